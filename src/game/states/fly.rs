// Fly: free or forward-locked aerial locomotion

use std::any::Any;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{LocomotionState, StateContext, StateCore, StateProfile};
use crate::core::math::{move_towards, project, project_on_plane};
use crate::core::{Curve, GameRng, RangedFloat, StateId};
use crate::engine::physics::{LayerMask, QueryTriggers};
use crate::game::animal::events::AnimalEvent;
use crate::game::animal::kinematics::Kinematics;

const LAND_PROBE_DISTANCE: f32 = 100.0;
/// Fraction of the surface distance the body is pushed back to
const SURFACE_PUSH: f32 = 0.75;

/// Extra landing probe hanging off a body part (head, chest) that can touch
/// ground before the main pivot does
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingBone {
    /// Offset from the main pivot in body space (x right, y up, z forward)
    pub offset: Vec3,
    /// Unscaled probe length
    pub distance: f32,
}

impl Default for BlockingBone {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            distance: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyConfig {
    pub bank: f32,
    pub y_limit: f32,
    pub bank_strafe: f32,
    pub y_limit_strafe: f32,
    /// Decay rate of the vertical inertia kept from the take-off
    pub inertia_lerp: f32,
    pub always_forward: bool,

    /// Upward take-off push, 0 disables it
    pub impulse: f32,
    pub impulse_time: f32,
    /// Impulse falloff sampled over `[0, 1]`
    pub impulse_curve: Curve,

    pub can_land: bool,
    pub land_on: LayerMask,
    pub land_multiplier: f32,

    /// Keep away from a surface instead of landing on it (water, ...)
    pub avoid_surface: bool,
    pub surface_distance: f32,
    pub surface_layer: LayerMask,

    pub glide_only: bool,
    pub auto_glide: bool,
    /// Duration range of a glide
    pub glide_chance: RangedFloat,
    /// Duration range of a flap
    pub flap_change: RangedFloat,
    pub flap_speed: f32,
    pub glide_speed: f32,
    pub variation: f32,

    pub gravity_drag: f32,
    pub down_acceleration: f32,
    pub blocking_bone: Option<BlockingBone>,
}

impl Default for FlyConfig {
    fn default() -> Self {
        Self {
            bank: 30.0,
            y_limit: 80.0,
            bank_strafe: 0.0,
            y_limit_strafe: 0.0,
            inertia_lerp: 1.0,
            always_forward: false,
            impulse: 0.0,
            impulse_time: 0.5,
            impulse_curve: Curve::linear_fade(),
            can_land: true,
            land_on: LayerMask::DEFAULT,
            land_multiplier: 1.0,
            avoid_surface: false,
            surface_distance: 0.5,
            surface_layer: LayerMask::WATER,
            glide_only: false,
            auto_glide: true,
            glide_chance: RangedFloat::new(0.8, 4.0),
            flap_change: RangedFloat::new(0.5, 4.0),
            flap_speed: 1.0,
            glide_speed: 2.0,
            variation: 0.3,
            gravity_drag: 0.0,
            down_acceleration: 0.5,
            blocking_bone: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fly {
    core: StateCore,
    pub config: FlyConfig,

    vertical_inertia: Vec3,
    acceleration: f32,
    is_gliding: bool,
    /// Duration of the current glide or flap
    fly_style_time: f32,
    /// When the current glide or flap started
    auto_glide_time: f32,
    going_down: bool,
    found_land: bool,
    touched_land: bool,
    last_always_forward: bool,
    elapsed_impulse_time: f32,
}

impl Fly {
    pub fn new(config: FlyConfig) -> Self {
        let profile = StateProfile {
            grounded: Some(false),
            gravity: Some(false),
            free_movement: Some(true),
            ignore_lower_states: true,
            persistent: false,
        };
        Self {
            core: StateCore::new(StateId::FLY, "Fly", 6, profile).with_input("Fly"),
            config,
            vertical_inertia: Vec3::ZERO,
            acceleration: 0.0,
            is_gliding: false,
            fly_style_time: 1.0,
            auto_glide_time: 0.0,
            going_down: false,
            found_land: false,
            touched_land: false,
            last_always_forward: false,
            elapsed_impulse_time: 0.0,
        }
    }

    pub fn is_gliding(&self) -> bool {
        self.is_gliding
    }

    pub fn fly_style_time(&self) -> f32 {
        self.fly_style_time
    }

    pub fn touched_land(&self) -> bool {
        self.touched_land
    }

    pub fn found_land(&self) -> bool {
        self.found_land
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.core.debug {
            debug!("[Fly] {}", message);
        }
    }

    /// Swap between gliding and flapping once the current style has run out
    fn auto_gliding(&mut self, kin: &mut Kinematics, time: f32, rng: &mut GameRng) {
        if time - self.auto_glide_time < self.fly_style_time {
            return;
        }
        self.auto_glide_time = time;
        self.is_gliding = !self.is_gliding;

        let config = &self.config;
        self.fly_style_time = if self.is_gliding {
            config.glide_chance.random(rng)
        } else {
            config.flap_change.random(rng)
        };

        let glide = rng.range_f32(config.glide_speed - config.variation, config.glide_speed);
        let flap = rng.range_f32(config.flap_speed, config.flap_speed + config.variation);
        kin.vertical_speed_modifier = if self.is_gliding && !kin.strafe { glide } else { flap };
    }

    /// Speed up while diving, slow back down otherwise
    fn gravity_push(&mut self, kin: &mut Kinematics, dt: f32) {
        if kin.movement_axis.y < 0.0 {
            self.acceleration += self.config.down_acceleration * kin.scale_factor() * dt;
        } else {
            self.acceleration = move_towards(self.acceleration, 0.0, dt * 2.0);
        }

        if self.acceleration != 0.0 {
            kin.additive_position += kin.inertia_position_speed.normalize_or_zero() * self.acceleration * dt;
        }
        if self.config.gravity_drag > 0.0 {
            kin.additive_position += kin.gravity * (self.config.gravity_drag * kin.scale_factor()) * dt;
        }
    }

    /// Hover above the avoided surface. Returns true while it is in reach.
    fn try_avoid_surface(&self, ctx: &mut StateContext<'_>) -> bool {
        if !self.config.avoid_surface {
            return false;
        }
        let kin = &mut *ctx.kinematics;
        let origin = kin.position + kin.additive_position;
        let distance = self.config.surface_distance * kin.scale_factor();

        let Some(hit) = ctx.physics.raycast(
            origin,
            kin.gravity,
            distance,
            self.config.surface_layer,
            QueryTriggers::Ignore,
        ) else {
            return false;
        };

        if kin.movement_axis.y < 0.0 {
            kin.movement_axis.y = 0.0;
        }
        let keep = distance * SURFACE_PUSH;
        if hit.distance < keep {
            kin.additive_position -= kin.gravity * (keep - hit.distance);
        }
        true
    }

    fn take_off_impulse(&mut self, kin: &mut Kinematics, dt: f32) {
        let config = &self.config;
        if config.impulse <= 0.0 || config.impulse_time <= 0.0 {
            return;
        }
        if self.elapsed_impulse_time <= config.impulse_time {
            let falloff = config.impulse_curve.evaluate(self.elapsed_impulse_time / config.impulse_time);
            kin.additive_position += kin.up_vector * config.impulse * falloff * dt;
            self.elapsed_impulse_time += dt;
        }
    }

    fn land(&mut self, kin: &mut Kinematics) {
        self.touched_land = true;
        kin.use_gravity = true;
        self.allow_exit();
    }
}

impl Default for Fly {
    fn default() -> Self {
        Self::new(FlyConfig::default())
    }
}

impl LocomotionState for Fly {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn awake(&mut self, time: f32, rng: &mut GameRng) {
        self.auto_glide_time = time;
        self.fly_style_time = self.config.glide_chance.random(rng);
    }

    fn try_activate(&mut self, _ctx: &mut StateContext<'_>) -> bool {
        self.core.input_value
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>) {
        self.reset_state_values();
        let kin = &mut *ctx.kinematics;
        self.core.enter(kin);

        self.last_always_forward = kin.always_forward;
        kin.always_forward = self.config.always_forward;
        self.core.input_value = true;

        self.vertical_inertia = project(kin.delta_pos, kin.up_vector);
        kin.pitch_direction = kin.forward;
        self.acceleration = 0.0;
        kin.inertia_position_speed = project_on_plane(kin.delta_pos, kin.up_vector);

        if self.config.glide_only {
            kin.vertical_speed_modifier = self.config.glide_speed;
            kin.speed_locked = true;
        } else {
            kin.vertical_speed_modifier = self.config.flap_speed;
            self.is_gliding = true;
        }
        self.auto_glide_time = ctx.time;
    }

    fn on_state_move(&mut self, ctx: &mut StateContext<'_>) {
        let dt = ctx.delta_time;
        if self.core.in_core_animation {
            let kin = &mut *ctx.kinematics;
            let (mut limit, bank) = if kin.strafe {
                (self.config.y_limit_strafe, self.config.bank_strafe)
            } else {
                (self.config.y_limit, self.config.bank)
            };

            self.going_down = kin.movement_axis.y <= 0.0;
            if self.config.glide_only && !self.going_down {
                kin.reset_up_vector();
                kin.movement_axis.y = 0.0;
                limit = 0.0;
            } else if self.config.auto_glide {
                self.auto_gliding(kin, ctx.time, ctx.rng);
            }

            self.gravity_push(kin, dt);

            if self.touched_land {
                limit = 0.0;
            }
            if kin.free_movement {
                kin.set_free_movement_limits(limit, bank);
            }

            if self.try_avoid_surface(ctx) {
                return;
            }

            if self.config.inertia_lerp > 0.0 {
                ctx.kinematics.add_inertia(&mut self.vertical_inertia, self.config.inertia_lerp, dt);
            }
        }

        self.take_off_impulse(ctx.kinematics, dt);
    }

    fn try_exit_state(&mut self, ctx: &mut StateContext<'_>) {
        if !self.core.input_value {
            self.allow_exit();
        }
        if !self.config.can_land || self.touched_land {
            return;
        }

        let physics = ctx.physics;
        let kin = &mut *ctx.kinematics;

        if let Some(bone) = self.config.blocking_bone {
            let origin = kin.main_pivot + kin.transform_direction(bone.offset);
            let reach = bone.distance * kin.scale_factor();
            if physics
                .raycast(origin, kin.gravity, reach, self.config.land_on, QueryTriggers::Ignore)
                .is_some()
            {
                self.trace(format_args!("blocking bone touched land"));
                self.land(kin);
                return;
            }
        }

        let pivot = kin.main_pivot + kin.additive_position;
        let land_distance = self.config.land_multiplier * kin.scale_factor();
        let hit = physics.raycast(
            pivot,
            kin.gravity,
            LAND_PROBE_DISTANCE,
            self.config.land_on,
            QueryTriggers::Ignore,
        );

        match hit {
            Some(hit) => {
                self.found_land = true;
                if hit.distance < land_distance {
                    self.trace(format_args!("landing, ground {:.2} away", hit.distance));
                    self.land(kin);
                }
            }
            None if self.found_land => {
                kin.teleport(kin.last_pos);
                kin.reset_up_vector();
                ctx.events.push(AnimalEvent::AnomalyRecovered {
                    state: StateId::FLY,
                });
                debug!("fly lost its ground hit, restoring last position");
            }
            None => {}
        }
    }

    fn reset_state_values(&mut self) {
        self.vertical_inertia = Vec3::ZERO;
        self.acceleration = 0.0;
        self.is_gliding = false;
        self.core.input_value = false;
        self.found_land = false;
        self.touched_land = false;
        self.going_down = false;
        self.elapsed_impulse_time = 0.0;
    }

    fn restore_animal_on_exit(&mut self, ctx: &mut StateContext<'_>) {
        let kin = &mut *ctx.kinematics;
        kin.free_movement = false;
        kin.always_forward = self.last_always_forward;
        kin.speed_locked = false;
        kin.free_movement_limits = None;
        if let Some(input) = self.core.input.as_deref() {
            ctx.input.set_input(input, false);
        }
    }

    fn on_input(&mut self, value: bool, is_active: bool) {
        self.core.input_value = value;
        if self.core.in_core_animation && is_active && !value {
            self.allow_exit();
        }
    }

    fn speed_direction(&self, kinematics: &Kinematics) -> Vec3 {
        if self.touched_land {
            kinematics.forward
        } else if kinematics.free_movement {
            kinematics.pitch_direction
        } else {
            kinematics.forward
        }
    }

    fn allow_exit(&mut self) {
        self.core.allow_exit();
        self.core.input_value = false;
    }
}
