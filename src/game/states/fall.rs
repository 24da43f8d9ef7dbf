// Fall: unsupported vertical motion until ground is touched again

use std::any::Any;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{LocomotionState, StateContext, StateCore, StateProfile};
use crate::core::math::{angle_deg, lerp, lerp_vec, project, project_on_plane};
use crate::core::{StatId, StateId};
use crate::engine::physics::QueryTriggers;
use crate::game::animal::events::AnimalEvent;
use crate::game::animal::kinematics::{Kinematics, SpeedProfile};
use crate::game::animal::stats::StatOption;

/// Length of the landing probe cast from the main pivot
const FALL_PROBE_DISTANCE: f32 = 100.0;
/// Per-step drop above which the body is snapped onto the contact point
const SNAP_DELTA: f32 = 0.1;

/// What drives the fall blend float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallBlending {
    /// Remaining height normalized by the highest point of the fall
    #[default]
    DistanceNormalized,
    /// Raw accumulated fall distance
    Distance,
    /// Signed vertical speed
    VerticalVelocity,
}

/// Landing animation variant picked by fall distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandStatus {
    pub distance: f32,
    pub status: i32,
}

impl LandStatus {
    pub const fn new(distance: f32, status: i32) -> Self {
        Self { distance, status }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallConfig {
    /// Steer with the movement input while falling
    pub air_control: bool,
    pub air_rotation: f32,
    /// Horizontal speed to reach while falling, 0 keeps the take-off speed
    pub air_movement: f32,
    pub air_smooth: f32,
    /// Decay rate of the upward impulse carried into the fall
    pub air_drag: f32,
    /// Look-ahead of the entry cast along forward
    pub fall_ray_forward: f32,
    pub fall_ray_multiplier: f32,
    pub ray_hits: usize,
    pub lower_blend_distance: f32,
    pub blend_fall: FallBlending,
    /// Falls shorter than this cause no damage
    pub fall_min_distance: f32,
    /// Fall distance that takes the whole stat
    pub fall_max_distance: f32,
    /// Ordered by distance
    pub land_status: Vec<LandStatus>,
    pub affect_stat: Option<StatId>,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            air_control: true,
            air_rotation: 10.0,
            air_movement: 0.0,
            air_smooth: 2.0,
            air_drag: 1.0,
            fall_ray_forward: 0.1,
            fall_ray_multiplier: 1.0,
            ray_hits: 2,
            lower_blend_distance: 0.1,
            blend_fall: FallBlending::DistanceNormalized,
            fall_min_distance: 5.0,
            fall_max_distance: 15.0,
            land_status: Vec::new(),
            affect_stat: None,
        }
    }
}

/// Status of the last threshold not exceeding `distance`. Thresholds are
/// scanned in order; 0 is used when none is reached.
pub fn select_land_status(list: &[LandStatus], distance: f32) -> Option<i32> {
    if list.is_empty() {
        return None;
    }
    let status = list
        .iter()
        .filter(|ls| ls.distance <= distance)
        .last()
        .map_or(0, |ls| ls.status);
    Some(status)
}

#[derive(Debug, Clone)]
pub struct Fall {
    core: StateCore,
    pub config: FallConfig,

    max_height: f32,
    fall_current_distance: f32,
    distance_to_ground: f32,
    last_delta_distance: f32,
    fall_blend: f32,
    up_impulse: Vec3,
    has_up_impulse: bool,
    going_down: bool,
    delta_going_down: bool,
    found_land: bool,
    starting_speed_direction: Vec3,
    current_speed_pos: f32,
}

impl Fall {
    pub fn new(config: FallConfig) -> Self {
        let profile = StateProfile {
            grounded: Some(false),
            gravity: Some(true),
            ..StateProfile::default()
        };
        let mut fall = Self {
            core: StateCore::new(StateId::FALL, "Fall", 3, profile),
            config,
            max_height: f32::NEG_INFINITY,
            fall_current_distance: 0.0,
            distance_to_ground: f32::INFINITY,
            last_delta_distance: 0.0,
            fall_blend: 1.0,
            up_impulse: Vec3::ZERO,
            has_up_impulse: false,
            going_down: false,
            delta_going_down: false,
            found_land: false,
            starting_speed_direction: Vec3::Z,
            current_speed_pos: 0.0,
        };
        fall.reset_state_values();
        fall
    }

    /// Distance travelled down since the fall started
    pub fn fall_current_distance(&self) -> f32 {
        self.fall_current_distance
    }

    /// Highest height above ground seen during the fall
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    pub fn distance_to_ground(&self) -> f32 {
        self.distance_to_ground
    }

    pub fn up_impulse(&self) -> Vec3 {
        self.up_impulse
    }

    pub fn found_land(&self) -> bool {
        self.found_land
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.core.debug {
            debug!("[Fall] {}", message);
        }
    }

    /// Feed the blend float from the current ground distance
    fn blend(&mut self, ctx: &mut StateContext<'_>) {
        let kin = &*ctx.kinematics;
        match self.config.blend_fall {
            FallBlending::DistanceNormalized => {
                let real_distance = self.distance_to_ground - kin.height();
                if self.max_height < real_distance {
                    self.max_height = real_distance;
                } else if self.max_height > 0.0 {
                    let target = (real_distance - self.config.lower_blend_distance) / self.max_height;
                    self.fall_blend = lerp(self.fall_blend, target, ctx.delta_time * 10.0);
                    ctx.animator.set_state_float(1.0 - self.fall_blend);
                }
            }
            FallBlending::Distance => {
                ctx.animator.set_state_float(self.fall_current_distance);
            }
            FallBlending::VerticalVelocity => {
                if kin.delta_time > 0.0 {
                    let up_inertia = project(kin.delta_pos, kin.up_vector).length();
                    let sign = if self.going_down { 1.0 } else { -1.0 };
                    ctx.animator.set_state_float(up_inertia / kin.delta_time * sign);
                }
            }
        }
    }

    /// Push the body forward when it stopped falling without landing
    fn unstick_from_ledge(&self, kin: &mut Kinematics, delta_distance: f32, dt: f32) {
        if self.delta_going_down && !self.going_down && self.last_delta_distance > delta_distance {
            kin.reset_up_vector();
            kin.movement_axis.z = 1.0;
            kin.inertia_position_speed = kin.forward * kin.scale_factor() * dt * kin.config.fall_forward;
            kin.additive_position += kin.inertia_position_speed;
            self.trace(format_args!("stuck on a ledge, pushing forward"));
        }
    }
}

impl Default for Fall {
    fn default() -> Self {
        Self::new(FallConfig::default())
    }
}

impl LocomotionState for Fall {
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

    fn try_activate(&mut self, ctx: &mut StateContext<'_>) -> bool {
        let physics = ctx.physics;
        let kin = &mut *ctx.kinematics;

        let look_ahead = kin.vertical_smooth * self.config.fall_ray_forward * kin.scale_factor();
        let pivot = kin.main_pivot + kin.forward * look_ahead + kin.delta_pos;
        let length = kin.pivot_multiplier() * self.config.fall_ray_multiplier;
        let direction = if kin.terrain_slope < 0.0 {
            kin.gravity
        } else {
            -kin.up_vector
        };

        let hits = physics.sphere_cast_all(
            pivot,
            kin.radius(),
            direction,
            length,
            kin.ground_layer,
            QueryTriggers::Ignore,
            self.config.ray_hits.max(1),
        );
        let Some(nearest) = hits.first() else {
            self.trace(format_args!("no ground beneath the animal"));
            return true;
        };

        let max_slope = kin.max_angle_slope;
        if kin.grounded {
            let accepted = hits.iter().find(|hit| {
                let slope = kin.signed_slope(hit.normal);
                slope > -max_slope && slope <= max_slope
            });
            let Some(ground) = accepted else {
                self.trace(format_args!("no walkable ground in {} hits", hits.len()));
                return true;
            };

            self.distance_to_ground = ground.distance;
            let slope = kin.signed_slope(ground.normal);
            if slope < -max_slope || kin.deep_slope {
                self.trace(format_args!("slope too deep ({:.2})", slope));
                return true;
            }
            false
        } else {
            self.distance_to_ground = nearest.distance;
            if angle_deg(nearest.normal, kin.up_vector) > max_slope {
                self.trace(format_args!("airborne over a steep slope"));
                return true;
            }
            if kin.height() >= nearest.distance {
                if kin.has_external_force() {
                    return true;
                }
                kin.check_if_grounded(physics);
            }
            false
        }
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>) {
        let kin = &mut *ctx.kinematics;
        self.starting_speed_direction = kin.speed_direction;
        self.core.enter(kin);
        ctx.animator.set_state_float(0.0);
        self.reset_state_values();

        self.up_impulse = project(kin.delta_pos, kin.up_vector);
        self.core.ignore_lower_states = false;

        let speed = kin.horizontal_speed() + kin.external_force_h_speed();
        self.current_speed_pos = speed;
        kin.set_custom_speed(SpeedProfile {
            name: "FallSpeed".to_string(),
            position: speed,
            strafe: speed,
            rotation: self.config.air_rotation,
            animator: 1.0,
        });

        if kin.has_external_force() && ctx.in_zone {
            kin.use_gravity = false;
        }

        self.has_up_impulse = self.up_impulse.dot(kin.up_vector) > 0.0;
        let from_ground = matches!(
            ctx.last_state,
            StateId::IDLE | StateId::LOCOMOTION | StateId::SWIM | StateId::CLIMB
        );
        if (from_ground && self.has_up_impulse) || kin.has_external_force() {
            self.up_impulse = Vec3::ZERO;
        }
    }

    fn on_state_move(&mut self, ctx: &mut StateContext<'_>) {
        if !self.core.in_core_animation {
            return;
        }
        let dt = ctx.delta_time;
        let kin = &mut *ctx.kinematics;

        kin.additive_position += self.up_impulse;
        if self.has_up_impulse {
            self.up_impulse = lerp_vec(self.up_impulse, Vec3::ZERO, dt * self.config.air_drag);
        }

        let config = &self.config;
        if config.air_control
            && config.air_movement > 0.0
            && config.air_movement > self.current_speed_pos
        {
            self.current_speed_pos = lerp(self.current_speed_pos, config.air_movement, dt * config.air_smooth);
            if let Some(speed) = kin.custom_speed.as_mut() {
                speed.position = self.current_speed_pos;
                speed.strafe = self.current_speed_pos;
            }
        }
    }

    fn try_exit_state(&mut self, ctx: &mut StateContext<'_>) {
        let dt = ctx.delta_time;
        let gravity = ctx.kinematics.gravity;

        self.delta_going_down = self.going_down;
        self.going_down = ctx.kinematics.delta_pos.dot(gravity) > 0.0;

        let mut delta_distance = 0.0;
        if self.going_down {
            delta_distance = project(ctx.kinematics.delta_pos, gravity).length();
            self.fall_current_distance += delta_distance;
        }

        let fall_point = ctx.kinematics.main_pivot;
        let ground_layer = ctx.kinematics.ground_layer;
        let hit = ctx.physics.raycast(
            fall_point,
            gravity,
            FALL_PROBE_DISTANCE,
            ground_layer,
            QueryTriggers::Ignore,
        );

        match hit {
            Some(hit) => {
                self.distance_to_ground = hit.distance;
                self.found_land = true;
                self.blend(ctx);

                let kin = &mut *ctx.kinematics;
                let touched = kin.height() > self.distance_to_ground
                    || self.distance_to_ground - delta_distance < 0.0;
                let slope = angle_deg(hit.normal, kin.up_vector);
                if touched && slope <= kin.max_angle_slope {
                    self.allow_exit();
                    kin.grounded = true;
                    kin.use_gravity = false;

                    let grounded_pos = project(hit.point - kin.position, gravity);
                    if delta_distance > SNAP_DELTA {
                        kin.teleport(kin.position + grounded_pos);
                    }
                    kin.reset_up_vector();
                    self.up_impulse = Vec3::ZERO;
                    self.trace(format_args!(
                        "grounded on a {:.1} degree slope, last drop {:.3}",
                        slope, delta_distance
                    ));
                }
            }
            None if self.found_land => {
                let kin = &mut *ctx.kinematics;
                kin.teleport(kin.last_pos);
                kin.reset_up_vector();
                ctx.events.push(AnimalEvent::AnomalyRecovered {
                    state: StateId::FALL,
                });
                debug!("fall lost its ground hit, restoring last position");
            }
            None => {}
        }

        if !ctx.in_zone && !ctx.kinematics.has_external_force() {
            self.unstick_from_ledge(ctx.kinematics, delta_distance, dt);
        }
        self.last_delta_distance = delta_distance;
    }

    fn exit_state(&mut self, ctx: &mut StateContext<'_>) {
        let distance = self.fall_current_distance;
        let status = select_land_status(&self.config.land_status, distance);
        if let Some(status) = status {
            ctx.animator.set_exit_status(status);
        }

        if !ctx.kinematics.grounded {
            return;
        }
        ctx.events.push(AnimalEvent::Landed { distance, status });
        debug!("landed after falling {:.2}", distance);

        if let Some(stat) = self.config.affect_stat {
            if distance > self.config.fall_min_distance && self.config.fall_max_distance > 0.0 {
                let percent = distance * 100.0 / self.config.fall_max_distance;
                if ctx.stats.modify(stat, percent, StatOption::ReduceByPercent).is_some() {
                    ctx.events.push(AnimalEvent::FallDamage { stat, percent });
                }
            }
        }
    }

    fn reset_state_values(&mut self) {
        self.max_height = f32::NEG_INFINITY;
        self.going_down = false;
        self.delta_going_down = false;
        self.found_land = false;
        self.distance_to_ground = f32::INFINITY;
        self.fall_blend = 1.0;
        self.up_impulse = Vec3::ZERO;
        self.has_up_impulse = false;
        self.fall_current_distance = 0.0;
        self.last_delta_distance = 0.0;
        self.current_speed_pos = 0.0;
    }

    fn restore_animal_on_exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.kinematics.custom_speed = None;
    }

    fn on_external_force(&mut self) {
        self.fall_current_distance = 0.0;
    }

    fn speed_direction(&self, kinematics: &Kinematics) -> Vec3 {
        if kinematics.has_external_force() {
            project_on_plane(kinematics.external_force, kinematics.up_vector).normalize_or_zero()
        } else if self.config.air_control {
            kinematics.forward
        } else {
            self.starting_speed_direction
        }
    }
}
