// Kinematic body of an animal: what states read and write every tick

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::math::{angle_deg, lerp_vec, project, project_on_plane};
use crate::engine::physics::{LayerMask, PhysicsQuery, QueryTriggers};

/// Static body configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Distance from the feet to the main pivot (unscaled)
    pub height: f32,
    /// Radius used for thick ground casts (unscaled)
    pub radius: f32,
    pub scale: f32,
    /// Multiplier applied to the main pivot ray length
    pub pivot_multiplier: f32,
    /// Steepest walkable slope in degrees
    pub max_angle_slope: f32,
    pub gravity_direction: Vec3,
    pub gravity_power: f32,
    /// Gravity time the fall acceleration restarts from
    pub gravity_start_time: f32,
    /// Forward push used to free the body when stuck on a ledge
    pub fall_forward: f32,
    pub ground_layer: LayerMask,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            height: 1.0,
            radius: 0.3,
            scale: 1.0,
            pivot_multiplier: 1.0,
            max_angle_slope: 45.0,
            gravity_direction: Vec3::NEG_Y,
            gravity_power: 9.81,
            gravity_start_time: 0.0,
            fall_forward: 1.0,
            ground_layer: LayerMask::GROUND,
        }
    }
}

/// Speed profile installed by a state (fall speed, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedProfile {
    pub name: String,
    pub position: f32,
    pub strafe: f32,
    pub rotation: f32,
    pub animator: f32,
}

/// Position, orientation and motion flags of one animal
#[derive(Debug, Clone)]
pub struct Kinematics {
    pub config: KinematicsConfig,

    // Transform
    /// Feet position
    pub position: Vec3,
    /// Position before the last integration step
    pub last_pos: Vec3,
    pub forward: Vec3,
    pub up_vector: Vec3,
    /// Main pivot (position + up * height)
    pub main_pivot: Vec3,

    // Motion
    /// Displacement applied by the last integration step
    pub delta_pos: Vec3,
    /// Displacement requested for the next integration step
    pub additive_position: Vec3,
    pub delta_time: f32,
    pub movement_axis: Vec3,
    pub inertia_position_speed: Vec3,
    pub pitch_direction: Vec3,
    /// Direction the active state moves the body along
    pub speed_direction: Vec3,
    /// Forward input amount, used to look ahead when probing for ledges
    pub vertical_smooth: f32,

    // Gravity
    pub gravity: Vec3,
    pub gravity_power: f32,
    pub gravity_time: f32,
    pub gravity_velocity: Vec3,
    pub use_gravity: bool,
    pub grounded: bool,

    // Terrain
    pub terrain_slope: f32,
    pub max_angle_slope: f32,
    pub deep_slope: bool,
    pub ground_layer: LayerMask,

    // External force
    pub external_force: Vec3,
    pub current_external_force: Vec3,
    pub external_force_acel: f32,

    // Movement flags
    pub free_movement: bool,
    pub always_forward: bool,
    pub strafe: bool,
    pub speed_locked: bool,
    pub free_movement_limits: Option<(f32, f32)>,
    pub custom_speed: Option<SpeedProfile>,
    pub vertical_speed_modifier: f32,

    teleported: bool,
}

impl Kinematics {
    pub fn new(config: KinematicsConfig) -> Self {
        let gravity = config.gravity_direction.normalize_or_zero();
        let gravity = if gravity == Vec3::ZERO { Vec3::NEG_Y } else { gravity };

        let mut kinematics = Self {
            position: Vec3::ZERO,
            last_pos: Vec3::ZERO,
            forward: Vec3::Z,
            up_vector: -gravity,
            main_pivot: Vec3::ZERO,
            delta_pos: Vec3::ZERO,
            additive_position: Vec3::ZERO,
            delta_time: 0.0,
            movement_axis: Vec3::ZERO,
            inertia_position_speed: Vec3::ZERO,
            pitch_direction: Vec3::Z,
            speed_direction: Vec3::Z,
            vertical_smooth: 0.0,
            gravity,
            gravity_power: config.gravity_power,
            gravity_time: config.gravity_start_time,
            gravity_velocity: Vec3::ZERO,
            use_gravity: false,
            grounded: true,
            terrain_slope: 0.0,
            max_angle_slope: config.max_angle_slope,
            deep_slope: false,
            ground_layer: config.ground_layer,
            external_force: Vec3::ZERO,
            current_external_force: Vec3::ZERO,
            external_force_acel: 0.0,
            free_movement: false,
            always_forward: false,
            strafe: false,
            speed_locked: false,
            free_movement_limits: None,
            custom_speed: None,
            vertical_speed_modifier: 1.0,
            teleported: false,
            config,
        };
        kinematics.update_pivot();
        kinematics
    }

    pub fn scale_factor(&self) -> f32 {
        self.config.scale
    }

    /// Scaled pivot height
    pub fn height(&self) -> f32 {
        self.config.height * self.config.scale
    }

    /// Scaled cast radius
    pub fn radius(&self) -> f32 {
        self.config.radius * self.config.scale
    }

    pub fn pivot_multiplier(&self) -> f32 {
        self.config.height * self.config.scale * self.config.pivot_multiplier
    }

    pub fn has_external_force(&self) -> bool {
        self.external_force != Vec3::ZERO
    }

    pub fn right(&self) -> Vec3 {
        self.up_vector.cross(self.forward).normalize_or_zero()
    }

    /// Horizontal speed of the last step in units per second
    pub fn horizontal_speed(&self) -> f32 {
        if self.delta_time <= 0.0 {
            return 0.0;
        }
        project_on_plane(self.delta_pos, self.up_vector).length() / self.delta_time
    }

    /// Horizontal speed contributed by the external force
    pub fn external_force_h_speed(&self) -> f32 {
        project_on_plane(self.current_external_force, self.up_vector).length()
    }

    /// Transform a local direction (x right, y up, z forward) to world space
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.right() * local.x + self.up_vector * local.y + self.forward * local.z
    }

    /// Place the body without producing a displacement
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.last_pos = position;
        self.delta_pos = Vec3::ZERO;
        self.update_pivot();
    }

    /// Move the body immediately; the pending step is discarded
    pub fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.teleported = true;
        self.update_pivot();
    }

    /// Re-align the up vector with gravity and drop carried vertical velocity
    pub fn reset_up_vector(&mut self) {
        self.up_vector = -self.gravity;
        self.gravity_time = self.config.gravity_start_time;
        self.gravity_velocity = Vec3::ZERO;
    }

    pub fn set_custom_speed(&mut self, speed: SpeedProfile) {
        self.custom_speed = Some(speed);
    }

    pub fn set_free_movement_limits(&mut self, limit: f32, bank: f32) {
        self.free_movement_limits = Some((limit, bank));
    }

    /// Add a decaying inertia vector to the pending step
    pub fn add_inertia(&mut self, inertia: &mut Vec3, speed: f32, dt: f32) {
        self.additive_position += *inertia;
        *inertia = lerp_vec(*inertia, Vec3::ZERO, dt * speed);
    }

    /// Signed slope of a surface: negative when it falls away in front
    pub fn signed_slope(&self, normal: Vec3) -> f32 {
        let slope = angle_deg(normal, self.up_vector);
        if normal.dot(self.forward) > 0.0 {
            -slope
        } else {
            slope
        }
    }

    /// Probe straight down from the pivot and snap onto walkable ground.
    /// Returns true when ground was found.
    pub fn check_if_grounded(&mut self, physics: &dyn PhysicsQuery) -> bool {
        let reach = self.height() + self.radius();
        let Some(hit) = physics.raycast(
            self.main_pivot,
            self.gravity,
            reach,
            self.ground_layer,
            QueryTriggers::Ignore,
        ) else {
            return false;
        };

        let slope = angle_deg(hit.normal, self.up_vector);
        if slope > self.max_angle_slope {
            return false;
        }

        self.terrain_slope = self.signed_slope(hit.normal);
        self.deep_slope = false;
        self.grounded = true;
        self.use_gravity = false;
        self.gravity_time = self.config.gravity_start_time;
        self.gravity_velocity = Vec3::ZERO;

        let snap = project(hit.point - self.position, self.gravity);
        self.teleport(self.position + snap);
        true
    }

    /// Keep a grounded body glued to the surface below it
    pub fn align_to_ground(&mut self, physics: &dyn PhysicsQuery) -> bool {
        let reach = self.height() + self.radius();
        let Some(hit) = physics.raycast(
            self.main_pivot,
            self.gravity,
            reach,
            self.ground_layer,
            QueryTriggers::Ignore,
        ) else {
            return false;
        };

        self.terrain_slope = self.signed_slope(hit.normal);
        self.deep_slope = angle_deg(hit.normal, self.up_vector) > self.max_angle_slope;
        self.additive_position += project(hit.point - self.position, self.gravity);
        true
    }

    /// Apply the pending step: additive displacement, gravity and external force
    pub fn integrate(&mut self, dt: f32) {
        self.delta_time = dt;

        if self.teleported {
            self.teleported = false;
            self.last_pos = self.position;
            self.delta_pos = Vec3::ZERO;
            self.additive_position = Vec3::ZERO;
            self.update_pivot();
            return;
        }

        self.last_pos = self.position;
        let mut step = self.additive_position;

        if self.use_gravity && !self.grounded {
            self.gravity_time += dt;
            self.gravity_velocity = self.gravity * self.gravity_power * self.gravity_time;
            step += self.gravity_velocity * dt;
        } else {
            self.gravity_time = self.config.gravity_start_time;
            self.gravity_velocity = Vec3::ZERO;
        }

        if self.external_force_acel > 0.0 {
            self.current_external_force = lerp_vec(
                self.current_external_force,
                self.external_force,
                dt * self.external_force_acel,
            );
        } else {
            self.current_external_force = self.external_force;
        }
        step += self.current_external_force * dt;

        self.position += step;
        self.delta_pos = step;
        self.additive_position = Vec3::ZERO;
        self.update_pivot();
    }

    fn update_pivot(&mut self) {
        self.main_pivot = self.position + self.up_vector * self.height();
    }
}

impl Default for Kinematics {
    fn default() -> Self {
        Self::new(KinematicsConfig::default())
    }
}
