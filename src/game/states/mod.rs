// Locomotion states
//
// One state is active per animal. Each state decides every tick whether it
// should take over (`try_activate`) and, while active, whether it is done
// (`try_exit_state`). The state machine owns the states and the active slot.

use std::any::Any;
use std::fmt;

use glam::Vec3;

use crate::core::{GameRng, ModeId, StateId};
use crate::engine::input::InputSource;
use crate::engine::physics::PhysicsQuery;
use crate::game::animal::animator::Animator;
use crate::game::animal::events::AnimalEvent;
use crate::game::animal::kinematics::Kinematics;
use crate::game::animal::stats::Stats;

pub mod fall;
pub mod fly;
pub mod locomotion;
pub mod machine;

pub use fall::{select_land_status, Fall, FallBlending, FallConfig, LandStatus};
pub use fly::{BlockingBone, Fly, FlyConfig};
pub use locomotion::Locomotion;
pub use machine::StateMachine;

/// Body settings a state applies when it becomes active. `None` leaves the
/// current value untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateProfile {
    pub grounded: Option<bool>,
    pub gravity: Option<bool>,
    pub free_movement: Option<bool>,
    pub ignore_lower_states: bool,
    pub persistent: bool,
}

/// Data shared by every locomotion state
#[derive(Debug, Clone)]
pub struct StateCore {
    pub id: StateId,
    pub name: String,
    /// Higher is tried first
    pub priority: i32,
    pub enabled: bool,
    /// Input name that drives this state
    pub input: Option<String>,
    pub input_value: bool,
    pub profile: StateProfile,
    /// While active, lower priority states are not tried
    pub ignore_lower_states: bool,
    /// While active, no other state is tried
    pub is_persistent: bool,
    pub in_core_animation: bool,
    /// Modes that put this state to sleep while they play
    pub sleep_from_mode: Vec<ModeId>,
    pub debug: bool,
}

impl StateCore {
    pub fn new(id: StateId, name: &str, priority: i32, profile: StateProfile) -> Self {
        Self {
            id,
            name: name.to_string(),
            priority,
            enabled: true,
            input: None,
            input_value: false,
            profile,
            ignore_lower_states: false,
            is_persistent: false,
            in_core_animation: false,
            sleep_from_mode: Vec::new(),
            debug: false,
        }
    }

    pub fn with_input(mut self, input: &str) -> Self {
        self.input = Some(input.to_string());
        self
    }

    /// Apply the activation profile to the body
    pub fn enter(&mut self, kinematics: &mut Kinematics) {
        let profile = self.profile;
        if let Some(grounded) = profile.grounded {
            kinematics.grounded = grounded;
        }
        if let Some(gravity) = profile.gravity {
            kinematics.use_gravity = gravity;
        }
        if let Some(free) = profile.free_movement {
            kinematics.free_movement = free;
        }
        self.ignore_lower_states = profile.ignore_lower_states;
        self.is_persistent = profile.persistent;
    }

    /// Let lower priority states take over
    pub fn allow_exit(&mut self) {
        self.ignore_lower_states = false;
        self.is_persistent = false;
    }

    /// True if `mode` puts this state to sleep
    pub fn sleeps_for(&self, mode: Option<ModeId>) -> bool {
        mode.map_or(false, |m| self.sleep_from_mode.contains(&m))
    }
}

/// Collaborators borrowed from the animal for one state tick
pub struct StateContext<'a> {
    pub kinematics: &'a mut Kinematics,
    pub physics: &'a dyn PhysicsQuery,
    pub animator: &'a mut Animator,
    pub input: &'a mut InputSource,
    pub rng: &'a mut GameRng,
    pub stats: &'a mut Stats,
    pub events: &'a mut Vec<AnimalEvent>,
    pub time: f32,
    pub delta_time: f32,
    /// The animal stands in a zone
    pub in_zone: bool,
    /// State active before the current one
    pub last_state: StateId,
}

/// A node of the locomotion state machine
pub trait LocomotionState: fmt::Debug {
    fn core(&self) -> &StateCore;
    fn core_mut(&mut self) -> &mut StateCore;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// One-time setup when the animal is created
    fn awake(&mut self, _time: f32, _rng: &mut GameRng) {}

    /// Whether this state should become active now
    fn try_activate(&mut self, ctx: &mut StateContext<'_>) -> bool;

    fn activate(&mut self, ctx: &mut StateContext<'_>) {
        self.core_mut().enter(ctx.kinematics);
    }

    /// Per-tick movement while active
    fn on_state_move(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Per-tick exit check while active
    fn try_exit_state(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called on the outgoing state when another state takes over
    fn exit_state(&mut self, _ctx: &mut StateContext<'_>) {}

    fn reset_state_values(&mut self) {}

    /// Undo the body changes made while active
    fn restore_animal_on_exit(&mut self, _ctx: &mut StateContext<'_>) {}

    fn on_input(&mut self, value: bool, _is_active: bool) {
        self.core_mut().input_value = value;
    }

    /// An external force was applied while this state is active
    fn on_external_force(&mut self) {}

    /// Direction the body moves along while this state is active
    fn speed_direction(&self, kinematics: &Kinematics) -> Vec3 {
        kinematics.forward
    }

    fn allow_exit(&mut self) {
        self.core_mut().allow_exit();
    }
}
