// Ground locomotion: the base state every other state falls back to

use std::any::Any;

use super::{LocomotionState, StateContext, StateCore, StateProfile};
use crate::core::StateId;

#[derive(Debug, Clone)]
pub struct Locomotion {
    core: StateCore,
}

impl Locomotion {
    pub fn new() -> Self {
        let profile = StateProfile {
            grounded: Some(true),
            gravity: Some(false),
            free_movement: Some(false),
            ..StateProfile::default()
        };
        Self {
            core: StateCore::new(StateId::LOCOMOTION, "Locomotion", 1, profile),
        }
    }
}

impl Default for Locomotion {
    fn default() -> Self {
        Self::new()
    }
}

impl LocomotionState for Locomotion {
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
        ctx.kinematics.grounded
    }

    fn on_state_move(&mut self, ctx: &mut StateContext<'_>) {
        ctx.kinematics.align_to_ground(ctx.physics);
    }
}
