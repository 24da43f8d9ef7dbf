// Animator parameters driven by the controller

use std::collections::VecDeque;

use crate::core::{ModeId, StateId};

/// Mode status codes understood by the animation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeStatus {
    Available = 0,
    Loop = -1,
    Interrupted = -2,
    OneTime = -3,
}

impl ModeStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Work the animation layer is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorRequest {
    /// Transition into the animation of a prepared ability
    Prepare { mode: ModeId, ability: i32 },
    /// Leave the animation of the playing ability
    ExitMode { mode: ModeId, ability: i32 },
}

/// Parameter block mirrored to the host's animator
#[derive(Debug, Clone)]
pub struct Animator {
    /// Active locomotion state id
    pub state: StateId,
    /// Status inside the active state
    pub state_status: i32,
    /// Status chosen by the state being left (landing variant, ...)
    pub state_exit_status: i32,
    /// Blend float of the active state
    pub state_float: f32,
    /// `mode_id * 1000 + ability`, 0 when no mode is set
    pub mode_value: i32,
    pub mode_status: ModeStatus,
    /// Ability the mode transitions from, 0 for a fresh start
    pub mode_transition: i32,
    pub mode_power: f32,
    pub vertical_speed: f32,
    requests: VecDeque<AnimatorRequest>,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    pub fn new() -> Self {
        Self {
            state: StateId::LOCOMOTION,
            state_status: 0,
            state_exit_status: 0,
            state_float: 0.0,
            mode_value: 0,
            mode_status: ModeStatus::Available,
            mode_transition: 0,
            mode_power: 0.0,
            vertical_speed: 0.0,
            requests: VecDeque::new(),
        }
    }

    pub fn set_state(&mut self, state: StateId) {
        self.state = state;
        self.state_status = 0;
    }

    pub fn set_state_status(&mut self, status: i32) {
        self.state_status = status;
    }

    pub fn set_exit_status(&mut self, status: i32) {
        self.state_exit_status = status;
    }

    pub fn set_state_float(&mut self, value: f32) {
        self.state_float = value;
    }

    /// Select the mode/ability the next animation plays
    pub fn set_mode(&mut self, mode: ModeId, ability: i32, transition_from: i32) {
        self.mode_value = mode.raw() as i32 * 1000 + ability;
        self.mode_transition = transition_from;
    }

    /// Clear the mode selection and mark the slot available
    pub fn clear_mode(&mut self) {
        self.mode_value = 0;
        self.mode_transition = 0;
        self.mode_status = ModeStatus::Available;
    }

    pub fn set_mode_status(&mut self, status: ModeStatus) {
        self.mode_status = status;
    }

    pub fn set_mode_power(&mut self, power: f32) {
        self.mode_power = power;
    }

    pub fn request(&mut self, request: AnimatorRequest) {
        self.requests.push_back(request);
    }

    /// Take every pending request in order
    pub fn drain_requests(&mut self) -> Vec<AnimatorRequest> {
        self.requests.drain(..).collect()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }
}
