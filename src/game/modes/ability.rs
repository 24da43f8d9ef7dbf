// Abilities and their activation properties

use serde::{Deserialize, Serialize};

use crate::core::StateId;

/// How long an ability stays active once its animation has started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AbilityStatus {
    /// Plays once and exits when the animation ends
    #[default]
    PlayOneTime,
    /// Stays on while the input is held
    HoldInputDown,
    /// Stays on for `hold_by_time` seconds
    ActiveByTime,
    /// Switched on and off by successive activations
    Toggle,
    /// Plays until interrupted
    Forever,
}

/// How an ability's state list filters the active locomotion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AffectStates {
    #[default]
    None,
    /// Only allowed while in one of the listed states
    Include,
    /// Not allowed while in any of the listed states
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeProperties {
    pub status: AbilityStatus,
    pub hold_by_time: f32,
    pub affect: AffectStates,
    pub affect_states: Vec<StateId>,
    /// Abilities of the same mode this one may interrupt directly
    pub transition_from: Vec<i32>,
}

impl ModeProperties {
    /// Copy of another ability's properties without its transition list
    pub fn copy_from(other: &ModeProperties) -> Self {
        Self {
            status: other.status,
            hold_by_time: other.hold_by_time,
            affect: other.affect,
            affect_states: other.affect_states.clone(),
            transition_from: Vec::new(),
        }
    }
}

/// One animation variant of a mode, selected by index
#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    pub active: bool,
    pub name: String,
    /// Unique within the owning mode
    pub index: i32,
    pub properties: ModeProperties,
}

impl Ability {
    pub fn new(name: &str, index: i32) -> Self {
        Self {
            active: true,
            name: name.to_string(),
            index,
            properties: ModeProperties::default(),
        }
    }

    pub fn with_status(mut self, status: AbilityStatus) -> Self {
        self.properties.status = status;
        self
    }

    pub fn with_hold_time(mut self, seconds: f32) -> Self {
        self.properties.hold_by_time = seconds;
        self
    }

    pub fn with_affect(mut self, affect: AffectStates, states: Vec<StateId>) -> Self {
        self.properties.affect = affect;
        self.properties.affect_states = states;
        self
    }

    pub fn with_transition_from(mut self, indices: Vec<i32>) -> Self {
        self.properties.transition_from = indices;
        self
    }

    pub fn status(&self) -> AbilityStatus {
        self.properties.status
    }

    pub fn has_affect_states(&self) -> bool {
        !self.properties.affect_states.is_empty()
    }

    pub fn has_transition_from(&self) -> bool {
        !self.properties.transition_from.is_empty()
    }

    pub fn can_transition_from(&self, index: i32) -> bool {
        self.properties.transition_from.contains(&index)
    }

    /// True when the locomotion state `state` forbids this ability
    pub fn blocked_by_state(&self, state: StateId) -> bool {
        let properties = &self.properties;
        if properties.affect == AffectStates::None || !self.has_affect_states() {
            return false;
        }

        let listed = properties.affect_states.contains(&state);
        match properties.affect {
            AffectStates::Exclude => listed,
            AffectStates::Include => !listed,
            AffectStates::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_filter() {
        let ground_only = Ability::new("Bite", 1)
            .with_affect(AffectStates::Include, vec![StateId::LOCOMOTION]);
        assert!(!ground_only.blocked_by_state(StateId::LOCOMOTION));
        assert!(ground_only.blocked_by_state(StateId::FLY));

        let not_flying = Ability::new("Roar", 2)
            .with_affect(AffectStates::Exclude, vec![StateId::FLY]);
        assert!(not_flying.blocked_by_state(StateId::FLY));
        assert!(!not_flying.blocked_by_state(StateId::FALL));
    }

    #[test]
    fn test_empty_filter_never_blocks() {
        let ability = Ability::new("Tail", 3).with_affect(AffectStates::Include, Vec::new());
        assert!(!ability.blocked_by_state(StateId::FLY));
    }

    #[test]
    fn test_copy_from_drops_transitions() {
        let source = Ability::new("Lie", 2)
            .with_status(AbilityStatus::Forever)
            .with_transition_from(vec![1]);
        let copy = ModeProperties::copy_from(&source.properties);

        assert_eq!(copy.status, AbilityStatus::Forever);
        assert!(copy.transition_from.is_empty());
    }
}
