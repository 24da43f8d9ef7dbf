// A mode: one family of abilities with priority and cooldown rules

use serde::{Deserialize, Serialize};

use super::ability::{Ability, AbilityStatus};
use crate::core::ModeId;

/// Which ability a mode should try next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityChoice {
    /// Nothing selected; activation is a no-op
    #[default]
    None,
    /// The ability with this index
    Fixed(i32),
    /// Any ability of the mode, uniformly
    Random,
}

/// How the last (or current) mode play ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeOutcome {
    #[default]
    None,
    Prepared,
    Playing,
    Completed,
    Interrupted,
    ForceExit,
}

#[derive(Debug, Clone)]
pub struct Mode {
    pub id: ModeId,
    pub name: String,
    /// Input name that drives this mode
    pub input: Option<String>,
    pub active: bool,
    /// Preempt lower priority modes that are playing
    pub ignore_lower_modes: bool,
    /// Higher wins
    pub priority: i32,
    /// Seconds before the mode can be preempted or replayed; 0 disables it
    pub cooldown: f32,
    pub abilities: Vec<Ability>,
    pub ability_index: AbilityChoice,
    pub default_index: AbilityChoice,
    pub reset_to_default: bool,
    pub allow_rotation: bool,
    pub allow_movement: bool,

    pub(crate) playing: bool,
    pub(crate) in_cooldown: bool,
    pub(crate) activation_time: f32,
    /// Position in `abilities` of the pending or playing ability
    pub(crate) active_ability: Option<usize>,
    pub(crate) input_value: bool,
    pub(crate) in_transition: bool,
}

impl Mode {
    pub fn new(id: ModeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            input: None,
            active: true,
            ignore_lower_modes: false,
            priority: 0,
            cooldown: 0.0,
            abilities: Vec::new(),
            ability_index: AbilityChoice::Random,
            default_index: AbilityChoice::Random,
            reset_to_default: false,
            allow_rotation: false,
            allow_movement: false,
            playing: false,
            in_cooldown: false,
            activation_time: 0.0,
            active_ability: None,
            input_value: false,
            in_transition: false,
        }
    }

    pub fn with_input(mut self, input: &str) -> Self {
        self.input = Some(input.to_string());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }

    pub fn ignoring_lower_modes(mut self) -> Self {
        self.ignore_lower_modes = true;
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_default_index(mut self, choice: AbilityChoice) -> Self {
        self.ability_index = choice;
        self.default_index = choice;
        self
    }

    pub fn has_cooldown(&self) -> bool {
        self.cooldown > 0.0
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn in_cooldown(&self) -> bool {
        self.in_cooldown
    }

    pub fn input_value(&self) -> bool {
        self.input_value
    }

    pub fn activation_time(&self) -> f32 {
        self.activation_time
    }

    pub fn is_in_transition(&self) -> bool {
        self.in_transition
    }

    /// The pending or playing ability
    pub fn active_ability(&self) -> Option<&Ability> {
        self.active_ability.and_then(|pos| self.abilities.get(pos))
    }

    pub fn active_ability_index(&self) -> Option<i32> {
        self.active_ability().map(|a| a.index)
    }

    pub fn ability(&self, index: i32) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.index == index)
    }

    pub fn ability_by_name(&self, name: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.name == name)
    }

    pub fn has_ability_index(&self, index: i32) -> bool {
        self.ability(index).is_some()
    }

    pub(crate) fn ability_position(&self, index: i32) -> Option<usize> {
        self.abilities.iter().position(|a| a.index == index)
    }

    /// True if the active ability has this status
    pub fn check_status(&self, status: AbilityStatus) -> bool {
        self.active_ability()
            .map_or(false, |ability| ability.status() == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack() -> Mode {
        Mode::new(ModeId::ATTACK1, "Attack1")
            .with_ability(Ability::new("Bite", 1))
            .with_ability(Ability::new("Claw", 2).with_status(AbilityStatus::Toggle))
    }

    #[test]
    fn test_ability_lookup() {
        let mode = attack();
        assert_eq!(mode.ability(2).map(|a| a.name.as_str()), Some("Claw"));
        assert_eq!(mode.ability_by_name("Bite").map(|a| a.index), Some(1));
        assert!(!mode.has_ability_index(7));
        assert_eq!(mode.ability_position(2), Some(1));
    }

    #[test]
    fn test_check_status_needs_active_ability() {
        let mut mode = attack();
        assert!(!mode.check_status(AbilityStatus::Toggle));

        mode.active_ability = Some(1);
        assert!(mode.check_status(AbilityStatus::Toggle));
        assert_eq!(mode.active_ability_index(), Some(2));
    }

    #[test]
    fn test_cooldown_presence() {
        assert!(!attack().has_cooldown());
        assert!(attack().with_cooldown(0.5).has_cooldown());
    }
}
