// Interaction zones

use serde::{Deserialize, Serialize};

use crate::core::ModeId;
use crate::game::modes::{AbilityChoice, AbilityStatus};

/// What entering the zone offers the animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    /// Activates an ability of a mode with the zone's status
    Mode,
    State,
    Stance,
}

/// An area the animal is standing in
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub kind: ZoneKind,
    pub mode: ModeId,
    pub ability_index: AbilityChoice,
    /// Status forced onto the ability activated through this zone
    pub ability_status: AbilityStatus,
    /// Hold time used when the forced status is `ActiveByTime`
    pub ability_time: f32,
    pub mode_float: f32,
}

impl Zone {
    /// Zone that plays one ability of `mode`
    pub fn mode(mode: ModeId, ability: i32, status: AbilityStatus) -> Self {
        Self {
            kind: ZoneKind::Mode,
            mode,
            ability_index: AbilityChoice::Fixed(ability),
            ability_status: status,
            ability_time: 0.0,
            mode_float: 0.0,
        }
    }

    pub fn with_ability_time(mut self, time: f32) -> Self {
        self.ability_time = time;
        self
    }

    pub fn with_mode_float(mut self, value: f32) -> Self {
        self.mode_float = value;
        self
    }

    /// True if this zone drives `mode`
    pub fn drives_mode(&self, mode: ModeId) -> bool {
        self.kind == ZoneKind::Mode && self.mode == mode
    }
}
