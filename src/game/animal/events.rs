// Messages flowing into and out of an animal

use crate::core::{ModeId, StatId, StateId};
use crate::game::modes::{AbilityChoice, ModeOutcome};

/// Notifications posted by the animation layer
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEvent {
    /// The animation tag of a mode was entered
    TagEntered { mode: ModeId },
    /// The animation tag of a mode was left. `next_ability` names an ability
    /// of the same mode the animation transitions into directly.
    TagExited {
        mode: ModeId,
        ability: i32,
        next_ability: Option<i32>,
    },
    /// Per-frame progress of the mode animation
    ModeStateMove {
        mode: ModeId,
        normalized_time: f32,
        in_transition: bool,
    },
}

/// Observable things that happened to an animal
#[derive(Debug, Clone, PartialEq)]
pub enum AnimalEvent {
    ModeEntered { mode: ModeId, ability: i32 },
    AbilityEntered { mode: ModeId, ability: i32 },
    AbilityExited { mode: ModeId, ability: i32 },
    ModeExited { mode: ModeId, outcome: ModeOutcome },
    AbilityIndexChanged { mode: ModeId, choice: AbilityChoice },
    ZoneActivated { mode: ModeId },
    StateChanged { from: StateId, to: StateId },
    Landed { distance: f32, status: Option<i32> },
    FallDamage { stat: StatId, percent: f32 },
    AnomalyRecovered { state: StateId },
}

/// Who a timed task belongs to; used for bulk cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Mode(ModeId),
    Reaction,
}

/// Deferred work resumed by the animal when its time comes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimedTask {
    /// A mode's cooldown has run out
    CooldownElapsed(ModeId),
    /// An `ActiveByTime` ability has been held long enough
    AbilityTimeout { mode: ModeId, ability: i32 },
    /// A force reaction's push time is over
    ForceReactionEnded { exit_drag: f32 },
}
