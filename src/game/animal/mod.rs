// Animal system
//
// This module contains everything one animal owns:
// - The orchestrator that ticks modes and states
// - Kinematics, animator parameters and stats
// - Zones, reactions and the events flowing in and out
// - Data-driven profiles

pub mod animator;
pub mod controller;
pub mod events;
pub mod kinematics;
pub mod profile;
pub mod reactions;
pub mod stats;
pub mod zone;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use animator::{Animator, AnimatorRequest, ModeStatus};
pub use controller::Animal;
pub use events::{AnimalEvent, AnimationEvent, TaskOwner, TimedTask};
pub use kinematics::{Kinematics, KinematicsConfig, SpeedProfile};
pub use profile::{AnimalProfile, ProfileError};
pub use reactions::{DirectionSpace, ForceReaction};
pub use stats::{Stat, StatOption, Stats};
pub use zone::{Zone, ZoneKind};
