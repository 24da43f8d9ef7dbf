// Modes: prioritized, cooldown-gated ability animations layered on top of
// locomotion

pub mod ability;
pub mod mode;
pub mod system;

pub use ability::{Ability, AbilityStatus, AffectStates, ModeProperties};
pub use mode::{AbilityChoice, Mode, ModeOutcome};
pub use system::{ModeEnv, ModeSystem};
