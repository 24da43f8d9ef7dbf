// Core utilities: math, curves, randomness and identity tokens

pub mod curve;
pub mod id;
pub mod math;
pub mod rng;

pub use curve::{Curve, Keyframe};
pub use id::{IdRegistry, ModeId, StatId, StateId};
pub use math::RangedFloat;
pub use rng::GameRng;
