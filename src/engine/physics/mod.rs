// Physics queries using rapier3d

mod layers;
mod query;
mod world;

pub use layers::LayerMask;
pub use query::{ColliderId, PhysicsQuery, QueryTriggers, RayHit};
pub use world::{ColliderHandle, PhysicsWorld};
