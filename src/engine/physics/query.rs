use glam::Vec3;

use super::layers::LayerMask;

/// Identity of the collider a query hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(pub u64);

/// Result of a ray or sphere cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Contact point in world space
    pub point: Vec3,
    /// Surface normal at the contact point
    pub normal: Vec3,
    /// Distance travelled along the cast direction before contact
    pub distance: f32,
    pub collider: ColliderId,
}

/// Whether trigger (sensor) colliders take part in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryTriggers {
    #[default]
    Ignore,
    Collide,
}

impl QueryTriggers {
    pub fn accepts(self, is_trigger: bool) -> bool {
        !is_trigger || self == QueryTriggers::Collide
    }
}

/// Physics query surface the controller needs from the host engine
pub trait PhysicsQuery {
    /// Nearest hit along a ray, if any within `max_distance`
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        triggers: QueryTriggers,
    ) -> Option<RayHit>;

    /// Up to `max_hits` hits of a swept sphere, nearest first
    #[allow(clippy::too_many_arguments)]
    fn sphere_cast_all(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        triggers: QueryTriggers,
        max_hits: usize,
    ) -> Vec<RayHit>;
}

/// Sort hits nearest first, keep the closest per collider and cap the count
pub(crate) fn nearest_hits(mut hits: Vec<RayHit>, max_hits: usize) -> Vec<RayHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut result: Vec<RayHit> = Vec::with_capacity(hits.len().min(max_hits));
    for hit in hits {
        if result.len() >= max_hits {
            break;
        }
        if result.iter().any(|kept| kept.collider == hit.collider) {
            continue;
        }
        result.push(hit);
    }
    result
}
