use glam::Vec3;
use rapier3d::parry::query::RayCast;
use rapier3d::prelude::*;

use super::layers::LayerMask;
use super::query::{nearest_hits, ColliderId, PhysicsQuery, QueryTriggers, RayHit};

/// Handle to identify colliders
pub type ColliderHandle = rapier3d::prelude::ColliderHandle;

/// Default thickness of ground slabs created by `add_ground`
const GROUND_THICKNESS: f32 = 0.5;

/// Static query world backed by rapier3d colliders
///
/// The controller never simulates bodies here; it only asks ray and sphere
/// questions. Each collider carries its layer bits in `user_data` so queries
/// can be filtered by `LayerMask`.
pub struct PhysicsWorld {
    /// Island manager, required by rapier when removing colliders
    island_manager: IslandManager,

    /// Rigid body set (kept empty, colliders are parentless)
    rigid_body_set: RigidBodySet,

    /// Collider set
    collider_set: ColliderSet,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            island_manager: IslandManager::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
        }
    }

    /// Add a static box centred at `center`
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, layer: LayerMask) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(to_vector(center))
            .user_data(layer.bits() as u128)
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a trigger box (sensor); ignored by queries using `QueryTriggers::Ignore`
    pub fn add_trigger(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        layer: LayerMask,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(to_vector(center))
            .user_data(layer.bits() as u128)
            .sensor(true)
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a flat square slab whose top face sits at `height`
    pub fn add_ground(&mut self, height: f32, half_size: f32, layer: LayerMask) -> ColliderHandle {
        let half_thickness = GROUND_THICKNESS * 0.5;
        self.add_box(
            Vec3::new(0.0, height - half_thickness, 0.0),
            Vec3::new(half_size, half_thickness, half_size),
            layer,
        )
    }

    /// Remove a collider from the world. Returns false for unknown handles.
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        self.collider_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                false,
            )
            .is_some()
    }

    /// Number of colliders in the world
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Stable query identity for a rapier handle
    pub fn collider_id(handle: ColliderHandle) -> ColliderId {
        let (index, generation) = handle.into_raw_parts();
        ColliderId(((generation as u64) << 32) | index as u64)
    }

    /// Every collider hit by a ray (one hit per collider)
    fn cast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        triggers: QueryTriggers,
    ) -> Vec<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return Vec::new();
        }

        let ray = Ray::new(to_point(origin), to_vector(direction));

        self.collider_set
            .iter()
            .filter(|(_, collider)| mask.contains(collider.user_data as u32))
            .filter(|(_, collider)| triggers.accepts(collider.is_sensor()))
            .filter_map(|(handle, collider)| {
                collider
                    .shape()
                    .cast_ray_and_get_normal(collider.position(), &ray, max_distance, true)
                    .map(|hit| RayHit {
                        point: origin + direction * hit.toi,
                        normal: to_vec3(&hit.normal),
                        distance: hit.toi,
                        collider: Self::collider_id(handle),
                    })
            })
            .collect()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsQuery for PhysicsWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        triggers: QueryTriggers,
    ) -> Option<RayHit> {
        self.cast_all(origin, direction, max_distance, mask, triggers)
            .into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    // Approximated with five rays: the centre plus four on the sphere's
    // equator perpendicular to the cast direction.
    fn sphere_cast_all(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        triggers: QueryTriggers,
        max_hits: usize,
    ) -> Vec<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_hits == 0 {
            return Vec::new();
        }

        let radius = radius.max(0.0);
        let mut hits: Vec<RayHit> = self
            .cast_all(origin, direction, max_distance + radius, mask, triggers)
            .into_iter()
            .map(|mut hit| {
                hit.distance = (hit.distance - radius).max(0.0);
                hit
            })
            .collect();

        if radius > 0.0 {
            let (a, b) = direction.any_orthonormal_pair();
            for offset in [a, -a, b, -b] {
                hits.extend(self.cast_all(
                    origin + offset * radius,
                    direction,
                    max_distance,
                    mask,
                    triggers,
                ));
            }
        }

        hits.retain(|hit| hit.distance <= max_distance);
        nearest_hits(hits, max_hits)
    }
}

fn to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}
