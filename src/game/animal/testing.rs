// Analytic physics fake for unit tests

use glam::Vec3;

use crate::engine::physics::{
    ColliderId, LayerMask, PhysicsQuery, QueryTriggers, RayHit,
};

/// Infinite plane collider
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
    pub layer: LayerMask,
    pub trigger: bool,
}

/// Physics query world made of infinite planes. Only the front face of a
/// plane is hit.
#[derive(Debug, Clone, Default)]
pub struct PlaneWorld {
    pub planes: Vec<Plane>,
}

impl PlaneWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Horizontal ground at `height` on the default layer
    pub fn flat(height: f32) -> Self {
        let mut world = Self::new();
        world.add(Vec3::new(0.0, height, 0.0), Vec3::Y, LayerMask::GROUND);
        world
    }

    pub fn add(&mut self, point: Vec3, normal: Vec3, layer: LayerMask) -> usize {
        self.planes.push(Plane {
            point,
            normal: normal.normalize(),
            layer,
            trigger: false,
        });
        self.planes.len() - 1
    }

    pub fn clear(&mut self) {
        self.planes.clear();
    }

    fn candidates(
        &self,
        mask: LayerMask,
        triggers: QueryTriggers,
    ) -> impl Iterator<Item = (usize, &Plane)> {
        self.planes
            .iter()
            .enumerate()
            .filter(move |(_, p)| mask.contains(p.layer.bits()) && triggers.accepts(p.trigger))
    }
}

impl PhysicsQuery for PlaneWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        triggers: QueryTriggers,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        self.candidates(mask, triggers)
            .filter_map(|(i, plane)| {
                let denom = dir.dot(plane.normal);
                if denom >= 0.0 {
                    return None;
                }
                let t = (plane.point - origin).dot(plane.normal) / denom;
                (t >= 0.0 && t <= max_distance).then(|| RayHit {
                    point: origin + dir * t,
                    normal: plane.normal,
                    distance: t,
                    collider: ColliderId(i as u64),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

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
        let dir = direction.normalize_or_zero();
        let mut hits: Vec<RayHit> = self
            .candidates(mask, triggers)
            .filter_map(|(i, plane)| {
                let denom = dir.dot(plane.normal);
                if denom >= 0.0 || (origin - plane.point).dot(plane.normal) < -radius {
                    return None;
                }
                let t = ((plane.point - origin).dot(plane.normal) + radius) / denom;
                let t = t.max(0.0);
                (t <= max_distance).then(|| RayHit {
                    point: origin + dir * t - plane.normal * radius,
                    normal: plane.normal,
                    distance: t,
                    collider: ColliderId(i as u64),
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(max_hits);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_raycast_against_floor() {
        let world = PlaneWorld::flat(0.0);
        let hit = world
            .raycast(
                Vec3::new(1.0, 4.0, 0.0),
                Vec3::NEG_Y,
                10.0,
                LayerMask::GROUND,
                QueryTriggers::Ignore,
            )
            .unwrap();

        assert_relative_eq!(hit.distance, 4.0);
        assert_relative_eq!(hit.point.x, 1.0);
        assert!(world
            .raycast(Vec3::new(0.0, 4.0, 0.0), Vec3::Y, 10.0, LayerMask::ALL, QueryTriggers::Ignore)
            .is_none());
    }

    #[test]
    fn test_sphere_cast_distance_is_centre_travel() {
        let world = PlaneWorld::flat(0.0);
        let hits = world.sphere_cast_all(
            Vec3::new(0.0, 3.0, 0.0),
            0.5,
            Vec3::NEG_Y,
            10.0,
            LayerMask::GROUND,
            QueryTriggers::Ignore,
            4,
        );

        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].distance, 2.5);
        assert_relative_eq!(hits[0].point.y, 0.0);
    }

    #[test]
    fn test_layers_filter_planes() {
        let mut world = PlaneWorld::new();
        world.add(Vec3::ZERO, Vec3::Y, LayerMask::WATER);

        assert!(world
            .raycast(Vec3::Y, Vec3::NEG_Y, 5.0, LayerMask::GROUND, QueryTriggers::Ignore)
            .is_none());
        assert!(world
            .raycast(Vec3::Y, Vec3::NEG_Y, 5.0, LayerMask::WATER, QueryTriggers::Ignore)
            .is_some());
    }
}
