// Math utilities and helper functions

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::rng::GameRng;

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Linear interpolation (t is clamped to [0, 1])
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * clamp(t, 0.0, 1.0)
}

/// Linear interpolation between vectors (t is clamped to [0, 1])
pub fn lerp_vec(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a.lerp(b, clamp(t, 0.0, 1.0))
}

/// Move `current` towards `target` by at most `max_delta`
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Check if two f32 values are approximately equal
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Projection of `v` onto `onto`. Zero when `onto` has no length.
pub fn project(v: Vec3, onto: Vec3) -> Vec3 {
    let len_sq = onto.length_squared();
    if len_sq <= f32::EPSILON {
        Vec3::ZERO
    } else {
        onto * (v.dot(onto) / len_sq)
    }
}

/// Component of `v` lying on the plane with the given normal
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - project(v, normal)
}

/// Unsigned angle between two vectors in degrees, 0 if either is zero
pub fn angle_deg(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    clamp(a.dot(b) / denom, -1.0, 1.0).acos().to_degrees()
}

/// Inclusive float range used for randomized timings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedFloat {
    pub min: f32,
    pub max: f32,
}

impl RangedFloat {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Pick a random value inside the range
    pub fn random(&self, rng: &mut GameRng) -> f32 {
        rng.range_f32(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}
