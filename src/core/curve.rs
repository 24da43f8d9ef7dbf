// Keyframed curves (take-off impulse falloff)

use serde::{Deserialize, Serialize};

use super::math::lerp;

/// A single curve key: value at time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Piecewise-linear curve. Keys are kept sorted by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// 1 at t=0 fading to 0 at t=1
    pub fn linear_fade() -> Self {
        Self::new(vec![Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.0)])
    }

    /// Sample the curve, holding the end values outside the key range
    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };

        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                return lerp(a.value, b.value, (t - a.time) / span);
            }
        }

        last.value
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::linear_fade()
    }
}

impl From<Vec<Keyframe>> for Curve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::new(keys)
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_fade() {
        let curve = Curve::linear_fade();
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert_relative_eq!(curve.evaluate(0.25), 0.75);
        assert_eq!(curve.evaluate(1.0), 0.0);
    }

    #[test]
    fn test_clamps_outside_keys() {
        let curve = Curve::linear_fade();
        assert_eq!(curve.evaluate(-1.0), 1.0);
        assert_eq!(curve.evaluate(5.0), 0.0);
    }

    #[test]
    fn test_unsorted_keys_are_sorted() {
        let curve = Curve::new(vec![
            Keyframe::new(1.0, 2.0),
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.5, 4.0),
        ]);
        assert_relative_eq!(curve.evaluate(0.25), 2.0);
        assert_relative_eq!(curve.evaluate(0.75), 3.0);
    }

    #[test]
    fn test_empty_curve() {
        assert_eq!(Curve::new(Vec::new()).evaluate(0.3), 0.0);
    }
}
