// Timed reactions applied to an animal from outside (hits, knockbacks, wind)

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::kinematics::Kinematics;

/// Space a reaction direction is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionSpace {
    /// Relative to the animal (x right, y up, z forward)
    #[default]
    Local,
    World,
}

/// Push the animal with an external force for a while
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceReaction {
    pub direction: Vec3,
    pub space: DirectionSpace,
    /// Seconds the force is applied
    pub time: f32,
    pub force: f32,
    /// How fast the body reaches the force
    pub acceleration: f32,
    /// How fast the force dies out once the time is over; 0 keeps it
    pub exit_drag: f32,
    /// Grounded flag forced while pushed
    pub grounded: bool,
}

impl Default for ForceReaction {
    fn default() -> Self {
        Self {
            direction: Vec3::Z,
            space: DirectionSpace::Local,
            time: 1.0,
            force: 10.0,
            acceleration: 2.0,
            exit_drag: 2.0,
            grounded: false,
        }
    }
}

impl ForceReaction {
    /// World-space force this reaction pushes with
    pub fn world_force(&self, kinematics: &Kinematics) -> Vec3 {
        let force = self.direction.normalize_or_zero() * self.force;
        match self.space {
            DirectionSpace::Local => kinematics.transform_direction(force),
            DirectionSpace::World => force,
        }
    }

    /// Start the push. Velocity carried from gravity becomes part of the
    /// starting force.
    pub fn apply(&self, kinematics: &mut Kinematics) {
        kinematics.current_external_force += kinematics.gravity_velocity;
        kinematics.grounded = self.grounded;
        kinematics.external_force = self.world_force(kinematics);
        kinematics.external_force_acel = self.acceleration;
    }

    /// Finish a push started by `apply`
    pub fn finish(kinematics: &mut Kinematics, falling: bool, exit_drag: f32) {
        if falling {
            kinematics.use_gravity = true;
        }
        if exit_drag > 0.0 {
            kinematics.external_force_acel = exit_drag;
            kinematics.external_force = Vec3::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_local_force_follows_facing() {
        let mut kin = Kinematics::default();
        kin.forward = Vec3::X;
        let reaction = ForceReaction {
            direction: Vec3::new(0.0, 0.0, 2.0),
            force: 5.0,
            ..ForceReaction::default()
        };

        let force = reaction.world_force(&kin);
        assert_relative_eq!(force.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(force.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_apply_keeps_gravity_velocity() {
        let mut kin = Kinematics::default();
        kin.gravity_velocity = Vec3::new(0.0, -3.0, 0.0);
        kin.grounded = true;
        let reaction = ForceReaction {
            space: DirectionSpace::World,
            direction: Vec3::X,
            ..ForceReaction::default()
        };

        reaction.apply(&mut kin);

        assert_eq!(kin.current_external_force, Vec3::new(0.0, -3.0, 0.0));
        assert_eq!(kin.external_force, Vec3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(kin.external_force_acel, 2.0);
        assert!(!kin.grounded);
    }

    #[test]
    fn test_finish_applies_drag() {
        let mut kin = Kinematics::default();
        kin.external_force = Vec3::X;
        ForceReaction::finish(&mut kin, true, 4.0);
        assert!(kin.use_gravity);
        assert!(!kin.has_external_force());
        assert_relative_eq!(kin.external_force_acel, 4.0);

        kin.external_force = Vec3::X;
        kin.use_gravity = false;
        ForceReaction::finish(&mut kin, false, 0.0);
        assert!(!kin.use_gravity);
        assert!(kin.has_external_force());
    }
}
