//! Cloud entity
//!
//! A cloud is a disc whose radius is always the square root of its mass
//! ("vapor"). Neutral clouds drift passively, owned clouds are steered by a
//! player through impulses.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::MIN_ALIVE_MASS;

/// A cloud in the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable id, unique within a world
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Vapor held by the cloud
    pub mass: f32,
    /// Player identity for controlled clouds
    #[serde(default)]
    pub owner: Option<String>,
    /// Display tag (color name), not gameplay-affecting
    #[serde(default)]
    pub tag: String,
}

impl Entity {
    /// Unowned cloud
    pub fn neutral(id: u32, pos: Vec2, vel: Vec2, mass: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            mass,
            owner: None,
            tag: String::new(),
        }
    }

    /// Radius derived from mass
    #[inline]
    pub fn radius(&self) -> f32 {
        self.mass.max(0.0).sqrt()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.mass >= MIN_ALIVE_MASS
    }

    /// Velocity strength
    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner.as_deref() == Some(identity)
    }

    /// Owned by a player other than `identity`
    pub fn is_opponent_of(&self, identity: &str) -> bool {
        matches!(self.owner.as_deref(), Some(owner) if owner != identity)
    }

    /// True if the two discs overlap (radii sum strictly exceeds distance)
    pub fn intersects(&self, other: &Entity) -> bool {
        self.pos.distance(other.pos) < self.radius() + other.radius()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_alive_threshold() {
        let mut cloud = Entity::neutral(1, Vec2::ZERO, Vec2::ZERO, 1.0);
        assert!(cloud.is_alive());
        cloud.mass = 0.999;
        assert!(!cloud.is_alive());
    }

    #[test]
    fn test_intersects_strict() {
        let a = Entity::neutral(1, Vec2::ZERO, Vec2::ZERO, 4.0);
        let b = Entity::neutral(2, Vec2::new(5.0, 0.0), Vec2::ZERO, 9.0);
        // Touching edges do not count as overlap
        assert!(!a.intersects(&b));

        let c = Entity::neutral(3, Vec2::new(4.9, 0.0), Vec2::ZERO, 9.0);
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn test_ownership() {
        let mut cloud = Entity::neutral(1, Vec2::ZERO, Vec2::ZERO, 10.0);
        assert!(!cloud.is_owned());
        assert!(!cloud.is_opponent_of("alice"));

        cloud.owner = Some("bob".to_string());
        assert!(cloud.is_owned_by("bob"));
        assert!(cloud.is_opponent_of("alice"));
        assert!(!cloud.is_opponent_of("bob"));
    }

    proptest! {
        #[test]
        fn radius_is_sqrt_of_mass(mass in 0.001f32..1.0e6) {
            let cloud = Entity::neutral(1, Vec2::ZERO, Vec2::ZERO, mass);
            prop_assert_eq!(cloud.radius(), mass.sqrt());
            prop_assert!(cloud.radius() >= 0.0);
        }

        #[test]
        fn radius_is_monotonic(a in 0.0f32..1.0e6, b in 0.0f32..1.0e6) {
            let small = Entity::neutral(1, Vec2::ZERO, Vec2::ZERO, a.min(b));
            let large = Entity::neutral(2, Vec2::ZERO, Vec2::ZERO, a.max(b));
            prop_assert!(small.radius() <= large.radius());
        }
    }
}
