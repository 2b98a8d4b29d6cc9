//! Cloud Wars - rollout-driven decision engine for a cloud-physics arena
//!
//! Core modules:
//! - `sim`: Deterministic physics kernel (movement, mass transfer, win condition)
//! - `planner`: Action catalog, parallel rollouts, scoring and selection
//! - `pilot`: Decision cycle that drives one cloud through a `WorldLink`
//! - `arena`: Authoritative world owner behind a lock
//! - `settings`: Match and pilot configuration

pub mod arena;
pub mod pilot;
pub mod planner;
pub mod settings;
pub mod sim;

pub use arena::{Arena, Ticker};
pub use pilot::{LocalLink, Outcome, Pilot, WorldLink};
pub use settings::{PilotSettings, Settings};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Position integration factor per tick (before the speed multiplier)
    pub const MOVE_SCALE: f32 = 0.1;
    /// Velocity damping applied every tick
    pub const VELOCITY_DAMPING: f32 = 0.999;
    /// Velocity kept when bouncing off an arena edge
    pub const WALL_RESTITUTION: f32 = 0.6;
    /// Mass moved per transfer step between intersecting clouds
    pub const TRANSFER_STEP: f32 = 1.0;

    /// Largest mass a snapshot may carry (2^24, where unit steps stop being exact)
    pub const MAX_MASS: f32 = 16_777_216.0;

    /// Clouds below this mass are dead
    pub const MIN_ALIVE_MASS: f32 = 1.0;
    /// Smallest accepted impulse strength
    pub const MIN_IMPULSE: f32 = 1.0;
    /// Velocity gained per unit of impulse, divided by the cloud radius
    pub const IMPULSE_GAIN: f32 = 5.0;
    /// Exhaust spawn distance factor (times the summed radii)
    pub const EXHAUST_SPACING: f32 = 1.1;
    /// Exhaust ejection speed
    pub const EXHAUST_SPEED: f32 = 20.0;

    /// Angular spacing of the self-destruct ring (degrees)
    pub const KILL_RING_STEP: f32 = 10.0;
    /// Impulse strength of each self-destruct ring entry
    pub const KILL_RING_STRENGTH: f32 = 2.5;

    /// Match length before the leader is declared winner (seconds of game time)
    pub const MATCH_SECONDS: u64 = 3 * 60;
    /// Share of total mass (percent) the leader must exceed to win early
    pub const WIN_SHARE_PERCENT: f32 = 51.0;
}

/// Impulse of the given strength pointing away from `angle_deg`.
///
/// Angle 0 pushes toward negative x, 90 toward negative y.
#[inline]
pub fn impulse_at_angle(angle_deg: f32, strength: f32) -> Vec2 {
    let theta = angle_deg.to_radians();
    Vec2::new(-theta.cos() * strength, -theta.sin() * strength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_at_angle() {
        let v = impulse_at_angle(0.0, 10.0);
        assert!((v.x + 10.0).abs() < 1e-5);
        assert!(v.y.abs() < 1e-5);

        let v = impulse_at_angle(90.0, 4.0);
        assert!(v.x.abs() < 1e-5);
        assert!((v.y + 4.0).abs() < 1e-5);
        assert!((v.length() - 4.0).abs() < 1e-5);
    }
}
