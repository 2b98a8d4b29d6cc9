//! Candidate actions and their per-horizon outcomes

use glam::Vec2;

use crate::sim::World;

/// Simulated-time checkpoint at which a rollout is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Short,
    Mid,
    Long,
}

impl Horizon {
    /// In rollout order; each horizon continues from the previous one
    pub const ALL: [Horizon; 3] = [Horizon::Short, Horizon::Mid, Horizon::Long];

    /// Simulated seconds this horizon adds
    pub fn seconds(self) -> f64 {
        match self {
            Horizon::Short => 0.6,
            Horizon::Mid => 1.0,
            Horizon::Long => 2.0,
        }
    }

    /// Ticks to advance a world for this horizon (truncated)
    pub fn ticks(self, tick_rate: u32, speed_multiplier: u32) -> u64 {
        (self.seconds() * tick_rate as f64 / speed_multiplier.max(1) as f64) as u64
    }
}

/// Outcome of one horizon, relative to the pre-action baseline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResult {
    pub start_tick: u64,
    pub end_tick: u64,
    /// Impulse magnitude spent by the action
    pub magnitude: f32,
    /// Controlled cloud still alive at the end of the horizon
    pub alive: bool,
    pub mass_delta: f32,
    pub speed_delta: f32,
    /// Opponents that died since the baseline
    pub kills: i32,
}

/// One candidate impulse
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub impulse: Vec2,
    pub magnitude: f32,
    pub short: ActionResult,
    pub mid: ActionResult,
    pub long: ActionResult,
    /// Evaluation score (filled in by the evaluator)
    pub score: f64,
}

impl Action {
    pub fn new(impulse: Vec2, magnitude: f32) -> Self {
        Self {
            impulse,
            magnitude,
            short: ActionResult::default(),
            mid: ActionResult::default(),
            long: ActionResult::default(),
            score: 0.0,
        }
    }

    /// The zero-impulse action
    pub fn idle() -> Self {
        Self::new(Vec2::ZERO, 0.0)
    }

    pub fn is_idle(&self) -> bool {
        self.impulse == Vec2::ZERO
    }

    pub fn result(&self, horizon: Horizon) -> &ActionResult {
        match horizon {
            Horizon::Short => &self.short,
            Horizon::Mid => &self.mid,
            Horizon::Long => &self.long,
        }
    }

    pub fn result_mut(&mut self, horizon: Horizon) -> &mut ActionResult {
        match horizon {
            Horizon::Short => &mut self.short,
            Horizon::Mid => &mut self.mid,
            Horizon::Long => &mut self.long,
        }
    }

    /// Clear results for reuse in another cycle
    pub fn reset(&mut self) {
        self.short = ActionResult::default();
        self.mid = ActionResult::default();
        self.long = ActionResult::default();
        self.score = 0.0;
    }
}

/// State of the controlled cloud before any candidate is applied
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub iteration: u64,
    pub mass: f32,
    pub speed: f32,
    pub alive: bool,
    /// Alive clouds owned by other players
    pub opponents: usize,
}

impl Baseline {
    /// Capture the baseline for `identity`, or None if it has no cloud
    pub fn capture(world: &World, identity: &str) -> Option<Self> {
        let me = world.controlled(identity)?;
        Some(Self {
            iteration: world.iteration(),
            mass: me.mass,
            speed: me.speed(),
            alive: me.is_alive(),
            opponents: world.alive_opponents(identity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_ticks() {
        assert_eq!(Horizon::Short.ticks(60, 10), 3);
        assert_eq!(Horizon::Mid.ticks(60, 10), 6);
        assert_eq!(Horizon::Long.ticks(60, 10), 12);
        assert_eq!(Horizon::Short.ticks(60, 1), 36);
        assert_eq!(Horizon::Short.ticks(60, 0), 36);
        // Truncated, not rounded
        assert_eq!(Horizon::Short.ticks(60, 7), 5);
    }

    #[test]
    fn test_reset_clears_results() {
        let mut action = Action::new(Vec2::new(10.0, 0.0), 10.0);
        action.mid.alive = true;
        action.long.kills = 2;
        action.score = 12.5;
        action.reset();
        assert_eq!(action, Action::new(Vec2::new(10.0, 0.0), 10.0));
        assert!(Action::idle().is_idle());
    }

    #[test]
    fn test_baseline_capture() {
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(100.0, 100.0), 250.0);
        world.add_player("foe", "red", Vec2::new(800.0, 800.0), 80.0);
        world.entities[0].vel = Vec2::new(3.0, 4.0);

        let baseline = Baseline::capture(&world, "me").unwrap();
        assert_eq!(baseline.mass, 250.0);
        assert_eq!(baseline.speed, 5.0);
        assert_eq!(baseline.opponents, 1);
        assert!(baseline.alive);
        assert!(Baseline::capture(&world, "nobody").is_none());
    }
}
