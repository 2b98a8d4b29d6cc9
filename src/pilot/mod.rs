//! Decision cycle
//!
//! Each cycle walks the same states:
//! - AwaitSnapshot: fetch the latest world through the link
//! - FastForward: advance it by the fetch latency plus the lookahead, then
//!   switch it to rollout speed
//! - Dispatch: run every candidate in parallel until the budget runs out
//! - Select: score completed rollouts and take the best
//! - Commit: send the winning impulse
//!
//! A cycle that finds our cloud dead, either in the snapshot or after the
//! fast-forward, goes to Terminate instead.

pub mod link;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::planner::{self, ActionSpace, Engagement, PlanError, Selection};
use crate::settings::PilotSettings;
use crate::sim::advance;

pub use link::{LinkError, LocalLink, WorldLink};

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("{0:?} has no cloud in the world")]
    NotInWorld(String),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    AwaitSnapshot,
    FastForward,
    Dispatch,
    Select,
    Commit,
    Terminate,
}

/// What one planned cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Tick the rollouts started from
    pub iteration: u64,
    /// Ticks the snapshot was advanced before planning
    pub fast_forward: u64,
    pub completed: usize,
    pub scheduled: usize,
    pub selection: Option<Selection>,
    pub committed: bool,
}

#[derive(Debug, Clone)]
pub enum Step {
    Planned(CycleReport),
    /// Snapshot unusable, try again next cycle
    Skipped,
    Eliminated,
    Decided(Option<String>),
    Disconnected,
}

/// How a pilot's run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Eliminated { cycles: u64 },
    Decided { leader: Option<String>, cycles: u64 },
    Disconnected { cycles: u64 },
}

/// Ticks to fast-forward a snapshot to cover `ahead` of wall-clock time
pub fn fast_forward_ticks(ahead: Duration, tick_rate: u32) -> u64 {
    (ahead.as_secs_f64() * tick_rate as f64).ceil() as u64
}

/// Drives one cloud through a `WorldLink`
pub struct Pilot<L: WorldLink> {
    link: L,
    identity: String,
    settings: PilotSettings,
    space: ActionSpace,
    cycles: u64,
}

impl<L: WorldLink> Pilot<L> {
    pub fn new(link: L, identity: impl Into<String>, settings: PilotSettings) -> Self {
        let space = settings.action_space();
        Self {
            link,
            identity: identity.into(),
            settings,
            space,
            cycles: 0,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Planned cycles so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run cycles until our cloud dies, the match ends or the link drops
    pub fn run(&mut self) -> Result<Outcome, PilotError> {
        log::info!(
            "{}: planning {} actions per cycle on {} workers",
            self.identity,
            self.space.size(),
            self.settings.workers()
        );
        let budget = self.settings.budget();

        loop {
            let started = Instant::now();
            let cycles = self.cycles;
            match self.cycle(started)? {
                Step::Planned(_) | Step::Skipped => {}
                Step::Eliminated => return Ok(Outcome::Eliminated { cycles }),
                Step::Decided(leader) => return Ok(Outcome::Decided { leader, cycles }),
                Step::Disconnected => return Ok(Outcome::Disconnected { cycles }),
            }

            let elapsed = started.elapsed();
            if elapsed < budget {
                thread::sleep(budget - elapsed);
            }
        }
    }

    /// One decision cycle, without pacing
    pub fn step(&mut self) -> Result<Step, PilotError> {
        self.cycle(Instant::now())
    }

    fn enter(&self, phase: CyclePhase) {
        log::trace!("{}: {:?}", self.identity, phase);
    }

    fn cycle(&mut self, started: Instant) -> Result<Step, PilotError> {
        // An unrepresentable deadline leaves no time to plan
        let deadline = started.checked_add(self.settings.budget()).unwrap_or(started);

        self.enter(CyclePhase::AwaitSnapshot);
        let mut world = match self.link.fetch_snapshot() {
            Ok(world) => world,
            Err(LinkError::Disconnected) => return Ok(Step::Disconnected),
            Err(err) => {
                log::warn!("{}: skipping cycle: {err}", self.identity);
                return Ok(Step::Skipped);
            }
        };
        let latency = started.elapsed();

        let Some(me) = world.controlled(&self.identity) else {
            return Err(PilotError::NotInWorld(self.identity.clone()));
        };
        if !me.is_alive() {
            self.enter(CyclePhase::Terminate);
            log::info!("{}: eliminated after {} cycles", self.identity, self.cycles);
            return Ok(Step::Eliminated);
        }
        if world.stats().win {
            self.enter(CyclePhase::Terminate);
            return Ok(Step::Decided(world.stats().leader.clone()));
        }

        self.enter(CyclePhase::FastForward);
        let fast_forward = fast_forward_ticks(latency + self.settings.lookahead(), world.tick_rate);
        for _ in 0..fast_forward {
            advance(&mut world);
        }
        world.speed_multiplier = self.settings.sim_speed;
        let iteration = world.iteration();
        if !world.controlled(&self.identity).is_some_and(|me| me.is_alive()) {
            self.enter(CyclePhase::Terminate);
            log::info!(
                "{}: eliminated by tick {iteration} after {} cycles",
                self.identity,
                self.cycles
            );
            return Ok(Step::Eliminated);
        }

        self.enter(CyclePhase::Dispatch);
        let seed = match self.settings.seed {
            Some(seed) => seed.wrapping_add(self.cycles),
            None => rand::random(),
        };
        let shards = self.space.shards(self.settings.workers(), seed);
        let mut dispatch = planner::dispatch(Arc::new(world), &self.identity, shards, deadline)?;

        self.enter(CyclePhase::Select);
        let selection = planner::select(&mut dispatch.shards, dispatch.baseline.mass);
        if let Some(best) = &selection {
            self.log_selection(best);
        }

        self.enter(CyclePhase::Commit);
        let committed = match &selection {
            None => {
                log::warn!("{}: no rollout finished in time, holding course", self.identity);
                false
            }
            // Idle is not a move the world accepts
            Some(best) if best.is_idle() => false,
            Some(best) => match self.link.submit_move(best.impulse) {
                Ok(()) => true,
                Err(LinkError::Disconnected) => return Ok(Step::Disconnected),
                Err(err) => {
                    log::warn!("{}: {err}", self.identity);
                    false
                }
            },
        };

        self.cycles += 1;
        Ok(Step::Planned(CycleReport {
            iteration,
            fast_forward,
            completed: dispatch.completed(),
            scheduled: dispatch.scheduled(),
            selection,
            committed,
        }))
    }

    fn log_selection(&self, best: &Selection) {
        let what = match best.tags.engagement {
            Some(Engagement::Kill) => "kill",
            Some(Engagement::Hunt) => "hunt",
            None if best.tags.escape => "escape",
            None => {
                log::debug!(
                    "{}: impulse ({:.1}, {:.1}) score {:.2}",
                    self.identity,
                    best.impulse.x,
                    best.impulse.y,
                    best.score
                );
                return;
            }
        };
        log::info!(
            "{}: {what} with impulse ({:.1}, {:.1}) score {:.2}",
            self.identity,
            best.impulse.x,
            best.impulse.y,
            best.score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::sim::{SnapshotError, World};
    use glam::Vec2;
    use std::collections::VecDeque;

    /// Replays canned snapshots and records submitted moves
    #[derive(Default)]
    struct Scripted {
        snapshots: VecDeque<Result<World, LinkError>>,
        moves: Vec<Vec2>,
        reject: bool,
    }

    impl WorldLink for Scripted {
        fn fetch_snapshot(&mut self) -> Result<World, LinkError> {
            self.snapshots.pop_front().unwrap_or(Err(LinkError::Disconnected))
        }

        fn submit_move(&mut self, impulse: Vec2) -> Result<(), LinkError> {
            if self.reject {
                return Err(LinkError::Rejected("test".into()));
            }
            self.moves.push(impulse);
            Ok(())
        }
    }

    fn settings() -> PilotSettings {
        PilotSettings {
            budget_ms: 500,
            angle_step: 90,
            magnitudes: vec![10.0],
            workers: Some(2),
            seed: Some(1),
            ..Default::default()
        }
    }

    /// A resting neutral cloud just out of reach to the east
    fn feast() -> World {
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(500.0, 500.0), 400.0);
        world.add_player("foe", "red", Vec2::new(100.0, 100.0), 500.0);
        world.spawn(Vec2::new(540.0, 500.0), Vec2::ZERO, 300.0);
        world.refresh_stats();
        world
    }

    fn pilot(snapshots: Vec<Result<World, LinkError>>) -> Pilot<Scripted> {
        let link = Scripted {
            snapshots: snapshots.into(),
            ..Default::default()
        };
        Pilot::new(link, "me", settings())
    }

    #[test]
    fn test_fast_forward_ticks() {
        assert_eq!(fast_forward_ticks(Duration::from_millis(250), 60), 15);
        assert_eq!(fast_forward_ticks(Duration::from_millis(251), 60), 16);
        assert_eq!(fast_forward_ticks(Duration::ZERO, 60), 0);
    }

    #[test]
    fn test_cycle_commits_best_move() {
        let mut pilot = pilot(vec![Ok(feast())]);
        let Step::Planned(report) = pilot.step().unwrap() else {
            panic!("expected a planned cycle");
        };

        assert!(report.fast_forward >= 30);
        assert_eq!(report.completed, 5);
        assert_eq!(report.scheduled, 5);
        let best = report.selection.unwrap();
        // Pushing east swallows the neutral cloud
        assert!(best.impulse.x > 9.9);
        assert!(best.score > 0.0);
        assert!(report.committed);
        assert_eq!(pilot.link.moves, vec![best.impulse]);
        assert_eq!(pilot.cycles(), 1);
    }

    #[test]
    fn test_idle_selection_is_not_sent() {
        // Nothing in reach: every move only costs vapor
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(500.0, 500.0), 400.0);
        world.add_player("foe", "red", Vec2::new(100.0, 100.0), 500.0);
        world.spawn(Vec2::new(900.0, 900.0), Vec2::ZERO, 1000.0);
        world.refresh_stats();
        let mut pilot = pilot(vec![Ok(world)]);

        let Step::Planned(report) = pilot.step().unwrap() else {
            panic!("expected a planned cycle");
        };
        assert!(report.selection.unwrap().is_idle());
        assert!(!report.committed);
        assert!(pilot.link.moves.is_empty());
    }

    #[test]
    fn test_rejected_move_continues() {
        let mut pilot = pilot(vec![Ok(feast())]);
        pilot.link.reject = true;
        let Step::Planned(report) = pilot.step().unwrap() else {
            panic!("expected a planned cycle");
        };
        assert!(!report.committed);
        assert!(report.selection.is_some());
    }

    #[test]
    fn test_malformed_snapshot_is_skipped() {
        let mut pilot = pilot(vec![
            Err(LinkError::Malformed(SnapshotError::Invalid("empty arena"))),
            Ok(feast()),
        ]);
        assert!(matches!(pilot.step().unwrap(), Step::Skipped));
        assert!(matches!(pilot.step().unwrap(), Step::Planned(_)));
        assert!(matches!(pilot.step().unwrap(), Step::Disconnected));
    }

    #[test]
    fn test_run_ends_on_disconnect() {
        let mut pilot = pilot(vec![Ok(feast())]);
        assert_eq!(pilot.run().unwrap(), Outcome::Disconnected { cycles: 1 });
    }

    #[test]
    fn test_dead_cloud_terminates() {
        let mut world = feast();
        world.entities[0].mass = 0.0;
        world.refresh_stats();
        let mut pilot = pilot(vec![Ok(world)]);
        assert_eq!(pilot.run().unwrap(), Outcome::Eliminated { cycles: 0 });
        assert!(pilot.link.moves.is_empty());
    }

    #[test]
    fn test_death_during_fast_forward_terminates() {
        // Alive in the snapshot, swallowed on the first forwarded tick
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(500.0, 500.0), 10.0);
        world.add_player("foe", "red", Vec2::new(100.0, 100.0), 500.0);
        world.spawn(Vec2::new(510.0, 500.0), Vec2::ZERO, 500.0);
        world.refresh_stats();

        let mut pilot = pilot(vec![Ok(world)]);
        assert!(matches!(pilot.step().unwrap(), Step::Eliminated));
        assert!(pilot.link.moves.is_empty());
        assert_eq!(pilot.cycles(), 0);
    }

    #[test]
    fn test_run_paces_cycles_to_budget() {
        let mut pilot = pilot(vec![Ok(feast()), Ok(feast())]);
        pilot.settings.budget_ms = 120;
        let started = Instant::now();
        assert_eq!(pilot.run().unwrap(), Outcome::Disconnected { cycles: 2 });
        assert!(started.elapsed() >= Duration::from_millis(240));
    }

    #[test]
    fn test_huge_budget_does_not_overflow() {
        let mut pilot = pilot(vec![Ok(feast())]);
        pilot.settings.budget_ms = u64::MAX;
        pilot.settings.lookahead_ms = Some(0);
        assert!(matches!(pilot.step().unwrap(), Step::Planned(_)));
    }

    #[test]
    fn test_decided_match_stops() {
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(500.0, 500.0), 400.0);
        let mut pilot = pilot(vec![Ok(world)]);
        assert_eq!(
            pilot.run().unwrap(),
            Outcome::Decided {
                leader: Some("me".into()),
                cycles: 0
            }
        );
    }

    #[test]
    fn test_missing_cloud_is_an_error() {
        let mut world = feast();
        world.entities.remove(0);
        let mut pilot = pilot(vec![Ok(world)]);
        assert!(matches!(pilot.step(), Err(PilotError::NotInWorld(_))));
    }

    #[test]
    fn test_local_link_cycle() {
        let mut world = World::new(1000, 1000, 60);
        world.spawn(Vec2::new(540.0, 500.0), Vec2::ZERO, 300.0);
        let arena = Arc::new(Arena::new(world, 9));
        arena.add_player("me", "blue", Some(Vec2::new(500.0, 500.0)), 400.0);
        arena.add_player("foe", "red", Some(Vec2::new(100.0, 100.0)), 500.0);

        let link = LocalLink::new(Arc::clone(&arena), "me");
        let mut pilot = Pilot::new(link, "me", settings());
        let Step::Planned(report) = pilot.step().unwrap() else {
            panic!("expected a planned cycle");
        };
        assert!(report.committed);
        let me = arena.snapshot().controlled("me").map(|e| e.mass);
        assert_eq!(me, Some(390.0));

        arena.close();
        assert!(matches!(pilot.step().unwrap(), Step::Disconnected));
    }
}
