//! Parallel rollouts under a shared deadline
//!
//! One worker thread per shard. Each worker clones the snapshot for every
//! action it starts and checks the deadline only between actions, so a
//! rollout that has begun always finishes all three horizons. Finished
//! actions stream back over a channel. Once the deadline passes the caller
//! waits only for rollouts already in flight, then joins every worker.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, Sender};
use thiserror::Error;

use super::action::{Action, ActionResult, Baseline, Horizon};
use super::space::Shard;
use crate::sim::{World, advance, apply_impulse};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no cloud controlled by {0:?} in snapshot")]
    NotInWorld(String),
    #[error("failed to spawn rollout worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// How far one shard got before the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardProgress {
    pub completed: usize,
    pub total: usize,
}

impl ShardProgress {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Everything gathered by one dispatch
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub baseline: Baseline,
    /// Completed actions per shard, in shard order
    pub shards: Vec<Vec<Action>>,
    pub progress: Vec<ShardProgress>,
}

impl Dispatch {
    pub fn completed(&self) -> usize {
        self.progress.iter().map(|p| p.completed).sum()
    }

    pub fn scheduled(&self) -> usize {
        self.progress.iter().map(|p| p.total).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.progress.iter().all(ShardProgress::is_complete)
    }
}

enum WorkerEvent {
    Completed { shard: usize, action: Action },
    Finished { shard: usize },
}

/// Simulate one candidate on a fresh clone of `snapshot`
///
/// A rejected impulse simply plays out as doing nothing. Returns false if the
/// controlled cloud is missing from the snapshot.
pub fn rollout(snapshot: &World, identity: &str, baseline: &Baseline, action: &mut Action) -> bool {
    let mut world = snapshot.clone();
    let Some(index) = world.index_of(identity) else {
        return false;
    };
    let id = world.entities[index].id;
    apply_impulse(&mut world, index, action.impulse);

    for horizon in Horizon::ALL {
        let ticks = horizon.ticks(world.tick_rate, world.speed_multiplier);
        for _ in 0..ticks {
            advance(&mut world);
        }

        // Owned clouds are never dropped, so the id stays resolvable
        let Some(me) = world.entity(id) else {
            return false;
        };
        *action.result_mut(horizon) = ActionResult {
            start_tick: baseline.iteration,
            end_tick: world.iteration(),
            magnitude: action.magnitude,
            alive: me.is_alive(),
            mass_delta: me.mass - baseline.mass,
            speed_delta: me.speed() - baseline.speed,
            kills: baseline.opponents as i32 - world.alive_opponents(identity) as i32,
        };
    }

    true
}

/// Run every shard in parallel until done or `deadline`, whichever is first
///
/// Workers stop taking new actions at the deadline. A rollout already under
/// way runs to completion and is still recorded, and every worker is joined
/// before this returns.
pub fn dispatch(
    snapshot: Arc<World>,
    identity: &str,
    shards: Vec<Shard>,
    deadline: Instant,
) -> Result<Dispatch, PlanError> {
    let baseline = Baseline::capture(&snapshot, identity)
        .ok_or_else(|| PlanError::NotInWorld(identity.to_string()))?;

    let workers = shards.len();
    let mut progress: Vec<ShardProgress> = shards
        .iter()
        .map(|shard| ShardProgress {
            completed: 0,
            total: shard.len(),
        })
        .collect();
    let mut results: Vec<Vec<Action>> = shards.iter().map(|s| Vec::with_capacity(s.len())).collect();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut handles = Vec::with_capacity(workers);
    for (index, shard) in shards.into_iter().enumerate() {
        let tx = tx.clone();
        let snapshot = Arc::clone(&snapshot);
        let identity = identity.to_string();
        let baseline = baseline.clone();
        let handle = thread::Builder::new()
            .name(format!("rollout-{index}"))
            .spawn(move || run_shard(index, shard, &snapshot, &identity, &baseline, deadline, &tx))?;
        handles.push(handle);
    }
    drop(tx);

    let mut finished = 0;
    while finished < workers {
        match rx.recv_deadline(deadline) {
            Ok(event) => {
                if record(event, &mut progress, &mut results) {
                    finished += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let on_time: usize = progress.iter().map(|p| p.completed).sum();

    // Each straggler finishes at most the one rollout it had started
    for event in rx.iter() {
        record(event, &mut progress, &mut results);
    }
    for handle in handles {
        if handle.join().is_err() {
            log::error!("Rollout worker panicked");
        }
    }

    let dispatch = Dispatch {
        baseline,
        shards: results,
        progress,
    };

    let late = dispatch.completed() - on_time;
    if late > 0 {
        log::debug!("{late} rollouts finished past the deadline");
    }
    if !dispatch.is_complete() {
        let scheduled = dispatch.scheduled().max(1);
        log::warn!(
            "Not enough computing power: {}/{} rollouts ({:.0}%) before the deadline",
            dispatch.completed(),
            dispatch.scheduled(),
            dispatch.completed() as f64 / scheduled as f64 * 100.0
        );
        for (index, shard) in dispatch.progress.iter().enumerate() {
            log::debug!("rollout-{index}: {:.0}% of {}", shard.percent(), shard.total);
        }
    }

    Ok(dispatch)
}

/// Returns true once the sending worker is done
fn record(event: WorkerEvent, progress: &mut [ShardProgress], results: &mut [Vec<Action>]) -> bool {
    match event {
        WorkerEvent::Completed { shard, action } => {
            progress[shard].completed += 1;
            results[shard].push(action);
            false
        }
        WorkerEvent::Finished { .. } => true,
    }
}

fn run_shard(
    index: usize,
    shard: Shard,
    snapshot: &World,
    identity: &str,
    baseline: &Baseline,
    deadline: Instant,
    tx: &Sender<WorkerEvent>,
) {
    for mut action in shard {
        if Instant::now() >= deadline {
            break;
        }
        action.reset();
        if rollout(snapshot, identity, baseline, &mut action)
            && tx.send(WorkerEvent::Completed { shard: index, action }).is_err()
        {
            return;
        }
    }
    let _ = tx.send(WorkerEvent::Finished { shard: index });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::space::ActionSpace;
    use glam::Vec2;
    use std::time::Duration;

    fn skirmish() -> World {
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(500.0, 500.0), 400.0);
        // Overlapping a much larger player: eaten on the first tick
        world.add_player("prey", "red", Vec2::new(515.0, 500.0), 10.0);
        world.add_player("far", "gray", Vec2::new(100.0, 100.0), 200.0);
        world.speed_multiplier = 10;
        world
    }

    #[test]
    fn test_rollout_records_kill_and_gain() {
        let world = skirmish();
        let baseline = Baseline::capture(&world, "me").unwrap();
        assert_eq!(baseline.opponents, 2);

        let mut action = Action::idle();
        assert!(rollout(&world, "me", &baseline, &mut action));

        assert_eq!(action.short.kills, 1);
        assert_eq!(action.mid.kills, 1);
        assert!(action.short.alive && action.mid.alive && action.long.alive);
        assert_eq!(action.short.mass_delta, 10.0);
        assert_eq!(action.short.start_tick, 0);
        assert_eq!(action.short.end_tick, 3);
        assert_eq!(action.mid.end_tick, 9);
        assert_eq!(action.long.end_tick, 21);
    }

    #[test]
    fn test_rollout_does_not_touch_snapshot() {
        let world = skirmish();
        let before = world.clone();
        let baseline = Baseline::capture(&world, "me").unwrap();
        let mut action = Action::new(Vec2::new(-40.0, 0.0), 40.0);
        assert!(rollout(&world, "me", &baseline, &mut action));
        assert_eq!(world, before);
        assert_eq!(action.short.magnitude, 40.0);
    }

    #[test]
    fn test_rollout_records_death() {
        let mut world = World::new(1000, 1000, 60);
        world.add_player("me", "blue", Vec2::new(500.0, 500.0), 10.0);
        world.spawn(Vec2::new(510.0, 500.0), Vec2::ZERO, 500.0);
        let baseline = Baseline::capture(&world, "me").unwrap();

        let mut action = Action::idle();
        assert!(rollout(&world, "me", &baseline, &mut action));
        assert!(!action.short.alive);
        assert!(action.short.mass_delta <= -9.0);
    }

    #[test]
    fn test_rollout_missing_identity() {
        let world = skirmish();
        let baseline = Baseline::capture(&world, "me").unwrap();
        let mut action = Action::idle();
        assert!(!rollout(&world, "ghost", &baseline, &mut action));
    }

    #[test]
    fn test_dispatch_completes_all_shards() {
        let world = Arc::new(skirmish());
        let space = ActionSpace::new(vec![10.0, 50.0], 90);
        let shards = space.shards(3, 11);
        let deadline = Instant::now() + Duration::from_secs(30);

        let dispatch = dispatch(world, "me", shards, deadline).unwrap();
        assert!(dispatch.is_complete());
        assert_eq!(dispatch.completed(), space.size());
        assert_eq!(dispatch.shards.len(), 3);

        // Results keep the dealt order
        let expected = space.shards(3, 11);
        for (got, want) in dispatch.shards.iter().zip(&expected) {
            let got: Vec<Vec2> = got.iter().map(|a| a.impulse).collect();
            let want: Vec<Vec2> = want.iter().map(|a| a.impulse).collect();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_dispatch_expired_deadline() {
        let world = Arc::new(skirmish());
        let shards = ActionSpace::new(vec![10.0, 50.0, 100.0], 30).shards(4, 1);
        let dispatch = dispatch(world, "me", shards, Instant::now()).unwrap();

        assert!(!dispatch.is_complete());
        assert_eq!(dispatch.completed(), 0);
        assert!(dispatch.shards.iter().all(|s| s.is_empty()));
        assert_eq!(dispatch.progress.len(), 4);
    }

    #[test]
    fn test_dispatch_joins_workers_past_deadline() {
        let world = Arc::new(skirmish());
        let space = ActionSpace::new(vec![10.0, 50.0, 100.0], 1);
        let shards = space.shards(4, 5);
        let deadline = Instant::now() + Duration::from_millis(2);

        let dispatch = dispatch(Arc::clone(&world), "me", shards, deadline).unwrap();

        // Every worker has exited and released its snapshot
        assert_eq!(Arc::strong_count(&world), 1);
        for (shard, progress) in dispatch.shards.iter().zip(&dispatch.progress) {
            assert_eq!(shard.len(), progress.completed);
            assert!(shard.iter().all(|a| a.short.end_tick > 0));
        }

        // Recorded actions are a prefix of what each worker was dealt
        let dealt = space.shards(4, 5);
        for (got, want) in dispatch.shards.iter().zip(&dealt) {
            let got: Vec<Vec2> = got.iter().map(|a| a.impulse).collect();
            let want: Vec<Vec2> = want.iter().take(got.len()).map(|a| a.impulse).collect();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_dispatch_unknown_identity() {
        let world = Arc::new(skirmish());
        let shards = ActionSpace::new(vec![10.0], 90).shards(2, 1);
        let deadline = Instant::now() + Duration::from_secs(5);
        assert!(matches!(
            dispatch(world, "ghost", shards, deadline),
            Err(PlanError::NotInWorld(_))
        ));
    }

    #[test]
    fn test_shard_progress_percent() {
        let p = ShardProgress {
            completed: 3,
            total: 4,
        };
        assert_eq!(p.percent(), 75.0);
        assert!(!p.is_complete());
        let empty = ShardProgress {
            completed: 0,
            total: 0,
        };
        assert!(empty.is_complete());
    }
}
