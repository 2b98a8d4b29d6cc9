//! Authoritative world owner
//!
//! The arena holds the one real `World` behind a mutex. Every read hands out
//! an owned copy, so nothing outside the lock ever aliases live state.
//! `Ticker` drives the arena in real time on a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::sim::{self, Entity, SnapshotError, World, WorldStats};

struct ArenaState {
    world: World,
    /// Spawn placement only; the physics never draws from it
    rng: Pcg32,
}

pub struct Arena {
    state: Mutex<ArenaState>,
    closed: AtomicBool,
}

impl Arena {
    pub fn new(world: World, seed: u64) -> Self {
        Self {
            state: Mutex::new(ArenaState {
                world,
                rng: Pcg32::seed_from_u64(seed),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// A panic elsewhere must not take the match down with it
    fn lock(&self) -> MutexGuard<'_, ArenaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deep copy of the current world
    pub fn snapshot(&self) -> World {
        self.lock().world.clone()
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.lock().world.entities.clone()
    }

    pub fn stats(&self) -> WorldStats {
        self.lock().world.stats().clone()
    }

    /// Current world in the JSON interchange form
    pub fn export_json(&self) -> Result<String, SnapshotError> {
        sim::to_json(&self.lock().world)
    }

    /// Apply `impulse` to the cloud controlled by `identity`
    ///
    /// False if the arena is frozen, the player has no cloud, or the kernel
    /// rejects the impulse.
    pub fn commit(&self, identity: &str, impulse: Vec2) -> bool {
        let mut state = self.lock();
        if state.world.is_frozen() {
            return false;
        }
        match state.world.index_of(identity) {
            Some(index) => sim::apply_impulse(&mut state.world, index, impulse),
            None => false,
        }
    }

    /// Blow up the cloud controlled by `identity`
    pub fn kill(&self, identity: &str) -> bool {
        let mut state = self.lock();
        if state.world.is_frozen() {
            return false;
        }
        match state.world.index_of(identity) {
            Some(index) => sim::kill(&mut state.world, index),
            None => false,
        }
    }

    /// Advance one tick unless frozen; returns the stats afterwards
    pub fn tick(&self) -> WorldStats {
        let mut state = self.lock();
        if !state.world.is_frozen() {
            sim::advance(&mut state.world);
        }
        state.world.stats().clone()
    }

    /// Add a player cloud, at a free random spot unless `pos` is given
    pub fn add_player(&self, name: &str, tag: &str, pos: Option<Vec2>, mass: f32) -> u32 {
        let mut state = self.lock();
        let ArenaState { world, rng } = &mut *state;
        let pos = pos.unwrap_or_else(|| world.free_spot(mass, rng));
        let id = world.add_player(name, tag, pos, mass);
        log::info!("{name} joined as cloud {id} at ({:.0}, {:.0})", pos.x, pos.y);
        id
    }

    pub fn freeze(&self, frozen: bool) {
        self.lock().world.set_frozen(frozen);
        log::info!("Arena {}", if frozen { "frozen" } else { "resumed" });
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().world.is_frozen()
    }

    /// Stop serving links; pending and future fetches see a disconnect
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Real-time driver for an `Arena`
pub struct Ticker {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<WorldStats>>,
}

impl Ticker {
    /// Start ticking `arena` at its own tick rate
    ///
    /// The thread ends once the match is decided or `stop` is called, and
    /// closes the arena on its way out.
    pub fn start(arena: Arc<Arena>) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let tick_rate = arena.snapshot().tick_rate.max(1);
        let period = Duration::from_secs_f64(1.0 / tick_rate as f64);

        let handle = thread::Builder::new()
            .name("arena-ticker".into())
            .spawn(move || {
                log::info!("Arena ticker started at {tick_rate} Hz");
                let mut next = Instant::now();
                let mut stats = arena.stats();

                while flag.load(Ordering::Relaxed) {
                    stats = arena.tick();
                    if stats.win {
                        log::info!(
                            "Match decided at tick {}: {}",
                            stats.iteration,
                            stats.leader.as_deref().unwrap_or("nobody")
                        );
                        break;
                    }
                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        // Fell behind; don't try to catch up in a burst
                        next = now;
                    }
                }

                arena.close();
                stats
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and return the final stats
    pub fn stop(&mut self) -> Option<WorldStats> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Wait for the match to end on its own
    pub fn join(&mut self) -> Option<WorldStats> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                log::error!("Arena ticker panicked");
                None
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
