//! World state and aggregate statistics
//!
//! Everything a rollout needs lives in `World`, so cloning it is the whole
//! cost of starting a new forward simulation.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use crate::consts::{MATCH_SECONDS, WIN_SHARE_PERCENT};

/// Attempts made by `free_spot` before settling for an overlapping position
const SPAWN_ATTEMPTS: u32 = 1000;

/// Parameters for generating a fresh arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
    /// Authoritative ticks per real second
    pub tick_rate: u32,
    /// Neutral clouds scattered at generation
    pub clouds: u32,
    /// Maximum initial speed per axis of neutral clouds
    pub max_drift: f32,
    /// Maximum initial mass of neutral clouds
    pub max_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 1152,
            tick_rate: 60,
            clouds: 100,
            max_drift: 7.0,
            max_size: 200.0,
        }
    }
}

/// Derived statistics, recomputed after every tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldStats {
    /// Ticks advanced so far
    pub iteration: u64,
    /// Mass of every retained cloud, corpses included
    pub total_mass: f32,
    /// Number of alive clouds
    pub alive: usize,
    /// Whether the match is decided
    pub win: bool,
    /// Heaviest alive player, if any
    pub leader: Option<String>,
}

/// The arena (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub width: u32,
    pub height: u32,
    /// Ticks per real second
    pub tick_rate: u32,
    /// Time compression used by rollouts (1 for the authoritative world)
    pub speed_multiplier: u32,
    /// Clouds in stable insertion order
    pub entities: Vec<Entity>,
    frozen: bool,
    stats: WorldStats,
    next_id: u32,
}

impl World {
    /// Create an empty world
    pub fn new(width: u32, height: u32, tick_rate: u32) -> Self {
        Self {
            width,
            height,
            tick_rate,
            speed_multiplier: 1,
            entities: Vec::new(),
            frozen: false,
            stats: WorldStats::default(),
            next_id: 1,
        }
    }

    /// Create a world populated with seeded neutral clouds
    pub fn generate(config: &WorldConfig, seed: u64) -> Self {
        let mut world = Self::new(config.width, config.height, config.tick_rate);
        let mut rng = Pcg32::seed_from_u64(seed);

        for _ in 0..config.clouds {
            let pos = Vec2::new(
                rng.random::<f32>() * config.width as f32,
                rng.random::<f32>() * config.height as f32,
            );
            let vel = Vec2::new(
                (2.0 * rng.random::<f32>() - 1.0) * config.max_drift,
                (2.0 * rng.random::<f32>() - 1.0) * config.max_drift,
            );
            let mass = rng.random::<f32>() * config.max_size;
            world.spawn(pos, vel, mass);
        }

        world.refresh_stats();
        world
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append a neutral cloud, returning its id
    pub fn spawn(&mut self, pos: Vec2, vel: Vec2, mass: f32) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity::neutral(id, pos, vel, mass));
        id
    }

    /// Append a resting player cloud, returning its id
    pub fn add_player(&mut self, owner: &str, tag: &str, pos: Vec2, mass: f32) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity {
            id,
            pos,
            vel: Vec2::ZERO,
            mass,
            owner: Some(owner.to_string()),
            tag: tag.to_string(),
        });
        self.refresh_stats();
        id
    }

    /// Random position where a cloud of `mass` overlaps nothing
    ///
    /// Gives up after a bounded number of attempts and returns the last
    /// candidate.
    pub fn free_spot<R: Rng + ?Sized>(&self, mass: f32, rng: &mut R) -> Vec2 {
        let mut probe = Entity::neutral(0, Vec2::ZERO, Vec2::ZERO, mass);
        for _ in 0..SPAWN_ATTEMPTS {
            probe.pos = Vec2::new(
                rng.random::<f32>() * self.width as f32,
                rng.random::<f32>() * self.height as f32,
            );
            if !self.entities.iter().any(|e| e.intersects(&probe)) {
                break;
            }
        }
        probe.pos
    }

    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }

    pub fn iteration(&self) -> u64 {
        self.stats.iteration
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Tick after which the leader wins by timeout
    pub fn max_iterations(&self) -> u64 {
        MATCH_SECONDS * self.tick_rate as u64
    }

    /// Effective speed multiplier (0 counts as 1)
    pub fn speed(&self) -> u32 {
        self.speed_multiplier.max(1)
    }

    /// Index of the cloud controlled by `identity` (oldest match)
    pub fn index_of(&self, identity: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.is_owned_by(identity))
    }

    /// Cloud controlled by `identity` (oldest match)
    pub fn controlled(&self, identity: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.is_owned_by(identity))
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Alive clouds owned by anyone other than `identity`
    pub fn alive_opponents(&self, identity: &str) -> usize {
        self.entities
            .iter()
            .filter(|e| e.is_alive() && e.is_opponent_of(identity))
            .count()
    }

    /// Leader and whether the match is decided
    pub fn win_condition(&self) -> (bool, Option<String>) {
        let mut leader: Option<&Entity> = None;
        for cloud in self.entities.iter().filter(|e| e.is_owned() && e.is_alive()) {
            match leader {
                Some(best) if best.mass >= cloud.mass => {}
                _ => leader = Some(cloud),
            }
        }

        let Some(leader) = leader else {
            return (true, None);
        };
        let name = leader.owner.clone();

        if self.stats.iteration > self.max_iterations() {
            return (true, name);
        }

        if leader.mass / self.stats.total_mass * 100.0 > WIN_SHARE_PERCENT {
            return (true, name);
        }

        (false, name)
    }

    /// Recompute total mass, alive count and the win condition
    pub fn refresh_stats(&mut self) {
        self.stats.total_mass = self.entities.iter().map(|e| e.mass).sum();
        self.stats.alive = self.entities.iter().filter(|e| e.is_alive()).count();
        let (win, leader) = self.win_condition();
        self.stats.win = win;
        self.stats.leader = leader;
    }

    /// End-of-tick bookkeeping: drop dead neutral clouds, count the tick
    pub(crate) fn settle(&mut self) {
        self.entities.retain(|e| e.is_alive() || e.is_owned());
        self.stats.iteration += 1;
        self.refresh_stats();
    }
}
