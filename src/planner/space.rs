//! Candidate action catalog
//!
//! The catalog is one idle action followed by a ring of impulses per
//! magnitude tier. Each ring is shuffled on its own, then the whole catalog is
//! dealt round-robin into one shard per worker, so a shard cut short by the
//! deadline still samples every tier.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use super::action::Action;
use crate::impulse_at_angle;

/// A disjoint slice of the catalog owned by one worker
pub type Shard = Vec<Action>;

#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    /// Impulse strength of each ring
    pub magnitudes: Vec<f32>,
    /// Angular spacing inside a ring (degrees, at least 1)
    pub angle_step: u32,
}

impl ActionSpace {
    pub fn new(magnitudes: Vec<f32>, angle_step: u32) -> Self {
        Self {
            magnitudes,
            angle_step: angle_step.max(1),
        }
    }

    /// Catalog size: idle plus every ring
    pub fn size(&self) -> usize {
        let ring = 360usize.div_ceil(self.angle_step.max(1) as usize);
        1 + ring * self.magnitudes.len()
    }

    /// Full catalog with each ring shuffled by `seed`
    pub fn catalog(&self, seed: u64) -> Vec<Action> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut all = Vec::with_capacity(self.size());
        all.push(Action::idle());

        let step = self.angle_step.max(1) as usize;
        for &magnitude in &self.magnitudes {
            let mut ring: Vec<Action> = (0..360)
                .step_by(step)
                .map(|deg| Action::new(impulse_at_angle(deg as f32, magnitude), magnitude))
                .collect();
            ring.shuffle(&mut rng);
            all.extend(ring);
        }

        all
    }

    /// Catalog dealt into `workers` shards
    pub fn shards(&self, workers: usize, seed: u64) -> Vec<Shard> {
        deal(self.catalog(seed), workers)
    }
}

/// Round-robin `actions` into `workers` shards (at least one)
pub fn deal(actions: Vec<Action>, workers: usize) -> Vec<Shard> {
    let workers = workers.max(1);
    let mut shards: Vec<Shard> = (0..workers)
        .map(|_| Vec::with_capacity(actions.len() / workers + 1))
        .collect();
    for (i, action) in actions.into_iter().enumerate() {
        shards[i % workers].push(action);
    }
    shards
}
