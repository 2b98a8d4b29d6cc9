//! Rollout scoring and selection
//!
//! Score = best weighted vapor gain over the three horizons, minus the vapor
//! spent, then one death penalty and one kill bonus. Both adjustments are
//! priority chains: only the first matching clause applies.

use glam::Vec2;

use super::action::{Action, ActionResult};

/// Horizon weights applied to the vapor gain percentage
const SHORT_WEIGHT: f64 = 1.0;
const MID_WEIGHT: f64 = 0.75;
const LONG_WEIGHT: f64 = 0.3;

/// Dying within the short or mid horizon
const EARLY_DEATH_PENALTY: f64 = 1000.0;
/// Dying only within the long horizon
const LATE_DEATH_PENALTY: f64 = 200.0;

const SHORT_KILL_BONUS: f64 = 50.0;
const MID_KILL_BONUS: f64 = 40.0;
const LONG_KILL_BONUS: f64 = 25.0;

/// Why an opponent death shows up in the winning rollout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// Kill within the short or mid horizon
    Kill,
    /// Kill only within the long horizon
    Hunt,
}

/// Diagnostic tags for a selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tags {
    /// Winning score is negative: every option loses vapor or dies
    pub escape: bool,
    pub engagement: Option<Engagement>,
}

/// The chosen action
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub impulse: Vec2,
    pub magnitude: f32,
    pub score: f64,
    pub tags: Tags,
    /// Shard and position of the winner in that shard's results
    pub shard: usize,
    pub slot: usize,
}

impl Selection {
    pub fn is_idle(&self) -> bool {
        self.impulse == Vec2::ZERO
    }
}

/// Score one completed rollout against the baseline mass
pub fn score(action: &Action, baseline_mass: f32) -> f64 {
    let mass = baseline_mass as f64;
    let vapor_pct = |r: &ActionResult| r.mass_delta as f64 / mass * 100.0;

    let gain = (vapor_pct(&action.short) * SHORT_WEIGHT)
        .max(vapor_pct(&action.mid) * MID_WEIGHT)
        .max(vapor_pct(&action.long) * LONG_WEIGHT);
    let cost = action.magnitude as f64 / mass * 100.0;
    let mut score = gain - cost;

    if !action.short.alive || !action.mid.alive {
        score -= EARLY_DEATH_PENALTY;
    } else if !action.long.alive {
        score -= LATE_DEATH_PENALTY;
    }

    if action.short.kills > 0 {
        score += SHORT_KILL_BONUS;
    } else if action.mid.kills > 0 {
        score += MID_KILL_BONUS;
    } else if action.long.kills > 0 {
        score += LONG_KILL_BONUS;
    }

    score
}

pub fn tags(action: &Action) -> Tags {
    let engagement = if action.short.kills > 0 || action.mid.kills > 0 {
        Some(Engagement::Kill)
    } else if action.long.kills > 0 {
        Some(Engagement::Hunt)
    } else {
        None
    };
    Tags {
        escape: action.score < 0.0,
        engagement,
    }
}

/// Score every action and return the strict argmax
///
/// Ties keep the earliest action in shard order, then in-shard order.
pub fn select(shards: &mut [Vec<Action>], baseline_mass: f32) -> Option<Selection> {
    let mut best: Option<Selection> = None;

    for (shard, actions) in shards.iter_mut().enumerate() {
        for (slot, action) in actions.iter_mut().enumerate() {
            action.score = score(action, baseline_mass);
            if best.as_ref().is_none_or(|b| action.score > b.score) {
                best = Some(Selection {
                    impulse: action.impulse,
                    magnitude: action.magnitude,
                    score: action.score,
                    tags: tags(action),
                    shard,
                    slot,
                });
            }
        }
    }

    best
}
