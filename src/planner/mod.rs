//! Rollout planner
//!
//! Builds a catalog of candidate impulses, simulates each one on its own
//! clone of the latest snapshot across a pool of worker threads, and picks
//! the best completed rollout before a wall-clock deadline.

pub mod action;
pub mod evaluate;
pub mod rollout;
pub mod space;

pub use action::{Action, ActionResult, Baseline, Horizon};
pub use evaluate::{Engagement, Selection, Tags, score, select};
pub use rollout::{Dispatch, PlanError, ShardProgress, dispatch, rollout};
pub use space::{ActionSpace, Shard, deal};
