//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Fixed tick only (no wall clock)
//! - Seeded RNG only
//! - Stable iteration order (by collection index)
//! - No locking, networking or threads

pub mod collision;
pub mod entity;
pub mod snapshot;
pub mod tick;
pub mod world;

pub use collision::{bounce, transfer_mass};
pub use entity::Entity;
pub use snapshot::{SnapshotError, from_json, to_json};
pub use tick::{advance, apply_impulse, kill};
pub use world::{World, WorldConfig, WorldStats};
