//! JSON interchange form of a world
//!
//! This is what crosses a link between the authoritative arena and a pilot.

use thiserror::Error;

use super::world::World;
use crate::consts::MAX_MASS;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot: {0}")]
    Invalid(&'static str),
}

pub fn to_json(world: &World) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(world)?)
}

/// Parse a snapshot, rejecting worlds no kernel call could handle
pub fn from_json(json: &str) -> Result<World, SnapshotError> {
    let world: World = serde_json::from_str(json)?;
    if world.width == 0 || world.height == 0 {
        return Err(SnapshotError::Invalid("empty arena"));
    }
    if world.tick_rate == 0 {
        return Err(SnapshotError::Invalid("zero tick rate"));
    }
    if world
        .entities
        .iter()
        .any(|e| !(e.mass >= 0.0 && e.mass < MAX_MASS))
    {
        return Err(SnapshotError::Invalid("mass out of range"));
    }
    if world
        .entities
        .iter()
        .any(|e| !e.pos.is_finite() || !e.vel.is_finite())
    {
        return Err(SnapshotError::Invalid("non-finite position or velocity"));
    }
    Ok(world)
}
