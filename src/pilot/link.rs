//! The pilot's view of the authoritative world

use std::sync::Arc;

use glam::Vec2;
use thiserror::Error;

use crate::arena::Arena;
use crate::sim::{self, SnapshotError, World};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("move rejected: {0}")]
    Rejected(String),
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] SnapshotError),
    #[error("disconnected")]
    Disconnected,
}

/// Transport between a pilot and the world it plays in
pub trait WorldLink {
    /// Latest authoritative world
    fn fetch_snapshot(&mut self) -> Result<World, LinkError>;

    /// Ask the world to apply `impulse` to our cloud
    fn submit_move(&mut self, impulse: Vec2) -> Result<(), LinkError>;
}

/// In-process link to an `Arena`
///
/// Snapshots go through the JSON interchange form so the pilot only ever
/// sees what a remote client would.
pub struct LocalLink {
    arena: Arc<Arena>,
    identity: String,
}

impl LocalLink {
    pub fn new(arena: Arc<Arena>, identity: impl Into<String>) -> Self {
        Self {
            arena,
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl WorldLink for LocalLink {
    fn fetch_snapshot(&mut self) -> Result<World, LinkError> {
        if self.arena.is_closed() {
            return Err(LinkError::Disconnected);
        }
        let json = self.arena.export_json()?;
        Ok(sim::from_json(&json)?)
    }

    fn submit_move(&mut self, impulse: Vec2) -> Result<(), LinkError> {
        if self.arena.is_closed() {
            return Err(LinkError::Disconnected);
        }
        if self.arena.commit(&self.identity, impulse) {
            Ok(())
        } else {
            Err(LinkError::Rejected(format!(
                "impulse ({:.2}, {:.2}) for {}",
                impulse.x, impulse.y, self.identity
            )))
        }
    }
}
