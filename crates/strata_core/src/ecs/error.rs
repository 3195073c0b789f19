//! # Storage Engine Errors
//!
//! The error surface is deliberately narrow. Missing-component lookups and
//! removals are not errors (they return `None` or do nothing); only the two
//! cases that would otherwise corrupt internal bookkeeping are reported:
//! using a stale entity id and destroying an entity twice.

use thiserror::Error;

use super::entity::EntityId;

/// Errors that can occur in the storage engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// The entity id does not refer to a live entity.
    ///
    /// Raised for ids that were never issued, ids whose entity has been
    /// destroyed (the generation no longer matches), and double destroys.
    #[error("entity {0:?} is not alive")]
    NotAlive(EntityId),
}

/// Result type for storage engine operations.
pub type EcsResult<T> = Result<T, EcsError>;
