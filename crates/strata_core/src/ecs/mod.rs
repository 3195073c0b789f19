//! # Entity Component Storage
//!
//! The storage engine groups entities by their exact component set.
//!
//! ## Design Philosophy
//!
//! - Component types are registered once, process-wide, and addressed by a
//!   small stable id
//! - Entity data lives in fixed-capacity columnar chunks owned by archetypes
//! - Every structural bookkeeping operation is O(1) via swap-and-pop with
//!   back-pointer repair
//! - No dynamic dispatch in hot paths; type erasure uses function pointers

pub mod archetype;
mod chunk;
mod component;
mod entity;
mod error;
mod registry;
mod signature;

pub use archetype::Archetype;
pub use chunk::{Chunk, CHUNK_CAPACITY};
pub use component::{
    type_count, type_id, type_info, Component, ComponentTypeId, ComponentTypeInfo,
    MAX_COMPONENT_TYPES,
};
pub use entity::{EntityAllocator, EntityId};
pub use error::{EcsError, EcsResult};
pub use registry::{Registry, DEFAULT_RETAINED_EMPTY_CHUNKS};
pub use signature::{ComponentSet, Signature, SignatureIter};
