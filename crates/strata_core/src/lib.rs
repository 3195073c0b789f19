//! # STRATA Core Engine
//!
//! Archetype-based entity/component storage:
//! - Entities sharing an identical component set live in the same archetype
//! - Each archetype stores its entities in fixed-capacity columnar chunks
//! - Structural changes (adding/removing a component) relocate the entity
//!   to the archetype matching its new component set
//!
//! ## Architecture Rules
//!
//! 1. **Columnar layout** - one contiguous array per component type per chunk
//! 2. **O(1) bookkeeping** - swap-and-pop with back-pointers everywhere
//! 3. **Single writer** - no internal locking on mutation paths
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::Registry;
//!
//! let mut registry = Registry::new();
//! let entity = registry.create_entity();
//! registry.add_component(entity, Position::new(1.0, 2.0))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;

pub use ecs::{
    Archetype, Chunk, Component, ComponentSet, ComponentTypeId, ComponentTypeInfo, EcsError,
    EcsResult, EntityAllocator, EntityId, Registry, Signature, CHUNK_CAPACITY,
    DEFAULT_RETAINED_EMPTY_CHUNKS, MAX_COMPONENT_TYPES,
};
