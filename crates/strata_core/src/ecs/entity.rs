//! # Entity Identifiers and Allocation
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the registry's location table
//! - A generation counter for safe reuse
//!
//! The generation counter makes stale ids detectable: destroying an entity
//! bumps its slot's generation, so any id minted before the destroy no
//! longer matches and every later lookup or destroy of it fails cleanly
//! instead of aliasing a recycled entity.

use bytemuck::{Pod, Zeroable};

use super::error::{EcsError, EcsResult};

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into the location table
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

/// Issues and recycles entity identifiers.
///
/// Destroyed indices are reused LIFO: the most recently recycled index is
/// handed out before any index that has never been issued. Each slot carries
/// the generation its next id will be minted with, so the allocator is the
/// authority on whether a given id is currently live.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation per index slot.
    generations: Vec<u32>,
    /// Recycled indices, most recent last.
    free: Vec<u32>,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues an id that is not currently live.
    ///
    /// Pops the most recently recycled index if one exists, otherwise mints
    /// the next never-used index.
    ///
    /// # Panics
    ///
    /// Panics if the 32-bit index space is exhausted.
    pub fn create(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            return EntityId::new(index, self.generations[index as usize]);
        }
        assert!(
            self.generations.len() < u32::MAX as usize,
            "entity index space exhausted"
        );
        let index = self.generations.len() as u32;
        self.generations.push(0);
        EntityId::new(index, 0)
    }

    /// Recycles an id, bumping its slot's generation.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotAlive`] if the id is stale or was already
    /// destroyed; the recycle pool is never corrupted by a double destroy.
    pub fn destroy(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.is_live(id) {
            return Err(EcsError::NotAlive(id));
        }
        let index = id.index() as usize;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(id.index());
        Ok(())
    }

    /// Checks whether the id refers to a currently live entity.
    #[inline]
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        !id.is_null()
            && (id.index() as usize) < self.generations.len()
            && self.generations[id.index() as usize] == id.generation()
    }

    /// Returns the number of currently live entities.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.generations.len() - self.free.len()
    }
}
