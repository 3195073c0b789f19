//! # Archetype - All Entities of One Exact Signature
//!
//! An archetype owns every chunk storing entities whose component set equals
//! its signature. Its component-type order is fixed ascending at
//! construction and determines the physical column layout of every chunk it
//! will ever own.
//!
//! ## Chunk bookkeeping
//!
//! Chunks live in a slab (`Vec<Option<Chunk>>` plus a vacant-index list), so
//! a chunk's id stays stable for the registry's location table even when
//! other chunks are evicted. A separate free-chunk pool lists the ids of
//! chunks with spare capacity; each chunk stores its own position in that
//! pool, so admission and removal are O(1) swap-and-pop with back-pointer
//! repair — no scanning, ever.
//!
//! ## Empty-chunk retention
//!
//! A bounded number of fully-emptied chunks is kept alive in the pool so
//! churny workloads (entities repeatedly gaining and losing the same
//! component combination) do not pay an allocation per cycle. Beyond the
//! cap, an emptied chunk is evicted: removed from the pool, its slab slot
//! recycled, its block freed.

// SAFETY: This module requires unsafe to hand out type-erased column
// pointers; bounds are guaranteed by the caller.
#![allow(unsafe_code)]

use tracing::{debug, trace};

use super::chunk::{Chunk, ChunkLayout};
use super::component::{ComponentTypeId, MAX_COMPONENT_TYPES};
use super::entity::EntityId;
use super::signature::Signature;

/// Sentinel in the type-id-to-column reverse map.
const NO_COLUMN: u8 = u8::MAX;

/// Storage for all entities sharing one exact component signature.
pub struct Archetype {
    signature: Signature,
    /// Component type ids, ascending; fixes the column order of all chunks.
    types: Vec<ComponentTypeId>,
    /// Reverse map from type id to column index, `NO_COLUMN` when absent.
    column_of: [u8; MAX_COMPONENT_TYPES],
    layout: ChunkLayout,
    /// Chunk slab; `None` marks an evicted slot awaiting reuse.
    chunks: Vec<Option<Chunk>>,
    /// Recycled slab slots.
    vacant: Vec<u32>,
    /// Ids of chunks with spare capacity. Non-owning; membership is mirrored
    /// by each chunk's pool back-pointer.
    pool: Vec<u32>,
    /// Total live entities across all chunks.
    entity_count: usize,
    /// Fully-emptied chunks currently tracked.
    empty_retained: usize,
    /// Cap on retained empty chunks before eviction kicks in.
    max_retained_empty: usize,
}

impl Archetype {
    /// Creates the archetype for `signature`.
    ///
    /// Every component type in the signature must already be registered,
    /// which is guaranteed when the signature was built from live type ids.
    pub(crate) fn new(signature: Signature, max_retained_empty: usize) -> Self {
        let types: Vec<ComponentTypeId> = signature.iter().collect();
        let mut column_of = [NO_COLUMN; MAX_COMPONENT_TYPES];
        for (column, ty) in types.iter().enumerate() {
            column_of[ty.index()] = column as u8;
        }
        let layout = ChunkLayout::new(&types);
        debug!(?signature, components = types.len(), "created archetype");
        Self {
            signature,
            types,
            column_of,
            layout,
            chunks: Vec::new(),
            vacant: Vec::new(),
            pool: Vec::new(),
            entity_count: 0,
            empty_retained: 0,
            max_retained_empty,
        }
    }

    /// Returns this archetype's signature.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Returns the component type ids in column order (ascending).
    #[must_use]
    pub fn types(&self) -> &[ComponentTypeId] {
        &self.types
    }

    /// Returns the column index storing `ty`, or `None` if absent.
    #[inline]
    #[must_use]
    pub fn column_index(&self, ty: ComponentTypeId) -> Option<usize> {
        let column = self.column_of[ty.index()];
        (column != NO_COLUMN).then_some(column as usize)
    }

    /// Returns the chunk with the given id, if it is still tracked.
    #[must_use]
    pub fn chunk(&self, chunk_id: u32) -> Option<&Chunk> {
        self.chunks.get(chunk_id as usize)?.as_ref()
    }

    /// Iterates all tracked chunks.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().flatten()
    }

    /// Returns the number of tracked chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len() - self.vacant.len()
    }

    /// Returns the total number of entities stored in this archetype.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub(crate) fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    /// Pointer to a component value.
    ///
    /// # Safety
    ///
    /// `chunk_id` must refer to a tracked chunk, `column` must be a valid
    /// column index, and `slot` must be below the chunk's live count.
    pub(crate) unsafe fn value_ptr(&self, chunk_id: u32, column: usize, slot: usize) -> *mut u8 {
        let chunk = self.chunks[chunk_id as usize]
            .as_ref()
            .expect("location refers to an evicted chunk");
        // SAFETY: bounds guaranteed by the caller.
        unsafe { chunk.column_ptr(&self.layout, column, slot) }
    }

    /// Places an entity in a chunk with spare capacity, creating a chunk if
    /// none has space. Returns the chunk id and slot.
    ///
    /// Component values for the slot are NOT initialized; the caller must
    /// write every column before the slot is observable.
    pub(crate) fn add_entity(&mut self, entity: EntityId) -> (u32, usize) {
        let chunk_id = match self.pool.last() {
            Some(&id) => id,
            None => self.new_chunk(),
        };

        let chunk = self.chunks[chunk_id as usize]
            .as_mut()
            .expect("pooled chunk id points at an evicted slot");
        let was_empty = chunk.is_empty();
        let slot = chunk.allocate(entity);
        let now_full = chunk.is_full();

        if was_empty {
            self.empty_retained -= 1;
        }
        if now_full {
            // Full chunks leave the pool so allocation never scans.
            self.pool_remove(chunk_id);
        }
        self.entity_count += 1;
        (chunk_id, slot)
    }

    /// Removes the entity at `(chunk_id, slot)`, destroying its component
    /// values. Returns the id of the entity relocated into the slot, or
    /// [`EntityId::NULL`]; the caller must patch that entity's location.
    pub(crate) fn remove_entity(&mut self, chunk_id: u32, slot: usize) -> EntityId {
        self.remove_inner(chunk_id, slot, true)
    }

    /// Removes the entity at `(chunk_id, slot)` after a migration has moved
    /// its component values elsewhere; nothing is destroyed.
    pub(crate) fn remove_migrated(&mut self, chunk_id: u32, slot: usize) -> EntityId {
        self.remove_inner(chunk_id, slot, false)
    }

    fn remove_inner(&mut self, chunk_id: u32, slot: usize, drop_values: bool) -> EntityId {
        let chunk = self.chunks[chunk_id as usize]
            .as_mut()
            .expect("location refers to an evicted chunk");
        let was_full = chunk.is_full();
        let relocated = if drop_values {
            chunk.remove_at(&self.layout, slot)
        } else {
            chunk.remove_migrated(&self.layout, slot)
        };
        let now_empty = chunk.is_empty();
        self.entity_count -= 1;

        if now_empty {
            if self.empty_retained >= self.max_retained_empty {
                self.evict(chunk_id);
            } else {
                self.empty_retained += 1;
                self.pool_insert(chunk_id);
            }
        } else if was_full {
            self.pool_insert(chunk_id);
        }
        relocated
    }

    fn new_chunk(&mut self) -> u32 {
        let chunk = Chunk::new(&self.layout);
        let chunk_id = if let Some(id) = self.vacant.pop() {
            self.chunks[id as usize] = Some(chunk);
            id
        } else {
            let id = self.chunks.len() as u32;
            self.chunks.push(Some(chunk));
            id
        };
        self.empty_retained += 1;
        self.pool_insert(chunk_id);
        trace!(signature = ?self.signature, chunk = chunk_id, "allocated chunk");
        chunk_id
    }

    /// Admits a chunk to the free pool; idempotent.
    fn pool_insert(&mut self, chunk_id: u32) {
        if self.chunks[chunk_id as usize]
            .as_ref()
            .is_some_and(|chunk| chunk.pool_slot().is_some())
        {
            return;
        }
        let slot = self.pool.len() as u32;
        self.pool.push(chunk_id);
        self.chunks[chunk_id as usize]
            .as_mut()
            .expect("pool insert on evicted chunk")
            .set_pool_slot(Some(slot));
    }

    /// Drops a chunk from the free pool via swap-and-pop, repairing the
    /// back-pointer of whichever chunk gets swapped into its place.
    fn pool_remove(&mut self, chunk_id: u32) {
        let Some(chunk) = self.chunks[chunk_id as usize].as_mut() else {
            return;
        };
        let Some(slot) = chunk.pool_slot() else {
            return;
        };
        chunk.set_pool_slot(None);

        let slot = slot as usize;
        self.pool.swap_remove(slot);
        if slot < self.pool.len() {
            let moved = self.pool[slot];
            self.chunks[moved as usize]
                .as_mut()
                .expect("pool entry points at an evicted chunk")
                .set_pool_slot(Some(slot as u32));
        }
    }

    /// Releases an emptied chunk: pool removal, slab slot recycling, block
    /// deallocation.
    fn evict(&mut self, chunk_id: u32) {
        self.pool_remove(chunk_id);
        let chunk = self.chunks[chunk_id as usize]
            .take()
            .expect("evicting an already evicted chunk");
        debug_assert!(chunk.is_empty(), "evicting a non-empty chunk");
        self.vacant.push(chunk_id);
        trace!(signature = ?self.signature, chunk = chunk_id, "evicted empty chunk");
        // Dropping the chunk frees its block; it holds no live values.
    }
}

impl Drop for Archetype {
    fn drop(&mut self) {
        let layout = &self.layout;
        for chunk in self.chunks.iter_mut().flatten() {
            chunk.drop_contents(layout);
        }
    }
}
