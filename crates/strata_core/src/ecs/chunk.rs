//! # Chunk - Fixed-Capacity Columnar Block
//!
//! A chunk holds up to [`CHUNK_CAPACITY`] entities of one archetype in a
//! single heap allocation laid out column by column:
//!
//! ```text
//! | EntityId[64] | ComponentA[64] | ComponentB[64] | ... |
//! ```
//!
//! Each column is aligned to its element's natural alignment. Slots
//! `[0, len)` hold live data; slots beyond do not. Removal is swap-and-pop:
//! the last slot's values are byte-copied into the vacated slot (a move, in
//! Rust terms) and the chunk reports which entity was relocated so the
//! caller can patch that entity's stored location.
//!
//! The chunk itself is layout-blind: the owning archetype computes a
//! [`ChunkLayout`] once and passes it into every operation that touches
//! component columns. Dropping a `Chunk` frees the block only; live values
//! must be destroyed first via [`Chunk::drop_contents`], which the owning
//! archetype guarantees.

// SAFETY: This module requires unsafe for manual columnar memory layout.
// All unsafe blocks are documented and rely on the len/capacity invariant.
#![allow(unsafe_code)]

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use super::component::{self, ComponentTypeId};
use super::entity::EntityId;

/// Number of entity slots per chunk.
pub const CHUNK_CAPACITY: usize = 64;

/// Placement of one component column within a chunk block.
pub(crate) struct ColumnLayout {
    /// Byte offset of the column's first slot.
    pub(crate) offset: usize,
    /// Size of one element in bytes.
    pub(crate) size: usize,
    /// Type-erased destructor, `None` for trivially destructible elements.
    pub(crate) drop_fn: Option<unsafe fn(*mut u8)>,
}

/// Block layout shared by every chunk of one archetype.
///
/// The entity-id column sits at offset zero; component columns follow in
/// the archetype's fixed type order, each aligned to its element alignment.
pub(crate) struct ChunkLayout {
    columns: Vec<ColumnLayout>,
    block: Layout,
}

const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

impl ChunkLayout {
    /// Computes the layout for the given component types, in order.
    pub(crate) fn new(types: &[ComponentTypeId]) -> Self {
        let mut offset = mem::size_of::<EntityId>() * CHUNK_CAPACITY;
        let mut align = mem::align_of::<EntityId>();
        let mut columns = Vec::with_capacity(types.len());

        for &ty in types {
            let info = component::type_info(ty);
            align = align.max(info.align());
            offset = align_up(offset, info.align());
            columns.push(ColumnLayout {
                offset,
                size: info.size(),
                drop_fn: info.drop_fn(),
            });
            offset += info.size() * CHUNK_CAPACITY;
        }

        let block = Layout::from_size_align(align_up(offset, align), align)
            .expect("chunk layout overflow");
        Self { columns, block }
    }

    /// Component columns in archetype type order.
    pub(crate) fn columns(&self) -> &[ColumnLayout] {
        &self.columns
    }
}

/// One fixed-capacity columnar storage block.
///
/// Tracks its live-slot count and its position in the owning archetype's
/// free-chunk pool (the back-pointer that makes pool removal O(1)).
pub struct Chunk {
    /// The raw block. Never null; freed on drop.
    data: NonNull<u8>,
    /// Layout of the block allocation, kept for deallocation.
    block: Layout,
    /// Number of live slots. Slots `[0, len)` are initialized.
    len: usize,
    /// Position in the owning archetype's free-chunk pool, if pooled.
    pool_slot: Option<u32>,
}

// SAFETY: the chunk exclusively owns its block, and every stored value is
// Send + Sync by the Component trait bound.
unsafe impl Send for Chunk {}
// SAFETY: shared access only reads; mutation requires &mut Chunk.
unsafe impl Sync for Chunk {}

impl Chunk {
    /// Allocates an empty chunk for the given layout.
    pub(crate) fn new(layout: &ChunkLayout) -> Self {
        let block = layout.block;
        // SAFETY: the block always has non-zero size (the entity column).
        let data = unsafe {
            let Some(ptr) = NonNull::new(alloc(block)) else {
                handle_alloc_error(block)
            };
            ptr
        };
        Self {
            data,
            block,
            len: 0,
            pool_slot: None,
        }
    }

    /// Returns the number of live slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the chunk has no live slots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Checks whether the chunk is at capacity.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == CHUNK_CAPACITY
    }

    /// Returns the live entity ids, in slot order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        // SAFETY: the entity column starts at offset zero, is aligned for
        // EntityId, and slots [0, len) are initialized.
        unsafe { slice::from_raw_parts(self.data.as_ptr().cast::<EntityId>(), self.len) }
    }

    /// Returns the entity id at `slot`, or `None` past the live range.
    #[must_use]
    pub fn entity_at(&self, slot: usize) -> Option<EntityId> {
        self.entities().get(slot).copied()
    }

    pub(crate) fn pool_slot(&self) -> Option<u32> {
        self.pool_slot
    }

    pub(crate) fn set_pool_slot(&mut self, slot: Option<u32>) {
        self.pool_slot = slot;
    }

    /// Pointer to the entity-id slot.
    ///
    /// # Safety
    ///
    /// `slot` must be below [`CHUNK_CAPACITY`].
    #[inline]
    unsafe fn entity_ptr(&self, slot: usize) -> *mut EntityId {
        // SAFETY: slot is within the entity column per the caller contract.
        unsafe { self.data.as_ptr().cast::<EntityId>().add(slot) }
    }

    /// Pointer into a component column at a slot.
    ///
    /// No bounds checking: the caller guarantees `column` is a valid column
    /// index for this chunk's layout and `slot < len`.
    ///
    /// # Safety
    ///
    /// See above; the returned pointer is only valid while the chunk lives.
    #[inline]
    pub(crate) unsafe fn column_ptr(
        &self,
        layout: &ChunkLayout,
        column: usize,
        slot: usize,
    ) -> *mut u8 {
        let col = &layout.columns[column];
        // SAFETY: column offsets were computed for this block.
        unsafe { self.data.as_ptr().add(col.offset + col.size * slot) }
    }

    /// Appends an entity id at the next free slot.
    ///
    /// The caller is responsible for initializing the slot's component
    /// values and, if this fills the chunk, for dropping it from the owning
    /// archetype's free-chunk pool.
    pub(crate) fn allocate(&mut self, entity: EntityId) -> usize {
        debug_assert!(self.len < CHUNK_CAPACITY, "chunk over capacity");
        let slot = self.len;
        // SAFETY: slot < CHUNK_CAPACITY, and the slot is dead (no old value).
        unsafe { self.entity_ptr(slot).write(entity) };
        self.len += 1;
        slot
    }

    /// Removes `slot`, destroying its component values.
    ///
    /// Returns the id of the entity relocated into `slot` from the last
    /// occupied slot, or [`EntityId::NULL`] when `slot` was last. The caller
    /// MUST patch the relocated entity's stored location.
    pub(crate) fn remove_at(&mut self, layout: &ChunkLayout, slot: usize) -> EntityId {
        self.remove_inner(layout, slot, true)
    }

    /// Removes `slot` whose component values were already moved out by a
    /// migration. Identical to [`Chunk::remove_at`] but skips destruction.
    pub(crate) fn remove_migrated(&mut self, layout: &ChunkLayout, slot: usize) -> EntityId {
        self.remove_inner(layout, slot, false)
    }

    fn remove_inner(&mut self, layout: &ChunkLayout, slot: usize, drop_values: bool) -> EntityId {
        debug_assert!(slot < self.len, "slot past live range");
        let last = self.len - 1;

        for col in &layout.columns {
            // SAFETY: slot and last are both below len, so both point at
            // initialized values within the column.
            unsafe {
                let removed = self.data.as_ptr().add(col.offset + col.size * slot);
                if drop_values {
                    if let Some(drop_fn) = col.drop_fn {
                        drop_fn(removed);
                    }
                }
                if slot != last {
                    // Byte-copy is a move: the last slot is dead afterwards
                    // and needs no destruction.
                    let tail = self.data.as_ptr().add(col.offset + col.size * last);
                    ptr::copy_nonoverlapping(tail, removed, col.size);
                }
            }
        }

        self.len = last;
        if slot == last {
            return EntityId::NULL;
        }
        // SAFETY: both slots are within the entity column.
        unsafe {
            let moved = self.entity_ptr(last).read();
            self.entity_ptr(slot).write(moved);
            moved
        }
    }

    /// Destroys every live component value, leaving the chunk empty.
    pub(crate) fn drop_contents(&mut self, layout: &ChunkLayout) {
        for col in &layout.columns {
            let Some(drop_fn) = col.drop_fn else { continue };
            for slot in 0..self.len {
                // SAFETY: slots [0, len) hold initialized values.
                unsafe { drop_fn(self.data.as_ptr().add(col.offset + col.size * slot)) };
            }
        }
        self.len = 0;
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: data was allocated with this layout in Chunk::new.
        unsafe { dealloc(self.data.as_ptr(), self.block) };
    }
}
