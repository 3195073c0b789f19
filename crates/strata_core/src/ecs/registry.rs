//! # Registry - The Storage Engine Facade
//!
//! The registry ties the pieces together: it allocates entity ids, tracks
//! where every live entity's data physically lives, owns all archetypes, and
//! performs migrations when an entity's component set changes.
//!
//! ## Locations
//!
//! Every live entity has exactly one location: either a concrete
//! `(archetype, chunk, slot)` triple, or *homeless* — alive but holding no
//! components. Homeless is the canonical empty representation: removing an
//! entity's last component reverts it to homeless, and no archetype for the
//! empty signature is ever created.
//!
//! ## Migration
//!
//! Adding or removing a component moves the entity between archetypes:
//! reserve a slot in the destination, byte-copy every surviving column value
//! across (a move — the source slots are dead afterwards), detach from the
//! source without running destructors, and patch the location of whichever
//! entity the source's swap-and-pop relocated.

// SAFETY: This module requires unsafe for type-erased column access during
// migration and component reads/writes.
#![allow(unsafe_code)]

use std::collections::HashMap;
use std::ptr;

use super::archetype::Archetype;
use super::component::{self, Component};
use super::entity::{EntityAllocator, EntityId};
use super::error::{EcsError, EcsResult};
use super::signature::{ComponentSet, Signature};

/// Default cap on retained empty chunks per archetype.
pub const DEFAULT_RETAINED_EMPTY_CHUNKS: usize = 1;

/// Sentinel archetype index marking an entity with no components.
const HOMELESS: u32 = u32::MAX;

/// Physical position of one entity's component data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct EntityLocation {
    archetype: u32,
    chunk: u32,
    slot: u32,
}

impl EntityLocation {
    const NONE: Self = Self {
        archetype: HOMELESS,
        chunk: 0,
        slot: 0,
    };

    #[inline]
    const fn is_homeless(self) -> bool {
        self.archetype == HOMELESS
    }
}

/// Copies every source column value that also exists in the destination into
/// the destination slot. A byte copy is a move; the affected source slots
/// are dead afterwards and must not be destroyed again.
fn migrate_columns(
    src: &Archetype,
    src_chunk: u32,
    src_slot: usize,
    dst: &Archetype,
    dst_chunk: u32,
    dst_slot: usize,
) {
    let columns = src.layout().columns();
    for (column, &ty) in src.types().iter().enumerate() {
        let Some(dst_column) = dst.column_index(ty) else {
            continue;
        };
        // SAFETY: the source slot is live, the destination slot is reserved,
        // and both columns store the same component type.
        unsafe {
            let from = src.value_ptr(src_chunk, column, src_slot);
            let to = dst.value_ptr(dst_chunk, dst_column, dst_slot);
            ptr::copy_nonoverlapping(from, to, columns[column].size);
        }
    }
}

/// The archetype storage engine.
///
/// Single-writer: mutation requires `&mut Registry`, and no internal locking
/// is performed (the process-global component type registry is the one
/// lock-protected piece of shared state).
pub struct Registry {
    allocator: EntityAllocator,
    /// Indexed by entity index; kept as long as the allocator's slot table.
    locations: Vec<EntityLocation>,
    archetypes: Vec<Archetype>,
    by_signature: HashMap<Signature, u32>,
    retained_empty_chunks: usize,
}

impl Registry {
    /// Creates an empty registry with the default empty-chunk retention cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_chunk_retention(DEFAULT_RETAINED_EMPTY_CHUNKS)
    }

    /// Creates an empty registry retaining at most `retained_empty_chunks`
    /// emptied chunks per archetype before evicting them.
    #[must_use]
    pub fn with_chunk_retention(retained_empty_chunks: usize) -> Self {
        Self {
            allocator: EntityAllocator::new(),
            locations: Vec::new(),
            archetypes: Vec::new(),
            by_signature: HashMap::new(),
            retained_empty_chunks,
        }
    }

    // ========================================================================
    // Entity lifecycle
    // ========================================================================

    /// Creates a live entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.allocator.create();
        let index = entity.index() as usize;
        if index >= self.locations.len() {
            self.locations.resize(index + 1, EntityLocation::NONE);
        }
        self.locations[index] = EntityLocation::NONE;
        entity
    }

    /// Destroys an entity: its component values are dropped, its slot is
    /// backfilled, and its id is recycled with a bumped generation.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotAlive`] for a stale id or a double destroy.
    pub fn destroy_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        if !self.allocator.is_live(entity) {
            return Err(EcsError::NotAlive(entity));
        }
        let index = entity.index() as usize;
        let loc = self.locations[index];
        if !loc.is_homeless() {
            let relocated =
                self.archetypes[loc.archetype as usize].remove_entity(loc.chunk, loc.slot as usize);
            self.patch_relocated(relocated, loc);
        }
        self.locations[index] = EntityLocation::NONE;
        self.allocator.destroy(entity)
    }

    /// Checks whether the id refers to a currently live entity.
    #[inline]
    #[must_use]
    pub fn is_live(&self, entity: EntityId) -> bool {
        self.allocator.is_live(entity)
    }

    /// Returns the number of currently live entities.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.allocator.live_count()
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Attaches `value` to the entity, returning a reference to the stored
    /// component.
    ///
    /// If the entity already has a `T`, the old value is dropped and
    /// replaced in place — no migration, the entity stays where it is.
    /// Otherwise the entity migrates to the archetype for its extended
    /// signature, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotAlive`] for a stale or destroyed id.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<&mut T> {
        if !self.allocator.is_live(entity) {
            return Err(EcsError::NotAlive(entity));
        }
        let ty = component::type_id::<T>();
        let loc = self.locations[entity.index() as usize];

        if !loc.is_homeless() {
            let archetype = &self.archetypes[loc.archetype as usize];
            if let Some(column) = archetype.column_index(ty) {
                // SAFETY: the location is live and the column stores T.
                unsafe {
                    let slot = archetype.value_ptr(loc.chunk, column, loc.slot as usize).cast::<T>();
                    *slot = value;
                    return Ok(&mut *slot);
                }
            }
        }

        let old_signature = if loc.is_homeless() {
            Signature::empty()
        } else {
            self.archetypes[loc.archetype as usize].signature()
        };
        let dst_index = self.archetype_index(old_signature.with(ty));
        let (dst_chunk, dst_slot) = self.archetypes[dst_index as usize].add_entity(entity);

        if !loc.is_homeless() {
            migrate_columns(
                &self.archetypes[loc.archetype as usize],
                loc.chunk,
                loc.slot as usize,
                &self.archetypes[dst_index as usize],
                dst_chunk,
                dst_slot,
            );
            let relocated = self.archetypes[loc.archetype as usize]
                .remove_migrated(loc.chunk, loc.slot as usize);
            self.patch_relocated(relocated, loc);
        }

        self.locations[entity.index() as usize] = EntityLocation {
            archetype: dst_index,
            chunk: dst_chunk,
            slot: dst_slot as u32,
        };

        let dst = &self.archetypes[dst_index as usize];
        let column = dst
            .column_index(ty)
            .expect("destination archetype lacks the added component type");
        // SAFETY: the slot was just reserved and its T column is dead, so a
        // plain write (no drop of old contents) is correct.
        unsafe {
            let slot = dst.value_ptr(dst_chunk, column, dst_slot).cast::<T>();
            slot.write(value);
            Ok(&mut *slot)
        }
    }

    /// Detaches and drops the entity's `T`, if it has one; silently does
    /// nothing when it does not. Removing the last component reverts the
    /// entity to homeless.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotAlive`] for a stale or destroyed id.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<()> {
        if !self.allocator.is_live(entity) {
            return Err(EcsError::NotAlive(entity));
        }
        let ty = component::type_id::<T>();
        let loc = self.locations[entity.index() as usize];
        if loc.is_homeless() {
            return Ok(());
        }
        let src_index = loc.archetype as usize;
        let Some(column) = self.archetypes[src_index].column_index(ty) else {
            return Ok(());
        };

        // Destroy the removed value now; the detach below must not touch it
        // again, so both paths use the migration-style removal.
        {
            let src = &self.archetypes[src_index];
            if let Some(drop_fn) = src.layout().columns()[column].drop_fn {
                // SAFETY: the location is live and the column stores T.
                unsafe { drop_fn(src.value_ptr(loc.chunk, column, loc.slot as usize)) };
            }
        }

        let new_signature = self.archetypes[src_index].signature().without(ty);
        if new_signature.is_empty() {
            let relocated =
                self.archetypes[src_index].remove_migrated(loc.chunk, loc.slot as usize);
            self.patch_relocated(relocated, loc);
            self.locations[entity.index() as usize] = EntityLocation::NONE;
            return Ok(());
        }

        let dst_index = self.archetype_index(new_signature);
        let (dst_chunk, dst_slot) = self.archetypes[dst_index as usize].add_entity(entity);
        migrate_columns(
            &self.archetypes[src_index],
            loc.chunk,
            loc.slot as usize,
            &self.archetypes[dst_index as usize],
            dst_chunk,
            dst_slot,
        );
        let relocated = self.archetypes[src_index].remove_migrated(loc.chunk, loc.slot as usize);
        self.patch_relocated(relocated, loc);
        self.locations[entity.index() as usize] = EntityLocation {
            archetype: dst_index,
            chunk: dst_chunk,
            slot: dst_slot as u32,
        };
        Ok(())
    }

    /// Returns the entity's `T`, or `None` for a stale id, a homeless
    /// entity, or an absent component type.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        // SAFETY: component_ptr only yields pointers to live, initialized
        // values; the shared borrow of self keeps the storage in place.
        self.component_ptr::<T>(entity).map(|p| unsafe { &*p })
    }

    /// Mutable variant of [`Registry::get_component`].
    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        // SAFETY: as above, and the exclusive borrow of self makes the
        // reference unique.
        self.component_ptr::<T>(entity).map(|p| unsafe { &mut *p })
    }

    fn component_ptr<T: Component>(&self, entity: EntityId) -> Option<*mut T> {
        if !self.allocator.is_live(entity) {
            return None;
        }
        let loc = self.locations[entity.index() as usize];
        if loc.is_homeless() {
            return None;
        }
        let archetype = &self.archetypes[loc.archetype as usize];
        let column = archetype.column_index(component::type_id::<T>())?;
        // SAFETY: the location is live and the column stores T.
        Some(unsafe { archetype.value_ptr(loc.chunk, column, loc.slot as usize).cast::<T>() })
    }

    // ========================================================================
    // Queries and inspection
    // ========================================================================

    /// Returns every live entity whose signature is a superset of the query
    /// set, in archetype/chunk/slot order.
    ///
    /// Linear scan over the archetypes; no secondary index is maintained.
    #[must_use]
    pub fn query_entities<S: ComponentSet>(&self) -> Vec<EntityId> {
        let query = S::signature();
        let mut out = Vec::new();
        for archetype in &self.archetypes {
            if !archetype.signature().is_superset_of(query) {
                continue;
            }
            for chunk in archetype.chunks() {
                out.extend_from_slice(chunk.entities());
            }
        }
        out
    }

    /// All archetypes created so far, in creation order.
    #[must_use]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Returns the signature of the archetype storing the entity, or `None`
    /// for a stale id or a homeless entity.
    #[must_use]
    pub fn archetype_of(&self, entity: EntityId) -> Option<Signature> {
        if !self.allocator.is_live(entity) {
            return None;
        }
        let loc = self.locations[entity.index() as usize];
        (!loc.is_homeless()).then(|| self.archetypes[loc.archetype as usize].signature())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Finds the archetype for `signature`, creating it on first use.
    fn archetype_index(&mut self, signature: Signature) -> u32 {
        if let Some(&index) = self.by_signature.get(&signature) {
            return index;
        }
        let index = self.archetypes.len() as u32;
        self.archetypes
            .push(Archetype::new(signature, self.retained_empty_chunks));
        self.by_signature.insert(signature, index);
        index
    }

    /// After a swap-and-pop relocated `relocated` into `loc`, records its
    /// new position. No-op for the NULL id (nothing was relocated).
    fn patch_relocated(&mut self, relocated: EntityId, loc: EntityLocation) {
        if !relocated.is_null() {
            self.locations[relocated.index() as usize] = loc;
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
