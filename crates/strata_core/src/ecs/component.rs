//! # Component Types and the Global Type Registry
//!
//! Components are plain data values attached to entities. Any `Send + Sync +
//! 'static` type qualifies; non-`Copy` types (owning heap data, running a
//! destructor) are fully supported.
//!
//! The registry assigns each component type a small stable id the first time
//! it is used and records the layout facts the storage engine needs to
//! operate on values without knowing their type: size, alignment, and a
//! type-erased destructor. Relocating a value between chunks is always a raw
//! byte copy — a Rust move is a bitwise copy that deinitializes the source,
//! so no per-type move operation is required.

// SAFETY: This module requires unsafe for type-erased destruction.
#![allow(unsafe_code)]

use std::any::{type_name, TypeId};
use std::mem;

use parking_lot::RwLock;

/// Maximum number of distinct component types (signature bit width).
pub const MAX_COMPONENT_TYPES: usize = 64;

/// Marker trait for ECS components.
///
/// Blanket-implemented for every `Send + Sync + 'static` type, so plain
/// structs work without any derive or registration boilerplate.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Stable small integer id for a registered component type.
///
/// Ids are assigned in first-use order, are dense in
/// `0..MAX_COMPONENT_TYPES`, and never change for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(u8);

impl ComponentTypeId {
    /// Returns the id as a bit/array index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u8)
    }
}

/// Layout and lifecycle facts for one registered component type.
#[derive(Clone, Copy, Debug)]
pub struct ComponentTypeInfo {
    name: &'static str,
    size: usize,
    align: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentTypeInfo {
    /// Human-readable type name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Size of one value in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Alignment requirement of the type.
    #[must_use]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Type-erased in-place destructor, absent for trivially destructible
    /// types (destruction is then a no-op).
    #[must_use]
    pub(crate) const fn drop_fn(&self) -> Option<unsafe fn(*mut u8)> {
        self.drop_fn
    }
}

/// Drops the `T` behind `ptr` in place.
///
/// # Safety
///
/// `ptr` must point at a live, properly aligned `T` that is never read again.
unsafe fn drop_erased<T>(ptr: *mut u8) {
    // SAFETY: guaranteed by the caller.
    unsafe { ptr.cast::<T>().drop_in_place() }
}

struct RegistryState {
    /// `TypeId` to assigned id. Linear scan - at most 64 entries.
    ids: Vec<(TypeId, ComponentTypeId)>,
    infos: Vec<ComponentTypeInfo>,
}

/// Process-wide registry. The lock makes first-use registration safe to
/// race from multiple threads; lookups take the read path only.
static REGISTRY: RwLock<RegistryState> = RwLock::new(RegistryState {
    ids: Vec::new(),
    infos: Vec::new(),
});

/// Returns the stable id for `T`, registering it on first use.
///
/// # Panics
///
/// Panics if more than [`MAX_COMPONENT_TYPES`] distinct component types are
/// registered.
#[must_use]
pub fn type_id<T: Component>() -> ComponentTypeId {
    let key = TypeId::of::<T>();
    {
        let state = REGISTRY.read();
        if let Some(&(_, id)) = state.ids.iter().find(|(k, _)| *k == key) {
            return id;
        }
    }

    let mut state = REGISTRY.write();
    // Another thread may have registered T between the two locks.
    if let Some(&(_, id)) = state.ids.iter().find(|(k, _)| *k == key) {
        return id;
    }

    let index = state.infos.len();
    assert!(
        index < MAX_COMPONENT_TYPES,
        "component type limit exceeded: {MAX_COMPONENT_TYPES} types already registered \
         (attempted to register {})",
        type_name::<T>()
    );

    let id = ComponentTypeId::from_index(index);
    state.infos.push(ComponentTypeInfo {
        name: type_name::<T>(),
        size: mem::size_of::<T>(),
        align: mem::align_of::<T>(),
        drop_fn: if mem::needs_drop::<T>() {
            Some(drop_erased::<T>)
        } else {
            None
        },
    });
    state.ids.push((key, id));
    id
}

/// Returns the recorded layout facts for a registered id.
///
/// # Panics
///
/// Panics if `id` was not issued by [`type_id`].
#[must_use]
pub fn type_info(id: ComponentTypeId) -> ComponentTypeInfo {
    REGISTRY.read().infos[id.index()]
}

/// Returns how many component types have been registered so far.
#[must_use]
pub fn type_count() -> usize {
    REGISTRY.read().infos.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain(#[allow(dead_code)] u32);
    struct Owning(#[allow(dead_code)] String);

    #[test]
    fn test_type_id_stable_and_distinct() {
        let a = type_id::<Plain>();
        let b = type_id::<Owning>();
        assert_ne!(a, b);
        assert_eq!(a, type_id::<Plain>());
        assert_eq!(b, type_id::<Owning>());
        assert!(type_count() >= 2);
    }

    #[test]
    fn test_type_info_layout() {
        let info = type_info(type_id::<Plain>());
        assert_eq!(info.size(), std::mem::size_of::<Plain>());
        assert_eq!(info.align(), std::mem::align_of::<Plain>());
        assert!(info.name().contains("Plain"));
    }

    #[test]
    fn test_drop_fn_only_when_needed() {
        assert!(type_info(type_id::<Plain>()).drop_fn().is_none());
        assert!(type_info(type_id::<Owning>()).drop_fn().is_some());
    }
}
