//! # Archetype Signatures
//!
//! A signature is a fixed-width bitset recording exactly which component
//! types an entity (or archetype) has. Bit `i` corresponds to the component
//! type with id `i`. Two signatures describe the same archetype iff their
//! bit patterns are equal, and a signature matches a query iff it is a
//! superset of the query's bits.

use super::component::{self, Component, ComponentTypeId};

/// Bitset of component types, one bit per [`ComponentTypeId`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature(u64);

impl Signature {
    /// The signature with no components.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns this signature with `id`'s bit set.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | 1 << id.index())
    }

    /// Returns this signature with `id`'s bit cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, id: ComponentTypeId) -> Self {
        Self(self.0 & !(1 << id.index()))
    }

    /// Checks whether `id`'s bit is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, id: ComponentTypeId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    /// Checks whether every bit of `query` is also set in `self`.
    #[inline]
    #[must_use]
    pub const fn is_superset_of(self, query: Self) -> bool {
        self.0 & query.0 == query.0
    }

    /// Returns the number of component types in the signature.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Checks whether no bits are set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the set bits as component type ids in ascending order.
    #[must_use]
    pub const fn iter(self) -> SignatureIter {
        SignatureIter { bits: self.0 }
    }
}

impl IntoIterator for Signature {
    type Item = ComponentTypeId;
    type IntoIter = SignatureIter;

    fn into_iter(self) -> SignatureIter {
        self.iter()
    }
}

/// Iterator over the component type ids of a [`Signature`], ascending.
pub struct SignatureIter {
    bits: u64,
}

impl Iterator for SignatureIter {
    type Item = ComponentTypeId;

    #[inline]
    fn next(&mut self) -> Option<ComponentTypeId> {
        if self.bits == 0 {
            return None;
        }
        let index = self.bits.trailing_zeros() as usize;
        // Clear the lowest set bit.
        self.bits &= self.bits - 1;
        Some(ComponentTypeId::from_index(index))
    }
}

/// A static set of component types usable as a query.
///
/// Implemented for tuples of components up to arity four:
/// `registry.query_entities::<(Position, Velocity)>()`.
pub trait ComponentSet {
    /// Builds the query signature, registering any type used for the first
    /// time.
    fn signature() -> Signature;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn signature() -> Signature {
                Signature::empty()$(.with(component::type_id::<$ty>()))+
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
