//! Construct identities for the topic map engine.
//!
//! Every topic map construct is identified by a [`ConstructId`], wrapped in
//! a typed id ([`TopicId`], [`NameId`], ...) so the compiler keeps a name id
//! from being passed where a topic is expected. [`ConstructRef`] is the
//! tagged union used wherever any construct may appear (error reporters,
//! item identifier lookups, parents).
//!
//! Ids come from a single process-wide [`ConstructIdAllocator`]. An id minted
//! by one topic map is therefore never present in another, which is how
//! cross-map references are detected.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, TmResult};

/// Unique, niche-optimized identifier for a construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConstructId(NonZeroU64);

impl ConstructId {
    /// Create a `ConstructId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ConstructId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ConstructId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe construct ID allocator.
///
/// Produces monotonically increasing IDs starting from 1.
#[derive(Debug)]
pub struct ConstructIdAllocator {
    next: AtomicU64,
}

impl ConstructIdAllocator {
    /// Create a new allocator that starts from ID 1.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next construct ID.
    ///
    /// Returns an error if the ID space is exhausted.
    pub fn next_id(&self) -> TmResult<ConstructId> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        ConstructId::new(raw).ok_or_else(|| ModelError::AllocatorExhausted.into())
    }
}

impl Default for ConstructIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

static ALLOCATOR: ConstructIdAllocator = ConstructIdAllocator::new();

/// Allocate a process-unique construct id.
pub(crate) fn allocate() -> TmResult<ConstructId> {
    ALLOCATOR.next_id()
}

/// Discriminant of a [`ConstructRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructKind {
    TopicMap,
    Topic,
    Association,
    Role,
    Name,
    Occurrence,
    Variant,
}

impl std::fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructKind::TopicMap => write!(f, "topic map"),
            ConstructKind::Topic => write!(f, "topic"),
            ConstructKind::Association => write!(f, "association"),
            ConstructKind::Role => write!(f, "role"),
            ConstructKind::Name => write!(f, "name"),
            ConstructKind::Occurrence => write!(f, "occurrence"),
            ConstructKind::Variant => write!(f, "variant"),
        }
    }
}

macro_rules! construct_ids {
    ($($(#[$doc:meta])* $name:ident => $variant:ident;)+) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[repr(transparent)]
            pub struct $name(ConstructId);

            impl $name {
                pub(crate) fn from_id(id: ConstructId) -> Self {
                    Self(id)
                }

                /// The untyped construct id.
                pub fn id(self) -> ConstructId {
                    self.0
                }
            }

            impl From<$name> for ConstructRef {
                fn from(id: $name) -> Self {
                    ConstructRef::$variant(id)
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}#{}", ConstructKind::$variant, self.0)
                }
            }
        )+

        /// Reference to any construct of a topic map.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ConstructRef {
            $($variant($name),)+
        }

        impl ConstructRef {
            /// What kind of construct this refers to.
            pub fn kind(self) -> ConstructKind {
                match self {
                    $(ConstructRef::$variant(_) => ConstructKind::$variant,)+
                }
            }

            /// The untyped construct id.
            pub fn id(self) -> ConstructId {
                match self {
                    $(ConstructRef::$variant(id) => id.id(),)+
                }
            }
        }

        impl std::fmt::Display for ConstructRef {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(ConstructRef::$variant(id) => std::fmt::Display::fmt(id, f),)+
                }
            }
        }
    };
}

construct_ids! {
    /// Identifier of a topic map.
    TopicMapId => TopicMap;
    /// Identifier of a topic.
    TopicId => Topic;
    /// Identifier of an association.
    AssociationId => Association;
    /// Identifier of an association role.
    RoleId => Role;
    /// Identifier of a topic name.
    NameId => Name;
    /// Identifier of an occurrence.
    OccurrenceId => Occurrence;
    /// Identifier of a name variant.
    VariantId => Variant;
}

impl ConstructRef {
    /// The topic id, if this refers to a topic.
    pub fn as_topic(self) -> Option<TopicId> {
        match self {
            ConstructRef::Topic(id) => Some(id),
            _ => None,
        }
    }
}

/// Constructs that carry a type.
pub trait Typed: Copy + Into<ConstructRef> {}

/// Constructs that carry a scope.
pub trait Scoped: Copy + Into<ConstructRef> {}

/// Constructs that can be reified by a topic.
pub trait Reifiable: Copy + Into<ConstructRef> {}

/// Constructs whose value carries a datatype.
pub trait DatatypeAware: Copy + Into<ConstructRef> {}

impl Typed for AssociationId {}
impl Typed for RoleId {}
impl Typed for NameId {}
impl Typed for OccurrenceId {}

impl Scoped for AssociationId {}
impl Scoped for NameId {}
impl Scoped for OccurrenceId {}
impl Scoped for VariantId {}

impl Reifiable for TopicMapId {}
impl Reifiable for AssociationId {}
impl Reifiable for RoleId {}
impl Reifiable for NameId {}
impl Reifiable for OccurrenceId {}
impl Reifiable for VariantId {}

impl DatatypeAware for OccurrenceId {}
impl DatatypeAware for VariantId {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<TopicId>>(),
            std::mem::size_of::<TopicId>()
        );
    }

    #[test]
    fn construct_id_zero_is_none() {
        assert!(ConstructId::new(0).is_none());
        assert_eq!(ConstructId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn allocator_produces_sequential_ids() {
        let alloc = ConstructIdAllocator::new();
        let a = alloc.next_id().unwrap();
        let b = alloc.next_id().unwrap();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn global_ids_are_unique() {
        let a = allocate().unwrap();
        let b = allocate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn construct_ref_kind_and_display() {
        let id = ConstructId::new(7).unwrap();
        let name: ConstructRef = NameId::from_id(id).into();
        assert_eq!(name.kind(), ConstructKind::Name);
        assert_eq!(name.id(), id);
        assert_eq!(name.to_string(), "name#7");
        assert!(name.as_topic().is_none());

        let topic: ConstructRef = TopicId::from_id(id).into();
        assert_eq!(topic.as_topic(), Some(TopicId::from_id(id)));
    }
}
