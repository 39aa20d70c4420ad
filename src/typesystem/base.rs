//! Core building blocks of the type model: weak type references, type kinds, and the lazily
//! evaluated hierarchy iterators.

use std::collections::{HashSet, VecDeque};
use std::sync::Weak;

use crate::typesystem::{PrimitiveKind, TypeInfo, TypeMeta};

/// A weak reference to a registered type.
///
/// Member descriptors point back at their declaring type and types point at their supertype.
/// Both edges use weak references so that the registry remains the only strong owner of type
/// metadata and reference cycles between a type and its members cannot keep each other alive.
#[derive(Clone)]
pub struct TypeRef {
    weak: Weak<TypeMeta>,
}

impl TypeRef {
    /// Create a reference from a strong descriptor.
    #[must_use]
    pub fn new(info: &TypeInfo) -> Self {
        TypeRef {
            weak: info.downgrade(),
        }
    }

    pub(crate) fn from_weak(weak: Weak<TypeMeta>) -> Self {
        TypeRef { weak }
    }

    /// A reference that will never resolve, used as a pre-registration placeholder.
    pub(crate) fn dangling() -> Self {
        TypeRef { weak: Weak::new() }
    }

    /// Get a strong descriptor for the referenced type, or `None` if it has been dropped.
    ///
    /// Types owned by the global registry live for the whole process, so `None` only occurs for
    /// placeholder references that were never wired up.
    #[must_use]
    pub fn upgrade(&self) -> Option<TypeInfo> {
        self.weak.upgrade().map(TypeInfo::from_meta)
    }

    /// Check if the referenced type is still alive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak.strong_count() > 0
    }
}

impl std::fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(info) => write!(f, "TypeRef({info})"),
            None => f.write_str("TypeRef(<dangling>)"),
        }
    }
}

impl From<TypeInfo> for TypeRef {
    fn from(info: TypeInfo) -> Self {
        TypeRef::new(&info)
    }
}

/// Classifies what flavor of type a descriptor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// The synthetic root of the type hierarchy. Every registered type eventually reaches it
    /// through the supertype chain; it has no supertype of its own.
    Any,
    /// A built-in primitive such as `i32` or `bool`.
    Primitive(PrimitiveKind),
    /// A concrete composite type with registered members.
    Struct,
    /// An abstract capability type. Interfaces carry no allocator and cannot be instantiated.
    Interface,
    /// An indexed sequence type with a component type.
    Array,
}

impl TypeKind {
    /// Check if this is a primitive type.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeKind::Primitive(_))
    }

    /// Check if this is an array type.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, TypeKind::Array)
    }

    /// Check if this is an abstract capability type.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        matches!(self, TypeKind::Interface)
    }

    /// The primitive kind, when this is a primitive type.
    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeKind::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Lazily walks the supertype chain of a type, one ancestor per step.
///
/// The sequence starts at the immediate supertype and ends at the hierarchy root, which is the
/// final element. It is finite for every registered type and restartable by calling
/// [`TypeInfo::super_types`] again.
pub struct SuperTypes {
    cursor: Option<TypeInfo>,
}

impl SuperTypes {
    pub(crate) fn new(start: &TypeInfo) -> Self {
        SuperTypes {
            cursor: start.super_type(),
        }
    }
}

impl Iterator for SuperTypes {
    type Item = TypeInfo;

    fn next(&mut self) -> Option<TypeInfo> {
        let current = self.cursor.take()?;
        self.cursor = current.super_type();
        Some(current)
    }
}

/// Breadth-first traversal over every type a descriptor is assignable to.
///
/// Unlike [`SuperTypes`] this walks the full supertype and interface DAG, flattened into a
/// deduplicated sequence. The order is fixed: the type itself first, then its supertype and
/// declared interfaces level by level, ending at the hierarchy root.
pub struct SubTypes {
    queue: VecDeque<TypeInfo>,
    seen: HashSet<std::any::TypeId>,
}

impl SubTypes {
    pub(crate) fn new(start: &TypeInfo) -> Self {
        let mut seen = HashSet::new();
        seen.insert(start.raw_id());
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        SubTypes { queue, seen }
    }
}

impl Iterator for SubTypes {
    type Item = TypeInfo;

    fn next(&mut self) -> Option<TypeInfo> {
        let current = self.queue.pop_front()?;

        let enqueue = |info: TypeInfo, queue: &mut VecDeque<TypeInfo>, seen: &mut HashSet<std::any::TypeId>| {
            if seen.insert(info.raw_id()) {
                queue.push_back(info);
            }
        };

        if let Some(base) = current.super_type() {
            enqueue(base, &mut self.queue, &mut self.seen);
        }
        for interface in current.interfaces() {
            enqueue(interface, &mut self.queue, &mut self.seen);
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_kind_predicates() {
        assert!(TypeKind::Primitive(PrimitiveKind::I32).is_primitive());
        assert!(!TypeKind::Struct.is_primitive());
        assert!(TypeKind::Array.is_array());
        assert!(TypeKind::Interface.is_interface());
        assert_eq!(
            TypeKind::Primitive(PrimitiveKind::Bool).as_primitive(),
            Some(PrimitiveKind::Bool)
        );
        assert_eq!(TypeKind::Any.as_primitive(), None);
    }

    #[test]
    fn test_dangling_ref() {
        let type_ref = TypeRef::dangling();
        assert!(!type_ref.is_valid());
        assert!(type_ref.upgrade().is_none());
    }
}
