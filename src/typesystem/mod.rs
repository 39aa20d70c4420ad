//! Runtime type model: descriptors, registration, and hierarchy navigation.
//!
//! This module provides the complete type model of the library. Types opt in by implementing
//! [`Reflected`], whose body uses a [`TypeBuilder`] to declare members, the supertype, implemented
//! interfaces, and generic arguments. The resulting [`TypeInfo`] descriptors are canonical,
//! structurally comparable, and owned for the process lifetime by the global [`TypeRegistry`].
//!
//! # Key Components
//!
//! - [`TypeInfo`]: Canonical descriptor of a registered type
//! - [`TypeRegistry`]: Process-wide registry with token and name indices
//! - [`TypeBuilder`]: Registration entry point used inside `Reflected` implementations
//! - [`Field`], [`Method`], [`Constructor`]: Shared member descriptors
//! - [`PrimitiveKind`]: Built-in primitives and their widening conversions
//!
//! # Generic Resolution and Erasure
//!
//! A registration declares its generic arguments explicitly, so a descriptor obtained from a
//! static type carries the full parameterization and [`TypeInfo::generic_type`] can be chained to
//! any depth. Descriptors reached through `&dyn Any` values carry exactly what their registration
//! declared; a registration that declared nothing, or a type never registered, is the erased
//! case and yields an empty generic sequence rather than an error.
//!
//! # Examples
//!
//! ```rust
//! use typescope::TypeInfo;
//! use std::collections::HashMap;
//!
//! let map = TypeInfo::of::<HashMap<String, Vec<i32>>>();
//! let values = map.generic_type(1).unwrap();
//! assert_eq!(values.to_string(), "i32[]");
//! assert_eq!(values.generic_type(0).unwrap().name(), "i32");
//! ```

mod base;
mod builder;
mod members;
pub(crate) mod primitives;
mod registry;

pub use base::{SubTypes, SuperTypes, TypeKind, TypeRef};
pub use builder::{Factory, FallibleInstanceMethod, InstanceMethod, StaticMethod, TypeBuilder};
pub use members::{
    CallError, Constructor, ConstructorRc, Field, FieldRc, MemberFlags, Method, MethodRc,
    RawFactory, RawGetter, RawInvoker, RawSetter, Visibility,
};
pub use primitives::PrimitiveKind;
pub use registry::{Token, TypeRegistry};

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::{Error, Result, Value};

/// Raw constructor-bypassing initializer registered per type.
pub(crate) type Allocator = Box<dyn Fn() -> Value + Send + Sync>;

/// A type that has registered itself with the type model.
///
/// Implementations describe the type once through a [`TypeBuilder`] and hand out the descriptor.
/// Registration is lazy and idempotent: the registry deduplicates by runtime type id, so calling
/// [`Reflected::type_info`] from multiple threads or call sites yields equal descriptors.
///
/// # Examples
///
/// ```rust
/// use typescope::{Reflected, TypeBuilder, TypeInfo};
///
/// #[derive(Default, Clone)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Reflected for Point {
///     fn type_info() -> TypeInfo {
///         TypeInfo::resolve::<Point>(|| {
///             TypeBuilder::<Point>::new("Point")
///                 .allocatable()
///                 .field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x)
///                 .field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)
///                 .build()
///         })
///     }
/// }
///
/// assert_eq!(Point::type_info().name(), "Point");
/// ```
pub trait Reflected: Any + Send + Sync {
    /// Descriptor for this type, registering it on first use.
    fn type_info() -> TypeInfo
    where
        Self: Sized;
}

/// Immutable metadata of one registered type. Owned by the registry, shared through [`TypeInfo`].
pub(crate) struct TypeMeta {
    pub(crate) token: Token,
    pub(crate) id: TypeId,
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    /// Supertype reference. Absent exactly at the hierarchy root.
    pub(crate) base: Option<TypeRef>,
    pub(crate) interfaces: Vec<TypeRef>,
    pub(crate) generics: Vec<TypeInfo>,
    pub(crate) component: Option<TypeInfo>,
    pub(crate) fields: Vec<FieldRc>,
    pub(crate) methods: Vec<MethodRc>,
    pub(crate) constructors: Vec<ConstructorRc>,
    pub(crate) allocator: Option<Allocator>,
}

/// Canonical descriptor of a (possibly generic) registered type.
///
/// Descriptors are cheap to clone and freely shareable. Equality and hashing are structural:
/// two descriptors compare equal exactly when they represent the same runtime type, regardless
/// of where or how they were obtained.
///
/// # Examples
///
/// ```rust
/// use typescope::TypeInfo;
///
/// let a = TypeInfo::of::<Vec<i32>>();
/// let b = TypeInfo::of_value(&vec![1, 2, 3]);
/// assert_eq!(a, b);
/// assert!(a.is_array());
/// assert_eq!(a.component_type().unwrap().name(), "i32");
/// ```
#[derive(Clone)]
pub struct TypeInfo {
    meta: Arc<TypeMeta>,
}

impl TypeInfo {
    pub(crate) fn from_meta(meta: Arc<TypeMeta>) -> Self {
        TypeInfo { meta }
    }

    pub(crate) fn downgrade(&self) -> Weak<TypeMeta> {
        Arc::downgrade(&self.meta)
    }

    /// Descriptor of a registered type, given statically.
    ///
    /// This is the normalization entry point for both plain and parameterized static types;
    /// `TypeInfo::of::<Vec<i32>>()` resolves the full parameterization.
    #[must_use]
    pub fn of<T: Reflected>() -> TypeInfo {
        T::type_info()
    }

    /// Descriptor of a value's runtime type.
    #[must_use]
    pub fn of_value<T: Reflected>(_value: &T) -> TypeInfo {
        T::type_info()
    }

    /// Descriptor for a type-erased value, looked up by runtime type id.
    ///
    /// This is the erased path: it can only see what a prior registration declared, and returns
    /// `None` for types the registry has never seen.
    #[must_use]
    pub fn from_any(value: &dyn Any) -> Option<TypeInfo> {
        TypeRegistry::global().get_by_id(value.type_id())
    }

    /// Look up `T` in the registry, running `init` to register it on first use.
    ///
    /// The standard body of a [`Reflected::type_info`] implementation.
    pub fn resolve<T: Any>(init: impl FnOnce() -> TypeInfo) -> TypeInfo {
        match TypeRegistry::global().get_by_id(TypeId::of::<T>()) {
            Some(info) => info,
            None => init(),
        }
    }

    /// Registry token of this type.
    #[must_use]
    pub fn token(&self) -> Token {
        self.meta.token
    }

    /// Runtime type id of the underlying type.
    #[must_use]
    pub fn raw_id(&self) -> TypeId {
        self.meta.id
    }

    /// Simple (unqualified) name of the type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The kind of type this descriptor represents.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.meta.kind
    }

    /// Check if this is a primitive type.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.meta.kind.is_primitive()
    }

    /// Check if this is an array type.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.meta.kind.is_array()
    }

    /// Check if this is an abstract capability type.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.meta.kind.is_interface()
    }

    /// The immediate supertype, or `None` exactly at the hierarchy root.
    #[must_use]
    pub fn super_type(&self) -> Option<TypeInfo> {
        self.meta.base.as_ref().and_then(TypeRef::upgrade)
    }

    /// The supertype at the given depth, where depth 0 is the immediate supertype.
    ///
    /// Returns `None` when the index walks past the hierarchy root.
    #[must_use]
    pub fn super_type_at(&self, index: usize) -> Option<TypeInfo> {
        self.super_types().nth(index)
    }

    /// Lazily iterate the supertype chain, ending at the hierarchy root.
    #[must_use]
    pub fn super_types(&self) -> SuperTypes {
        SuperTypes::new(self)
    }

    /// Breadth-first sequence of every type this one is assignable to, starting with itself.
    ///
    /// Covers the full supertype and interface DAG, deduplicated, in a stable order.
    #[must_use]
    pub fn sub_types(&self) -> SubTypes {
        SubTypes::new(self)
    }

    /// Directly implemented interfaces, in declaration order.
    #[must_use]
    pub fn interfaces(&self) -> Vec<TypeInfo> {
        self.meta
            .interfaces
            .iter()
            .filter_map(TypeRef::upgrade)
            .collect()
    }

    /// Generic arguments of this type, in declared order.
    ///
    /// Empty when the type is not parameterized or the parameterization was erased; never an
    /// error.
    pub fn generic_types(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.meta.generics.iter().cloned()
    }

    /// The generic argument at the given slot, or `None` out of range.
    ///
    /// The result is itself a full descriptor, so calls chain to resolve nested generics at any
    /// depth.
    #[must_use]
    pub fn generic_type(&self, index: usize) -> Option<TypeInfo> {
        self.meta.generics.get(index).cloned()
    }

    /// The element type of an array type. Present exactly when [`TypeInfo::is_array`] is true.
    #[must_use]
    pub fn component_type(&self) -> Option<TypeInfo> {
        self.meta.component.clone()
    }

    /// Check whether this type is assignable from `other`.
    ///
    /// The check is covariant: a type matches itself, every subtype of itself, and every
    /// implementor of itself when it is an interface.
    #[must_use]
    pub fn matches(&self, other: &TypeInfo) -> bool {
        other.sub_types().any(|candidate| candidate == *self)
    }

    /// Check whether this type is assignable from the runtime type of a value.
    ///
    /// Unregistered value types never match.
    #[must_use]
    pub fn matches_value(&self, value: &dyn Any) -> bool {
        TypeInfo::from_any(value).is_some_and(|info| self.matches(&info))
    }

    /// Registered field descriptors, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldRc] {
        &self.meta.fields
    }

    /// Registered method descriptors, in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodRc] {
        &self.meta.methods
    }

    /// Registered constructor descriptors, in declaration order.
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorRc] {
        &self.meta.constructors
    }

    /// Produce a new instance of this type without running any constructor.
    ///
    /// The instance is exactly what the registered raw initializer yields: every declared field
    /// holds its default/zero value and no constructor side effect has occurred. Invariants that
    /// constructors normally establish do not hold until the caller sets the instance up
    /// manually.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] when the type registered no initializer, which includes interface
    /// types and abstract markers.
    pub fn allocate(&self) -> Result<Value> {
        match &self.meta.allocator {
            Some(allocator) => Ok(allocator()),
            None => Err(Error::Allocation {
                type_name: self.name().to_string(),
                reason: match self.meta.kind {
                    TypeKind::Interface => "interface types cannot be instantiated".to_string(),
                    _ => "no allocator registered for this type".to_string(),
                },
            }),
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.meta.id == other.meta.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.meta.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    /// Array types render as `Element[]`, everything else as the simple name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_array(), self.component_type()) {
            (true, Some(component)) => write!(f, "{component}[]"),
            _ => f.write_str(self.name()),
        }
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("token", &self.meta.token)
            .field("name", &self.meta.name)
            .field("kind", &self.meta.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_across_call_sites() {
        let a = TypeInfo::of::<Vec<i64>>();
        let b = TypeInfo::of::<Vec<i64>>();
        assert_eq!(a, b);
        assert_eq!(a.token(), b.token());

        let c = TypeInfo::of::<Vec<i32>>();
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(TypeInfo::of::<i32>().to_string(), "i32");
        assert_eq!(TypeInfo::of::<Vec<i32>>().to_string(), "i32[]");
        assert_eq!(TypeInfo::of::<Vec<Vec<bool>>>().to_string(), "bool[][]");
        assert_eq!(TypeInfo::of::<String>().to_string(), "String");
    }

    #[test]
    fn test_from_any_unregistered_is_none() {
        struct NeverRegistered;
        let value = NeverRegistered;
        assert!(TypeInfo::from_any(&value).is_none());
    }

    #[test]
    fn test_component_present_iff_array() {
        let array = TypeInfo::of::<Vec<u8>>();
        assert!(array.is_array());
        assert!(array.component_type().is_some());

        let plain = TypeInfo::of::<u8>();
        assert!(!plain.is_array());
        assert!(plain.component_type().is_none());
    }

    #[test]
    fn test_matches_is_covariant_not_equality() {
        let root = TypeRegistry::global().root();
        let int = TypeInfo::of::<i32>();

        assert!(root.matches(&int));
        assert!(!int.matches(&root));
        assert!(int.matches(&int));
    }

    #[test]
    fn test_super_type_walk_terminates_at_root() {
        let int = TypeInfo::of::<i32>();
        let root = TypeRegistry::global().root();

        let chain: Vec<TypeInfo> = int.super_types().collect();
        assert_eq!(chain.last(), Some(&root));
        assert!(root.super_type().is_none());
        assert_eq!(int.super_type_at(0), int.super_type());
    }

    #[test]
    fn test_generic_chaining() {
        use std::collections::HashMap;

        let map = TypeInfo::of::<HashMap<String, Vec<i32>>>();
        assert_eq!(map.generic_type(0).unwrap().name(), "String");

        let values = map.generic_type(1).unwrap();
        assert_eq!(values.generic_type(0).unwrap().name(), "i32");
        assert!(map.generic_type(2).is_none());
    }

    #[test]
    fn test_erased_generics_are_empty_not_error() {
        let plain = TypeInfo::of::<String>();
        assert_eq!(plain.generic_types().count(), 0);
        assert!(plain.generic_type(0).is_none());
    }
}
