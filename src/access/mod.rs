//! Member access surface: capability traits, strategies, and the access facade.
//!
//! Every member is reachable through two interchangeable strategies with identical observable
//! behavior:
//!
//! - **Reflective** ([`reflection`]): works for any registered type with no setup cost, paying
//!   per-call signature validation and argument conversion.
//! - **Generated** ([`generated`]): decorates the reflective objects and replaces method
//!   invocation with a lazily compiled trampoline, cached process-wide per member signature.
//!
//! The facade entry points are [`reflect`], [`unreflect`], and the matching methods on
//! [`TypeInfo`]. A facade result applies its strategy uniformly to every member it exposes.
//!
//! # Examples
//!
//! ```rust
//! use typescope::{Reflected, TypeBuilder, TypeInfo, Value};
//!
//! #[derive(Default, Clone)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Reflected for Point {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::resolve::<Point>(|| {
//!             TypeBuilder::<Point>::new("Point")
//!                 .allocatable()
//!                 .field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x)
//!                 .field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)
//!                 .build()
//!         })
//!     }
//! }
//!
//! let access = typescope::reflect::<Point>();
//! let point = Point { x: 3, y: 4 };
//! let x = access.field("x").unwrap().get(&point).unwrap();
//! assert_eq!(x.downcast::<i32>().unwrap(), 3);
//! ```

pub mod generated;
pub mod reflection;
pub mod trampoline;

use std::any::Any;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::typesystem::{primitives, Reflected, Token, TypeInfo, Visibility};
use crate::{Error, Result, Value};

use generated::GeneratedClassAccess;
use reflection::ReflectionClassAccess;
use trampoline::TrampolineCache;

/// Shared handle to a class-level access object.
pub type ClassAccessRc = Arc<dyn ClassAccess>;
/// Shared handle to a field access object.
pub type FieldAccessRc = Arc<dyn FieldAccess>;
/// Shared handle to a method access object.
pub type MethodAccessRc = Arc<dyn MethodAccess>;
/// Shared handle to a constructor access object.
pub type ConstructorAccessRc = Arc<dyn ConstructorAccess>;

/// The access strategy behind an access object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Strategy {
    /// Universal per-call dispatch with no setup cost.
    Reflective,
    /// Cached direct-call trampolines, compiled lazily per member signature.
    Generated,
}

/// Capabilities common to every member access object.
pub trait MemberAccess: Send + Sync {
    /// Effective name of the member, with display-name annotations applied.
    fn name(&self) -> &str;
    /// The type declaring the member, if still registered.
    fn declaring_type(&self) -> Option<TypeInfo>;
    /// Declared visibility. Metadata only; access is never blocked by it.
    fn visibility(&self) -> Visibility;
}

/// Read and write access to one field.
pub trait FieldAccess: MemberAccess {
    /// Declared type of the field's value.
    fn field_type(&self) -> TypeInfo;
    /// Check whether writes through this field are rejected.
    fn is_read_only(&self) -> bool;
    /// Read the field from a target instance. The result is a clone of the field's contents.
    fn get(&self, target: &dyn Any) -> Result<Value>;
    /// Write the field on a target instance, widening primitive values when needed.
    fn set(&self, target: &mut dyn Any, value: Value) -> Result<()>;
    /// The reflective view of this field.
    fn reflect(&self) -> FieldAccessRc;
    /// The generated view of this field.
    fn unreflect(&self) -> FieldAccessRc;
}

/// Invocation access to one method.
pub trait MethodAccess: MemberAccess {
    /// Declared parameter types, in order.
    fn parameter_types(&self) -> Vec<TypeInfo>;
    /// Declared return type.
    fn return_type(&self) -> TypeInfo;
    /// Check whether the method is unbound. Unbound methods ignore the call target.
    fn is_static(&self) -> bool;
    /// Invoke the method on a target with the given arguments.
    fn invoke(&self, target: Option<&mut dyn Any>, args: Vec<Value>) -> Result<Value>;
    /// The reflective view of this method.
    fn reflect(&self) -> MethodAccessRc;
    /// The generated view of this method.
    fn unreflect(&self) -> MethodAccessRc;
}

/// Instantiation access to one constructor.
pub trait ConstructorAccess: MemberAccess {
    /// Declared parameter types, in order.
    fn parameter_types(&self) -> Vec<TypeInfo>;
    /// Run the constructor with the given arguments and return the new instance.
    fn create(&self, args: Vec<Value>) -> Result<Value>;
    /// The reflective view of this constructor.
    fn reflect(&self) -> ConstructorAccessRc;
    /// The generated view of this constructor.
    fn unreflect(&self) -> ConstructorAccessRc;
}

/// Class-level access to every registered member of one type, under one strategy.
pub trait ClassAccess: Send + Sync {
    /// Descriptor of the accessed type.
    fn type_info(&self) -> TypeInfo;
    /// The strategy this access object applies to all of its members.
    fn strategy(&self) -> Strategy;
    /// Access objects for all registered fields, in declaration order.
    fn fields(&self) -> Vec<FieldAccessRc>;
    /// Access objects for all registered methods, in declaration order.
    fn methods(&self) -> Vec<MethodAccessRc>;
    /// Access objects for all registered constructors, in declaration order.
    fn constructors(&self) -> Vec<ConstructorAccessRc>;
    /// Field access by effective name.
    fn field(&self, name: &str) -> Option<FieldAccessRc>;
    /// Method access by effective name. The first declaration wins on duplicates.
    fn method(&self, name: &str) -> Option<MethodAccessRc>;
    /// Constructor access by parameter count.
    fn constructor(&self, arity: usize) -> Option<ConstructorAccessRc>;
    /// Instantiate through the first constructor compatible with the given arguments.
    fn create(&self, args: Vec<Value>) -> Result<Value>;
    /// Produce an instance without running any constructor.
    fn allocate(&self) -> Result<Value>;
    /// The reflective view of this class access.
    fn reflect(&self) -> ClassAccessRc;
    /// The generated view of this class access.
    fn unreflect(&self) -> ClassAccessRc;
}

/// Validate arity and convert every argument to its declared parameter type.
///
/// Shared by both strategies so that argument handling is observably identical; the generated
/// strategy merely captures the resolved parameter list once instead of resolving it per call.
pub(crate) fn prepare_args(
    member: &str,
    params: &[TypeInfo],
    args: Vec<Value>,
) -> Result<Vec<Value>> {
    if args.len() != params.len() {
        return Err(Error::ArgumentMismatch(format!(
            "'{member}' expects {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    args.into_iter()
        .zip(params)
        .enumerate()
        .map(|(index, (value, param))| {
            primitives::coerce(value, param).map_err(|_| {
                Error::ArgumentMismatch(format!(
                    "argument {index} of '{member}' has an incompatible type"
                ))
            })
        })
        .collect()
}

/// Check argument compatibility without consuming the argument values.
pub(crate) fn args_compatible(params: &[TypeInfo], args: &[Value]) -> bool {
    if args.len() != params.len() {
        return false;
    }
    args.iter().zip(params).all(|(value, param)| {
        if value.id() == param.raw_id() {
            return true;
        }
        match (
            crate::typesystem::PrimitiveKind::of_id(value.id()),
            param.kind().as_primitive(),
        ) {
            (Some(source), Some(target)) => source.widens_to(target),
            _ => false,
        }
    })
}

fn class_cache() -> &'static DashMap<(Token, Strategy), ClassAccessRc> {
    static CACHE: OnceLock<DashMap<(Token, Strategy), ClassAccessRc>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

impl TypeInfo {
    /// Class-level access to this type under the reflective strategy.
    #[must_use]
    pub fn reflect(&self) -> ClassAccessRc {
        class_cache()
            .entry((self.token(), Strategy::Reflective))
            .or_insert_with(|| Arc::new(ReflectionClassAccess::new(self.clone())) as ClassAccessRc)
            .clone()
    }

    /// Class-level access to this type under the generated strategy, backed by the process-wide
    /// trampoline cache.
    #[must_use]
    pub fn unreflect(&self) -> ClassAccessRc {
        class_cache()
            .entry((self.token(), Strategy::Generated))
            .or_insert_with(|| {
                Arc::new(GeneratedClassAccess::new(
                    ReflectionClassAccess::new(self.clone()),
                    TrampolineCache::global(),
                )) as ClassAccessRc
            })
            .clone()
    }

    /// Class-level access under the generated strategy with a caller-supplied trampoline cache.
    ///
    /// This is the injection point for custom invoker backends; the result bypasses the facade
    /// cache so that different backends never observe each other's trampolines.
    #[must_use]
    pub fn unreflect_with(&self, cache: Arc<TrampolineCache>) -> ClassAccessRc {
        Arc::new(GeneratedClassAccess::new(
            ReflectionClassAccess::new(self.clone()),
            cache,
        ))
    }
}

/// Class-level access to `T` under the reflective strategy.
#[must_use]
pub fn reflect<T: Reflected>() -> ClassAccessRc {
    T::type_info().reflect()
}

/// Class-level access to `T` under the generated strategy.
#[must_use]
pub fn unreflect<T: Reflected>() -> ClassAccessRc {
    T::type_info().unreflect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_args_arity_error() {
        let params = [TypeInfo::of::<i32>(), TypeInfo::of::<i32>()];
        let err = prepare_args("add", &params, vec![Value::new(1i32)]).unwrap_err();
        assert!(matches!(err, Error::ArgumentMismatch(_)));
        assert!(err.to_string().contains("expects 2 arguments, got 1"));
    }

    #[test]
    fn test_prepare_args_widens() {
        let params = [TypeInfo::of::<i64>()];
        let args = prepare_args("push", &params, vec![Value::new(5i8)]).unwrap();
        assert_eq!(args[0].downcast_ref::<i64>(), Some(&5));
    }

    #[test]
    fn test_prepare_args_rejects_incompatible() {
        let params = [TypeInfo::of::<String>()];
        let err = prepare_args("rename", &params, vec![Value::new(5i8)]).unwrap_err();
        assert!(err.to_string().contains("argument 0"));
    }

    #[test]
    fn test_args_compatible() {
        let params = [TypeInfo::of::<i64>(), TypeInfo::of::<String>()];
        let args = vec![Value::new(1i32), Value::new("x".to_string())];
        assert!(args_compatible(&params, &args));

        let wrong = vec![Value::new("x".to_string()), Value::new(1i32)];
        assert!(!args_compatible(&params, &wrong));
        assert!(!args_compatible(&params, &[]));
    }

    #[test]
    fn test_facade_cache_reuses_class_access() {
        let int = TypeInfo::of::<i32>();
        let first = int.reflect();
        let second = int.reflect();
        assert!(Arc::ptr_eq(&first, &second));

        let generated = int.unreflect();
        assert_eq!(generated.strategy(), Strategy::Generated);
        assert_eq!(first.strategy(), Strategy::Reflective);
    }
}
