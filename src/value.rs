//! Dynamically typed value box used at every member-access boundary.
//!
//! Arguments, field values, and invocation results cross the access surface as [`Value`], a thin
//! wrapper around `Box<dyn Any + Send + Sync>`. The wrapper exists so that downcasting, runtime
//! type inspection, and the erased registry lookup live in one place instead of being repeated at
//! each call site.

use std::any::{Any, TypeId};
use std::fmt;

use crate::typesystem::{TypeInfo, TypeRegistry};

/// A boxed value of some runtime type.
///
/// Values are the unit of exchange for member access: method arguments arrive as a `Vec<Value>`,
/// field reads produce a `Value` holding a clone of the field, and constructors return the new
/// instance as a `Value`.
///
/// # Examples
///
/// ```rust
/// use typescope::Value;
///
/// let value = Value::new(42i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast::<i32>().unwrap(), 42);
/// ```
pub struct Value(Box<dyn Any + Send + Sync>);

impl Value {
    /// Box a concrete value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Value(Box::new(value))
    }

    /// The unit value, used as the result of members that return nothing.
    #[must_use]
    pub fn unit() -> Self {
        Value::new(())
    }

    /// The runtime type id of the boxed value.
    #[must_use]
    pub fn id(&self) -> TypeId {
        (*self.0).type_id()
    }

    /// Check whether the boxed value is of type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Check whether the boxed value is the unit value.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.is::<()>()
    }

    /// Take the value out as `T`, returning `self` unchanged on type mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Value> {
        match self.0.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(original) => Err(Value(original)),
        }
    }

    /// Borrow the value as `T`, or `None` on type mismatch.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Mutably borrow the value as `T`, or `None` on type mismatch.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.downcast_mut::<T>()
    }

    /// Borrow the boxed value as a type-erased reference.
    #[must_use]
    pub fn as_any(&self) -> &dyn Any {
        &*self.0
    }

    /// Mutably borrow the boxed value as a type-erased reference.
    pub fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut *self.0
    }

    /// The descriptor of the boxed value's runtime type, if that type has been registered.
    ///
    /// This is the erased view: the lookup goes through the runtime type id alone, so the result
    /// carries exactly the generic information the registration declared, or `None` for types
    /// never seen by the registry.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeInfo> {
        TypeRegistry::global().get_by_id(self.id())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_info() {
            Some(info) => write!(f, "Value({info})"),
            None => write!(f, "Value(<unregistered>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let value = Value::new(7u64);
        assert!(value.is::<u64>());
        assert!(!value.is::<i64>());
        assert_eq!(value.downcast::<u64>().unwrap(), 7);
    }

    #[test]
    fn test_downcast_mismatch_returns_value() {
        let value = Value::new("text".to_string());
        let value = value.downcast::<i32>().unwrap_err();
        assert_eq!(value.downcast::<String>().unwrap(), "text");
    }

    #[test]
    fn test_unit() {
        let value = Value::unit();
        assert!(value.is_unit());
    }

    #[test]
    fn test_downcast_ref_and_mut() {
        let mut value = Value::new(vec![1, 2, 3]);
        assert_eq!(value.downcast_ref::<Vec<i32>>().unwrap().len(), 3);
        value.downcast_mut::<Vec<i32>>().unwrap().push(4);
        assert_eq!(value.downcast::<Vec<i32>>().unwrap(), vec![1, 2, 3, 4]);
    }
}
