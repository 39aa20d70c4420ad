//! Built-in primitive kinds, widening conversions, and registrations for standard types.
//!
//! The conversion rules are deliberately lossless: an argument or field value widens into a
//! larger numeric type exactly when every value of the source fits the destination. Lossy
//! conversions (such as `i64` into `f64`, or anything involving the platform-sized integers)
//! are rejected and surface as argument mismatches.

use std::any::TypeId;
use std::collections::HashMap;

use crate::typesystem::{Reflected, TypeBuilder, TypeInfo};
use crate::Value;

/// Kinds of built-in primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveKind {
    /// The unit type, produced by members that return nothing.
    Unit,
    /// Boolean truth value.
    Bool,
    /// Unicode scalar value.
    Char,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
    /// Pointer-sized signed integer.
    ISize,
    /// Pointer-sized unsigned integer.
    USize,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
}

impl PrimitiveKind {
    /// The primitive kind of a runtime type id, if it is one of the built-in primitives.
    #[must_use]
    pub fn of_id(id: TypeId) -> Option<PrimitiveKind> {
        if id == TypeId::of::<()>() {
            Some(PrimitiveKind::Unit)
        } else if id == TypeId::of::<bool>() {
            Some(PrimitiveKind::Bool)
        } else if id == TypeId::of::<char>() {
            Some(PrimitiveKind::Char)
        } else if id == TypeId::of::<i8>() {
            Some(PrimitiveKind::I8)
        } else if id == TypeId::of::<u8>() {
            Some(PrimitiveKind::U8)
        } else if id == TypeId::of::<i16>() {
            Some(PrimitiveKind::I16)
        } else if id == TypeId::of::<u16>() {
            Some(PrimitiveKind::U16)
        } else if id == TypeId::of::<i32>() {
            Some(PrimitiveKind::I32)
        } else if id == TypeId::of::<u32>() {
            Some(PrimitiveKind::U32)
        } else if id == TypeId::of::<i64>() {
            Some(PrimitiveKind::I64)
        } else if id == TypeId::of::<u64>() {
            Some(PrimitiveKind::U64)
        } else if id == TypeId::of::<isize>() {
            Some(PrimitiveKind::ISize)
        } else if id == TypeId::of::<usize>() {
            Some(PrimitiveKind::USize)
        } else if id == TypeId::of::<f32>() {
            Some(PrimitiveKind::F32)
        } else if id == TypeId::of::<f64>() {
            Some(PrimitiveKind::F64)
        } else {
            None
        }
    }

    /// Check whether a value of this kind losslessly widens into `target`.
    #[must_use]
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::{F32, F64, I16, I32, I64, U16, U32, U64, U8};

        match self {
            PrimitiveKind::I8 => matches!(target, I16 | I32 | I64 | F32 | F64),
            U8 => matches!(target, U16 | U32 | U64 | I16 | I32 | I64 | F32 | F64),
            I16 => matches!(target, I32 | I64 | F32 | F64),
            U16 => matches!(target, U32 | U64 | I32 | I64 | F32 | F64),
            I32 => matches!(target, I64 | F64),
            U32 => matches!(target, U64 | I64 | F64),
            F32 => matches!(target, F64),
            _ => false,
        }
    }
}

fn integer_of(value: &Value) -> Option<i128> {
    let kind = PrimitiveKind::of_id(value.id())?;
    match kind {
        PrimitiveKind::I8 => value.downcast_ref::<i8>().map(|v| i128::from(*v)),
        PrimitiveKind::U8 => value.downcast_ref::<u8>().map(|v| i128::from(*v)),
        PrimitiveKind::I16 => value.downcast_ref::<i16>().map(|v| i128::from(*v)),
        PrimitiveKind::U16 => value.downcast_ref::<u16>().map(|v| i128::from(*v)),
        PrimitiveKind::I32 => value.downcast_ref::<i32>().map(|v| i128::from(*v)),
        PrimitiveKind::U32 => value.downcast_ref::<u32>().map(|v| i128::from(*v)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integer_to(target: PrimitiveKind, value: i128) -> Option<Value> {
    // Only reachable through a widens_to-approved pair, so the casts cannot truncate.
    match target {
        PrimitiveKind::I16 => Some(Value::new(value as i16)),
        PrimitiveKind::U16 => Some(Value::new(value as u16)),
        PrimitiveKind::I32 => Some(Value::new(value as i32)),
        PrimitiveKind::U32 => Some(Value::new(value as u32)),
        PrimitiveKind::I64 => Some(Value::new(value as i64)),
        PrimitiveKind::U64 => Some(Value::new(value as u64)),
        PrimitiveKind::F32 => Some(Value::new(value as f32)),
        PrimitiveKind::F64 => Some(Value::new(value as f64)),
        _ => None,
    }
}

/// Widen a primitive value into the target kind.
///
/// Returns the value unchanged when it already is of the target kind, the widened value for an
/// approved lossless pair, and the original value as the error otherwise.
pub(crate) fn widen(value: Value, target: PrimitiveKind) -> Result<Value, Value> {
    let Some(source) = PrimitiveKind::of_id(value.id()) else {
        return Err(value);
    };
    if source == target {
        return Ok(value);
    }
    if !source.widens_to(target) {
        return Err(value);
    }

    if source == PrimitiveKind::F32 {
        return match value.downcast::<f32>() {
            Ok(v) => Ok(Value::new(f64::from(v))),
            Err(original) => Err(original),
        };
    }

    match integer_of(&value).and_then(|v| integer_to(target, v)) {
        Some(widened) => Ok(widened),
        None => Err(value),
    }
}

/// Bring a value to the declared type, widening primitives when needed.
///
/// Exact type matches pass through untouched. A primitive destination accepts any value whose
/// kind losslessly widens into it. Everything else is a mismatch, with the original value
/// returned as the error.
pub(crate) fn coerce(value: Value, expected: &TypeInfo) -> Result<Value, Value> {
    if value.id() == expected.raw_id() {
        return Ok(value);
    }
    match expected.kind().as_primitive() {
        Some(kind) => widen(value, kind),
        None => Err(value),
    }
}

macro_rules! primitive_reflected {
    ($($ty:ty => $kind:ident, $name:literal;)+) => {$(
        impl Reflected for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::resolve::<$ty>(|| {
                    TypeBuilder::<$ty>::primitive($name, PrimitiveKind::$kind)
                        .allocatable()
                        .build()
                })
            }
        }
    )+};
}

primitive_reflected! {
    () => Unit, "unit";
    bool => Bool, "bool";
    char => Char, "char";
    i8 => I8, "i8";
    u8 => U8, "u8";
    i16 => I16, "i16";
    u16 => U16, "u16";
    i32 => I32, "i32";
    u32 => U32, "u32";
    i64 => I64, "i64";
    u64 => U64, "u64";
    isize => ISize, "isize";
    usize => USize, "usize";
    f32 => F32, "f32";
    f64 => F64, "f64";
}

impl Reflected for String {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<String>(|| {
            TypeBuilder::<String>::new("String")
                .allocatable()
                .constructor(String::new)
                .build()
        })
    }
}

impl<T: Reflected> Reflected for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Vec<T>>(|| {
            TypeBuilder::<Vec<T>>::array("Vec")
                .component::<T>()
                .generic::<T>()
                .allocatable()
                .build()
        })
    }
}

impl<T: Reflected, const N: usize> Reflected for [T; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<[T; N]>(|| {
            TypeBuilder::<[T; N]>::array("Array")
                .component::<T>()
                .build()
        })
    }
}

impl<T: Reflected> Reflected for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Option<T>>(|| {
            TypeBuilder::<Option<T>>::new("Option")
                .generic::<T>()
                .allocatable()
                .build()
        })
    }
}

impl<T: Reflected> Reflected for Box<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Box<T>>(|| {
            TypeBuilder::<Box<T>>::new("Box").generic::<T>().build()
        })
    }
}

impl<K, V> Reflected for HashMap<K, V>
where
    K: Reflected + Eq + std::hash::Hash,
    V: Reflected,
{
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<HashMap<K, V>>(|| {
            TypeBuilder::<HashMap<K, V>>::new("HashMap")
                .generic::<K>()
                .generic::<V>()
                .allocatable()
                .build()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_id() {
        assert_eq!(PrimitiveKind::of_id(TypeId::of::<i32>()), Some(PrimitiveKind::I32));
        assert_eq!(PrimitiveKind::of_id(TypeId::of::<()>()), Some(PrimitiveKind::Unit));
        assert_eq!(PrimitiveKind::of_id(TypeId::of::<String>()), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(PrimitiveKind::I32.to_string(), "i32");
        assert_eq!(PrimitiveKind::USize.to_string(), "usize");
        assert_eq!(PrimitiveKind::Unit.to_string(), "unit");
    }

    #[test]
    fn test_widening_is_lossless_only() {
        assert!(PrimitiveKind::I8.widens_to(PrimitiveKind::I64));
        assert!(PrimitiveKind::U8.widens_to(PrimitiveKind::I16));
        assert!(PrimitiveKind::I32.widens_to(PrimitiveKind::F64));
        assert!(PrimitiveKind::F32.widens_to(PrimitiveKind::F64));

        assert!(!PrimitiveKind::I64.widens_to(PrimitiveKind::I32));
        assert!(!PrimitiveKind::I32.widens_to(PrimitiveKind::F32));
        assert!(!PrimitiveKind::I64.widens_to(PrimitiveKind::F64));
        assert!(!PrimitiveKind::USize.widens_to(PrimitiveKind::U64));
        assert!(!PrimitiveKind::Bool.widens_to(PrimitiveKind::I32));
    }

    #[test]
    fn test_widen_values() {
        let widened = widen(Value::new(5i8), PrimitiveKind::I64).unwrap();
        assert_eq!(widened.downcast::<i64>().unwrap(), 5);

        let widened = widen(Value::new(7u16), PrimitiveKind::F64).unwrap();
        assert!((widened.downcast::<f64>().unwrap() - 7.0).abs() < f64::EPSILON);

        let same = widen(Value::new(9i32), PrimitiveKind::I32).unwrap();
        assert_eq!(same.downcast::<i32>().unwrap(), 9);

        let rejected = widen(Value::new(9i64), PrimitiveKind::I32).unwrap_err();
        assert_eq!(rejected.downcast::<i64>().unwrap(), 9);
    }

    #[test]
    fn test_coerce_against_descriptor() {
        let long = TypeInfo::of::<i64>();
        let coerced = coerce(Value::new(3i32), &long).unwrap();
        assert_eq!(coerced.downcast::<i64>().unwrap(), 3);

        let string = TypeInfo::of::<String>();
        let rejected = coerce(Value::new(3i32), &string).unwrap_err();
        assert!(rejected.is::<i32>());
    }

    #[test]
    fn test_primitive_registrations() {
        let info = TypeInfo::of::<i32>();
        assert!(info.is_primitive());
        assert_eq!(info.kind().as_primitive(), Some(PrimitiveKind::I32));

        let allocated = info.allocate().unwrap();
        assert_eq!(allocated.downcast::<i32>().unwrap(), 0);
    }

    #[test]
    fn test_array_registration_has_no_allocator() {
        let info = TypeInfo::of::<[i32; 3]>();
        assert!(info.is_array());
        assert!(info.allocate().is_err());
    }
}
