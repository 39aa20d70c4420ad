//! Reflective access strategy.
//!
//! The universal implementation of the access capability set. Every operation goes through the
//! registered raw primitives after validating and converting arguments against the member
//! descriptors on each call. Nothing is precomputed, so access works for any registered type
//! with no setup cost; the per-call descriptor consultation is the price.
//!
//! This strategy is also the backing implementation that the generated strategy decorates.

use std::any::Any;
use std::sync::Arc;

use crate::access::{
    args_compatible, generated, prepare_args, ClassAccess, ClassAccessRc, ConstructorAccess,
    ConstructorAccessRc, FieldAccess, FieldAccessRc, MemberAccess, MethodAccess, MethodAccessRc,
    Strategy,
};
use crate::access::trampoline::TrampolineCache;
use crate::typesystem::{ConstructorRc, FieldRc, MethodRc, TypeInfo, Visibility};
use crate::{Error, Result, Value};

/// Reflective access to one field.
#[derive(Clone)]
pub struct ReflectionFieldAccess {
    field: FieldRc,
}

impl ReflectionFieldAccess {
    pub(crate) fn new(field: FieldRc) -> Self {
        ReflectionFieldAccess { field }
    }

    pub(crate) fn descriptor(&self) -> &FieldRc {
        &self.field
    }
}

impl MemberAccess for ReflectionFieldAccess {
    fn name(&self) -> &str {
        self.field.name()
    }

    fn declaring_type(&self) -> Option<TypeInfo> {
        self.field.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        self.field.visibility()
    }
}

impl FieldAccess for ReflectionFieldAccess {
    fn field_type(&self) -> TypeInfo {
        self.field.field_type()
    }

    fn is_read_only(&self) -> bool {
        self.field.is_read_only()
    }

    fn get(&self, target: &dyn Any) -> Result<Value> {
        self.field.get_raw(target)
    }

    fn set(&self, target: &mut dyn Any, value: Value) -> Result<()> {
        let field_type = self.field.field_type();
        let value = crate::typesystem::primitives::coerce(value, &field_type).map_err(|_| {
            Error::ArgumentMismatch(format!(
                "value for field '{}' has an incompatible type",
                self.field.name()
            ))
        })?;
        self.field.set_raw(target, value)
    }

    fn reflect(&self) -> FieldAccessRc {
        Arc::new(self.clone())
    }

    fn unreflect(&self) -> FieldAccessRc {
        Arc::new(generated::GeneratedFieldAccess::new(self.clone()))
    }
}

/// Reflective access to one method.
#[derive(Clone)]
pub struct ReflectionMethodAccess {
    method: MethodRc,
}

impl ReflectionMethodAccess {
    pub(crate) fn new(method: MethodRc) -> Self {
        ReflectionMethodAccess { method }
    }

    pub(crate) fn descriptor(&self) -> &MethodRc {
        &self.method
    }
}

impl MemberAccess for ReflectionMethodAccess {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn declaring_type(&self) -> Option<TypeInfo> {
        self.method.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        self.method.visibility()
    }
}

impl MethodAccess for ReflectionMethodAccess {
    fn parameter_types(&self) -> Vec<TypeInfo> {
        self.method.parameter_types()
    }

    fn return_type(&self) -> TypeInfo {
        self.method.return_type()
    }

    fn is_static(&self) -> bool {
        self.method.is_static()
    }

    fn invoke(&self, target: Option<&mut dyn Any>, args: Vec<Value>) -> Result<Value> {
        // The descriptor walk happens on every call; that is the whole strategy.
        let params = self.method.parameter_types();
        let args = prepare_args(self.method.name(), &params, args)?;
        self.method.invoke_raw(target, args)
    }

    fn reflect(&self) -> MethodAccessRc {
        Arc::new(self.clone())
    }

    fn unreflect(&self) -> MethodAccessRc {
        Arc::new(generated::GeneratedMethodAccess::new(
            self.clone(),
            TrampolineCache::global(),
        ))
    }
}

/// Reflective access to one constructor.
#[derive(Clone)]
pub struct ReflectionConstructorAccess {
    constructor: ConstructorRc,
}

impl ReflectionConstructorAccess {
    pub(crate) fn new(constructor: ConstructorRc) -> Self {
        ReflectionConstructorAccess { constructor }
    }
}

impl MemberAccess for ReflectionConstructorAccess {
    fn name(&self) -> &str {
        self.constructor.name()
    }

    fn declaring_type(&self) -> Option<TypeInfo> {
        self.constructor.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        self.constructor.visibility()
    }
}

impl ConstructorAccess for ReflectionConstructorAccess {
    fn parameter_types(&self) -> Vec<TypeInfo> {
        self.constructor.parameter_types()
    }

    fn create(&self, args: Vec<Value>) -> Result<Value> {
        let params = self.constructor.parameter_types();
        let args = prepare_args(self.constructor.name(), &params, args)?;
        self.constructor.create_raw(args)
    }

    fn reflect(&self) -> ConstructorAccessRc {
        Arc::new(self.clone())
    }

    fn unreflect(&self) -> ConstructorAccessRc {
        Arc::new(generated::GeneratedConstructorAccess::new(self.clone()))
    }
}

/// Reflective class-level access to every registered member of one type.
#[derive(Clone)]
pub struct ReflectionClassAccess {
    ty: TypeInfo,
}

impl ReflectionClassAccess {
    pub(crate) fn new(ty: TypeInfo) -> Self {
        ReflectionClassAccess { ty }
    }
}

impl ClassAccess for ReflectionClassAccess {
    fn type_info(&self) -> TypeInfo {
        self.ty.clone()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Reflective
    }

    fn fields(&self) -> Vec<FieldAccessRc> {
        self.ty
            .fields()
            .iter()
            .map(|f| Arc::new(ReflectionFieldAccess::new(f.clone())) as FieldAccessRc)
            .collect()
    }

    fn methods(&self) -> Vec<MethodAccessRc> {
        self.ty
            .methods()
            .iter()
            .map(|m| Arc::new(ReflectionMethodAccess::new(m.clone())) as MethodAccessRc)
            .collect()
    }

    fn constructors(&self) -> Vec<ConstructorAccessRc> {
        self.ty
            .constructors()
            .iter()
            .map(|c| Arc::new(ReflectionConstructorAccess::new(c.clone())) as ConstructorAccessRc)
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldAccessRc> {
        self.ty
            .fields()
            .iter()
            .find(|f| f.name() == name)
            .map(|f| Arc::new(ReflectionFieldAccess::new(f.clone())) as FieldAccessRc)
    }

    fn method(&self, name: &str) -> Option<MethodAccessRc> {
        self.ty
            .methods()
            .iter()
            .find(|m| m.name() == name)
            .map(|m| Arc::new(ReflectionMethodAccess::new(m.clone())) as MethodAccessRc)
    }

    fn constructor(&self, arity: usize) -> Option<ConstructorAccessRc> {
        self.ty
            .constructors()
            .iter()
            .find(|c| c.arity() == arity)
            .map(|c| Arc::new(ReflectionConstructorAccess::new(c.clone())) as ConstructorAccessRc)
    }

    fn create(&self, args: Vec<Value>) -> Result<Value> {
        let candidate = self.ty.constructors().iter().find(|c| {
            let params = c.parameter_types();
            args_compatible(&params, &args)
        });
        match candidate {
            Some(constructor) => {
                let params = constructor.parameter_types();
                let args = prepare_args(constructor.name(), &params, args)?;
                constructor.create_raw(args)
            }
            None => Err(Error::ArgumentMismatch(format!(
                "no constructor of '{}' accepts the given {} arguments",
                self.ty,
                args.len()
            ))),
        }
    }

    fn allocate(&self) -> Result<Value> {
        self.ty.allocate()
    }

    fn reflect(&self) -> ClassAccessRc {
        Arc::new(self.clone())
    }

    fn unreflect(&self) -> ClassAccessRc {
        Arc::new(generated::GeneratedClassAccess::new(
            self.clone(),
            TrampolineCache::global(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::{Reflected, TypeBuilder};

    #[derive(Default, Clone)]
    struct Gauge {
        level: i64,
    }

    impl Reflected for Gauge {
        fn type_info() -> TypeInfo {
            TypeInfo::resolve::<Gauge>(|| {
                TypeBuilder::<Gauge>::new("Gauge")
                    .allocatable()
                    .field("level", |g: &Gauge| &g.level, |g: &mut Gauge| &mut g.level)
                    .method("raise", |g: &mut Gauge, by: i64| {
                        g.level += by;
                        g.level
                    })
                    .constructor(|level: i64| Gauge { level })
                    .build()
            })
        }
    }

    #[test]
    fn test_field_get_set_with_widening() {
        let access = ReflectionClassAccess::new(Gauge::type_info());
        let field = access.field("level").unwrap();

        let mut gauge = Gauge { level: 10 };
        assert_eq!(field.get(&gauge).unwrap().downcast::<i64>().unwrap(), 10);

        // i32 widens into the declared i64 field type.
        field.set(&mut gauge, Value::new(32i32)).unwrap();
        assert_eq!(gauge.level, 32);

        let err = field.set(&mut gauge, Value::new("nope".to_string())).unwrap_err();
        assert!(matches!(err, Error::ArgumentMismatch(_)));
    }

    #[test]
    fn test_invoke_checks_target() {
        let access = ReflectionClassAccess::new(Gauge::type_info());
        let raise = access.method("raise").unwrap();

        let mut gauge = Gauge { level: 1 };
        let result = raise.invoke(Some(&mut gauge), vec![Value::new(4i64)]).unwrap();
        assert_eq!(result.downcast::<i64>().unwrap(), 5);

        let err = raise.invoke(None, vec![Value::new(4i64)]).unwrap_err();
        assert!(matches!(err, Error::ArgumentMismatch(_)));

        let mut not_a_gauge = 3i32;
        let err = raise
            .invoke(Some(&mut not_a_gauge), vec![Value::new(4i64)])
            .unwrap_err();
        assert!(matches!(err, Error::ArgumentMismatch(_)));
    }

    #[test]
    fn test_create_picks_compatible_constructor() {
        let access = ReflectionClassAccess::new(Gauge::type_info());

        let gauge = access.create(vec![Value::new(8i16)]).unwrap();
        assert_eq!(gauge.downcast::<Gauge>().unwrap().level, 8);

        let err = access.create(vec![Value::new("x".to_string())]).unwrap_err();
        assert!(matches!(err, Error::ArgumentMismatch(_)));
    }

    #[test]
    fn test_constructor_lookup_by_arity() {
        let access = ReflectionClassAccess::new(Gauge::type_info());
        assert!(access.constructor(1).is_some());
        assert!(access.constructor(3).is_none());
    }
}
