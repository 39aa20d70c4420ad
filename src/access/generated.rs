//! Generated access strategy.
//!
//! Decorators over the reflective access objects. Each wrapper holds its reflective delegate and
//! forwards every capability to it explicitly, overriding only the operations it actually
//! changes: method invocation goes through a cached trampoline, and the strategy identity
//! reported by `reflect`/`unreflect` flips. Exhaustive manual forwarding keeps the wrappers
//! honest when the capability traits grow; a new trait method fails to compile here until a
//! forwarding decision is made.
//!
//! Trampolines exist for methods only. Field and constructor wrappers change nothing but their
//! reported identity, since their hot paths have no per-call signature analysis worth removing.
//!
//! A trampoline compilation failure surfaces as
//! [`Error::TrampolineCompilation`](crate::Error::TrampolineCompilation) and leaves the cache
//! untouched. There is no silent fallback to the reflective path: callers that need resilience
//! against backend failure must choose the reflective strategy explicitly, which keeps the
//! performance contract of this strategy observable.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use crate::access::reflection::{
    ReflectionClassAccess, ReflectionConstructorAccess, ReflectionFieldAccess,
    ReflectionMethodAccess,
};
use crate::access::trampoline::{Trampoline, TrampolineCache};
use crate::access::{
    ClassAccess, ClassAccessRc, ConstructorAccess, ConstructorAccessRc, FieldAccess,
    FieldAccessRc, MemberAccess, MethodAccess, MethodAccessRc, Strategy,
};
use crate::typesystem::{TypeInfo, Visibility};
use crate::{Result, Value};

/// Generated-strategy access to one field.
///
/// Field reads and writes have no trampoline; the wrapper forwards them unchanged and only
/// reports the generated identity.
#[derive(Clone)]
pub struct GeneratedFieldAccess {
    delegate: ReflectionFieldAccess,
}

impl GeneratedFieldAccess {
    pub(crate) fn new(delegate: ReflectionFieldAccess) -> Self {
        GeneratedFieldAccess { delegate }
    }
}

impl MemberAccess for GeneratedFieldAccess {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn declaring_type(&self) -> Option<TypeInfo> {
        self.delegate.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        self.delegate.visibility()
    }
}

impl FieldAccess for GeneratedFieldAccess {
    fn field_type(&self) -> TypeInfo {
        self.delegate.field_type()
    }

    fn is_read_only(&self) -> bool {
        self.delegate.is_read_only()
    }

    fn get(&self, target: &dyn Any) -> Result<Value> {
        self.delegate.get(target)
    }

    fn set(&self, target: &mut dyn Any, value: Value) -> Result<()> {
        self.delegate.set(target, value)
    }

    fn reflect(&self) -> FieldAccessRc {
        Arc::new(self.delegate.clone())
    }

    fn unreflect(&self) -> FieldAccessRc {
        Arc::new(self.clone())
    }
}

/// Generated-strategy access to one method.
///
/// Delegates everything to the wrapped reflective access except invocation, which dispatches
/// through a trampoline compiled on first use and shared process-wide by signature.
#[derive(Clone)]
pub struct GeneratedMethodAccess {
    delegate: ReflectionMethodAccess,
    cache: Arc<TrampolineCache>,
    slot: Arc<OnceLock<Trampoline>>,
}

impl GeneratedMethodAccess {
    pub(crate) fn new(delegate: ReflectionMethodAccess, cache: Arc<TrampolineCache>) -> Self {
        GeneratedMethodAccess {
            delegate,
            cache,
            slot: Arc::new(OnceLock::new()),
        }
    }

    fn trampoline(&self) -> Result<Trampoline> {
        if let Some(compiled) = self.slot.get() {
            return Ok(compiled.clone());
        }
        let compiled = self.cache.resolve(self.delegate.descriptor())?;
        let _ = self.slot.set(compiled.clone());
        Ok(compiled)
    }
}

impl MemberAccess for GeneratedMethodAccess {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn declaring_type(&self) -> Option<TypeInfo> {
        self.delegate.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        self.delegate.visibility()
    }
}

impl MethodAccess for GeneratedMethodAccess {
    fn parameter_types(&self) -> Vec<TypeInfo> {
        self.delegate.parameter_types()
    }

    fn return_type(&self) -> TypeInfo {
        self.delegate.return_type()
    }

    fn is_static(&self) -> bool {
        self.delegate.is_static()
    }

    fn invoke(&self, target: Option<&mut dyn Any>, args: Vec<Value>) -> Result<Value> {
        let trampoline = self.trampoline()?;
        (*trampoline)(target, args)
    }

    fn reflect(&self) -> MethodAccessRc {
        Arc::new(self.delegate.clone())
    }

    fn unreflect(&self) -> MethodAccessRc {
        Arc::new(self.clone())
    }
}

/// Generated-strategy access to one constructor.
///
/// Constructors are not trampolined; the wrapper forwards creation unchanged and only reports
/// the generated identity.
#[derive(Clone)]
pub struct GeneratedConstructorAccess {
    delegate: ReflectionConstructorAccess,
}

impl GeneratedConstructorAccess {
    pub(crate) fn new(delegate: ReflectionConstructorAccess) -> Self {
        GeneratedConstructorAccess { delegate }
    }
}

impl MemberAccess for GeneratedConstructorAccess {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn declaring_type(&self) -> Option<TypeInfo> {
        self.delegate.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        self.delegate.visibility()
    }
}

impl ConstructorAccess for GeneratedConstructorAccess {
    fn parameter_types(&self) -> Vec<TypeInfo> {
        self.delegate.parameter_types()
    }

    fn create(&self, args: Vec<Value>) -> Result<Value> {
        self.delegate.create(args)
    }

    fn reflect(&self) -> ConstructorAccessRc {
        Arc::new(self.delegate.clone())
    }

    fn unreflect(&self) -> ConstructorAccessRc {
        Arc::new(self.clone())
    }
}

/// Generated-strategy class-level access.
///
/// Every member it returns is wrapped for the generated strategy; methods share the cache this
/// access object was built with.
#[derive(Clone)]
pub struct GeneratedClassAccess {
    delegate: ReflectionClassAccess,
    cache: Arc<TrampolineCache>,
}

impl GeneratedClassAccess {
    pub(crate) fn new(delegate: ReflectionClassAccess, cache: Arc<TrampolineCache>) -> Self {
        GeneratedClassAccess { delegate, cache }
    }
}

impl ClassAccess for GeneratedClassAccess {
    fn type_info(&self) -> TypeInfo {
        self.delegate.type_info()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Generated
    }

    fn fields(&self) -> Vec<FieldAccessRc> {
        self.type_info()
            .fields()
            .iter()
            .map(|f| {
                Arc::new(GeneratedFieldAccess::new(ReflectionFieldAccess::new(
                    f.clone(),
                ))) as FieldAccessRc
            })
            .collect()
    }

    fn methods(&self) -> Vec<MethodAccessRc> {
        self.type_info()
            .methods()
            .iter()
            .map(|m| {
                Arc::new(GeneratedMethodAccess::new(
                    ReflectionMethodAccess::new(m.clone()),
                    self.cache.clone(),
                )) as MethodAccessRc
            })
            .collect()
    }

    fn constructors(&self) -> Vec<ConstructorAccessRc> {
        self.type_info()
            .constructors()
            .iter()
            .map(|c| {
                Arc::new(GeneratedConstructorAccess::new(
                    ReflectionConstructorAccess::new(c.clone()),
                )) as ConstructorAccessRc
            })
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldAccessRc> {
        self.type_info()
            .fields()
            .iter()
            .find(|f| f.name() == name)
            .map(|f| {
                Arc::new(GeneratedFieldAccess::new(ReflectionFieldAccess::new(
                    f.clone(),
                ))) as FieldAccessRc
            })
    }

    fn method(&self, name: &str) -> Option<MethodAccessRc> {
        self.type_info()
            .methods()
            .iter()
            .find(|m| m.name() == name)
            .map(|m| {
                Arc::new(GeneratedMethodAccess::new(
                    ReflectionMethodAccess::new(m.clone()),
                    self.cache.clone(),
                )) as MethodAccessRc
            })
    }

    fn constructor(&self, arity: usize) -> Option<ConstructorAccessRc> {
        self.type_info()
            .constructors()
            .iter()
            .find(|c| c.arity() == arity)
            .map(|c| {
                Arc::new(GeneratedConstructorAccess::new(
                    ReflectionConstructorAccess::new(c.clone()),
                )) as ConstructorAccessRc
            })
    }

    fn create(&self, args: Vec<Value>) -> Result<Value> {
        self.delegate.create(args)
    }

    fn allocate(&self) -> Result<Value> {
        self.delegate.allocate()
    }

    fn reflect(&self) -> ClassAccessRc {
        Arc::new(self.delegate.clone())
    }

    fn unreflect(&self) -> ClassAccessRc {
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::{Reflected, TypeBuilder};

    #[derive(Default, Clone)]
    struct Adder;

    impl Reflected for Adder {
        fn type_info() -> TypeInfo {
            TypeInfo::resolve::<Adder>(|| {
                TypeBuilder::<Adder>::new("Adder")
                    .allocatable()
                    .method("add", |_a: &mut Adder, x: i32, y: i32| x + y)
                    .build()
            })
        }
    }

    #[test]
    fn test_invoke_through_trampoline() {
        let access = GeneratedClassAccess::new(
            ReflectionClassAccess::new(Adder::type_info()),
            TrampolineCache::global(),
        );
        let add = access.method("add").unwrap();

        let mut adder = Adder;
        let result = add
            .invoke(Some(&mut adder), vec![Value::new(2i32), Value::new(3i32)])
            .unwrap();
        assert_eq!(result.downcast::<i32>().unwrap(), 5);
    }

    #[test]
    fn test_strategy_identity() {
        let access = GeneratedClassAccess::new(
            ReflectionClassAccess::new(Adder::type_info()),
            TrampolineCache::global(),
        );

        assert_eq!(access.strategy(), Strategy::Generated);
        assert_eq!(access.reflect().strategy(), Strategy::Reflective);
        assert_eq!(access.unreflect().strategy(), Strategy::Generated);

        let add = access.method("add").unwrap();
        let reflective = add.reflect();
        // The reflective view of a generated method access is the plain delegate, and asking
        // either view for its own strategy again is stable.
        assert_eq!(reflective.parameter_types(), add.parameter_types());
    }
}
