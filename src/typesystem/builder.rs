//! Builder for registering types and their members.
//!
//! A [`TypeBuilder`] is the write side of the type model. It is used inside
//! [`Reflected::type_info`] implementations, where the surrounding module grants access to
//! private members; the declared visibility recorded here is metadata only.
//!
//! Methods, static methods, and constructors are registered from plain closures. The
//! [`InstanceMethod`], [`FallibleInstanceMethod`], [`StaticMethod`], and [`Factory`] traits are
//! implemented for closures of up to four parameters whose argument and return types are all
//! [`Reflected`], and take care of arity checking, argument downcasting, and result boxing.
//!
//! # Examples
//!
//! ```rust
//! use typescope::{Reflected, TypeBuilder, TypeInfo};
//!
//! #[derive(Default, Clone)]
//! struct Counter {
//!     count: u64,
//! }
//!
//! impl Reflected for Counter {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::resolve::<Counter>(|| {
//!             TypeBuilder::<Counter>::new("Counter")
//!                 .allocatable()
//!                 .field("count", |c: &Counter| &c.count, |c: &mut Counter| &mut c.count)
//!                 .method("increment", |c: &mut Counter| { c.count += 1; })
//!                 .constructor(|| Counter { count: 0 })
//!                 .build()
//!         })
//!     }
//! }
//!
//! let info = Counter::type_info();
//! assert_eq!(info.fields().len(), 1);
//! assert_eq!(info.methods().len(), 1);
//! ```

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::typesystem::{
    Allocator, CallError, Constructor, Field, MemberFlags, Method, PrimitiveKind, RawFactory,
    RawGetter, RawInvoker, RawSetter, Reflected, TypeInfo, TypeKind, TypeMeta, TypeRef,
    TypeRegistry, Visibility,
};
use crate::Value;

macro_rules! count_args {
    () => (0usize);
    ($head:ident $($tail:ident)*) => (1usize + count_args!($($tail)*));
}

/// An infallible instance method registered from a closure.
///
/// Implemented for `Fn(&mut T, A0, .., An) -> Ret` closures with up to four parameters, where
/// every parameter type and the return type are [`Reflected`].
pub trait InstanceMethod<T, Args>: Send + Sync + 'static {
    /// Parameter descriptor resolvers, in declaration order.
    fn parameters(&self) -> Vec<fn() -> TypeInfo>;
    /// Return type descriptor resolver.
    fn return_resolver(&self) -> fn() -> TypeInfo;
    /// Consume the closure into a raw invocation primitive.
    fn into_invoker(self) -> RawInvoker;
}

/// A fallible instance method registered from a closure returning `Result`.
///
/// The error type is carried through [`CallError::Raised`] unmodified, so the caller observes
/// the callee's own failure semantics.
pub trait FallibleInstanceMethod<T, Args>: Send + Sync + 'static {
    /// Parameter descriptor resolvers, in declaration order.
    fn parameters(&self) -> Vec<fn() -> TypeInfo>;
    /// Return type descriptor resolver for the success value.
    fn return_resolver(&self) -> fn() -> TypeInfo;
    /// Consume the closure into a raw invocation primitive.
    fn into_invoker(self) -> RawInvoker;
}

/// An unbound method registered from a closure without a receiver.
pub trait StaticMethod<Args>: Send + Sync + 'static {
    /// Parameter descriptor resolvers, in declaration order.
    fn parameters(&self) -> Vec<fn() -> TypeInfo>;
    /// Return type descriptor resolver.
    fn return_resolver(&self) -> fn() -> TypeInfo;
    /// Consume the closure into a raw invocation primitive.
    fn into_invoker(self) -> RawInvoker;
}

/// A constructor registered from a closure producing the declared type.
pub trait Factory<T, Args>: Send + Sync + 'static {
    /// Parameter descriptor resolvers, in declaration order.
    fn parameters(&self) -> Vec<fn() -> TypeInfo>;
    /// Consume the closure into a raw instantiation primitive.
    fn into_factory(self) -> RawFactory;
}

macro_rules! method_impls {
    ($(($($arg:ident),*)),+ $(,)?) => {$(
        impl<T, Fun, Ret $(, $arg)*> InstanceMethod<T, ($($arg,)*)> for Fun
        where
            T: Any + Send + Sync,
            Fun: Fn(&mut T $(, $arg)*) -> Ret + Send + Sync + 'static,
            Ret: Reflected,
            $($arg: Reflected,)*
        {
            fn parameters(&self) -> Vec<fn() -> TypeInfo> {
                vec![$(<$arg as Reflected>::type_info as fn() -> TypeInfo),*]
            }

            fn return_resolver(&self) -> fn() -> TypeInfo {
                <Ret as Reflected>::type_info
            }

            fn into_invoker(self) -> RawInvoker {
                Box::new(move |target, args| {
                    let expected = count_args!($($arg)*);
                    if args.len() != expected {
                        return Err(CallError::Arity { expected, got: args.len() });
                    }
                    let target = target.ok_or(CallError::MissingTarget)?;
                    let target = target.downcast_mut::<T>().ok_or(CallError::TargetMismatch)?;
                    #[allow(unused_mut, unused_variables)]
                    let mut taken = args.into_iter();
                    let _index = 0usize;
                    $(
                        let $arg = taken
                            .next()
                            .and_then(|value| value.downcast::<$arg>().ok())
                            .ok_or(CallError::Argument { index: _index })?;
                        let _index = _index + 1;
                    )*
                    Ok(Value::new((self)(target $(, $arg)*)))
                })
            }
        }

        impl<T, Fun, Ret, E $(, $arg)*> FallibleInstanceMethod<T, ($($arg,)*)> for Fun
        where
            T: Any + Send + Sync,
            Fun: Fn(&mut T $(, $arg)*) -> std::result::Result<Ret, E> + Send + Sync + 'static,
            Ret: Reflected,
            E: std::error::Error + Send + Sync + 'static,
            $($arg: Reflected,)*
        {
            fn parameters(&self) -> Vec<fn() -> TypeInfo> {
                vec![$(<$arg as Reflected>::type_info as fn() -> TypeInfo),*]
            }

            fn return_resolver(&self) -> fn() -> TypeInfo {
                <Ret as Reflected>::type_info
            }

            fn into_invoker(self) -> RawInvoker {
                Box::new(move |target, args| {
                    let expected = count_args!($($arg)*);
                    if args.len() != expected {
                        return Err(CallError::Arity { expected, got: args.len() });
                    }
                    let target = target.ok_or(CallError::MissingTarget)?;
                    let target = target.downcast_mut::<T>().ok_or(CallError::TargetMismatch)?;
                    #[allow(unused_mut, unused_variables)]
                    let mut taken = args.into_iter();
                    let _index = 0usize;
                    $(
                        let $arg = taken
                            .next()
                            .and_then(|value| value.downcast::<$arg>().ok())
                            .ok_or(CallError::Argument { index: _index })?;
                        let _index = _index + 1;
                    )*
                    match (self)(target $(, $arg)*) {
                        Ok(result) => Ok(Value::new(result)),
                        Err(raised) => Err(CallError::Raised(Box::new(raised))),
                    }
                })
            }
        }

        impl<Fun, Ret $(, $arg)*> StaticMethod<($($arg,)*)> for Fun
        where
            Fun: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: Reflected,
            $($arg: Reflected,)*
        {
            fn parameters(&self) -> Vec<fn() -> TypeInfo> {
                vec![$(<$arg as Reflected>::type_info as fn() -> TypeInfo),*]
            }

            fn return_resolver(&self) -> fn() -> TypeInfo {
                <Ret as Reflected>::type_info
            }

            fn into_invoker(self) -> RawInvoker {
                Box::new(move |_target, args| {
                    let expected = count_args!($($arg)*);
                    if args.len() != expected {
                        return Err(CallError::Arity { expected, got: args.len() });
                    }
                    #[allow(unused_mut, unused_variables)]
                    let mut taken = args.into_iter();
                    let _index = 0usize;
                    $(
                        let $arg = taken
                            .next()
                            .and_then(|value| value.downcast::<$arg>().ok())
                            .ok_or(CallError::Argument { index: _index })?;
                        let _index = _index + 1;
                    )*
                    Ok(Value::new((self)($($arg),*)))
                })
            }
        }

        impl<T, Fun $(, $arg)*> Factory<T, ($($arg,)*)> for Fun
        where
            T: Any + Send + Sync,
            Fun: Fn($($arg),*) -> T + Send + Sync + 'static,
            $($arg: Reflected,)*
        {
            fn parameters(&self) -> Vec<fn() -> TypeInfo> {
                vec![$(<$arg as Reflected>::type_info as fn() -> TypeInfo),*]
            }

            fn into_factory(self) -> RawFactory {
                Box::new(move |args| {
                    let expected = count_args!($($arg)*);
                    if args.len() != expected {
                        return Err(CallError::Arity { expected, got: args.len() });
                    }
                    #[allow(unused_mut, unused_variables)]
                    let mut taken = args.into_iter();
                    let _index = 0usize;
                    $(
                        let $arg = taken
                            .next()
                            .and_then(|value| value.downcast::<$arg>().ok())
                            .ok_or(CallError::Argument { index: _index })?;
                        let _index = _index + 1;
                    )*
                    Ok(Value::new((self)($($arg),*)))
                })
            }
        }
    )+};
}

method_impls!((), (A0), (A0, A1), (A0, A1, A2), (A0, A1, A2, A3));

enum LastMember {
    None,
    Field(usize),
    Method(usize),
    Constructor(usize),
}

/// Registration builder for one type.
///
/// Builders are consumed by [`TypeBuilder::build`], which publishes the finished metadata to the
/// global registry. Member modifiers ([`TypeBuilder::private`], [`TypeBuilder::read_only`],
/// [`TypeBuilder::display`]) apply to the most recently added member.
pub struct TypeBuilder<T: Any + Send + Sync> {
    name: String,
    kind: TypeKind,
    base: Option<TypeInfo>,
    interfaces: Vec<TypeInfo>,
    generics: Vec<TypeInfo>,
    component: Option<TypeInfo>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    constructors: Vec<Constructor>,
    allocator: Option<Allocator>,
    last: LastMember,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeBuilder<T> {
    fn with_kind(name: &str, kind: TypeKind) -> Self {
        TypeBuilder {
            name: name.to_string(),
            kind,
            base: None,
            interfaces: Vec::new(),
            generics: Vec::new(),
            component: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            allocator: None,
            last: LastMember::None,
            _marker: PhantomData,
        }
    }

    /// Start registration of a concrete composite type.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Struct)
    }

    /// Start registration of an abstract capability type.
    ///
    /// Interface registrations use a marker type as their anchor, carry no allocator, and
    /// typically declare no members.
    #[must_use]
    pub fn interface(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Interface)
    }

    /// Start registration of an array type. The element type is declared with
    /// [`TypeBuilder::component`].
    #[must_use]
    pub fn array(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Array)
    }

    pub(crate) fn primitive(name: &str, kind: PrimitiveKind) -> Self {
        Self::with_kind(name, TypeKind::Primitive(kind))
    }

    /// Declare the supertype. Types without an explicit supertype extend the hierarchy root.
    #[must_use]
    pub fn extends<B: Reflected>(mut self) -> Self {
        self.base = Some(B::type_info());
        self
    }

    /// Declare an implemented interface.
    #[must_use]
    pub fn implements<I: Reflected>(mut self) -> Self {
        self.interfaces.push(I::type_info());
        self
    }

    /// Append a generic argument of the parameterization being registered.
    #[must_use]
    pub fn generic<G: Reflected>(mut self) -> Self {
        self.generics.push(G::type_info());
        self
    }

    /// Declare the element type of an array type.
    #[must_use]
    pub fn component<C: Reflected>(mut self) -> Self {
        self.component = Some(C::type_info());
        self
    }

    /// Opt in to constructor-bypassing allocation.
    ///
    /// The raw initializer is `T::default()`, so every declared field holds its default/zero
    /// value and no registered constructor runs.
    #[must_use]
    pub fn allocatable(mut self) -> Self
    where
        T: Default,
    {
        self.allocator = Some(Box::new(|| Value::new(T::default())));
        self
    }

    /// Register a field through a borrow accessor pair.
    ///
    /// Reads clone the field's current value; writes replace it. The accessors are the raw
    /// primitives behind both access strategies.
    #[must_use]
    pub fn field<F, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        F: Reflected + Clone,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let getter: RawGetter = Box::new(move |target| {
            let target = target
                .downcast_ref::<T>()
                .ok_or(CallError::TargetMismatch)?;
            Ok(Value::new(get(target).clone()))
        });
        let setter: RawSetter = Box::new(move |target, value| {
            let target = target
                .downcast_mut::<T>()
                .ok_or(CallError::TargetMismatch)?;
            let value = value
                .downcast::<F>()
                .map_err(|_| CallError::Argument { index: 0 })?;
            *set(target) = value;
            Ok(())
        });

        self.fields.push(Field::new(
            name,
            <F as Reflected>::type_info as fn() -> TypeInfo,
            getter,
            setter,
        ));
        self.last = LastMember::Field(self.fields.len() - 1);
        self
    }

    /// Register an instance method from a closure.
    #[must_use]
    pub fn method<Args, F>(mut self, name: &str, method: F) -> Self
    where
        F: InstanceMethod<T, Args>,
    {
        self.methods.push(Method::new(
            name,
            method.parameters(),
            method.return_resolver(),
            MemberFlags::empty(),
            method.into_invoker(),
        ));
        self.last = LastMember::Method(self.methods.len() - 1);
        self
    }

    /// Register a fallible instance method from a closure returning `Result`.
    ///
    /// A returned `Err` surfaces to callers as [`Error::Invocation`](crate::Error::Invocation)
    /// with the callee's error preserved as source.
    #[must_use]
    pub fn try_method<Args, F>(mut self, name: &str, method: F) -> Self
    where
        F: FallibleInstanceMethod<T, Args>,
    {
        self.methods.push(Method::new(
            name,
            method.parameters(),
            method.return_resolver(),
            MemberFlags::empty(),
            method.into_invoker(),
        ));
        self.last = LastMember::Method(self.methods.len() - 1);
        self
    }

    /// Register an unbound method from a closure without a receiver.
    ///
    /// Static methods ignore any call target they are handed.
    #[must_use]
    pub fn static_method<Args, F>(mut self, name: &str, method: F) -> Self
    where
        F: StaticMethod<Args>,
    {
        self.methods.push(Method::new(
            name,
            method.parameters(),
            method.return_resolver(),
            MemberFlags::STATIC,
            method.into_invoker(),
        ));
        self.last = LastMember::Method(self.methods.len() - 1);
        self
    }

    /// Register a constructor from a closure producing `T`.
    #[must_use]
    pub fn constructor<Args, F>(mut self, factory: F) -> Self
    where
        F: Factory<T, Args>,
    {
        self.constructors
            .push(Constructor::new(factory.parameters(), factory.into_factory()));
        self.last = LastMember::Constructor(self.constructors.len() - 1);
        self
    }

    /// Set the declared visibility of the most recently added member.
    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        match self.last {
            LastMember::Field(i) => self.fields[i].visibility = visibility,
            LastMember::Method(i) => self.methods[i].visibility = visibility,
            LastMember::Constructor(i) => self.constructors[i].visibility = visibility,
            LastMember::None => {}
        }
        self
    }

    /// Mark the most recently added member as private.
    #[must_use]
    pub fn private(self) -> Self {
        self.visibility(Visibility::Private)
    }

    /// Mark the most recently added field as rejecting writes.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        if let LastMember::Field(i) = self.last {
            self.fields[i].flags |= MemberFlags::READ_ONLY;
        }
        self
    }

    /// Attach a display-name annotation to the most recently added member.
    ///
    /// The annotation overrides the declared name during enumeration and name lookup.
    #[must_use]
    pub fn display(mut self, name: &str) -> Self {
        let name = Some(name.to_string());
        match self.last {
            LastMember::Field(i) => self.fields[i].display_name = name,
            LastMember::Method(i) => self.methods[i].display_name = name,
            LastMember::Constructor(i) => self.constructors[i].display_name = name,
            LastMember::None => {}
        }
        self
    }

    /// Publish the registration to the global registry and return the descriptor.
    ///
    /// Publication is first-wins: when the type is already registered, the existing descriptor
    /// is returned and this builder's metadata is discarded.
    #[must_use]
    pub fn build(self) -> TypeInfo {
        let registry = TypeRegistry::global();
        let TypeBuilder {
            name,
            kind,
            base,
            interfaces,
            generics,
            component,
            fields,
            methods,
            constructors,
            allocator,
            ..
        } = self;

        let base = base.unwrap_or_else(|| registry.root());

        registry.insert_cyclic(TypeId::of::<T>(), move |token, weak| TypeMeta {
            token,
            id: TypeId::of::<T>(),
            name,
            kind,
            base: Some(TypeRef::new(&base)),
            interfaces: interfaces.iter().map(TypeRef::new).collect(),
            generics,
            component,
            fields: fields
                .into_iter()
                .map(|mut field| {
                    field.declaring = TypeRef::from_weak(weak.clone());
                    std::sync::Arc::new(field)
                })
                .collect(),
            methods: methods
                .into_iter()
                .map(|mut method| {
                    method.declaring = TypeRef::from_weak(weak.clone());
                    std::sync::Arc::new(method)
                })
                .collect(),
            constructors: constructors
                .into_iter()
                .map(|mut constructor| {
                    constructor.declaring = TypeRef::from_weak(weak.clone());
                    std::sync::Arc::new(constructor)
                })
                .collect(),
            allocator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::Visibility;

    #[derive(Default, Clone)]
    struct Sample {
        id: u32,
        label: String,
    }

    impl Reflected for Sample {
        fn type_info() -> TypeInfo {
            TypeInfo::resolve::<Sample>(|| {
                TypeBuilder::<Sample>::new("Sample")
                    .allocatable()
                    .field("id", |s: &Sample| &s.id, |s: &mut Sample| &mut s.id)
                    .read_only()
                    .field(
                        "label",
                        |s: &Sample| &s.label,
                        |s: &mut Sample| &mut s.label,
                    )
                    .private()
                    .display("title")
                    .method("describe", |s: &mut Sample| {
                        format!("{}#{}", s.label, s.id)
                    })
                    .static_method("origin", || 0u32)
                    .constructor(|id: u32, label: String| Sample { id, label })
                    .build()
            })
        }
    }

    #[test]
    fn test_registration_shape() {
        let info = Sample::type_info();

        assert_eq!(info.name(), "Sample");
        assert_eq!(info.fields().len(), 2);
        assert_eq!(info.methods().len(), 2);
        assert_eq!(info.constructors().len(), 1);

        let id = &info.fields()[0];
        assert!(id.is_read_only());
        assert_eq!(id.visibility(), Visibility::Public);
        assert_eq!(id.field_type().name(), "u32");

        let label = &info.fields()[1];
        assert_eq!(label.visibility(), Visibility::Private);
        assert_eq!(label.name(), "title");
        assert_eq!(label.source_name(), "label");
    }

    #[test]
    fn test_member_back_references() {
        let info = Sample::type_info();
        for field in info.fields() {
            assert_eq!(field.declaring_type(), Some(info.clone()));
        }
        for method in info.methods() {
            assert_eq!(method.declaring_type(), Some(info.clone()));
        }
    }

    #[test]
    fn test_static_method_metadata() {
        let info = Sample::type_info();
        let origin = info
            .methods()
            .iter()
            .find(|m| m.name() == "origin")
            .expect("static method registered");
        assert!(origin.is_static());
        assert_eq!(origin.arity(), 0);
        assert_eq!(origin.return_type().name(), "u32");
    }

    #[test]
    fn test_default_base_is_root() {
        let info = Sample::type_info();
        let root = TypeRegistry::global().root();
        assert_eq!(info.super_type(), Some(root));
    }

    #[test]
    fn test_constructor_metadata() {
        let info = Sample::type_info();
        let ctor = &info.constructors()[0];
        assert_eq!(ctor.arity(), 2);
        assert_eq!(ctor.parameter_types()[0].name(), "u32");
        assert_eq!(ctor.parameter_types()[1].name(), "String");
    }
}
