//! Member descriptors for fields, methods, and constructors.
//!
//! A member descriptor combines the declared shape of a member (name, parameter and return
//! types, visibility) with the raw access primitives registered for it. The raw primitives
//! expect exact types and perform no argument conversion; conversion and validation against the
//! declared signature is the job of the access strategies layered on top.
//!
//! Descriptors are owned by their declaring type's metadata and shared read-only between all
//! access objects through [`FieldRc`], [`MethodRc`], and [`ConstructorRc`].

use std::any::Any;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;

use crate::typesystem::{TypeInfo, TypeRef};
use crate::{Error, Result, Value};

/// Reference to a shared [`Field`] descriptor.
pub type FieldRc = Arc<Field>;
/// Reference to a shared [`Method`] descriptor.
pub type MethodRc = Arc<Method>;
/// Reference to a shared [`Constructor`] descriptor.
pub type ConstructorRc = Arc<Constructor>;

/// Declared visibility of a member.
///
/// Visibility is metadata only. Registration happens inside the type's own module, which is what
/// grants access to private members; the access layer reports the declared level but never
/// enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum Visibility {
    /// Accessible from anywhere.
    #[default]
    Public,
    /// Accessible within the declaring crate.
    Crate,
    /// Accessible only within the declaring module.
    Private,
}

bitflags! {
    /// Structural flags of a member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemberFlags: u8 {
        /// The member is not bound to an instance.
        const STATIC = 0x01;
        /// The member rejects writes.
        const READ_ONLY = 0x02;
    }
}

/// Error raised by a raw registered access primitive.
///
/// Raw primitives sit below the strategy layer and know nothing about the declared signature
/// beyond what the registration baked in, so their errors are minimal and position based. The
/// strategies translate them into [`enum@crate::Error`] values with member context attached.
#[derive(Debug)]
pub enum CallError {
    /// An instance member was called without a target.
    MissingTarget,
    /// The call target is not an instance of the declaring type.
    TargetMismatch,
    /// The argument array has the wrong length.
    Arity {
        /// Number of parameters the member declares.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },
    /// An argument could not be downcast to the declared parameter type.
    Argument {
        /// Zero-based position of the offending argument.
        index: usize,
    },
    /// The member itself ran and failed; its error is carried unmodified.
    Raised(Box<dyn std::error::Error + Send + Sync>),
}

impl CallError {
    pub(crate) fn into_error(self, member: &str) -> Error {
        match self {
            CallError::MissingTarget => Error::ArgumentMismatch(format!(
                "'{member}' is an instance member and requires a call target"
            )),
            CallError::TargetMismatch => Error::ArgumentMismatch(format!(
                "call target is not an instance of the type declaring '{member}'"
            )),
            CallError::Arity { expected, got } => Error::ArgumentMismatch(format!(
                "'{member}' expects {expected} arguments, got {got}"
            )),
            CallError::Argument { index } => Error::ArgumentMismatch(format!(
                "argument {index} of '{member}' has an incompatible type"
            )),
            CallError::Raised(source) => Error::Invocation(source),
        }
    }
}

/// Raw field read primitive, registered per field.
pub type RawGetter = Box<dyn Fn(&dyn Any) -> std::result::Result<Value, CallError> + Send + Sync>;
/// Raw field write primitive, registered per field. Expects the exact field type.
pub type RawSetter =
    Box<dyn Fn(&mut dyn Any, Value) -> std::result::Result<(), CallError> + Send + Sync>;
/// Raw invocation primitive, registered per method. Expects exact argument types.
pub type RawInvoker = Box<
    dyn Fn(Option<&mut dyn Any>, Vec<Value>) -> std::result::Result<Value, CallError>
        + Send
        + Sync,
>;
/// Raw instantiation primitive, registered per constructor. Expects exact argument types.
pub type RawFactory =
    Box<dyn Fn(Vec<Value>) -> std::result::Result<Value, CallError> + Send + Sync>;

/// A descriptor resolver deferred until first use.
///
/// Member registration records `fn() -> TypeInfo` resolvers instead of descriptors so that
/// self-referential types can register without recursing into their own unfinished metadata.
pub(crate) struct LazyType {
    init: fn() -> TypeInfo,
    cell: OnceLock<TypeInfo>,
}

impl LazyType {
    pub(crate) fn new(init: fn() -> TypeInfo) -> Self {
        LazyType {
            init,
            cell: OnceLock::new(),
        }
    }

    pub(crate) fn get(&self) -> &TypeInfo {
        self.cell.get_or_init(self.init)
    }
}

impl std::fmt::Debug for LazyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell.get() {
            Some(info) => write!(f, "LazyType({info})"),
            None => f.write_str("LazyType(<unresolved>)"),
        }
    }
}

/// Descriptor of a single registered field.
pub struct Field {
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) declaring: TypeRef,
    pub(crate) ty: LazyType,
    pub(crate) visibility: Visibility,
    pub(crate) flags: MemberFlags,
    pub(crate) getter: RawGetter,
    pub(crate) setter: RawSetter,
}

impl Field {
    pub(crate) fn new(name: &str, ty: fn() -> TypeInfo, getter: RawGetter, setter: RawSetter) -> Self {
        Field {
            name: name.to_string(),
            display_name: None,
            declaring: TypeRef::dangling(),
            ty: LazyType::new(ty),
            visibility: Visibility::Public,
            flags: MemberFlags::empty(),
            getter,
            setter,
        }
    }

    /// Effective name of the field: the display-name annotation when present, the declared name
    /// otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// The name the field was declared with, ignoring annotations.
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.name
    }

    /// The type declaring this field, if still registered.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeInfo> {
        self.declaring.upgrade()
    }

    /// The declared type of the field's value.
    #[must_use]
    pub fn field_type(&self) -> TypeInfo {
        self.ty.get().clone()
    }

    /// Declared visibility of the field.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Structural flags of the field.
    #[must_use]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    /// Check whether writes through this field are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(MemberFlags::READ_ONLY)
    }

    /// Read the field from a target, without argument conversion.
    ///
    /// The returned value is a clone of the field's current contents.
    pub fn get_raw(&self, target: &dyn Any) -> Result<Value> {
        (self.getter)(target).map_err(|e| e.into_error(self.name()))
    }

    /// Write the field on a target. The value must already be of the exact field type.
    pub fn set_raw(&self, target: &mut dyn Any, value: Value) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::Access(format!("field '{}' is read-only", self.name())));
        }
        (self.setter)(target, value).map_err(|e| e.into_error(self.name()))
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Descriptor of a single registered method.
pub struct Method {
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) declaring: TypeRef,
    pub(crate) params: Vec<LazyType>,
    pub(crate) returns: LazyType,
    pub(crate) visibility: Visibility,
    pub(crate) flags: MemberFlags,
    pub(crate) invoker: RawInvoker,
}

impl Method {
    pub(crate) fn new(
        name: &str,
        params: Vec<fn() -> TypeInfo>,
        returns: fn() -> TypeInfo,
        flags: MemberFlags,
        invoker: RawInvoker,
    ) -> Self {
        Method {
            name: name.to_string(),
            display_name: None,
            declaring: TypeRef::dangling(),
            params: params.into_iter().map(LazyType::new).collect(),
            returns: LazyType::new(returns),
            visibility: Visibility::Public,
            flags,
            invoker,
        }
    }

    /// Effective name of the method: the display-name annotation when present, the declared name
    /// otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// The name the method was declared with, ignoring annotations.
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.name
    }

    /// The type declaring this method, if still registered.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeInfo> {
        self.declaring.upgrade()
    }

    /// Declared parameter types, in order.
    #[must_use]
    pub fn parameter_types(&self) -> Vec<TypeInfo> {
        self.params.iter().map(|p| p.get().clone()).collect()
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> TypeInfo {
        self.returns.get().clone()
    }

    /// Declared visibility of the method.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Check whether the method is unbound.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    /// Invoke the method with exact-typed arguments and no conversion.
    ///
    /// This is the direct entry into the registered invocation primitive. Both access strategies
    /// and custom invoker backends funnel through it after argument preparation.
    pub fn invoke_raw(&self, target: Option<&mut dyn Any>, args: Vec<Value>) -> Result<Value> {
        (self.invoker)(target, args).map_err(|e| e.into_error(self.name()))
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("arity", &self.params.len())
            .field("visibility", &self.visibility)
            .field("static", &self.is_static())
            .finish_non_exhaustive()
    }
}

/// Descriptor of a single registered constructor.
pub struct Constructor {
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) declaring: TypeRef,
    pub(crate) params: Vec<LazyType>,
    pub(crate) visibility: Visibility,
    pub(crate) factory: RawFactory,
}

impl Constructor {
    pub(crate) fn new(params: Vec<fn() -> TypeInfo>, factory: RawFactory) -> Self {
        Constructor {
            name: "new".to_string(),
            display_name: None,
            declaring: TypeRef::dangling(),
            params: params.into_iter().map(LazyType::new).collect(),
            visibility: Visibility::Public,
            factory,
        }
    }

    /// Effective name of the constructor.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// The type declaring this constructor, if still registered.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeInfo> {
        self.declaring.upgrade()
    }

    /// Declared parameter types, in order.
    #[must_use]
    pub fn parameter_types(&self) -> Vec<TypeInfo> {
        self.params.iter().map(|p| p.get().clone()).collect()
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Declared visibility of the constructor.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Instantiate with exact-typed arguments and no conversion.
    pub fn create_raw(&self, args: Vec<Value>) -> Result<Value> {
        (self.factory)(args).map_err(|e| e.into_error(self.name()))
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("arity", &self.params.len())
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}
