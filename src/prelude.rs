//! # typescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits of the
//! library. Import this module to get quick access to descriptor navigation and both access
//! strategies.
//!
//! ```rust
//! use typescope::prelude::*;
//!
//! let info = TypeInfo::of::<Vec<i32>>();
//! assert!(info.is_array());
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all typescope operations
pub use crate::Error;

/// The result type used throughout typescope
pub use crate::Result;

/// The dynamically typed value box exchanged at every access boundary
pub use crate::Value;

// ================================================================================================
// Type Model
// ================================================================================================

/// Canonical type descriptor and registration entry points
pub use crate::typesystem::{Reflected, TypeBuilder, TypeInfo, TypeRegistry};

/// Type classification and primitives
pub use crate::typesystem::{PrimitiveKind, Token, TypeKind};

/// Member descriptors and their metadata
pub use crate::typesystem::{
    Constructor, ConstructorRc, Field, FieldRc, MemberFlags, Method, MethodRc, Visibility,
};

// ================================================================================================
// Access Surface
// ================================================================================================

/// Facade entry points
pub use crate::access::{reflect, unreflect};

/// Capability traits and shared handles
pub use crate::access::{
    ClassAccess, ClassAccessRc, ConstructorAccess, ConstructorAccessRc, FieldAccess,
    FieldAccessRc, MemberAccess, MethodAccess, MethodAccessRc, Strategy,
};

/// Trampoline cache and invoker backend boundary
pub use crate::access::trampoline::{
    DirectCompiler, MemberSignature, Trampoline, TrampolineCache, TrampolineCompiler,
};
