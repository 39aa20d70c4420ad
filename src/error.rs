use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of descriptor navigation, instance allocation, and member
/// access under either strategy. Each variant provides specific context about the failure mode to
/// enable appropriate error handling.
///
/// Absent results are never errors: operations such as looking up a supertype of the hierarchy
/// root or resolving an out-of-range generic slot return `None` instead.
///
/// # Error Categories
///
/// ## Allocation
/// - [`Error::Allocation`] - Constructor-bypassing instantiation is not possible for the type
///
/// ## Member Access
/// - [`Error::Access`] - The access itself is forbidden (e.g. writing a read-only field)
/// - [`Error::ArgumentMismatch`] - Argument count or types incompatible with a member signature
/// - [`Error::Invocation`] - The invoked member itself failed; its error is preserved as source
///
/// ## Generated Strategy
/// - [`Error::TrampolineCompilation`] - The invoker backend failed to compile a trampoline
///
/// # Examples
///
/// ```rust
/// use typescope::{Error, TypeInfo};
///
/// // Fixed-size arrays register without an allocator, so bare allocation fails.
/// match TypeInfo::of::<[i32; 3]>().allocate() {
///     Err(Error::Allocation { type_name, .. }) => assert_eq!(type_name, "Array"),
///     other => panic!("expected allocation failure, got {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A bare instance of the type could not be produced.
    ///
    /// Constructor-bypassing allocation requires a raw initializer supplied at registration
    /// time. Interface types, abstract markers, and registrations that never opted in via
    /// [`allocatable`](crate::typesystem::TypeBuilder::allocatable) cannot be allocated.
    ///
    /// # Fields
    ///
    /// * `type_name` - Simple name of the type that could not be allocated
    /// * `reason` - Why no instance could be produced
    #[error("Cannot allocate instance of '{type_name}': {reason}")]
    Allocation {
        /// Simple name of the type that could not be allocated
        type_name: String,
        /// Why no instance could be produced
        reason: String,
    },

    /// The requested access is denied.
    ///
    /// Declared visibility is metadata only and never blocks access, so this error is reserved
    /// for accesses that are structurally impossible, such as writing through a field that was
    /// registered as read-only.
    #[error("Access denied - {0}")]
    Access(String),

    /// Argument count or argument types do not match the member signature.
    ///
    /// Raised before the member is entered, by both strategies, when the argument array has the
    /// wrong arity, an argument cannot be converted to the declared parameter type (widening
    /// conversions are attempted first), or the call target is missing or of the wrong type.
    #[error("Argument mismatch - {0}")]
    ArgumentMismatch(String),

    /// The invoked member itself raised an error.
    ///
    /// The callee's own error is carried unmodified as the source of this variant so that its
    /// failure semantics are preserved across the reflective indirection.
    #[error("Invocation target failed - {0}")]
    Invocation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The invoker backend failed to produce a trampoline for a member signature.
    ///
    /// Compilation failures leave no entry behind in the trampoline cache, so a later attempt
    /// for the same signature starts clean. The generated strategy never falls back to the
    /// reflective path on its own; callers that need resilience to backend failure must choose
    /// the reflective strategy explicitly.
    #[error("Trampoline compilation failed - {0}")]
    TrampolineCompilation(String),
}

impl Error {
    /// Wrap an error raised by an invoked member, preserving it as the source.
    pub fn invocation<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Invocation(Box::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        let err = Error::Allocation {
            type_name: "Shape".to_string(),
            reason: "no allocator registered".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot allocate instance of 'Shape': no allocator registered"
        );

        let err = Error::ArgumentMismatch("expected 2 arguments, got 1".to_string());
        assert!(err.to_string().contains("expected 2 arguments"));

        let err = Error::Access("field 'id' is read-only".to_string());
        assert!(err.to_string().starts_with("Access denied"));
    }

    #[test]
    fn test_invocation_preserves_source() {
        let source = std::io::Error::other("boom");
        let err = Error::invocation(source);

        let source = std::error::Error::source(&err).expect("source must be preserved");
        assert_eq!(source.to_string(), "boom");
    }
}
