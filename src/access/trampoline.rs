//! Trampoline compilation and the process-wide signature cache.
//!
//! A trampoline is a compiled routine performing a direct call equivalent to invoking one
//! specific member signature. The [`TrampolineCompiler`] trait is the boundary to the invoker
//! backend: the built-in [`DirectCompiler`] resolves the member's parameter list once and
//! captures the direct invocation primitive, so dispatch skips all per-call descriptor
//! consultation. Custom backends can be injected through [`TrampolineCache::new`] together with
//! [`TypeInfo::unreflect_with`](crate::TypeInfo::unreflect_with).
//!
//! # Thread Safety
//!
//! Entries are compiled outside the cache lock and published atomically, so readers never
//! observe a partially constructed trampoline. Concurrent first-time compilation of the same
//! signature is tolerated: both threads compile, the first insertion wins, and the loser is
//! discarded. A failed compilation publishes nothing, leaving the signature clean for later
//! attempts.

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::typesystem::{Method, MethodRc, Token, TypeInfo};
use crate::{Result, Value};

/// A compiled direct-call routine for one member signature.
///
/// The calling convention mirrors raw invocation: optional target instance plus the argument
/// array, returning the member's result.
pub type Trampoline =
    Arc<dyn Fn(Option<&mut dyn Any>, Vec<Value>) -> Result<Value> + Send + Sync>;

/// Identity of a member signature: declaring type, member name, and parameter types.
///
/// Signatures key the trampoline cache, so at most one compiled routine exists per distinct
/// signature at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    declaring: Token,
    name: String,
    params: Vec<TypeId>,
}

impl MemberSignature {
    /// The signature of a method descriptor.
    #[must_use]
    pub fn of_method(method: &Method) -> Self {
        MemberSignature {
            declaring: method
                .declaring_type()
                .map_or(Token::new(0), |t| t.token()),
            name: method.source_name().to_string(),
            params: method
                .parameter_types()
                .iter()
                .map(TypeInfo::raw_id)
                .collect(),
        }
    }

    /// Token of the declaring type.
    #[must_use]
    pub fn declaring(&self) -> Token {
        self.declaring
    }

    /// Declared name of the member.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Backend that turns a member signature into a compiled trampoline.
///
/// Implementations must either return a complete routine or report failure through
/// [`Error::TrampolineCompilation`](crate::Error::TrampolineCompilation); partial output is not
/// an option. Compilation is treated as a potentially expensive one-time cost and is never
/// retried automatically.
pub trait TrampolineCompiler: Send + Sync {
    /// Compile a direct-call trampoline for the given method.
    fn compile(&self, method: &MethodRc) -> Result<Trampoline>;
}

/// The built-in invoker backend.
///
/// "Compilation" here means resolving the declared parameter list exactly once and baking it
/// into a closure around the direct invocation primitive. The resulting routine still converts
/// arguments, but against the captured plan instead of walking descriptors per call.
pub struct DirectCompiler;

impl TrampolineCompiler for DirectCompiler {
    fn compile(&self, method: &MethodRc) -> Result<Trampoline> {
        let params = method.parameter_types();
        let name = method.name().to_string();
        let method = method.clone();

        Ok(Arc::new(move |target, args| {
            let args = crate::access::prepare_args(&name, &params, args)?;
            method.invoke_raw(target, args)
        }))
    }
}

/// Process-wide cache of compiled trampolines, keyed by member signature.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use typescope::{DirectCompiler, TrampolineCache};
///
/// let cache = TrampolineCache::new(Arc::new(DirectCompiler));
/// assert!(cache.is_empty());
/// ```
pub struct TrampolineCache {
    entries: DashMap<MemberSignature, Trampoline>,
    compiler: Arc<dyn TrampolineCompiler>,
}

impl TrampolineCache {
    /// Create a cache backed by the given compiler.
    #[must_use]
    pub fn new(compiler: Arc<dyn TrampolineCompiler>) -> Self {
        TrampolineCache {
            entries: DashMap::new(),
            compiler,
        }
    }

    /// The process-wide cache behind [`TypeInfo::unreflect`](crate::TypeInfo::unreflect),
    /// backed by [`DirectCompiler`].
    #[must_use]
    pub fn global() -> Arc<TrampolineCache> {
        static INSTANCE: OnceLock<Arc<TrampolineCache>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(TrampolineCache::new(Arc::new(DirectCompiler))))
            .clone()
    }

    /// The trampoline for a method, compiling it on first request.
    ///
    /// Racing callers may compile the same signature twice; the first published entry wins and
    /// every caller receives it. Compilation failure publishes nothing.
    pub fn resolve(&self, method: &MethodRc) -> Result<Trampoline> {
        let signature = MemberSignature::of_method(method);
        if let Some(entry) = self.entries.get(&signature) {
            return Ok(entry.clone());
        }

        let compiled = self.compiler.compile(method)?;
        Ok(self.entries.entry(signature).or_insert(compiled).clone())
    }

    /// Check whether a signature already has a compiled entry.
    #[must_use]
    pub fn contains(&self, signature: &MemberSignature) -> bool {
        self.entries.contains_key(signature)
    }

    /// Number of compiled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no trampoline has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
