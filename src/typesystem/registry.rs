//! Process-wide type registry.
//!
//! The registry is the single strong owner of all type metadata. It is a multi-index store in
//! the same shape as a metadata table heap:
//!
//! - **Token-based lookup**: primary index, ordered by registration token
//! - **Id-based lookup**: secondary index keyed by runtime type id
//! - **Name-based lookup**: secondary index keyed by simple name
//!
//! # Thread Safety
//!
//! All lookups and insertions are lock-free from the caller's perspective: the primary store is
//! a [`SkipMap`], the secondary indices are [`DashMap`]s, and token allocation is a single atomic
//! counter. Concurrent registration of the same type is tolerated; the first insertion wins and
//! later attempts observe and return the winner. Registered metadata is immutable and lives for
//! the process, so readers never observe a partially constructed type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, OnceLock, Weak,
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::typesystem::{TypeInfo, TypeKind, TypeMeta};

/// Sequential identifier assigned to each registered type.
///
/// Tokens are allocation order, not identity: structural identity is the runtime type id.
/// Gaps can occur when concurrent registrations race and a loser's token is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u32);

impl Token {
    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// The raw token value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

const ROOT_TOKEN: Token = Token(1);

/// Central registry for all reflected types in the process.
///
/// # Examples
///
/// ```rust
/// use typescope::{TypeInfo, TypeRegistry};
///
/// let registry = TypeRegistry::global();
/// let int = TypeInfo::of::<i64>();
///
/// assert_eq!(registry.get(int.token()), Some(int.clone()));
/// assert!(registry.get_by_name("i64").contains(&int));
/// ```
pub struct TypeRegistry {
    types: SkipMap<Token, TypeInfo>,
    by_id: DashMap<TypeId, Token>,
    by_name: DashMap<String, Vec<Token>>,
    next_token: AtomicU32,
}

impl TypeRegistry {
    /// The process-wide registry instance.
    pub fn global() -> &'static TypeRegistry {
        static INSTANCE: OnceLock<TypeRegistry> = OnceLock::new();
        INSTANCE.get_or_init(TypeRegistry::new)
    }

    fn new() -> Self {
        let registry = TypeRegistry {
            types: SkipMap::new(),
            by_id: DashMap::new(),
            by_name: DashMap::new(),
            next_token: AtomicU32::new(ROOT_TOKEN.value() + 1),
        };

        // The hierarchy root is registered by hand: it is the one type with no supertype and
        // the builder refuses to produce such a thing.
        let root = TypeInfo::from_meta(Arc::new(TypeMeta {
            token: ROOT_TOKEN,
            id: TypeId::of::<dyn Any>(),
            name: "Any".to_string(),
            kind: TypeKind::Any,
            base: None,
            interfaces: Vec::new(),
            generics: Vec::new(),
            component: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            allocator: None,
        }));
        registry.publish(root);
        registry
    }

    /// The synthetic root of the type hierarchy.
    ///
    /// Every registered type reaches it through the supertype chain; its own supertype is
    /// absent.
    #[must_use]
    pub fn root(&self) -> TypeInfo {
        self.get(ROOT_TOKEN)
            .unwrap_or_else(|| unreachable!("root type is registered at construction"))
    }

    fn allocate_token(&self) -> Token {
        Token(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    fn publish(&self, info: TypeInfo) {
        let token = info.token();
        self.types.insert(token, info.clone());
        self.by_name
            .entry(info.name().to_string())
            .or_default()
            .push(token);
        self.by_id.insert(info.raw_id(), token);
    }

    /// Insert a type whose members need a back-reference to their own metadata.
    ///
    /// The builder closure runs inside [`Arc::new_cyclic`] and receives the allocated token plus
    /// the weak self-reference to wire into member descriptors. Insertion is first-wins: when a
    /// concurrent registration for the same id already published, the freshly built metadata is
    /// discarded and the winner returned.
    pub(crate) fn insert_cyclic(
        &self,
        id: TypeId,
        build: impl FnOnce(Token, &Weak<TypeMeta>) -> TypeMeta,
    ) -> TypeInfo {
        if let Some(existing) = self.get_by_id(id) {
            return existing;
        }

        let token = self.allocate_token();
        let info = TypeInfo::from_meta(Arc::new_cyclic(|weak| build(token, weak)));

        match self.by_id.entry(id) {
            Entry::Occupied(entry) => {
                let winner = *entry.get();
                drop(entry);
                self.get(winner)
                    .unwrap_or_else(|| unreachable!("index entries are published after the type"))
            }
            Entry::Vacant(entry) => {
                self.types.insert(token, info.clone());
                self.by_name
                    .entry(info.name().to_string())
                    .or_default()
                    .push(token);
                entry.insert(token);
                info
            }
        }
    }

    /// Look up a type by its registration token.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<TypeInfo> {
        self.types.get(&token).map(|entry| entry.value().clone())
    }

    /// Look up a type by runtime type id.
    #[must_use]
    pub fn get_by_id(&self, id: TypeId) -> Option<TypeInfo> {
        let token = *self.by_id.get(&id)?;
        self.get(token)
    }

    /// All registered types carrying the given simple name.
    ///
    /// Simple names are not unique; every parameterization of a generic container shares one.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Vec<TypeInfo> {
        match self.by_name.get(name) {
            Some(tokens) => tokens.iter().filter_map(|t| self.get(*t)).collect(),
            None => Vec::new(),
        }
    }

    /// Number of registered types, including the hierarchy root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check whether the registry holds no types. Never true in practice, since the root is
    /// registered at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Snapshot of all registered types in token order.
    #[must_use]
    pub fn all(&self) -> Vec<TypeInfo> {
        self.types
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_registered() {
        let registry = TypeRegistry::global();
        let root = registry.root();

        assert_eq!(root.name(), "Any");
        assert_eq!(root.token(), ROOT_TOKEN);
        assert!(root.super_type().is_none());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::new(0x2A).to_string(), "0x0000002A");
    }

    #[test]
    fn test_lookup_by_token_id_and_name() {
        let registry = TypeRegistry::global();
        let info = TypeInfo::of::<f64>();

        assert_eq!(registry.get(info.token()), Some(info.clone()));
        assert_eq!(registry.get_by_id(info.raw_id()), Some(info.clone()));
        assert!(registry.get_by_name("f64").contains(&info));
        assert!(registry.get_by_name("no-such-type").is_empty());
    }

    #[test]
    fn test_all_is_token_ordered() {
        let registry = TypeRegistry::global();
        let _ = TypeInfo::of::<u16>();

        let all = registry.all();
        let tokens: Vec<u32> = all.iter().map(|t| t.token().value()).collect();
        let mut sorted = tokens.clone();
        sorted.sort_unstable();
        assert_eq!(tokens, sorted);
    }
}
