//! Component lifetime, sharing and ownership definitions.

use std::fmt;
use std::sync::Arc;

/// Tag attached to a lifetime scope, matched by
/// [`Lifetime::MatchingScope`] registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeTag(Arc<str>);

impl ScopeTag {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for ScopeTag {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

/// Where in the scope tree instances of a component are shared.
///
/// # Lifetime Characteristics
///
/// - **Singleton**: one instance for the whole tree, owned by the root scope
/// - **Scoped**: one instance per lifetime scope that resolves it
/// - **MatchingScope**: one instance per nearest ancestor scope carrying a tag
/// - **Transient**: a new instance on every resolve
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ContainerBuilder, Resolver, Lifetime};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UnitOfWork;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Database { url: "postgres://localhost".to_string() });
/// builder.register(|_| Ok(UnitOfWork)).instance_per_lifetime_scope();
///
/// let container = builder.build().unwrap();
/// let scope = container.begin_lifetime_scope();
///
/// let db1 = container.resolve::<Database>().unwrap();
/// let db2 = scope.resolve::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let uow1 = scope.resolve::<UnitOfWork>().unwrap();
/// let uow2 = scope.resolve::<UnitOfWork>().unwrap();
/// assert!(Arc::ptr_eq(&uow1, &uow2));
/// assert!(!Arc::ptr_eq(&uow1, &container.resolve::<UnitOfWork>().unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifetime {
    /// Shared in the root scope, whichever descendant resolves it.
    Singleton,
    /// Shared in the scope that resolves it.
    Scoped,
    /// Shared in the nearest enclosing scope (inclusive) whose tag is listed.
    MatchingScope(Arc<[ScopeTag]>),
    /// Never shared.
    Transient,
}

impl Lifetime {
    pub fn matching<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ScopeTag>,
    {
        Lifetime::MatchingScope(tags.into_iter().map(Into::into).collect::<Vec<_>>().into())
    }

    /// Sharing policy implied by the lifetime.
    pub fn sharing(&self) -> Sharing {
        match self {
            Lifetime::Transient => Sharing::None,
            _ => Sharing::Shared,
        }
    }
}

/// Whether resolutions within the applicable scope return the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    None,
    Shared,
}

/// Who disposes activated instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    /// The activation scope disposes the instance when it ends.
    #[default]
    OwnedByLifetimeScope,
    /// The caller is responsible for cleanup.
    ExternallyOwned,
}
