//! The built container and its runtime resolution machinery.
//!
//! A [`Container`] owns the root [`LifetimeScope`]; every resolve request
//! runs as a resolve operation against some scope and hands a
//! [`ResolveContext`] to the activators and hooks it invokes.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::error::DiResult;
use crate::observer::Observers;
use crate::parameters::Parameter;
use crate::registration::Instance;
use crate::registry::ComponentRegistry;
use crate::service::Service;
use crate::traits::ResolverCore;
use crate::types::TypeOracle;

mod context;
mod operation;
mod scope;

pub use context::ResolveContext;
pub use scope::LifetimeScope;
pub(crate) use scope::WeakScope;

/// State shared by every scope of one container.
pub(crate) struct ContainerCore {
    pub(crate) registry: ComponentRegistry,
    pub(crate) oracle: Arc<dyn TypeOracle>,
    pub(crate) options: ContainerOptions,
    pub(crate) observers: Observers,
}

/// A built container: the root lifetime scope plus the component registry.
///
/// `Container` dereferences to its root [`LifetimeScope`], so child scopes
/// are started and the registry is inspected directly on it. Singletons are
/// owned by the root scope and disposed with the container.
///
/// # Thread Safety
///
/// The container is `Send + Sync` and cheap to clone; clones share the same
/// root scope. Concurrent resolution is supported and each shared instance is
/// constructed at most once per scope.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Database { url: "postgres://localhost".to_string() });
/// builder.register(|ctx| Ok(UserService { db: ctx.resolve::<Database>()? }));
///
/// let container = builder.build().unwrap();
/// let users = container.resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    root: LifetimeScope,
}

impl Container {
    pub(crate) fn new(core: ContainerCore) -> Self {
        Self {
            root: LifetimeScope::root(Arc::new(core)),
        }
    }

    /// The root lifetime scope.
    pub fn root_scope(&self) -> &LifetimeScope {
        &self.root
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.root.core().options
    }

    pub fn oracle(&self) -> &dyn TypeOracle {
        self.root.core().oracle.as_ref()
    }
}

impl Deref for Container {
    type Target = LifetimeScope;

    fn deref(&self) -> &LifetimeScope {
        &self.root
    }
}

impl ResolverCore for Container {
    fn resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Instance> {
        self.root.resolve_with(service, parameters)
    }

    fn try_resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Option<Instance>> {
        self.root.try_resolve_with(service, parameters)
    }

    fn is_registered(&self, service: &Service) -> bool {
        self.root.is_registered(service)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("root", &self.root)
            .field("registrations", &self.root.registry().registrations().len())
            .finish()
    }
}
