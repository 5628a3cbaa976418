//! Lifetime scopes: nested units of instance sharing and disposal.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace, warn};

use super::operation::ResolveOperation;
use super::ContainerCore;
use crate::error::{DiError, DiResult};
use crate::internal::{DisposeBag, Disposer};
use crate::lifetime::{Lifetime, ScopeTag};
use crate::parameters::Parameter;
use crate::registration::{ComponentRegistration, Instance, RegistrationId};
use crate::registry::ComponentRegistry;
use crate::service::Service;
use crate::traits::ResolverCore;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// A lifetime scope.
///
/// Scopes form a tree rooted at the [`Container`](crate::Container). Each
/// scope shares instances of its [`Lifetime::Scoped`] registrations (and of
/// [`Lifetime::MatchingScope`] registrations when its tag matches) and
/// disposes the instances it owns when it ends. Singletons always live in
/// the root scope.
///
/// `LifetimeScope` is a cheap handle; clones refer to the same scope. The
/// scope is disposed by [`dispose`](LifetimeScope::dispose) or when the last
/// handle is dropped. Disposal ends child scopes first, then runs this
/// scope's disposers in reverse activation order.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct RequestContext;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_| Ok(RequestContext)).instance_per_lifetime_scope();
/// let container = builder.build().unwrap();
///
/// let request = container.begin_lifetime_scope();
/// let a = request.resolve::<RequestContext>().unwrap();
/// let b = request.resolve::<RequestContext>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let other = container.begin_lifetime_scope();
/// assert!(!Arc::ptr_eq(&a, &other.resolve::<RequestContext>().unwrap()));
///
/// request.dispose();
/// assert!(request.resolve::<RequestContext>().is_err());
/// ```
#[derive(Clone)]
pub struct LifetimeScope {
    inner: Arc<ScopeInner>,
}

/// A handle that does not keep its scope alive.
#[derive(Clone)]
pub(crate) struct WeakScope {
    inner: Weak<ScopeInner>,
}

impl WeakScope {
    /// The scope, if it is still alive and not disposed.
    pub(crate) fn upgrade(&self) -> Option<LifetimeScope> {
        let inner = self.inner.upgrade()?;
        if inner.disposed.load(Ordering::Acquire) {
            return None;
        }
        Some(LifetimeScope { inner })
    }
}

pub(crate) struct ScopeInner {
    id: u64,
    tag: ScopeTag,
    parent: Option<LifetimeScope>,
    core: Arc<ContainerCore>,
    shared: Mutex<AHashMap<RegistrationId, Instance>>,
    creation_lock: ReentrantMutex<()>,
    disposer: Mutex<DisposeBag>,
    children: Mutex<Vec<Weak<ScopeInner>>>,
    disposed: AtomicBool,
}

impl LifetimeScope {
    pub(crate) fn root(core: Arc<ContainerCore>) -> Self {
        let tag = ScopeTag::new(core.options.root_tag.as_str());
        Self::create(core, Some(tag), None)
    }

    /// Untagged scopes get a unique generated tag.
    fn create(core: Arc<ContainerCore>, tag: Option<ScopeTag>, parent: Option<LifetimeScope>) -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        let disposed = parent.as_ref().is_some_and(LifetimeScope::is_disposed);
        let scope = Self {
            inner: Arc::new(ScopeInner {
                id,
                tag: tag.unwrap_or_else(|| ScopeTag::new(format!("scope-{}", id))),
                parent,
                core,
                shared: Mutex::new(AHashMap::new()),
                creation_lock: ReentrantMutex::new(()),
                disposer: Mutex::new(DisposeBag::default()),
                children: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(disposed),
            }),
        };
        if disposed {
            scope.inner.disposer.lock().close();
        }
        scope
    }

    /// Starts a child scope tagged with a generated unique tag.
    pub fn begin_lifetime_scope(&self) -> LifetimeScope {
        self.begin_child(None)
    }

    /// Starts a child scope with `tag`, matched by
    /// [`Lifetime::MatchingScope`] registrations.
    ///
    /// A child of a disposed scope starts disposed.
    pub fn begin_tagged_lifetime_scope(&self, tag: impl Into<ScopeTag>) -> LifetimeScope {
        self.begin_child(Some(tag.into()))
    }

    fn begin_child(&self, tag: Option<ScopeTag>) -> LifetimeScope {
        let child = Self::create(self.inner.core.clone(), tag, Some(self.clone()));
        let mut children = self.inner.children.lock();
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
        drop(children);
        trace!(parent = %self.inner.tag, child = %child.inner.tag, "lifetime scope started");
        child
    }

    pub fn tag(&self) -> &ScopeTag {
        &self.inner.tag
    }

    pub fn parent(&self) -> Option<&LifetimeScope> {
        self.inner.parent.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// The component registry shared by every scope of the container.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.core.registry
    }

    /// Ends the scope: disposes child scopes, then every owned instance in
    /// reverse activation order. Later calls do nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Number of instances waiting to be disposed with this scope.
    pub fn tracked_disposals(&self) -> usize {
        self.inner.disposer.lock().len()
    }

    pub(crate) fn core(&self) -> &ContainerCore {
        &self.inner.core
    }

    pub(crate) fn downgrade(&self) -> WeakScope {
        WeakScope {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn ensure_open(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::Disposed(format!("lifetime scope '{}'", self.inner.tag)));
        }
        Ok(())
    }

    fn root_scope(&self) -> &LifetimeScope {
        let mut scope = self;
        while let Some(parent) = scope.parent() {
            scope = parent;
        }
        scope
    }

    /// The scope that shares and owns instances of `registration` when it
    /// is resolved from this scope.
    pub(crate) fn activation_scope(&self, registration: &ComponentRegistration) -> DiResult<LifetimeScope> {
        match registration.lifetime() {
            Lifetime::Singleton => Ok(self.root_scope().clone()),
            Lifetime::Scoped | Lifetime::Transient => Ok(self.clone()),
            Lifetime::MatchingScope(tags) => {
                let mut scope = Some(self);
                while let Some(current) = scope {
                    if tags.contains(&current.inner.tag) {
                        return Ok(current.clone());
                    }
                    scope = current.parent();
                }
                Err(DiError::NoMatchingScope {
                    component: registration.description(),
                    tags: tags.iter().map(ToString::to_string).collect(),
                })
            }
        }
    }

    /// Shared instance of `id`, created by `create` at most once per scope.
    ///
    /// Creation is serialized per scope by a reentrant lock, so nested
    /// activations on the same thread proceed while other threads wait and
    /// then observe the stored instance.
    pub(crate) fn get_or_create_shared<F>(&self, id: RegistrationId, create: F) -> DiResult<Instance>
    where
        F: FnOnce() -> DiResult<Instance>,
    {
        if let Some(instance) = self.inner.shared.lock().get(&id) {
            return Ok(instance.clone());
        }
        let _creating = self.inner.creation_lock.lock();
        if let Some(instance) = self.inner.shared.lock().get(&id) {
            return Ok(instance.clone());
        }
        let instance = create()?;
        self.ensure_open()?;
        self.inner.shared.lock().insert(id, instance.clone());
        Ok(instance)
    }

    /// Queues `disposer` to run when the scope ends. If the scope already
    /// ended, runs it immediately and fails.
    pub(crate) fn track(&self, disposer: Disposer) -> DiResult<()> {
        let rejected = self.inner.disposer.lock().push(disposer);
        match rejected {
            Ok(()) => Ok(()),
            Err(disposer) => {
                run_disposer(&self.inner.tag, disposer);
                Err(DiError::Disposed(format!("lifetime scope '{}'", self.inner.tag)))
            }
        }
    }

    /// Resolves `registration` as `service` in a new top-level operation.
    pub(crate) fn resolve_component(
        &self,
        service: &Service,
        registration: &Arc<ComponentRegistration>,
        parameters: &[Parameter],
    ) -> DiResult<Instance> {
        ResolveOperation::execute(self, service, Some(registration), parameters)?.ok_or_else(|| {
            DiError::NotRegistered {
                service: service.description(),
            }
        })
    }
}

impl ResolverCore for LifetimeScope {
    fn resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Instance> {
        self.try_resolve_with(service, parameters)?
            .ok_or_else(|| DiError::NotRegistered {
                service: service.description(),
            })
    }

    fn try_resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Option<Instance>> {
        ResolveOperation::execute(self, service, None, parameters)
    }

    fn is_registered(&self, service: &Service) -> bool {
        self.registry().is_registered(service)
    }
}

impl fmt::Debug for LifetimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeScope")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().rev() {
            if let Some(child) = child.upgrade() {
                child.dispose();
            }
        }

        // Wait for in-flight shared activations before tearing down.
        let disposers = {
            let _creating = self.creation_lock.lock();
            self.disposer.lock().close()
        };
        let count = disposers.len();
        for disposer in disposers {
            run_disposer(&self.tag, disposer);
        }
        self.shared.lock().clear();

        debug!(scope = %self.tag, disposed = count, "lifetime scope disposed");
        self.core.observers.scope_disposed(self.tag.as_str());
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_disposer(tag: &ScopeTag, disposer: Disposer) {
    if catch_unwind(AssertUnwindSafe(disposer)).is_err() {
        warn!(scope = %tag, "disposer panicked; continuing with the remaining disposers");
    }
}
