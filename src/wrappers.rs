//! Relationship types resolved through the built-in adapter sources.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{DiError, DiResult};
use crate::provider::{LifetimeScope, WeakScope};
use crate::registration::{ComponentRegistration, Instance, Metadata};
use crate::service::Service;

fn downcast<T: Any + Send + Sync>(instance: Instance) -> DiResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

/// Deferred resolution of one component.
///
/// The component is activated on the first call to [`value`](Lazy::value),
/// in the scope the `Lazy` was resolved from, and memoised afterwards. A
/// `Lazy` does not keep its scope alive: once the scope is disposed or
/// dropped, an unforced `Lazy` fails with [`DiError::Disposed`].
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_| Ok(String::from("expensive"))).single_instance();
/// let container = builder.build().unwrap();
///
/// let lazy = container.resolve_lazy::<String>().unwrap();
/// assert!(!lazy.is_value_created());
/// assert_eq!(*lazy.get::<String>().unwrap(), "expensive");
/// assert!(lazy.is_value_created());
/// ```
pub struct Lazy {
    scope: WeakScope,
    service: Service,
    registration: Arc<ComponentRegistration>,
    value: OnceCell<Instance>,
}

impl Lazy {
    pub(crate) fn new(scope: &LifetimeScope, service: Service, registration: Arc<ComponentRegistration>) -> Self {
        Self {
            scope: scope.downgrade(),
            service,
            registration,
            value: OnceCell::new(),
        }
    }

    /// The component, activating it on first use.
    pub fn value(&self) -> DiResult<Instance> {
        self.value
            .get_or_try_init(|| {
                let scope = self
                    .scope
                    .upgrade()
                    .ok_or_else(|| DiError::Disposed(format!("scope of Lazy<{}>", self.service)))?;
                scope.resolve_component(&self.service, &self.registration, &[])
            })
            .cloned()
    }

    /// The component downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast(self.value()?)
    }

    pub fn is_value_created(&self) -> bool {
        self.value.get().is_some()
    }

    /// The service this `Lazy` resolves.
    pub fn service(&self) -> &Service {
        &self.service
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("service", &self.service)
            .field("registration", &self.registration.id())
            .field("created", &self.is_value_created())
            .finish()
    }
}

/// A component together with the metadata of the registration that
/// produced it.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register_instance(8080u16)
///     .with_metadata("role", "http");
/// let container = builder.build().unwrap();
///
/// let meta = container.resolve_meta::<u16>().unwrap();
/// assert_eq!(*meta.get::<u16>().unwrap(), 8080);
/// assert_eq!(meta.metadata()["role"], "http");
/// ```
pub struct Meta {
    value: Instance,
    metadata: Metadata,
}

impl Meta {
    pub(crate) fn new(value: Instance, metadata: Metadata) -> Self {
        Self { value, metadata }
    }

    pub fn value(&self) -> &Instance {
        &self.value
    }

    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast(self.value.clone())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta").field("metadata", &self.metadata).finish_non_exhaustive()
    }
}

/// Every implementation of a service, in registration order.
pub struct Collection {
    items: Vec<Instance>,
}

impl Collection {
    pub(crate) fn new(items: Vec<Instance>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.items.iter()
    }

    /// Every item downcast to `T`; fails on the first item of another type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> DiResult<Vec<Arc<T>>> {
        self.items.iter().cloned().map(downcast).collect()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("len", &self.items.len()).finish()
    }
}
