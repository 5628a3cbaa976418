//! Fluent configuration of a single registration.

use std::any::Any;
use std::sync::Arc;

use super::PendingRegistration;
use crate::error::BoxError;
use crate::lifetime::{Lifetime, Ownership, ScopeTag};
use crate::parameters::Parameter;
use crate::registration::{ActivatedEvent, ActivatingEvent, Instance, PreparingEvent};
use crate::service::{Service, ServiceKey};
use crate::traits::Dispose;
use crate::types::TypeDesc;

/// Configures the registration just added to a
/// [`ContainerBuilder`](crate::ContainerBuilder).
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Connection { url: String }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|_| Ok(Connection { url: "postgres://primary".into() }))
///     .named::<Connection>("primary")
///     .instance_per_matching_lifetime_scope(["request"])
///     .with_metadata("pool", 10);
///
/// let container = builder.build().unwrap();
/// let request = container.begin_tagged_lifetime_scope("request");
/// let nested = request.begin_lifetime_scope();
/// let a = request.resolve_named::<Connection>("primary").unwrap();
/// let b = nested.resolve_named::<Connection>("primary").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(container.resolve_named::<Connection>("primary").is_err());
/// ```
pub struct RegistrationBuilder<'a> {
    entry: &'a mut PendingRegistration,
}

impl<'a> RegistrationBuilder<'a> {
    pub(crate) fn new(entry: &'a mut PendingRegistration) -> Self {
        Self { entry }
    }

    // ----- Services -----

    /// Exposes the component as `ty`.
    pub fn as_service(self, ty: TypeDesc) -> Self {
        self.entry.data.add_service(Service::typed(ty));
        self
    }

    /// Exposes the component as the Rust type `S`.
    pub fn as_type<S: ?Sized + 'static>(self) -> Self {
        self.as_service(TypeDesc::of::<S>())
    }

    /// Exposes the component as its own type, alongside other services.
    pub fn as_self(self) -> Self {
        if let Some(limit) = self.entry.limit_type() {
            self.entry.data.add_service(Service::typed(limit));
        }
        self
    }

    /// Exposes the component as `S` under `key`.
    pub fn keyed<S: ?Sized + 'static>(self, key: impl Into<ServiceKey>) -> Self {
        self.keyed_service(TypeDesc::of::<S>(), key)
    }

    pub fn keyed_service(self, ty: TypeDesc, key: impl Into<ServiceKey>) -> Self {
        self.entry.data.add_service(Service::keyed(ty, key));
        self
    }

    /// Exposes the component as `S` under a string key.
    pub fn named<S: ?Sized + 'static>(self, name: &str) -> Self {
        self.keyed::<S>(name)
    }

    // ----- Lifetime and ownership -----

    /// One instance for the whole container, owned by the root scope.
    pub fn single_instance(self) -> Self {
        self.entry.data.lifetime = Lifetime::Singleton;
        self
    }

    /// One instance per lifetime scope.
    pub fn instance_per_lifetime_scope(self) -> Self {
        self.entry.data.lifetime = Lifetime::Scoped;
        self
    }

    /// One instance per nearest enclosing scope tagged with one of `tags`.
    pub fn instance_per_matching_lifetime_scope<I, T>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ScopeTag>,
    {
        self.entry.data.lifetime = Lifetime::matching(tags);
        self
    }

    /// A new instance for every request.
    pub fn instance_per_dependency(self) -> Self {
        self.entry.data.lifetime = Lifetime::Transient;
        self
    }

    /// The container never disposes instances of this component.
    pub fn externally_owned(self) -> Self {
        self.entry.data.ownership = Ownership::ExternallyOwned;
        self
    }

    /// Keeps registrations made earlier as the defaults for this
    /// component's services.
    pub fn preserve_existing_defaults(self) -> Self {
        self.entry.preserve_defaults = true;
        self
    }

    // ----- Activation -----

    /// Parameter applied on every activation, after call-site parameters.
    pub fn with_parameter(self, parameter: Parameter) -> Self {
        self.entry.data.parameters.push(parameter);
        self
    }

    pub fn with_metadata(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.entry.data.metadata.insert(key.into(), value.into());
        self
    }

    /// Restricts a catalog type to the constructor with these parameter
    /// types. For open generics the types may use the definition's
    /// parameters.
    pub fn using_constructor(self, signature: impl IntoIterator<Item = TypeDesc>) -> Self {
        self.entry.signature = Some(signature.into_iter().collect());
        self
    }

    /// Also injects optional catalog properties whose types can be resolved.
    pub fn properties_autowired(self) -> Self {
        self.entry.data.autowire_properties = true;
        self
    }

    // ----- Lifecycle hooks -----

    pub fn on_preparing<F>(self, hook: F) -> Self
    where
        F: Fn(&mut PreparingEvent<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.entry.data.hooks.preparing.push(Arc::new(hook));
        self
    }

    pub fn on_activating<F>(self, hook: F) -> Self
    where
        F: Fn(&mut ActivatingEvent<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.entry.data.hooks.activating.push(Arc::new(hook));
        self
    }

    /// Runs once the resolve request that created the instance completed.
    pub fn on_activated<F>(self, hook: F) -> Self
    where
        F: Fn(&ActivatedEvent<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.entry.data.hooks.activated.push(Arc::new(hook));
        self
    }

    /// Runs when the owning scope ends, for instances of type `T`.
    pub fn on_release<T, F>(self, hook: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let release = move |instance: &Instance| {
            if let Some(value) = instance.downcast_ref::<T>() {
                hook(value);
            }
        };
        self.entry.data.hooks.release.push(Arc::new(release));
        self
    }

    /// Calls [`Dispose::dispose`] when the owning scope ends.
    pub fn dispose_with<T: Dispose>(self) -> Self {
        self.on_release::<T, _>(|value| value.dispose())
    }
}
