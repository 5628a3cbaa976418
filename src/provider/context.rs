//! The context handed to activators, factories and lifecycle hooks.

use std::fmt;
use std::sync::Arc;

use super::operation::ResolveOperation;
use super::LifetimeScope;
use crate::error::{DiError, DiResult};
use crate::parameters::Parameter;
use crate::registration::{ComponentRegistration, Instance};
use crate::service::Service;
use crate::traits::ResolverCore;
use crate::types::TypeOracle;

/// One component activation within a running resolve operation.
///
/// Dependencies resolved through the context join the same operation: they
/// share its circular-dependency tracking and are resolved against the
/// scope the component is activated in, so a singleton never captures an
/// instance owned by a shorter-lived scope.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Client { config: Arc<Config> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Config { url: "http://localhost".into() });
/// builder.register(|ctx| Ok(Client { config: ctx.resolve::<Config>()? }));
///
/// let container = builder.build().unwrap();
/// assert_eq!(container.resolve::<Client>().unwrap().config.url, "http://localhost");
/// ```
pub struct ResolveContext<'a> {
    operation: &'a ResolveOperation,
    scope: &'a LifetimeScope,
    registration: &'a Arc<ComponentRegistration>,
    service: &'a Service,
    parameters: &'a [Parameter],
}

impl<'a> ResolveContext<'a> {
    pub(crate) fn new(
        operation: &'a ResolveOperation,
        scope: &'a LifetimeScope,
        registration: &'a Arc<ComponentRegistration>,
        service: &'a Service,
        parameters: &'a [Parameter],
    ) -> Self {
        Self {
            operation,
            scope,
            registration,
            service,
            parameters,
        }
    }

    /// The scope the component is being activated in.
    pub fn scope(&self) -> &LifetimeScope {
        self.scope
    }

    /// The registration being activated.
    pub fn registration(&self) -> &Arc<ComponentRegistration> {
        self.registration
    }

    /// The service the component was requested as.
    pub fn service(&self) -> &Service {
        self.service
    }

    /// Effective parameters of this activation.
    pub fn parameters(&self) -> &[Parameter] {
        self.parameters
    }

    pub fn oracle(&self) -> &dyn TypeOracle {
        self.scope.core().oracle.as_ref()
    }

    /// Every implementation of `service`, most preferred first.
    pub fn registrations_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        self.scope.registry().registrations_for(service)
    }

    /// Resolves a specific registration as `service`, within this operation.
    pub(crate) fn resolve_component(
        &self,
        service: &Service,
        registration: &Arc<ComponentRegistration>,
        parameters: &[Parameter],
    ) -> DiResult<Instance> {
        self.operation.get_or_create(self.scope, service, registration, parameters)
    }
}

impl ResolverCore for ResolveContext<'_> {
    fn resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Instance> {
        self.try_resolve_with(service, parameters)?
            .ok_or_else(|| DiError::NotRegistered {
                service: service.description(),
            })
    }

    fn try_resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Option<Instance>> {
        self.operation.resolve(self.scope, service, parameters)
    }

    fn is_registered(&self, service: &Service) -> bool {
        self.scope.registry().is_registered(service)
    }
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("service", self.service)
            .field("registration", &self.registration.id())
            .field("scope", &self.scope.tag())
            .finish()
    }
}
