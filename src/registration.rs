//! Component registrations and their lifecycle hooks.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::activators::Activator;
use crate::error::{BoxError, DiResult};
use crate::lifetime::{Lifetime, Ownership, Sharing};
use crate::parameters::Parameter;
use crate::provider::{LifetimeScope, ResolveContext};
use crate::service::Service;

/// Type-erased component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Registration-time metadata, exposed through `Meta` wrappers.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Process-unique registration identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegistrationId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raised before activation; may replace parameters or short-circuit with an instance.
pub struct PreparingEvent<'a> {
    pub context: &'a ResolveContext<'a>,
    pub registration: &'a ComponentRegistration,
    pub parameters: Vec<Parameter>,
    pub(crate) instance: Option<Instance>,
}

impl PreparingEvent<'_> {
    /// Supplies the instance, bypassing the activator.
    pub fn supply_instance(&mut self, instance: Instance) {
        self.instance = Some(instance);
    }
}

/// Raised after construction, before the instance is shared.
pub struct ActivatingEvent<'a> {
    pub context: &'a ResolveContext<'a>,
    pub registration: &'a ComponentRegistration,
    pub parameters: &'a [Parameter],
    pub(crate) instance: Instance,
}

impl ActivatingEvent<'_> {
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Replaces the instance, e.g. with a wrapping proxy.
    pub fn replace_instance(&mut self, instance: Instance) {
        self.instance = instance;
    }
}

/// Raised once the top-level resolve operation that created the instance completed.
pub struct ActivatedEvent<'a> {
    pub scope: &'a LifetimeScope,
    pub registration: &'a ComponentRegistration,
    pub instance: &'a Instance,
}

pub(crate) type PreparingFn = Arc<dyn Fn(&mut PreparingEvent<'_>) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type ActivatingFn = Arc<dyn Fn(&mut ActivatingEvent<'_>) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type ActivatedFn = Arc<dyn Fn(&ActivatedEvent<'_>) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type ReleaseFn = Arc<dyn Fn(&Instance) + Send + Sync>;

/// Ordered callback lists attached at build time.
#[derive(Clone, Default)]
pub(crate) struct LifecycleHooks {
    pub(crate) preparing: Vec<PreparingFn>,
    pub(crate) activating: Vec<ActivatingFn>,
    pub(crate) activated: Vec<ActivatedFn>,
    pub(crate) release: Vec<ReleaseFn>,
}

/// Everything about a registration except its activator.
///
/// Registration sources copy this from a template and swap in closed
/// services when they synthesize concrete registrations.
#[derive(Clone)]
pub(crate) struct RegistrationData {
    pub(crate) lifetime: Lifetime,
    pub(crate) ownership: Ownership,
    pub(crate) services: Vec<Service>,
    pub(crate) metadata: Metadata,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) autowire_properties: bool,
    pub(crate) hooks: LifecycleHooks,
}

impl RegistrationData {
    pub(crate) fn new(lifetime: Lifetime) -> Self {
        Self {
            lifetime,
            ownership: Ownership::OwnedByLifetimeScope,
            services: Vec::new(),
            metadata: Metadata::new(),
            parameters: Vec::new(),
            autowire_properties: false,
            hooks: LifecycleHooks::default(),
        }
    }

    pub(crate) fn add_service(&mut self, service: Service) {
        if !self.services.contains(&service) {
            self.services.push(service);
        }
    }
}

/// One distinct, constructible component.
///
/// Immutable once created; registrations are shared as
/// `Arc<ComponentRegistration>` between the registry, sources and scopes.
pub struct ComponentRegistration {
    id: RegistrationId,
    activator: Arc<dyn Activator>,
    data: RegistrationData,
    target: Option<Arc<ComponentRegistration>>,
}

impl ComponentRegistration {
    pub(crate) fn new(activator: Arc<dyn Activator>, data: RegistrationData) -> Arc<Self> {
        Arc::new(Self {
            id: RegistrationId::next(),
            activator,
            data,
            target: None,
        })
    }

    /// Standalone registration for custom registration sources and late
    /// registration through [`ComponentRegistry::register`](crate::ComponentRegistry::register).
    ///
    /// Services default to the activator's limit type when none are given.
    pub fn from_activator(
        activator: Arc<dyn Activator>,
        lifetime: Lifetime,
        services: impl IntoIterator<Item = Service>,
    ) -> Arc<Self> {
        let mut data = RegistrationData::new(lifetime);
        for service in services {
            data.add_service(service);
        }
        if data.services.is_empty() {
            data.add_service(Service::typed(activator.limit_type()));
        }
        Self::new(activator, data)
    }

    /// Registration synthesized from `upstream` (adapter or decorator).
    pub(crate) fn adapting(
        activator: Arc<dyn Activator>,
        data: RegistrationData,
        upstream: &Arc<ComponentRegistration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: RegistrationId::next(),
            activator,
            data,
            target: Some(upstream.target().clone()),
        })
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn activator(&self) -> &Arc<dyn Activator> {
        &self.activator
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.data.lifetime
    }

    pub fn sharing(&self) -> Sharing {
        self.data.lifetime.sharing()
    }

    pub fn ownership(&self) -> Ownership {
        self.data.ownership
    }

    pub fn services(&self) -> &[Service] {
        &self.data.services
    }

    pub fn metadata(&self) -> &Metadata {
        &self.data.metadata
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.data.parameters
    }

    pub fn autowires_properties(&self) -> bool {
        self.data.autowire_properties
    }

    /// The original component this registration was derived from, or itself.
    pub fn target(self: &Arc<Self>) -> &Arc<ComponentRegistration> {
        match &self.target {
            Some(upstream) => upstream,
            None => self,
        }
    }

    pub(crate) fn hooks(&self) -> &LifecycleHooks {
        &self.data.hooks
    }

    /// Disposer for `instance`, if the registration declared one.
    pub(crate) fn release_hook(&self, instance: &Instance) -> Option<Box<dyn FnOnce() + Send>> {
        if self.data.hooks.release.is_empty() {
            return None;
        }
        let hooks = self.data.hooks.release.clone();
        let instance = instance.clone();
        Some(Box::new(move || {
            for hook in &hooks {
                hook(&instance);
            }
        }))
    }

    pub(crate) fn run_preparing(&self, event: &mut PreparingEvent<'_>) -> DiResult<()> {
        for hook in &self.data.hooks.preparing {
            hook(event).map_err(|e| crate::DiError::activation(self.description(), e))?;
        }
        Ok(())
    }

    pub(crate) fn run_activating(&self, event: &mut ActivatingEvent<'_>) -> DiResult<()> {
        for hook in &self.data.hooks.activating {
            hook(event).map_err(|e| crate::DiError::activation(self.description(), e))?;
        }
        Ok(())
    }

    pub(crate) fn run_activated(&self, event: &ActivatedEvent<'_>) -> DiResult<()> {
        for hook in &self.data.hooks.activated {
            hook(event).map_err(|e| crate::DiError::activation(self.description(), e))?;
        }
        Ok(())
    }

    /// Activator description used in diagnostics.
    pub fn description(&self) -> String {
        self.activator.description()
    }
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("id", &self.id)
            .field("activator", &self.activator.description())
            .field("services", &self.data.services)
            .field("lifetime", &self.data.lifetime)
            .field("ownership", &self.data.ownership)
            .finish()
    }
}

impl fmt::Display for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services: Vec<String> = self.data.services.iter().map(Service::description).collect();
        write!(
            f,
            "Activator = {}, Services = [{}], Lifetime = {:?}, Ownership = {:?}",
            self.activator.description(),
            services.join(", "),
            self.data.lifetime,
            self.data.ownership
        )
    }
}
