//! One top-level resolve request and every nested activation it causes.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use super::context::ResolveContext;
use super::LifetimeScope;
use crate::error::{DiError, DiResult};
use crate::internal::ResolveStack;
use crate::lifetime::{Ownership, Sharing};
use crate::parameters::Parameter;
use crate::registration::{ActivatedEvent, ActivatingEvent, ComponentRegistration, Instance, PreparingEvent};
use crate::service::Service;
use crate::traits::ResolverCore;

/// An activation whose `Activated` hooks wait for the operation to finish.
struct PendingActivation {
    scope: LifetimeScope,
    registration: Arc<ComponentRegistration>,
    instance: Instance,
}

/// State of a single top-level resolve request.
///
/// Lives on the resolving thread's stack for the duration of the request;
/// nested resolutions borrow it through their [`ResolveContext`].
pub(crate) struct ResolveOperation {
    stack: ResolveStack,
    activated: RefCell<Vec<PendingActivation>>,
}

impl ResolveOperation {
    fn new(max_depth: usize) -> Self {
        Self {
            stack: ResolveStack::new(max_depth),
            activated: RefCell::new(Vec::new()),
        }
    }

    /// Runs a top-level request for `service` (or for `registration` as
    /// `service`, when given) against `scope`, then the deferred `Activated`
    /// hooks. `Ok(None)` means nothing provides `service`.
    pub(crate) fn execute(
        scope: &LifetimeScope,
        service: &Service,
        registration: Option<&Arc<ComponentRegistration>>,
        parameters: &[Parameter],
    ) -> DiResult<Option<Instance>> {
        let core = scope.core();
        let observed = core.observers.has_observers();
        if observed {
            core.observers.resolving(service);
        }
        let started = Instant::now();

        let operation = ResolveOperation::new(core.options.max_resolve_depth);
        let result = match registration {
            Some(registration) => operation
                .get_or_create(scope, service, registration, parameters)
                .map(Some),
            None => operation.resolve(scope, service, parameters),
        }
        .and_then(|instance| {
            operation.complete()?;
            Ok(instance)
        });

        if observed {
            match &result {
                Ok(Some(_)) => core.observers.resolved(service, started.elapsed()),
                Ok(None) => core.observers.resolution_failed(
                    service,
                    &DiError::NotRegistered {
                        service: service.description(),
                    },
                ),
                Err(e) => core.observers.resolution_failed(service, e),
            }
        }
        result
    }

    /// Resolves the default registration of `service` within this operation.
    pub(crate) fn resolve(
        &self,
        scope: &LifetimeScope,
        service: &Service,
        parameters: &[Parameter],
    ) -> DiResult<Option<Instance>> {
        scope.ensure_open()?;
        match scope.registry().try_get_registration(service) {
            Some(registration) => self.get_or_create(scope, service, &registration, parameters).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the shared instance of `registration` for `scope`, or
    /// activates a new one.
    pub(crate) fn get_or_create(
        &self,
        scope: &LifetimeScope,
        service: &Service,
        registration: &Arc<ComponentRegistration>,
        parameters: &[Parameter],
    ) -> DiResult<Instance> {
        scope.ensure_open()?;
        let _frame = self.stack.enter(registration.id(), &service.description())?;
        let activation_scope = scope.activation_scope(registration)?;

        match registration.sharing() {
            Sharing::None => self.activate(&activation_scope, service, registration, parameters),
            Sharing::Shared => activation_scope.get_or_create_shared(registration.id(), || {
                self.activate(&activation_scope, service, registration, parameters)
            }),
        }
    }

    fn activate(
        &self,
        scope: &LifetimeScope,
        service: &Service,
        registration: &Arc<ComponentRegistration>,
        parameters: &[Parameter],
    ) -> DiResult<Instance> {
        trace!(
            service = %service,
            registration = %registration.id(),
            scope = %scope.tag(),
            depth = self.stack.depth(),
            "activating component"
        );

        let call_site = ResolveContext::new(self, scope, registration, service, parameters);
        let mut preparing = PreparingEvent {
            context: &call_site,
            registration: registration.as_ref(),
            parameters: parameters.to_vec(),
            instance: None,
        };
        registration.run_preparing(&mut preparing)?;
        let PreparingEvent {
            parameters: mut effective,
            instance: supplied,
            ..
        } = preparing;
        effective.extend(registration.parameters().iter().cloned());

        let ctx = ResolveContext::new(self, scope, registration, service, &effective);
        let instance = match supplied {
            Some(instance) => instance,
            None => {
                let instance = registration.activator().activate(&ctx, &effective)?;
                self.inject_properties(&ctx, registration, instance)?
            }
        };

        let mut activating = ActivatingEvent {
            context: &ctx,
            registration: registration.as_ref(),
            parameters: &effective,
            instance,
        };
        registration.run_activating(&mut activating)?;
        let instance = activating.instance;

        if registration.ownership() == Ownership::OwnedByLifetimeScope {
            if let Some(disposer) = registration.release_hook(&instance) {
                scope.track(disposer)?;
            }
        }
        if !registration.hooks().activated.is_empty() {
            self.activated.borrow_mut().push(PendingActivation {
                scope: scope.clone(),
                registration: registration.clone(),
                instance: instance.clone(),
            });
        }
        Ok(instance)
    }

    /// Sets the catalog-declared properties of a freshly activated instance.
    ///
    /// Required properties are always set and fail activation when their
    /// type cannot be resolved; optional ones only when the registration
    /// autowires properties, and are skipped when unresolvable.
    fn inject_properties(
        &self,
        ctx: &ResolveContext<'_>,
        registration: &Arc<ComponentRegistration>,
        instance: Instance,
    ) -> DiResult<Instance> {
        let limit = registration.activator().limit_type();
        let Some(definition) = ctx.oracle().definition(&limit) else {
            return Ok(instance);
        };
        let bindings = definition.bindings_for(&limit);
        for property in definition.properties() {
            if !property.is_required() && !registration.autowires_properties() {
                continue;
            }
            let service = Service::typed(property.ty().substitute(&bindings));
            let value = match ctx.try_resolve_with(&service, &[])? {
                Some(value) => value,
                None if property.is_required() => {
                    return Err(DiError::RequiredProperty {
                        component: registration.description(),
                        property: property.name().to_string(),
                    })
                }
                None => continue,
            };
            trace!(component = %limit, property = property.name(), "injecting property");
            property
                .set(&instance, value)
                .map_err(|e| DiError::activation(registration.description(), e))?;
        }
        Ok(instance)
    }

    /// Fires the deferred `Activated` hooks in activation order.
    fn complete(&self) -> DiResult<()> {
        let pending = std::mem::take(&mut *self.activated.borrow_mut());
        for activation in &pending {
            let event = ActivatedEvent {
                scope: &activation.scope,
                registration: activation.registration.as_ref(),
                instance: &activation.instance,
            };
            activation.registration.run_activated(&event)?;
        }
        Ok(())
    }
}
