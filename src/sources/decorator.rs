//! Decorator registrations: wrap every component registered under one key
//! and expose the wrapped result under another.

use std::fmt;
use std::sync::Arc;

use crate::activators::ReflectionActivator;
use crate::error::{DiError, DiResult};
use crate::parameters::Parameter;
use crate::registration::{ComponentRegistration, RegistrationData};
use crate::service::{Service, ServiceKey};
use crate::sources::RegistrationAccessor;
use crate::types::catalog::bind_generic_arguments;
use crate::types::{TypeBindings, TypeDesc, TypeOracle};

/// Decorates the components registered as `(from_key) service` and exposes
/// each decorated instance as `(to_key) service`.
///
/// The decorator type receives the inner instance through the constructor
/// parameter whose type is the decorated service. Chains are built by
/// registering decorators at successive keys (`base -> mid`, `mid -> top`).
/// Both the decorator and the service may be open generic definitions.
pub struct DecoratorSource {
    oracle: Arc<dyn TypeOracle>,
    decorator: TypeDesc,
    service: TypeDesc,
    from_key: ServiceKey,
    to_key: ServiceKey,
    template: RegistrationData,
}

impl DecoratorSource {
    pub(crate) fn new(
        oracle: Arc<dyn TypeOracle>,
        decorator: TypeDesc,
        service: TypeDesc,
        from_key: ServiceKey,
        to_key: ServiceKey,
        template: RegistrationData,
    ) -> DiResult<Self> {
        if from_key == to_key {
            return Err(DiError::config(format!(
                "decorator '{}' for '{}' must decorate from one key to a different one (both are {})",
                decorator, service, from_key
            )));
        }
        if decorator.is_open() && !decorator.is_generic_definition() {
            return Err(DiError::config(format!(
                "decorator '{}' is neither closed nor an open generic type definition",
                decorator
            )));
        }
        if decorator.is_open() != service.is_open() {
            return Err(DiError::config(format!(
                "decorator '{}' and decorated service '{}' must both be open or both be closed",
                decorator, service
            )));
        }
        if oracle.definition(&decorator).is_none() {
            return Err(DiError::config(format!(
                "decorator type '{}' is not described in the type catalog",
                decorator
            )));
        }
        Ok(Self {
            oracle,
            decorator,
            service,
            from_key,
            to_key,
            template,
        })
    }

    /// Closed decorator type for the closed service `requested`.
    fn close_decorator(&self, requested: &TypeDesc) -> Option<TypeDesc> {
        if !self.decorator.is_open() {
            return Some(self.decorator.clone());
        }
        let definition = self.oracle.definition(&self.decorator)?;
        let args = bind_generic_arguments(self.oracle.as_ref(), definition, requested)?;
        Some(TypeDesc::generic(definition.name().clone(), args))
    }

    pub(crate) fn registrations_for(
        &self,
        service: &Service,
        accessor: RegistrationAccessor<'_>,
    ) -> Vec<Arc<ComponentRegistration>> {
        let Service::Keyed(requested, key) = service else {
            return Vec::new();
        };
        if *key != self.to_key || requested.is_open() {
            return Vec::new();
        }
        let applies = if self.service.is_open() {
            self.service.same_definition(requested) && TypeDesc::unify(&self.service, requested, &mut TypeBindings::new())
        } else {
            self.service == *requested
        };
        if !applies {
            return Vec::new();
        }
        let Some(decorator) = self.close_decorator(requested) else {
            return Vec::new();
        };

        let inner_service = Service::keyed(requested.clone(), self.from_key.clone());
        let mut produced = Vec::new();
        for upstream in accessor(&inner_service) {
            let Ok(activator) = ReflectionActivator::new(self.oracle.clone(), decorator.clone()) else {
                continue;
            };

            let decorated_type = requested.clone();
            let inner = inner_service.clone();
            let target = upstream.clone();
            let decorated = Parameter::resolved(
                move |param| *param.ty() == decorated_type,
                move |ctx| ctx.resolve_component(&inner, &target, &[]),
            );

            let mut data = self.template.clone();
            data.services = vec![service.clone()];
            data.parameters.insert(0, decorated);
            produced.push(ComponentRegistration::adapting(Arc::new(activator), data, &upstream));
        }
        produced
    }
}

impl fmt::Display for DecoratorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decorator {} for ({}) {} -> ({}) {}",
            self.decorator, self.from_key, self.service, self.to_key, self.service
        )
    }
}
