//! Closing open generic registrations on demand.

use std::fmt;
use std::sync::Arc;

use super::same_key;
use crate::activators::{DelegateActivator, ReflectionActivator};
use crate::error::{BoxError, DiError, DiResult};
use crate::parameters::Parameter;
use crate::provider::ResolveContext;
use crate::registration::{ComponentRegistration, Instance, RegistrationData};
use crate::service::Service;
use crate::types::catalog::bind_generic_arguments;
use crate::types::{TypeBindings, TypeDesc, TypeOracle};

pub(crate) type GenericFactory =
    Arc<dyn Fn(&ResolveContext<'_>, &[TypeDesc], &[Parameter]) -> Result<Instance, BoxError> + Send + Sync>;

/// Template service matching `requested`, if any.
fn matching_template<'a>(templates: &'a [Service], requested: &Service) -> Option<&'a Service> {
    let ty = requested.service_type()?;
    if ty.is_open() {
        return None;
    }
    templates.iter().find(|t| {
        same_key(t, requested) && t.service_type().is_some_and(|tt| tt.same_definition(ty))
    })
}

/// Binds an open implementation type such as `Repository<T>` to closed
/// requests such as `IRepository<User>`.
///
/// The implementation's parameters are recovered by unifying its declared
/// supertypes with the request; a request that cannot be unified, or whose
/// arguments violate a constraint, is silently not served.
pub struct OpenGenericSource {
    oracle: Arc<dyn TypeOracle>,
    implementation: TypeDesc,
    template: RegistrationData,
    signature: Option<Vec<TypeDesc>>,
}

impl OpenGenericSource {
    /// Validates the registration eagerly: the implementation and every
    /// service must be generic type definitions, and the implementation
    /// must be assignable to each service's definition.
    pub(crate) fn new(
        oracle: Arc<dyn TypeOracle>,
        implementation: TypeDesc,
        template: RegistrationData,
        signature: Option<Vec<TypeDesc>>,
    ) -> DiResult<Self> {
        if !implementation.is_generic_definition() {
            return Err(DiError::config(format!(
                "'{}' is not an open generic type definition",
                implementation
            )));
        }
        let definition = oracle
            .definition(&implementation)
            .ok_or_else(|| DiError::config(format!("type '{}' is not described in the type catalog", implementation)))?;
        let supertypes = oracle.assignable_types(&definition.self_type());
        for service in &template.services {
            let Some(ty) = service.service_type() else {
                return Err(DiError::config(format!(
                    "open generic '{}' cannot be exposed as {}",
                    implementation, service
                )));
            };
            if !ty.is_generic_definition() {
                return Err(DiError::config(format!(
                    "service '{}' of open generic '{}' is not an open generic type definition",
                    ty, implementation
                )));
            }
            if !supertypes.iter().any(|s| s.same_definition(ty)) {
                return Err(DiError::config(format!(
                    "open generic '{}' does not implement '{}'",
                    implementation, ty
                )));
            }
        }
        Ok(Self {
            oracle,
            implementation,
            template,
            signature,
        })
    }

    pub(crate) fn registrations_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        self.close(service).map(|r| vec![r]).unwrap_or_default()
    }

    fn close(&self, service: &Service) -> Option<Arc<ComponentRegistration>> {
        matching_template(&self.template.services, service)?;
        let requested = service.service_type()?;
        let definition = self.oracle.definition(&self.implementation)?;
        let args = bind_generic_arguments(self.oracle.as_ref(), definition, requested)?;
        let closed = TypeDesc::generic(definition.name().clone(), args);
        let bindings = definition.bindings_for(&closed);

        let assignable = self.oracle.assignable_types(&closed);
        let services = self
            .template
            .services
            .iter()
            .filter_map(|template| {
                let ty = template.service_type()?;
                let closed_ty = assignable.iter().find(|a| a.same_definition(ty))?;
                template.with_type(closed_ty.clone())
            })
            .collect::<Vec<_>>();

        let mut activator = ReflectionActivator::new(self.oracle.clone(), closed).ok()?;
        if let Some(signature) = &self.signature {
            activator = activator.with_signature(close_all(signature, &bindings));
        }
        let mut data = self.template.clone();
        data.services = services;
        Some(ComponentRegistration::new(Arc::new(activator), data))
    }
}

impl fmt::Display for OpenGenericSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "open generic {}", self.implementation)
    }
}

fn close_all(types: &[TypeDesc], bindings: &TypeBindings) -> Vec<TypeDesc> {
    types.iter().map(|t| t.substitute(bindings)).collect()
}

/// Serves closed requests for open service definitions from a factory that
/// receives the request's type arguments.
pub struct OpenGenericDelegateSource {
    template: RegistrationData,
    factory: GenericFactory,
}

impl OpenGenericDelegateSource {
    pub(crate) fn new(template: RegistrationData, factory: GenericFactory) -> DiResult<Self> {
        if template.services.is_empty() {
            return Err(DiError::config("open generic factory exposes no services"));
        }
        for service in &template.services {
            match service.service_type() {
                Some(ty) if ty.is_generic_definition() => {}
                _ => {
                    return Err(DiError::config(format!(
                        "service '{}' of an open generic factory is not an open generic type definition",
                        service
                    )))
                }
            }
        }
        Ok(Self { template, factory })
    }

    pub(crate) fn registrations_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        let Some(template) = matching_template(&self.template.services, service) else {
            return Vec::new();
        };
        let (Some(pattern), Some(requested)) = (template.service_type(), service.service_type()) else {
            return Vec::new();
        };
        let mut bindings = TypeBindings::new();
        if !TypeDesc::unify(pattern, requested, &mut bindings) {
            return Vec::new();
        }

        let services = self
            .template
            .services
            .iter()
            .filter_map(|t| {
                let closed = t.service_type()?.substitute(&bindings);
                (!closed.is_open()).then(|| t.with_type(closed)).flatten()
            })
            .collect::<Vec<_>>();

        let type_args = requested.args().to_vec();
        let factory = self.factory.clone();
        let activator = DelegateActivator::with_parameters(requested.clone(), move |ctx, parameters| {
            factory(ctx, &type_args, parameters)
        });
        let mut data = self.template.clone();
        data.services = services;
        vec![ComponentRegistration::new(Arc::new(activator), data)]
    }
}

impl fmt::Display for OpenGenericDelegateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services: Vec<String> = self.template.services.iter().map(ToString::to_string).collect();
        write!(f, "open generic factory for [{}]", services.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::Lifetime;
    use crate::types::{ConstructorDef, TypeCatalog, TypeDef};

    fn p(name: &str) -> TypeDesc {
        TypeDesc::param(name)
    }

    fn oracle() -> Arc<dyn TypeOracle> {
        let mut catalog = TypeCatalog::new();
        catalog.define(TypeDef::interface("IRepo").param("T"));
        catalog.define(
            TypeDef::class("Repo")
                .param("E")
                .implements(TypeDesc::generic("IRepo", [p("E")]))
                .constructor(ConstructorDef::new(|_| Ok(()))),
        );
        Arc::new(catalog)
    }

    fn data(service: TypeDesc) -> RegistrationData {
        let mut data = RegistrationData::new(Lifetime::Transient);
        data.add_service(Service::typed(service));
        data
    }

    #[test]
    fn closes_requested_service() {
        let source = OpenGenericSource::new(
            oracle(),
            TypeDesc::generic("Repo", [p("E")]),
            data(TypeDesc::generic("IRepo", [p("T")])),
            None,
        )
        .unwrap();

        let request = Service::typed(TypeDesc::generic("IRepo", [TypeDesc::of::<i32>()]));
        let produced = source.registrations_for(&request);
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].services(), &[request]);
        assert_eq!(produced[0].activator().limit_type().to_string(), "Repo<i32>");

        let keyed = Service::keyed(TypeDesc::generic("IRepo", [TypeDesc::of::<i32>()]), "x");
        assert!(source.registrations_for(&keyed).is_empty());
        assert!(source.registrations_for(&Service::of::<i32>()).is_empty());
    }

    #[test]
    fn rejects_closed_or_unrelated_definitions() {
        let closed = OpenGenericSource::new(
            oracle(),
            TypeDesc::generic("Repo", [TypeDesc::of::<i32>()]),
            data(TypeDesc::generic("IRepo", [p("T")])),
            None,
        );
        assert!(matches!(closed, Err(DiError::Configuration(_))));

        let unrelated = OpenGenericSource::new(
            oracle(),
            TypeDesc::generic("Repo", [p("E")]),
            data(TypeDesc::generic("IOther", [p("T")])),
            None,
        );
        assert!(matches!(unrelated, Err(DiError::Configuration(_))));
    }
}
