//! Container configuration: registering components and building the
//! [`Container`].

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::activators::{Activator, DelegateActivator, ProvidedInstanceActivator, ReflectionActivator};
use crate::config::ContainerOptions;
use crate::error::{BoxError, DiError, DiResult};
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::parameters::Parameter;
use crate::provider::{Container, ContainerCore, ResolveContext};
use crate::registration::{ComponentRegistration, Instance, RegistrationData};
use crate::registry::ComponentRegistry;
use crate::service::{Service, ServiceKey};
use crate::sources::{
    BuiltinSource, CollectionSource, DecoratorSource, GenericFactory, LazySource, MetaSource,
    OpenGenericDelegateSource, OpenGenericSource, RegistrationSource,
};
use crate::types::{TypeCatalog, TypeDef, TypeDesc, TypeOracle};

mod module_system;
mod registration_builder;

pub use module_system::Module;
pub use registration_builder::RegistrationBuilder;

/// How a pending registration produces instances.
pub(crate) enum ComponentKind {
    /// A ready activator (factory closure or provided instance).
    Activator(Arc<dyn Activator>),
    /// A closed catalog type activated through its constructors.
    Reflection(TypeDesc),
    /// An open generic catalog type, closed on demand.
    OpenGeneric(TypeDesc),
    /// A factory serving closed requests for open service definitions.
    OpenGenericDelegate(GenericFactory),
    /// A decorator wrapping every `(from) service` as `(to) service`.
    Decorator {
        decorator: TypeDesc,
        service: TypeDesc,
        from: ServiceKey,
        to: ServiceKey,
    },
}

/// A registration as configured, before `build` validates it.
pub(crate) struct PendingRegistration {
    pub(crate) kind: ComponentKind,
    pub(crate) data: RegistrationData,
    pub(crate) preserve_defaults: bool,
    pub(crate) signature: Option<Vec<TypeDesc>>,
}

impl PendingRegistration {
    fn new(kind: ComponentKind, lifetime: Lifetime) -> Self {
        Self {
            kind,
            data: RegistrationData::new(lifetime),
            preserve_defaults: false,
            signature: None,
        }
    }

    /// The type registered "as self", when the kind has one.
    pub(crate) fn limit_type(&self) -> Option<TypeDesc> {
        match &self.kind {
            ComponentKind::Activator(activator) => Some(activator.limit_type()),
            ComponentKind::Reflection(ty) | ComponentKind::OpenGeneric(ty) => Some(ty.clone()),
            ComponentKind::OpenGenericDelegate(_) | ComponentKind::Decorator { .. } => None,
        }
    }

    /// Validates the registration and adds it, or the source it configures,
    /// to `registry`.
    fn build_into(self, oracle: &Arc<dyn TypeOracle>, registry: &ComponentRegistry) -> DiResult<()> {
        let PendingRegistration {
            kind,
            mut data,
            preserve_defaults,
            signature,
        } = self;

        match kind {
            ComponentKind::Activator(activator) => {
                let limit = activator.limit_type();
                if activator.activates_once() && data.lifetime != Lifetime::Singleton {
                    return Err(DiError::config(format!(
                        "{} is activated once and must be registered as a single instance",
                        activator.description()
                    )));
                }
                default_to_self(&mut data, &limit);
                if oracle.definition(&limit).is_some() {
                    check_assignable(oracle.as_ref(), &limit, &data.services)?;
                }
                registry.register(ComponentRegistration::new(activator, data), preserve_defaults);
            }
            ComponentKind::Reflection(ty) => {
                let mut activator = ReflectionActivator::new(oracle.clone(), ty.clone())?;
                if let Some(signature) = signature {
                    activator = activator.with_signature(signature);
                }
                default_to_self(&mut data, &ty);
                check_assignable(oracle.as_ref(), &ty, &data.services)?;
                registry.register(ComponentRegistration::new(Arc::new(activator), data), preserve_defaults);
            }
            ComponentKind::OpenGeneric(ty) => {
                default_to_self(&mut data, &ty);
                let source = OpenGenericSource::new(oracle.clone(), ty, data, signature)?;
                registry.add_registration_source(Arc::new(BuiltinSource::OpenGeneric(source)));
            }
            ComponentKind::OpenGenericDelegate(factory) => {
                let source = OpenGenericDelegateSource::new(data, factory)?;
                registry.add_registration_source(Arc::new(BuiltinSource::OpenGenericDelegate(source)));
            }
            ComponentKind::Decorator {
                decorator,
                service,
                from,
                to,
            } => {
                let source = DecoratorSource::new(oracle.clone(), decorator, service, from, to, data)?;
                registry.add_registration_source(Arc::new(BuiltinSource::Decorator(source)));
            }
        }
        Ok(())
    }
}

fn default_to_self(data: &mut RegistrationData, limit: &TypeDesc) {
    if data.services.is_empty() {
        data.add_service(Service::typed(limit.clone()));
    }
}

fn check_assignable(oracle: &dyn TypeOracle, limit: &TypeDesc, services: &[Service]) -> DiResult<()> {
    for service in services {
        if let Some(ty) = service.service_type() {
            if !oracle.is_assignable(limit, ty) {
                return Err(DiError::config(format!(
                    "the type '{}' is not assignable to service '{}'",
                    limit, service
                )));
            }
        }
    }
    Ok(())
}

/// Collects registrations and builds the [`Container`].
///
/// Every `register*` method returns a [`RegistrationBuilder`] for
/// configuring the new registration's services, lifetime, parameters and
/// hooks. Registering the same service again makes the new registration the
/// default unless it preserves existing defaults; every registration stays
/// available through `resolve_all`.
///
/// Catalog-described types (constructors, properties, generic parameters)
/// are declared with [`define_type`](ContainerBuilder::define_type) and then
/// registered with [`register_type`](ContainerBuilder::register_type) or
/// [`register_generic`](ContainerBuilder::register_generic).
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(String::from("first"));
/// builder.register_instance(String::from("second"));
/// builder
///     .register_instance(String::from("fallback"))
///     .preserve_existing_defaults();
///
/// let container = builder.build().unwrap();
/// assert_eq!(*container.resolve::<String>().unwrap(), "second");
/// assert_eq!(container.resolve_all::<String>().unwrap().len(), 3);
/// ```
pub struct ContainerBuilder {
    catalog: TypeCatalog,
    oracle: Option<Arc<dyn TypeOracle>>,
    registrations: Vec<PendingRegistration>,
    sources: Vec<Arc<dyn RegistrationSource>>,
    observers: Observers,
    options: ContainerOptions,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            catalog: TypeCatalog::new(),
            oracle: None,
            registrations: Vec::new(),
            sources: Vec::new(),
            observers: Observers::new(),
            options: ContainerOptions::default(),
        }
    }

    // ----- Type metadata -----

    /// Adds metadata for a type to the builder's catalog.
    pub fn define_type(&mut self, def: TypeDef) -> &mut Self {
        self.catalog.define(def);
        self
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TypeCatalog {
        &mut self.catalog
    }

    /// Replaces the built-in catalog with another type oracle, such as one
    /// produced by a code generator. Types defined on the builder's catalog
    /// are then ignored.
    pub fn with_type_oracle(&mut self, oracle: Arc<dyn TypeOracle>) -> &mut Self {
        self.oracle = Some(oracle);
        self
    }

    // ----- Registrations -----

    fn push(&mut self, kind: ComponentKind, lifetime: Lifetime) -> RegistrationBuilder<'_> {
        self.registrations.push(PendingRegistration::new(kind, lifetime));
        let index = self.registrations.len() - 1;
        RegistrationBuilder::new(&mut self.registrations[index])
    }

    /// Registers a factory producing `T`, exposed as `T` unless other
    /// services are declared. A new instance per request by default.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_ioc::{ContainerBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct Clock;
    /// struct Scheduler { clock: Arc<Clock> }
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register(|_| Ok(Clock)).single_instance();
    /// builder.register(|ctx| Ok(Scheduler { clock: ctx.resolve::<Clock>()? }));
    ///
    /// let container = builder.build().unwrap();
    /// let a = container.resolve::<Scheduler>().unwrap();
    /// let b = container.resolve::<Scheduler>().unwrap();
    /// assert!(!Arc::ptr_eq(&a, &b));
    /// assert!(Arc::ptr_eq(&a.clock, &b.clock));
    /// ```
    pub fn register<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_>
    where
        T: Any + Send + Sync,
        F: Fn(&ResolveContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push(
            ComponentKind::Activator(Arc::new(DelegateActivator::new(factory))),
            Lifetime::Transient,
        )
    }

    /// Registers a pre-built value, shared as a singleton.
    ///
    /// The value exists once, so giving the registration another lifetime
    /// fails [`build`](ContainerBuilder::build).
    pub fn register_instance<T: Any + Send + Sync>(&mut self, value: T) -> RegistrationBuilder<'_> {
        self.push(
            ComponentKind::Activator(Arc::new(ProvidedInstanceActivator::new(value))),
            Lifetime::Singleton,
        )
    }

    /// Registers a custom activator.
    pub fn register_activator(&mut self, activator: Arc<dyn Activator>) -> RegistrationBuilder<'_> {
        self.push(ComponentKind::Activator(activator), Lifetime::Transient)
    }

    /// Registers a closed catalog type, activated through the constructor
    /// with the most resolvable parameters.
    pub fn register_type(&mut self, ty: TypeDesc) -> RegistrationBuilder<'_> {
        self.push(ComponentKind::Reflection(ty), Lifetime::Transient)
    }

    /// Registers an open generic catalog type such as `Repo<T>`; closed
    /// requests for its open services are served by closing it over the
    /// requested arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_ioc::{ConstructorDef, ContainerBuilder, Resolver, Service, TypeDef, TypeDesc};
    ///
    /// struct Repo { entity: TypeDesc }
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.define_type(TypeDef::interface("IRepo").param("T"));
    /// builder.define_type(
    ///     TypeDef::class("Repo")
    ///         .param("T")
    ///         .implements(TypeDesc::generic("IRepo", [TypeDesc::param("T")]))
    ///         .constructor(ConstructorDef::new(|args| Ok(Repo { entity: args.type_args()[0].clone() }))),
    /// );
    /// builder
    ///     .register_generic(TypeDesc::generic("Repo", [TypeDesc::param("T")]))
    ///     .as_service(TypeDesc::generic("IRepo", [TypeDesc::param("T")]));
    ///
    /// let container = builder.build().unwrap();
    /// let users = Service::typed(TypeDesc::generic("IRepo", [TypeDesc::named("User")]));
    /// let repo = container.resolve_as::<Repo>(&users).unwrap();
    /// assert_eq!(repo.entity, TypeDesc::named("User"));
    /// ```
    pub fn register_generic(&mut self, implementation: TypeDesc) -> RegistrationBuilder<'_> {
        self.push(ComponentKind::OpenGeneric(implementation), Lifetime::Transient)
    }

    /// Registers a factory serving closed requests for the open service
    /// `service`. The factory receives the request's type arguments.
    pub fn register_generic_delegate<F>(&mut self, service: TypeDesc, factory: F) -> RegistrationBuilder<'_>
    where
        F: Fn(&ResolveContext<'_>, &[TypeDesc], &[Parameter]) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        self.push(ComponentKind::OpenGenericDelegate(Arc::new(factory)), Lifetime::Transient)
            .as_service(service)
    }

    /// Registers `decorator` around every component registered as
    /// `(from_key) service`, exposing the results as `(to_key) service`.
    ///
    /// The decorator is a catalog type whose constructor takes the decorated
    /// service as one of its parameters.
    pub fn register_decorator(
        &mut self,
        decorator: TypeDesc,
        service: TypeDesc,
        from_key: impl Into<ServiceKey>,
        to_key: impl Into<ServiceKey>,
    ) -> RegistrationBuilder<'_> {
        self.push(
            ComponentKind::Decorator {
                decorator,
                service,
                from: from_key.into(),
                to: to_key.into(),
            },
            Lifetime::Transient,
        )
    }

    /// Adds a custom registration source, consulted before the built-in ones.
    pub fn register_source<S: RegistrationSource + 'static>(&mut self, source: S) -> &mut Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Lets `module` add its registrations.
    pub fn register_module<M: Module>(&mut self, module: M) -> DiResult<&mut Self> {
        module.load(self)?;
        Ok(self)
    }

    // ----- Container-wide settings -----

    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn with_options(&mut self, options: ContainerOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Number of registrations configured so far, sources included.
    pub fn len(&self) -> usize {
        self.registrations.len() + self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates the configuration and creates the container.
    ///
    /// Configuration problems are reported here, never at resolve time:
    /// unknown catalog types, open generic registrations that are not
    /// generic definitions or do not implement their services, decorators
    /// from and to the same key, and services a type is not assignable to.
    pub fn build(self) -> DiResult<Container> {
        self.options.validate()?;
        let ContainerBuilder {
            catalog,
            oracle,
            registrations,
            sources,
            observers,
            options,
        } = self;

        let oracle: Arc<dyn TypeOracle> = oracle.unwrap_or_else(|| Arc::new(catalog));
        let registry = ComponentRegistry::new(options.update_initialized_adapters);
        registry.add_registration_source(Arc::new(BuiltinSource::Collection(CollectionSource)));
        registry.add_registration_source(Arc::new(BuiltinSource::Lazy(LazySource)));
        registry.add_registration_source(Arc::new(BuiltinSource::Meta(MetaSource)));

        let count = registrations.len();
        for registration in registrations {
            registration.build_into(&oracle, &registry)?;
        }
        for source in sources {
            registry.add_registration_source(source);
        }
        debug!(registrations = count, sources = registry.sources().len(), "container built");

        Ok(Container::new(ContainerCore {
            registry,
            oracle,
            options,
            observers,
        }))
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
