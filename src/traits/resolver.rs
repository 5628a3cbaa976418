//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::parameters::Parameter;
use crate::registration::Instance;
use crate::service::{Service, ServiceKey};
use crate::types::TypeDesc;
use crate::wrappers::{Collection, Lazy, Meta};

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container),
/// [`LifetimeScope`](crate::LifetimeScope) and the
/// [`ResolveContext`](crate::ResolveContext) handed to factories, so the
/// same calls work at the top level and inside a running resolve operation.
///
/// Most users should use the [`Resolver`] trait instead, which provides more
/// ergonomic generic methods built on top of this trait.
pub trait ResolverCore {
    /// Resolves the default registration of `service`.
    ///
    /// The parameters apply to the requested component only, not to its
    /// dependencies.
    ///
    /// # Returns
    ///
    /// * `Ok(Instance)` - The resolved component as `Arc<dyn Any>`
    /// * `Err(DiError)` - Not registered, circular, activation failure, etc.
    fn resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Instance>;

    /// Like [`resolve_with`](Self::resolve_with), but `Ok(None)` when no
    /// registration provides `service`.
    fn try_resolve_with(&self, service: &Service, parameters: &[Parameter]) -> DiResult<Option<Instance>>;

    /// Whether some registration (explicit or synthesized by a source)
    /// provides `service`.
    fn is_registered(&self, service: &Service) -> bool;
}

fn downcast<T: Any + Send + Sync>(instance: Instance) -> DiResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Blanket-implemented for every [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(42usize);
/// builder.register(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>));
///
/// let container = builder.build().unwrap();
/// assert_eq!(*container.resolve::<usize>().unwrap(), 42);
///
/// let logger = container.resolve::<Arc<dyn Logger>>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the component registered as the Rust type `T`.
    fn resolve<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.resolve_as::<T>(&Service::of::<T>())
    }

    /// Resolves `service` as a type-erased instance.
    fn resolve_service(&self, service: &Service) -> DiResult<Instance> {
        self.resolve_with(service, &[])
    }

    /// Resolves `service` and downcasts the instance to `T`.
    fn resolve_as<T: Any + Send + Sync>(&self, service: &Service) -> DiResult<Arc<T>> {
        downcast(self.resolve_with(service, &[])?)
    }

    /// Resolves `T` registered under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_ioc::{ContainerBuilder, Resolver};
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_instance("primary".to_string()).keyed::<String>("primary");
    /// builder.register_instance("replica".to_string()).keyed::<String>("replica");
    ///
    /// let container = builder.build().unwrap();
    /// assert_eq!(*container.resolve_keyed::<String>("replica").unwrap(), "replica");
    /// ```
    fn resolve_keyed<T: Any + Send + Sync>(&self, key: impl Into<ServiceKey>) -> DiResult<Arc<T>> {
        self.resolve_as::<T>(&Service::keyed(TypeDesc::of::<T>(), key))
    }

    /// Resolves `T` registered under a string key.
    fn resolve_named<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        self.resolve_keyed::<T>(name)
    }

    /// Resolves `T`, supplying constructor parameters.
    fn resolve_with_parameters<T: Any + Send + Sync>(&self, parameters: &[Parameter]) -> DiResult<Arc<T>> {
        downcast(self.resolve_with(&Service::of::<T>(), parameters)?)
    }

    /// Resolves `T`, or `Ok(None)` when it is not registered.
    ///
    /// Failures other than "not registered" (a circular dependency, a
    /// failing constructor) are still errors.
    fn try_resolve<T: Any + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
        match self.try_resolve_with(&Service::of::<T>(), &[])? {
            Some(instance) => downcast(instance).map(Some),
            None => Ok(None),
        }
    }

    /// Whether `T` can be resolved.
    fn can_resolve<T: Any + Send + Sync>(&self) -> bool {
        self.is_registered(&Service::of::<T>())
    }

    /// Every implementation of `T`, in registration order.
    ///
    /// Resolves to an empty vector when nothing provides `T`.
    fn resolve_all<T: Any + Send + Sync>(&self) -> DiResult<Vec<Arc<T>>> {
        let service = Service::typed(TypeDesc::collection(TypeDesc::of::<T>()));
        let collection = self.resolve_as::<Collection>(&service)?;
        collection.downcast::<T>()
    }

    /// Deferred resolution of `T`, bound to the scope it is resolved from.
    fn resolve_lazy<T: Any + Send + Sync>(&self) -> DiResult<Arc<Lazy>> {
        self.resolve_as::<Lazy>(&Service::typed(TypeDesc::lazy(TypeDesc::of::<T>())))
    }

    /// `T` together with the metadata of the registration that produced it.
    fn resolve_meta<T: Any + Send + Sync>(&self) -> DiResult<Arc<Meta>> {
        self.resolve_as::<Meta>(&Service::typed(TypeDesc::meta(TypeDesc::of::<T>())))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
