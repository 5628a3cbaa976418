//! Registration sources: lazily synthesized registrations for services no
//! explicit registration names, such as closed generics, decorators and the
//! `Lazy`/`Meta`/`Collection` wrapper types.

use std::fmt;
use std::sync::Arc;

use crate::registration::ComponentRegistration;
use crate::service::Service;

mod adapters;
mod decorator;
mod open_generic;

pub use adapters::{CollectionSource, LazySource, MetaSource};
pub use decorator::DecoratorSource;
pub(crate) use open_generic::GenericFactory;
pub use open_generic::{OpenGenericDelegateSource, OpenGenericSource};

/// Looks up the registrations of another service while a source runs.
pub type RegistrationAccessor<'a> = &'a mut dyn FnMut(&Service) -> Vec<Arc<ComponentRegistration>>;

/// Produces registrations on demand.
///
/// The registry consults each source once per service, the first time the
/// service is requested, and caches the result. Not matching a service is
/// never an error: return an empty vector.
pub trait RegistrationSource: Send + Sync {
    /// Registrations providing `service`.
    ///
    /// `accessor` queries the registry for other services (for example the
    /// component an adapter wraps). It must not be used to query `service`
    /// itself.
    fn registrations_for(&self, service: &Service, accessor: RegistrationAccessor<'_>) -> Vec<Arc<ComponentRegistration>>;

    /// Whether each produced registration wraps exactly one upstream
    /// registration. Such sources are re-run when a component is registered
    /// after the services they adapt were initialized.
    fn is_adapter_for_individual_components(&self) -> bool {
        false
    }

    fn description(&self) -> String;
}

/// The sources the container ships with.
pub enum BuiltinSource {
    OpenGeneric(OpenGenericSource),
    OpenGenericDelegate(OpenGenericDelegateSource),
    Decorator(DecoratorSource),
    Collection(CollectionSource),
    Lazy(LazySource),
    Meta(MetaSource),
}

impl RegistrationSource for BuiltinSource {
    fn registrations_for(&self, service: &Service, accessor: RegistrationAccessor<'_>) -> Vec<Arc<ComponentRegistration>> {
        match self {
            BuiltinSource::OpenGeneric(s) => s.registrations_for(service),
            BuiltinSource::OpenGenericDelegate(s) => s.registrations_for(service),
            BuiltinSource::Decorator(s) => s.registrations_for(service, accessor),
            BuiltinSource::Collection(s) => s.registrations_for(service),
            BuiltinSource::Lazy(s) => s.registrations_for(service, accessor),
            BuiltinSource::Meta(s) => s.registrations_for(service, accessor),
        }
    }

    fn is_adapter_for_individual_components(&self) -> bool {
        matches!(
            self,
            BuiltinSource::Decorator(_) | BuiltinSource::Lazy(_) | BuiltinSource::Meta(_)
        )
    }

    fn description(&self) -> String {
        match self {
            BuiltinSource::OpenGeneric(s) => s.to_string(),
            BuiltinSource::OpenGenericDelegate(s) => s.to_string(),
            BuiltinSource::Decorator(s) => s.to_string(),
            BuiltinSource::Collection(_) => "Collection<T> support".to_string(),
            BuiltinSource::Lazy(_) => "Lazy<T> support".to_string(),
            BuiltinSource::Meta(_) => "Meta<T> support".to_string(),
        }
    }
}

impl fmt::Debug for dyn RegistrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistrationSource({})", self.description())
    }
}

/// Same service kind and key, ignoring the type.
pub(crate) fn same_key(template: &Service, requested: &Service) -> bool {
    match (template, requested) {
        (Service::Typed(_), Service::Typed(_)) => true,
        (Service::Keyed(_, a), Service::Keyed(_, b)) => a == b,
        _ => false,
    }
}
