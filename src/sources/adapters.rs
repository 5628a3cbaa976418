//! Adapters exposing registered components as `Collection<T>`, `Lazy<T>`
//! and `Meta<T>`.

use std::sync::Arc;

use crate::activators::DelegateActivator;
use crate::lifetime::{Lifetime, Ownership};
use crate::registration::{ComponentRegistration, Instance, RegistrationData};
use crate::service::Service;
use crate::sources::RegistrationAccessor;
use crate::types::TypeDesc;
use crate::wrappers::{Collection, Lazy, Meta};

/// Registration data shared by all adapter registrations: a fresh wrapper
/// per request, never disposed by the container.
fn adapter_data(service: &Service) -> RegistrationData {
    let mut data = RegistrationData::new(Lifetime::Transient);
    data.ownership = Ownership::ExternallyOwned;
    data.add_service(service.clone());
    data
}

/// `(service, element service)` when `service` wraps an element with `unwrap`.
fn element_of(service: &Service, unwrap: fn(&TypeDesc) -> Option<&TypeDesc>) -> Option<Service> {
    let element = unwrap(service.service_type()?)?;
    service.with_type(element.clone())
}

/// Resolves `Collection<T>` to every implementation of `T`.
///
/// The element registrations are looked up when the collection is
/// activated, so the collection always reflects the current registry.
#[derive(Debug, Default)]
pub struct CollectionSource;

impl CollectionSource {
    pub(crate) fn registrations_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        let Some(element) = element_of(service, TypeDesc::collection_element) else {
            return Vec::new();
        };
        let limit = service.service_type().cloned().unwrap_or_else(|| TypeDesc::collection(TypeDesc::named("?")));
        let activator = DelegateActivator::with_parameters(limit, move |ctx, _| {
            let mut registrations = ctx.registrations_for(&element);
            registrations.sort_by_key(|r| r.target().id());
            let mut items = Vec::with_capacity(registrations.len());
            for registration in &registrations {
                items.push(ctx.resolve_component(&element, registration, &[])?);
            }
            Ok(Arc::new(Collection::new(items)) as Instance)
        });
        vec![ComponentRegistration::new(Arc::new(activator), adapter_data(service))]
    }
}

/// Resolves `Lazy<T>` to a handle that activates `T` on first use.
#[derive(Debug, Default)]
pub struct LazySource;

impl LazySource {
    pub(crate) fn registrations_for(
        &self,
        service: &Service,
        accessor: RegistrationAccessor<'_>,
    ) -> Vec<Arc<ComponentRegistration>> {
        let Some(element) = element_of(service, TypeDesc::lazy_element) else {
            return Vec::new();
        };
        let Some(limit) = service.service_type().cloned() else {
            return Vec::new();
        };
        accessor(&element)
            .into_iter()
            .map(|upstream| {
                let element = element.clone();
                let target = upstream.clone();
                let activator = DelegateActivator::with_parameters(limit.clone(), move |ctx, _| {
                    Ok(Arc::new(Lazy::new(ctx.scope(), element.clone(), target.clone())) as Instance)
                });
                ComponentRegistration::adapting(Arc::new(activator), adapter_data(service), &upstream)
            })
            .collect()
    }
}

/// Resolves `Meta<T>` to `T` paired with its registration metadata.
#[derive(Debug, Default)]
pub struct MetaSource;

impl MetaSource {
    pub(crate) fn registrations_for(
        &self,
        service: &Service,
        accessor: RegistrationAccessor<'_>,
    ) -> Vec<Arc<ComponentRegistration>> {
        let Some(element) = element_of(service, TypeDesc::meta_element) else {
            return Vec::new();
        };
        let Some(limit) = service.service_type().cloned() else {
            return Vec::new();
        };
        accessor(&element)
            .into_iter()
            .map(|upstream| {
                let element = element.clone();
                let target = upstream.clone();
                let activator = DelegateActivator::with_parameters(limit.clone(), move |ctx, _| {
                    let value = ctx.resolve_component(&element, &target, &[])?;
                    Ok(Arc::new(Meta::new(value, target.metadata().clone())) as Instance)
                });
                ComponentRegistration::adapting(Arc::new(activator), adapter_data(service), &upstream)
            })
            .collect()
    }
}
