//! The component registry: services to registrations, plus the dynamic
//! registration sources consulted on first use of each service.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::registration::ComponentRegistration;
use crate::service::Service;
use crate::sources::RegistrationSource;

mod service_info;

use service_info::{ServiceRegistrationInfo, SourceRef};

/// Index of every registration by the services it provides.
///
/// All state sits behind one mutex: lazy initialization of a service mutates
/// the index and must appear atomic to concurrent readers, so a racing
/// thread never runs a source twice for the same service nor observes a
/// half-initialized implementation list. Registration sources run while the
/// lock is held and reach the registry only through the accessor they are
/// handed.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ContainerBuilder, Service};
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(1u8);
/// builder.register_instance(2u8);
/// let container = builder.build().unwrap();
///
/// let registry = container.registry();
/// assert!(registry.is_registered(&Service::of::<u8>()));
/// assert_eq!(registry.registrations_for(&Service::of::<u8>()).len(), 2);
/// assert!(registry.try_get_registration(&Service::of::<u16>()).is_none());
/// ```
pub struct ComponentRegistry {
    state: Mutex<RegistryState>,
}

struct RegistryState {
    infos: Vec<ServiceRegistrationInfo>,
    index: AHashMap<Service, usize>,
    /// Front is the most recently added source.
    sources: VecDeque<SourceRef>,
    registrations: Vec<Arc<ComponentRegistration>>,
    update_initialized_adapters: bool,
}

impl ComponentRegistry {
    pub(crate) fn new(update_initialized_adapters: bool) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                infos: Vec::new(),
                index: AHashMap::new(),
                sources: VecDeque::new(),
                registrations: Vec::new(),
                update_initialized_adapters,
            }),
        }
    }

    /// Adds `registration` for each of its services.
    ///
    /// The registration becomes the new default unless `preserve_defaults`
    /// is set, in which case it is appended with the lowest priority.
    pub fn register(&self, registration: Arc<ComponentRegistration>, preserve_defaults: bool) {
        self.state.lock().register(registration, preserve_defaults);
    }

    /// Adds a dynamic source ahead of every existing one.
    pub fn add_registration_source(&self, source: Arc<dyn RegistrationSource>) {
        self.state.lock().add_source(source);
    }

    /// Default registration for `service`, initializing it first.
    pub fn try_get_registration(&self, service: &Service) -> Option<Arc<ComponentRegistration>> {
        let mut state = self.state.lock();
        let idx = state.initialized_info(service);
        state.infos[idx].default_implementation().cloned()
    }

    pub fn is_registered(&self, service: &Service) -> bool {
        let mut state = self.state.lock();
        let idx = state.initialized_info(service);
        state.infos[idx].has_implementations()
    }

    /// Every implementation of `service`, most preferred first.
    pub fn registrations_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        self.state.lock().registrations_for(service)
    }

    /// Every registration added so far, explicit or synthesized, in the order
    /// it was added.
    pub fn registrations(&self) -> Vec<Arc<ComponentRegistration>> {
        self.state.lock().registrations.clone()
    }

    /// Dynamic sources, highest priority first.
    pub fn sources(&self) -> Vec<Arc<dyn RegistrationSource>> {
        self.state.lock().sources.iter().cloned().collect()
    }

    /// Human-readable dump of the services known so far and their
    /// implementations. Does not initialize anything.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let state = self.state.lock();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "ComponentRegistry: {} registrations, {} services, {} sources",
            state.registrations.len(),
            state.infos.len(),
            state.sources.len()
        );
        for source in &state.sources {
            let _ = writeln!(out, "  source {}", source.description());
        }
        let mut infos: Vec<&ServiceRegistrationInfo> = state.infos.iter().collect();
        infos.sort_by_key(|i| i.service().to_string());
        for info in infos {
            let status = if info.is_initialized() { "" } else { " (not initialized)" };
            let _ = writeln!(out, "  {}{}", info.service(), status);
            for registration in info.implementations() {
                let _ = writeln!(out, "    {} {}", registration.id(), registration);
            }
        }
        out
    }
}

impl RegistryState {
    fn info_index(&mut self, service: &Service) -> usize {
        if let Some(&idx) = self.index.get(service) {
            return idx;
        }
        let idx = self.infos.len();
        self.infos.push(ServiceRegistrationInfo::new(service.clone()));
        self.index.insert(service.clone(), idx);
        idx
    }

    /// Index of the info for `service`, consulting pending sources until
    /// the queue is drained.
    fn initialized_info(&mut self, service: &Service) -> usize {
        let idx = self.info_index(service);
        if self.infos[idx].is_initialized() {
            return idx;
        }
        if !self.infos[idx].is_initializing() {
            let sources: Vec<SourceRef> = self.sources.iter().cloned().collect();
            self.infos[idx].begin_initialization(sources);
        }

        while let Some(source) = self.infos[idx].dequeue_source() {
            let produced = {
                let mut accessor = |s: &Service| self.registrations_for(s);
                source.registrations_for(service, &mut accessor)
            };
            if !produced.is_empty() {
                debug!(
                    service = %service,
                    source = %source.description(),
                    count = produced.len(),
                    "registration source provided components"
                );
            }

            for registration in produced {
                for additional in registration.services() {
                    if additional == service {
                        continue;
                    }
                    let other = self.info_index(additional);
                    if self.infos[other].is_initializing() {
                        self.infos[other].skip_source(&source);
                    } else if !self.infos[other].is_initialized() {
                        let remaining: Vec<SourceRef> = self
                            .sources
                            .iter()
                            .filter(|s| !Arc::ptr_eq(s, &source))
                            .cloned()
                            .collect();
                        self.infos[other].begin_initialization(remaining);
                    }
                }
                self.add_registration(registration, true, true);
            }
        }

        self.infos[idx].complete_initialization();
        trace!(service = %service, "service initialized");
        idx
    }

    fn registrations_for(&mut self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        let idx = self.initialized_info(service);
        self.infos[idx].implementations()
    }

    fn add_registration(&mut self, registration: Arc<ComponentRegistration>, preserve_defaults: bool, from_source: bool) {
        for service in registration.services() {
            let idx = self.info_index(service);
            self.infos[idx].add(registration.clone(), preserve_defaults, from_source);
        }
        self.registrations.push(registration);
    }

    fn register(&mut self, registration: Arc<ComponentRegistration>, preserve_defaults: bool) {
        debug!(
            registration = %registration.id(),
            component = %registration.description(),
            preserve_defaults,
            "component registered"
        );
        self.add_registration(registration.clone(), preserve_defaults, false);
        if self.update_initialized_adapters {
            self.update_initialized_adapters(&registration);
        }
    }

    /// Re-runs adapter sources for already initialized services so they see
    /// a registration added after resolution began.
    fn update_initialized_adapters(&mut self, registration: &Arc<ComponentRegistration>) {
        let adapted_services: Vec<Service> = self
            .infos
            .iter()
            .filter(|i| i.is_initialized() && !registration.services().contains(i.service()))
            .map(|i| i.service().clone())
            .collect();
        if adapted_services.is_empty() {
            return;
        }
        let adapters: Vec<SourceRef> = self
            .sources
            .iter()
            .filter(|s| s.is_adapter_for_individual_components())
            .cloned()
            .collect();

        let mut produced = Vec::new();
        for service in &adapted_services {
            for source in &adapters {
                let mut sandbox = |s: &Service| {
                    if registration.services().contains(s) {
                        vec![registration.clone()]
                    } else {
                        Vec::new()
                    }
                };
                produced.extend(source.registrations_for(service, &mut sandbox));
            }
        }
        if produced.is_empty() {
            return;
        }

        warn!(
            registration = %registration.id(),
            component = %registration.description(),
            adapters = produced.len(),
            "component registered after dependent adapters were initialized; adding adapters for it"
        );
        for adapter in produced {
            self.register(adapter, true);
        }
    }

    fn add_source(&mut self, source: SourceRef) {
        debug!(source = %source.description(), "registration source added");
        self.sources.push_front(source.clone());
        for info in &mut self.infos {
            info.include(source.clone());
        }
    }
}
