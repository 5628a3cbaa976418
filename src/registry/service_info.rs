//! Per-service bookkeeping owned by the component registry.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::registration::ComponentRegistration;
use crate::service::Service;
use crate::sources::RegistrationSource;

pub(crate) type SourceRef = Arc<dyn RegistrationSource>;

enum InitState {
    Uninitialized,
    Initializing(VecDeque<SourceRef>),
    Initialized,
}

/// Known implementations of one service and the dynamic sources not yet
/// consulted for it.
pub(crate) struct ServiceRegistrationInfo {
    service: Service,
    /// Explicit registrations, oldest first; the last one is the default.
    defaults: Vec<Arc<ComponentRegistration>>,
    /// Registrations synthesized by sources, in the order they were produced.
    from_sources: Vec<Arc<ComponentRegistration>>,
    /// Explicit registrations added with "preserve existing defaults".
    preserved: Vec<Arc<ComponentRegistration>>,
    state: InitState,
}

impl ServiceRegistrationInfo {
    pub(crate) fn new(service: Service) -> Self {
        Self {
            service,
            defaults: Vec::new(),
            from_sources: Vec::new(),
            preserved: Vec::new(),
            state: InitState::Uninitialized,
        }
    }

    pub(crate) fn service(&self) -> &Service {
        &self.service
    }

    pub(crate) fn is_initialized(&self) -> bool {
        matches!(self.state, InitState::Initialized)
    }

    pub(crate) fn is_initializing(&self) -> bool {
        matches!(self.state, InitState::Initializing(_))
    }

    /// Starts initialization with the given sources queued in priority order.
    pub(crate) fn begin_initialization(&mut self, sources: impl IntoIterator<Item = SourceRef>) {
        self.state = InitState::Initializing(sources.into_iter().collect());
    }

    /// Next source to consult; `None` once the queue is drained.
    pub(crate) fn dequeue_source(&mut self) -> Option<SourceRef> {
        match &mut self.state {
            InitState::Initializing(queue) => queue.pop_front(),
            _ => None,
        }
    }

    /// Drops `source` from the pending queue.
    pub(crate) fn skip_source(&mut self, source: &SourceRef) {
        if let InitState::Initializing(queue) = &mut self.state {
            queue.retain(|s| !Arc::ptr_eq(s, source));
        }
    }

    pub(crate) fn complete_initialization(&mut self) {
        self.state = InitState::Initialized;
    }

    /// Offers a newly added source.
    ///
    /// Initialized services are reopened with only the new source; services
    /// still initializing queue it behind the pending ones.
    pub(crate) fn include(&mut self, source: SourceRef) {
        if self.is_initialized() {
            self.begin_initialization([source]);
        } else if let InitState::Initializing(queue) = &mut self.state {
            queue.push_back(source);
        }
    }

    pub(crate) fn add(&mut self, registration: Arc<ComponentRegistration>, preserve_defaults: bool, from_source: bool) {
        if from_source {
            self.from_sources.push(registration);
        } else if preserve_defaults {
            self.preserved.push(registration);
        } else {
            self.defaults.push(registration);
        }
    }

    /// Implementations, most preferred first.
    pub(crate) fn implementations(&self) -> Vec<Arc<ComponentRegistration>> {
        self.defaults
            .iter()
            .rev()
            .chain(&self.from_sources)
            .chain(&self.preserved)
            .cloned()
            .collect()
    }

    pub(crate) fn default_implementation(&self) -> Option<&Arc<ComponentRegistration>> {
        self.defaults
            .last()
            .or_else(|| self.from_sources.first())
            .or_else(|| self.preserved.first())
    }

    pub(crate) fn has_implementations(&self) -> bool {
        self.default_implementation().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activators::ProvidedInstanceActivator;
    use crate::lifetime::Lifetime;
    use crate::registration::RegistrationData;

    fn reg(value: u32) -> Arc<ComponentRegistration> {
        let mut data = RegistrationData::new(Lifetime::Singleton);
        data.add_service(Service::of::<u32>());
        ComponentRegistration::new(Arc::new(ProvidedInstanceActivator::new(value)), data)
    }

    #[test]
    fn last_default_wins_and_preserved_trail() {
        let mut info = ServiceRegistrationInfo::new(Service::of::<u32>());
        let (a, b, c, d) = (reg(1), reg(2), reg(3), reg(4));
        info.add(a.clone(), false, false);
        info.add(c.clone(), true, false);
        info.add(b.clone(), false, false);
        info.add(d.clone(), true, true);

        assert_eq!(info.default_implementation().map(|r| r.id()), Some(b.id()));
        let order: Vec<_> = info.implementations().iter().map(|r| r.id()).collect();
        assert_eq!(order, vec![b.id(), a.id(), d.id(), c.id()]);
    }

    #[test]
    fn preserved_only_service_still_has_a_default() {
        let mut info = ServiceRegistrationInfo::new(Service::of::<u32>());
        let a = reg(1);
        info.add(a.clone(), true, false);
        assert_eq!(info.default_implementation().map(|r| r.id()), Some(a.id()));
    }
}
