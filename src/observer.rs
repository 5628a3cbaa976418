//! Diagnostic observers for resolution traceability.
//!
//! Observers see every top-level resolve operation: when it starts, how long
//! it took and how it failed. Nested dependency resolutions are part of the
//! enclosing operation and are not reported separately.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::service::Service;

/// Observer for resolution events.
///
/// # Performance
///
/// Observer calls are made synchronously on the resolving thread. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, DiError, DiObserver, Resolver, Service};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     resolved: AtomicUsize,
/// }
///
/// impl DiObserver for CountingObserver {
///     fn resolving(&self, _service: &Service) {}
///
///     fn resolved(&self, _service: &Service, _duration: Duration) {
///         self.resolved.fetch_add(1, Ordering::Relaxed);
///     }
///
///     fn resolution_failed(&self, _service: &Service, _error: &DiError) {}
/// }
///
/// let observer = Arc::new(CountingObserver::default());
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(7u32);
/// builder.add_observer(observer.clone());
///
/// let container = builder.build().unwrap();
/// container.resolve::<u32>().unwrap();
/// assert_eq!(observer.resolved.load(Ordering::Relaxed), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before a top-level resolve operation starts.
    fn resolving(&self, service: &Service);

    /// Called when the operation completed, including its `Activated` hooks.
    ///
    /// # Arguments
    ///
    /// * `service` - The service that was resolved
    /// * `duration` - Time elapsed from `resolving` to `resolved`
    fn resolved(&self, service: &Service, duration: Duration);

    /// Called when the operation failed.
    fn resolution_failed(&self, service: &Service, error: &DiError);

    /// Called after a lifetime scope was disposed.
    fn scope_disposed(&self, _tag: &str) {}
}

/// Container for registered observers.
///
/// Designed to have minimal overhead when no observers are registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, service: &Service) {
        for observer in &self.observers {
            observer.resolving(service);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, service: &Service, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(service, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, service: &Service, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(service, error);
        }
    }

    pub(crate) fn scope_disposed(&self, tag: &str) {
        for observer in &self.observers {
            observer.scope_disposed(tag);
        }
    }
}

/// Observer that forwards events to `tracing`.
///
/// Successful resolutions are emitted at `DEBUG`, failures at `WARN`.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver {
    prefix: Option<String>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer whose events carry `prefix` in a `container` field.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn container(&self) -> &str {
        self.prefix.as_deref().unwrap_or("ferrous-ioc")
    }
}

impl DiObserver for TracingObserver {
    fn resolving(&self, service: &Service) {
        tracing::trace!(container = self.container(), service = %service, "resolving");
    }

    fn resolved(&self, service: &Service, duration: Duration) {
        tracing::debug!(
            container = self.container(),
            service = %service,
            elapsed_us = duration.as_micros() as u64,
            "resolved"
        );
    }

    fn resolution_failed(&self, service: &Service, error: &DiError) {
        tracing::warn!(container = self.container(), service = %service, error = %error, "resolution failed");
    }

    fn scope_disposed(&self, tag: &str) {
        tracing::debug!(container = self.container(), scope = tag, "lifetime scope disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl DiObserver for Recording {
        fn resolving(&self, service: &Service) {
            self.events.lock().unwrap().push(format!("resolving {}", service));
        }

        fn resolved(&self, service: &Service, _duration: Duration) {
            self.events.lock().unwrap().push(format!("resolved {}", service));
        }

        fn resolution_failed(&self, service: &Service, _error: &DiError) {
            self.events.lock().unwrap().push(format!("failed {}", service));
        }
    }

    #[test]
    fn notifies_every_observer_in_order() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(first.clone());
        observers.add(second.clone());
        observers.add(Arc::new(TracingObserver::with_prefix("test")));

        let service = Service::typed(crate::types::TypeDesc::named("Db"));
        observers.resolving(&service);
        observers.resolution_failed(&service, &DiError::TypeMismatch("Db".into()));

        for recording in [&first, &second] {
            assert_eq!(*recording.events.lock().unwrap(), vec!["resolving Db", "failed Db"]);
        }
    }
}
