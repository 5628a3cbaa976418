//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for components that need structured teardown
/// (flushing caches, closing connections) and register them with
/// [`dispose_with`](crate::RegistrationBuilder::dispose_with). Scope-owned
/// instances are disposed in LIFO order when their lifetime scope ends, so
/// dependents are always disposed before their dependencies.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerBuilder, Dispose, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Cache {
///     flushed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let flushed = Arc::new(AtomicBool::new(false));
/// let flag = flushed.clone();
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(move |_| Ok(Cache { flushed: flag.clone() }))
///     .instance_per_lifetime_scope()
///     .dispose_with::<Cache>();
///
/// let container = builder.build().unwrap();
/// let scope = container.begin_lifetime_scope();
/// scope.resolve::<Cache>().unwrap();
/// scope.dispose();
/// assert!(flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
