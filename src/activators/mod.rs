//! Strategies that turn a resolve request into an instance.

use crate::error::DiResult;
use crate::parameters::Parameter;
use crate::provider::ResolveContext;
use crate::registration::Instance;
use crate::types::TypeDesc;

mod delegate;
mod provided;
mod reflection;

pub use delegate::DelegateActivator;
pub use provided::ProvidedInstanceActivator;
pub use reflection::ReflectionActivator;

/// Produces instances for a component registration.
///
/// Activators are invoked by the resolve pipeline after the `Preparing`
/// hooks ran, with the prepared call-site parameters followed by the
/// parameters configured on the registration.
pub trait Activator: Send + Sync {
    /// Most specific type the produced instances are known to have.
    fn limit_type(&self) -> TypeDesc;

    /// Creates an instance, resolving dependencies through `ctx`.
    fn activate(&self, ctx: &ResolveContext<'_>, parameters: &[Parameter]) -> DiResult<Instance>;

    /// Short description used in diagnostics and error messages.
    fn description(&self) -> String {
        self.limit_type().to_string()
    }

    /// Whether every activation hands out the same object. Such activators
    /// are only valid for singleton registrations, since each activation
    /// would otherwise track the object for disposal again.
    fn activates_once(&self) -> bool {
        false
    }
}
