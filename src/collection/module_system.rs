//! Reusable bundles of registrations.

use super::ContainerBuilder;
use crate::error::DiResult;

/// A reusable group of registrations.
///
/// # Example
///
/// ```rust
/// use ferrous_ioc::{ContainerBuilder, DiResult, Module, Resolver};
/// use std::sync::Arc;
///
/// struct UserConfig;
/// struct UserService { config: Arc<UserConfig> }
///
/// struct UserModule;
///
/// impl Module for UserModule {
///     fn load(&self, builder: &mut ContainerBuilder) -> DiResult<()> {
///         builder.register_instance(UserConfig);
///         builder
///             .register(|ctx| Ok(UserService { config: ctx.resolve::<UserConfig>()? }))
///             .instance_per_lifetime_scope();
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = ContainerBuilder::new();
/// builder.register_module(UserModule)?;
/// let container = builder.build()?;
/// assert!(container.resolve::<UserService>().is_ok());
/// # Ok(())
/// # }
/// ```
pub trait Module {
    /// Adds this module's registrations to `builder`.
    fn load(&self, builder: &mut ContainerBuilder) -> DiResult<()>;
}
