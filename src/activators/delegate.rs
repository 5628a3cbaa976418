use std::any::Any;
use std::sync::Arc;

use super::Activator;
use crate::error::{BoxError, DiError, DiResult};
use crate::parameters::Parameter;
use crate::provider::ResolveContext;
use crate::registration::Instance;
use crate::types::TypeDesc;

type ActivationFn = Arc<dyn Fn(&ResolveContext<'_>, &[Parameter]) -> Result<Instance, BoxError> + Send + Sync>;

/// Activates components by calling a factory closure.
///
/// Failures returned by the closure are wrapped in [`DiError::Activation`]
/// naming the component; errors that already are container errors keep
/// their kind.
#[derive(Clone)]
pub struct DelegateActivator {
    limit: TypeDesc,
    factory: ActivationFn,
}

impl DelegateActivator {
    /// Factory producing a `T`.
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ResolveContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::with_parameters(TypeDesc::of::<T>(), move |ctx, _| {
            factory(ctx).map(|v| Arc::new(v) as Instance)
        })
    }

    /// Factory that also sees the effective parameters and yields an erased instance.
    pub fn with_parameters<F>(limit: TypeDesc, factory: F) -> Self
    where
        F: Fn(&ResolveContext<'_>, &[Parameter]) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            limit,
            factory: Arc::new(factory),
        }
    }
}

impl Activator for DelegateActivator {
    fn limit_type(&self) -> TypeDesc {
        self.limit.clone()
    }

    fn activate(&self, ctx: &ResolveContext<'_>, parameters: &[Parameter]) -> DiResult<Instance> {
        (self.factory)(ctx, parameters).map_err(|e| DiError::activation(self.description(), e))
    }

    fn description(&self) -> String {
        format!("λ:{}", self.limit)
    }
}
