use std::any::Any;
use std::sync::Arc;

use super::Activator;
use crate::error::DiResult;
use crate::parameters::Parameter;
use crate::provider::ResolveContext;
use crate::registration::Instance;
use crate::types::TypeDesc;

/// Hands out a value that was built before the container.
pub struct ProvidedInstanceActivator {
    ty: TypeDesc,
    instance: Instance,
}

impl ProvidedInstanceActivator {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_instance(TypeDesc::of::<T>(), Arc::new(value))
    }

    pub fn from_instance(ty: TypeDesc, instance: Instance) -> Self {
        Self { ty, instance }
    }
}

impl Activator for ProvidedInstanceActivator {
    fn limit_type(&self) -> TypeDesc {
        self.ty.clone()
    }

    fn activate(&self, _ctx: &ResolveContext<'_>, _parameters: &[Parameter]) -> DiResult<Instance> {
        Ok(self.instance.clone())
    }

    fn description(&self) -> String {
        format!("instance of {}", self.ty)
    }

    fn activates_once(&self) -> bool {
        true
    }
}
