use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use super::Activator;
use crate::error::{DiError, DiResult};
use crate::parameters::{Parameter, Supplied};
use crate::provider::ResolveContext;
use crate::registration::Instance;
use crate::service::Service;
use crate::traits::ResolverCore;
use crate::types::{ConstructorArgs, ConstructorDef, ParamDef, TypeBindings, TypeDef, TypeDesc, TypeOracle};

/// How one constructor argument will be produced.
enum Binding {
    Supplied(Supplied),
    Resolve(Service),
    Default(Instance),
}

/// A constructor whose every argument has a binding.
struct Candidate<'a> {
    ctor: &'a ConstructorDef,
    bindings: SmallVec<[Binding; 6]>,
}

/// Activates a catalog-described type by choosing and invoking one of its
/// constructors.
///
/// Selection considers only constructors whose every parameter can be bound
/// (from a supplied parameter, a registered service or a declared default)
/// and picks the one with the most parameters. Several maximal candidates
/// are an [`DiError::AmbiguousConstructor`] error.
pub struct ReflectionActivator {
    oracle: Arc<dyn TypeOracle>,
    implementation: TypeDesc,
    definition: TypeDef,
    type_args: Vec<TypeDesc>,
    type_bindings: TypeBindings,
    signature: Option<Vec<TypeDesc>>,
}

impl ReflectionActivator {
    /// Activator for the closed type `implementation`.
    pub fn new(oracle: Arc<dyn TypeOracle>, implementation: TypeDesc) -> DiResult<Self> {
        if implementation.is_open() {
            return Err(DiError::config(format!(
                "'{}' is an open generic type and cannot be activated directly",
                implementation
            )));
        }
        let definition = oracle
            .definition(&implementation)
            .cloned()
            .ok_or_else(|| DiError::config(format!("type '{}' is not described in the type catalog", implementation)))?;
        let type_bindings = definition.bindings_for(&implementation);
        Ok(Self {
            type_args: implementation.args().to_vec(),
            oracle,
            implementation,
            definition,
            type_bindings,
            signature: None,
        })
    }

    /// Restricts activation to the constructor with exactly these (closed) parameter types.
    pub fn with_signature(mut self, signature: Vec<TypeDesc>) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn implementation(&self) -> &TypeDesc {
        &self.implementation
    }

    fn closed_params(&self, ctor: &ConstructorDef) -> Vec<ParamDef> {
        ctor.params().iter().map(|p| p.closed(&self.type_bindings)).collect()
    }

    fn bind<'a>(
        &self,
        ctor: &'a ConstructorDef,
        ctx: &ResolveContext<'_>,
        parameters: &[Parameter],
    ) -> Result<Candidate<'a>, String> {
        let mut bindings = SmallVec::new();
        for (position, param) in self.closed_params(ctor).iter().enumerate() {
            let supplied = parameters
                .iter()
                .find_map(|p| p.supply(position, param, self.oracle.as_ref()));
            let binding = match supplied {
                Some(s) => Binding::Supplied(s),
                None => {
                    let service = Service::typed(param.ty().clone());
                    if ctx.is_registered(&service) {
                        Binding::Resolve(service)
                    } else if let Some(default) = param.default_value() {
                        Binding::Default(default.clone())
                    } else {
                        return Err(format!(
                            "cannot resolve parameter '{:?}' of constructor '{}'",
                            param,
                            ctor.describe(&self.implementation)
                        ));
                    }
                }
            };
            bindings.push(binding);
        }
        Ok(Candidate { ctor, bindings })
    }

    fn select<'a>(&'a self, ctx: &ResolveContext<'_>, parameters: &[Parameter]) -> DiResult<Candidate<'a>> {
        let constructors: Vec<&ConstructorDef> = match &self.signature {
            Some(signature) => self
                .definition
                .constructors()
                .iter()
                .filter(|c| {
                    let closed: Vec<TypeDesc> = c.signature().iter().map(|t| t.substitute(&self.type_bindings)).collect();
                    closed == *signature
                })
                .collect(),
            None => self.definition.constructors().iter().collect(),
        };
        if constructors.is_empty() {
            let details = match &self.signature {
                Some(signature) => {
                    let types: Vec<String> = signature.iter().map(ToString::to_string).collect();
                    format!("no constructor has the signature ({})", types.join(", "))
                }
                None => "the type declares no constructors".to_string(),
            };
            return Err(DiError::NoConstructor {
                component: self.implementation.to_string(),
                details,
            });
        }

        let mut viable: Vec<Candidate<'a>> = Vec::new();
        let mut failures = Vec::new();
        for ctor in constructors {
            match self.bind(ctor, ctx, parameters) {
                Ok(candidate) => viable.push(candidate),
                Err(reason) => failures.push(reason),
            }
        }

        let Some(longest) = viable.iter().map(|c| c.ctor.params().len()).max() else {
            return Err(DiError::NoConstructor {
                component: self.implementation.to_string(),
                details: failures.join("; "),
            });
        };
        viable.retain(|c| c.ctor.params().len() == longest);
        if viable.len() > 1 {
            return Err(DiError::AmbiguousConstructor {
                component: self.implementation.to_string(),
                candidates: viable.iter().map(|c| c.ctor.describe(&self.implementation)).collect(),
            });
        }
        Ok(viable.remove(0))
    }
}

impl Activator for ReflectionActivator {
    fn limit_type(&self) -> TypeDesc {
        self.implementation.clone()
    }

    fn activate(&self, ctx: &ResolveContext<'_>, parameters: &[Parameter]) -> DiResult<Instance> {
        let candidate = self.select(ctx, parameters)?;
        trace!(
            component = %self.implementation,
            constructor = %candidate.ctor.describe(&self.implementation),
            "constructor selected"
        );

        let mut values = Vec::with_capacity(candidate.bindings.len());
        for binding in &candidate.bindings {
            let value = match binding {
                Binding::Supplied(supplied) => supplied.produce(ctx)?,
                Binding::Resolve(service) => ctx.resolve_with(service, &[])?,
                Binding::Default(value) => value.clone(),
            };
            values.push(value);
        }

        let args = ConstructorArgs::new(&self.type_args, values);
        candidate
            .ctor
            .invoke(&args)
            .map_err(|e| DiError::activation(self.description(), e))
    }

    fn description(&self) -> String {
        self.implementation.to_string()
    }
}
