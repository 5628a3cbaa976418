//! Parameters supplied at the call site or configured on a registration.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::provider::ResolveContext;
use crate::registration::Instance;
use crate::types::convert::convert;
use crate::types::{ParamDef, TypeDesc, TypeOracle};

type ParamPredicate = Arc<dyn Fn(&ParamDef) -> bool + Send + Sync>;
pub(crate) type ValueProvider = Arc<dyn Fn(&ResolveContext<'_>) -> DiResult<Instance> + Send + Sync>;

/// A value together with the type it was supplied as.
#[derive(Clone)]
pub struct ParameterValue {
    ty: TypeDesc,
    value: Instance,
}

impl ParameterValue {
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            ty: TypeDesc::of::<V>(),
            value: Arc::new(value),
        }
    }

    /// Value whose type is described by a catalog descriptor.
    pub fn from_instance(ty: TypeDesc, value: Instance) -> Self {
        Self { ty, value }
    }

    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }

    pub fn value(&self) -> &Instance {
        &self.value
    }

    fn coerce(&self, oracle: &dyn TypeOracle, target: &TypeDesc) -> Option<Instance> {
        convert(oracle, &self.value, &self.ty, target)
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.ty)
    }
}

/// Constructor argument source that takes precedence over autowiring.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Parameter, TypeDesc};
///
/// let by_name = Parameter::named("connection_string", "postgres://db".to_string());
/// let by_position = Parameter::positional(0, 30u32);
/// let by_type = Parameter::typed(8080u16);
/// let computed = Parameter::resolved(
///     |p| p.name() == "started_at",
///     |_ctx| Ok(std::sync::Arc::new(42u64)),
/// );
/// # let _ = (by_name, by_position, by_type, computed);
/// ```
#[derive(Clone)]
pub enum Parameter {
    /// Matches the constructor parameter with this name.
    Named(Arc<str>, ParameterValue),
    /// Matches the constructor parameter at this position.
    Positional(usize, ParameterValue),
    /// Matches parameters whose declared type accepts the value's type.
    Typed(ParameterValue),
    /// Matches parameters accepted by the predicate; the value is produced
    /// lazily, only if the constructor is chosen.
    Resolved {
        predicate: ParamPredicate,
        provider: ValueProvider,
    },
}

/// How a matched parameter will produce its value.
#[derive(Clone)]
pub(crate) enum Supplied {
    Value(Instance),
    Deferred(ValueProvider),
}

impl Supplied {
    pub(crate) fn produce(&self, ctx: &ResolveContext<'_>) -> DiResult<Instance> {
        match self {
            Supplied::Value(v) => Ok(v.clone()),
            Supplied::Deferred(provider) => provider(ctx),
        }
    }
}

impl Parameter {
    pub fn named<V: Any + Send + Sync>(name: impl Into<Arc<str>>, value: V) -> Self {
        Parameter::Named(name.into(), ParameterValue::new(value))
    }

    pub fn positional<V: Any + Send + Sync>(position: usize, value: V) -> Self {
        Parameter::Positional(position, ParameterValue::new(value))
    }

    pub fn typed<V: Any + Send + Sync>(value: V) -> Self {
        Parameter::Typed(ParameterValue::new(value))
    }

    /// Typed parameter for an instance described by a catalog descriptor.
    pub fn typed_instance(ty: TypeDesc, value: Instance) -> Self {
        Parameter::Typed(ParameterValue::from_instance(ty, value))
    }

    pub fn resolved<P, F>(predicate: P, provider: F) -> Self
    where
        P: Fn(&ParamDef) -> bool + Send + Sync + 'static,
        F: Fn(&ResolveContext<'_>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Parameter::Resolved {
            predicate: Arc::new(predicate),
            provider: Arc::new(provider),
        }
    }

    /// Checks whether this parameter can supply constructor argument
    /// `position` (declared as `param`).
    pub(crate) fn supply(&self, position: usize, param: &ParamDef, oracle: &dyn TypeOracle) -> Option<Supplied> {
        match self {
            Parameter::Named(name, value) if **name == *param.name() => {
                value.coerce(oracle, param.ty()).map(Supplied::Value)
            }
            Parameter::Positional(index, value) if *index == position => {
                value.coerce(oracle, param.ty()).map(Supplied::Value)
            }
            Parameter::Typed(value) if oracle.is_assignable(value.ty(), param.ty()) => {
                Some(Supplied::Value(value.value().clone()))
            }
            Parameter::Resolved { predicate, provider } if predicate(param) => {
                Some(Supplied::Deferred(provider.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Named(name, v) => write!(f, "Named({}, {:?})", name, v),
            Parameter::Positional(i, v) => write!(f, "Positional({}, {:?})", i, v),
            Parameter::Typed(v) => write!(f, "Typed({:?})", v),
            Parameter::Resolved { .. } => f.write_str("Resolved(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstructorDef, TypeCatalog};

    fn params() -> Vec<ParamDef> {
        ConstructorDef::new(|_| Ok(()))
            .param("port", TypeDesc::of::<u32>())
            .param("host", TypeDesc::of::<String>())
            .params()
            .to_vec()
    }

    #[test]
    fn named_parameter_converts_value() {
        let catalog = TypeCatalog::new();
        let p = params();
        let supplied = Parameter::named("port", 80u16).supply(0, &p[0], &catalog);
        match supplied {
            Some(Supplied::Value(v)) => assert_eq!(*v.downcast::<u32>().unwrap(), 80),
            _ => panic!("expected a converted value"),
        }
        assert!(Parameter::named("port", 80u16).supply(1, &p[1], &catalog).is_none());
    }

    #[test]
    fn positional_and_typed_match_independently() {
        let catalog = TypeCatalog::new();
        let p = params();
        assert!(Parameter::positional(1, "db".to_string()).supply(1, &p[1], &catalog).is_some());
        assert!(Parameter::positional(1, "db".to_string()).supply(0, &p[0], &catalog).is_none());
        assert!(Parameter::typed(5u32).supply(0, &p[0], &catalog).is_some());
        assert!(Parameter::typed(5u64).supply(0, &p[0], &catalog).is_none());
    }
}
