//! Type metadata: constructors, properties, implemented services and
//! generic constraints, plus the [`TypeOracle`] capability used by resolution.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;

use super::{TypeBindings, TypeDesc};
use crate::error::BoxError;
use crate::registration::Instance;

// Declarations are acyclic in practice; this only stops runaway recursion.
const MAX_HIERARCHY_DEPTH: usize = 32;

/// Broad category of a type, used by `Class`/`Struct` constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
}

/// Constraint on a generic parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Argument must be a reference type (class or interface).
    Class,
    /// Argument must be a value type.
    Struct,
    /// Argument must be constructible without arguments.
    DefaultConstructor,
    /// Argument must be assignable to the type (which may mention other parameters).
    Implements(TypeDesc),
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    name: Arc<str>,
    constraints: Vec<Constraint>,
}

impl GenericParam {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// Values handed to a constructor: closed generic arguments and the
/// resolved parameter values, in declaration order.
pub struct ConstructorArgs {
    type_args: SmallVec<[TypeDesc; 4]>,
    values: Vec<Instance>,
}

impl ConstructorArgs {
    pub(crate) fn new(type_args: &[TypeDesc], values: Vec<Instance>) -> Self {
        Self {
            type_args: type_args.iter().cloned().collect(),
            values,
        }
    }

    /// Closed generic arguments of the type being constructed.
    pub fn type_args(&self) -> &[TypeDesc] {
        &self.type_args
    }

    pub fn type_arg(&self, index: usize) -> Option<&TypeDesc> {
        self.type_args.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Type-erased argument value.
    pub fn instance(&self, index: usize) -> Result<Instance, BoxError> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| format!("constructor argument {} is out of range", index).into())
    }

    /// Argument value downcast to `T`.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        self.instance(index)?.downcast::<T>().map_err(|_| {
            format!(
                "constructor argument {} is not a {}",
                index,
                std::any::type_name::<T>()
            )
            .into()
        })
    }
}

type ConstructFn = Arc<dyn Fn(&ConstructorArgs) -> Result<Instance, BoxError> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&Instance, Instance) -> Result<(), BoxError> + Send + Sync>;

/// Constructor parameter.
#[derive(Clone)]
pub struct ParamDef {
    name: Arc<str>,
    ty: TypeDesc,
    default: Option<Instance>,
}

impl ParamDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }

    pub(crate) fn closed(&self, bindings: &TypeBindings) -> ParamDef {
        ParamDef {
            name: self.name.clone(),
            ty: self.ty.substitute(bindings),
            default: self.default.clone(),
        }
    }
}

impl fmt::Debug for ParamDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// One constructor of a type definition.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ConstructorDef, TypeDesc};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Scheduler { clock: Arc<Clock> }
///
/// let ctor = ConstructorDef::new(|args| Ok(Scheduler { clock: args.get::<Clock>(0)? }))
///     .param("clock", TypeDesc::of::<Clock>());
/// assert_eq!(ctor.params().len(), 1);
/// ```
#[derive(Clone)]
pub struct ConstructorDef {
    params: Vec<ParamDef>,
    invoke: ConstructFn,
}

impl ConstructorDef {
    /// Constructor producing a `T`.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ConstructorArgs) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::from_instance(move |args| f(args).map(|v| Arc::new(v) as Instance))
    }

    /// Constructor producing an already type-erased instance; useful for
    /// generic definitions whose concrete Rust type depends on the arguments.
    pub fn from_instance<F>(f: F) -> Self
    where
        F: Fn(&ConstructorArgs) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            invoke: Arc::new(f),
        }
    }

    pub fn param(mut self, name: impl Into<Arc<str>>, ty: TypeDesc) -> Self {
        self.params.push(ParamDef {
            name: name.into(),
            ty,
            default: None,
        });
        self
    }

    /// Parameter with a fallback used when nothing else can supply it.
    pub fn param_with_default<V: Any + Send + Sync>(
        mut self,
        name: impl Into<Arc<str>>,
        ty: TypeDesc,
        default: V,
    ) -> Self {
        self.params.push(ParamDef {
            name: name.into(),
            ty,
            default: Some(Arc::new(default)),
        });
        self
    }

    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    pub fn signature(&self) -> Vec<TypeDesc> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    pub(crate) fn invoke(&self, args: &ConstructorArgs) -> Result<Instance, BoxError> {
        (self.invoke)(args)
    }

    pub(crate) fn describe(&self, owner: &TypeDesc) -> String {
        let params: Vec<String> = self.params.iter().map(|p| format!("{:?}", p)).collect();
        format!("{}({})", owner, params.join(", "))
    }
}

/// Settable property.
#[derive(Clone)]
pub struct PropertyDef {
    name: Arc<str>,
    ty: TypeDesc,
    required: bool,
    setter: SetterFn,
}

impl PropertyDef {
    /// Property of `O` holding an `Arc<V>`.
    pub fn new<O, V, F>(name: impl Into<Arc<str>>, ty: TypeDesc, set: F) -> Self
    where
        O: Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: Fn(&O, Arc<V>) + Send + Sync + 'static,
    {
        let name: Arc<str> = name.into();
        let prop = name.clone();
        let setter = move |target: &Instance, value: Instance| -> Result<(), BoxError> {
            let owner = target
                .downcast_ref::<O>()
                .ok_or_else(|| format!("property '{}' set on an instance that is not {}", prop, std::any::type_name::<O>()))?;
            let value = value
                .downcast::<V>()
                .map_err(|_| format!("value for property '{}' is not {}", prop, std::any::type_name::<V>()))?;
            set(owner, value);
            Ok(())
        };
        Self {
            name,
            ty,
            required: false,
            setter: Arc::new(setter),
        }
    }

    /// Marks the property as required: failing to resolve it fails activation.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub(crate) fn set(&self, target: &Instance, value: Instance) -> Result<(), BoxError> {
        (self.setter)(target, value)
    }
}

/// Metadata for a (possibly generic) type definition.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ConstructorDef, TypeDef, TypeDesc};
///
/// struct Repo { entity: TypeDesc }
///
/// let repo = TypeDef::class("Repo")
///     .param("T")
///     .implements(TypeDesc::generic("IRepo", [TypeDesc::param("T")]))
///     .constructor(ConstructorDef::new(|args| Ok(Repo { entity: args.type_args()[0].clone() })));
///
/// assert!(repo.self_type().is_generic_definition());
/// ```
#[derive(Clone)]
pub struct TypeDef {
    name: Arc<str>,
    kind: TypeKind,
    params: Vec<GenericParam>,
    implements: Vec<TypeDesc>,
    constructors: Vec<ConstructorDef>,
    properties: Vec<PropertyDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<Arc<str>>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            implements: Vec::new(),
            constructors: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn structure(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn interface(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Definition for a Rust type, named like [`TypeDesc::of`].
    pub fn of<T: ?Sized + 'static>(kind: TypeKind) -> Self {
        Self::new(std::any::type_name::<T>(), kind)
    }

    /// Adds an unconstrained generic parameter.
    pub fn param(self, name: impl Into<Arc<str>>) -> Self {
        self.generic_param(GenericParam::new(name))
    }

    pub fn generic_param(mut self, param: GenericParam) -> Self {
        self.params.push(param);
        self
    }

    /// Declares an implemented interface or base type, written over this
    /// definition's own parameters.
    pub fn implements(mut self, service: TypeDesc) -> Self {
        self.implements.push(service);
        self
    }

    pub fn constructor(mut self, ctor: ConstructorDef) -> Self {
        self.constructors.push(ctor);
        self
    }

    pub fn property(mut self, prop: PropertyDef) -> Self {
        self.properties.push(prop);
        self
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn generic_params(&self) -> &[GenericParam] {
        &self.params
    }

    pub fn implemented(&self) -> &[TypeDesc] {
        &self.implements
    }

    pub fn constructors(&self) -> &[ConstructorDef] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    /// `Name<P1, .., Pn>` over this definition's parameters.
    pub fn self_type(&self) -> TypeDesc {
        if self.params.is_empty() {
            TypeDesc::named(self.name.clone())
        } else {
            TypeDesc::generic(
                self.name.clone(),
                self.params.iter().map(|p| TypeDesc::Param(p.name.clone())),
            )
        }
    }

    /// Bindings of this definition's parameters to the arguments of `closed`.
    pub fn bindings_for(&self, closed: &TypeDesc) -> TypeBindings {
        let mut bindings = TypeBindings::new();
        for (param, arg) in self.params.iter().zip(closed.args()) {
            bindings.insert(param.name.clone(), arg.clone());
        }
        bindings
    }

    pub(crate) fn has_default_constructor(&self) -> bool {
        self.kind == TypeKind::Struct
            || self
                .constructors
                .iter()
                .any(|c| c.params.iter().all(|p| p.default.is_some()))
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("type", &self.self_type())
            .field("kind", &self.kind)
            .field("implements", &self.implements)
            .field("constructors", &self.constructors.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Narrow reflection capability the resolve pipeline depends on.
///
/// Only [`definition`](TypeOracle::definition) must be supplied; the other
/// queries derive from the declared metadata.
pub trait TypeOracle: Send + Sync {
    /// Metadata for the definition `ty` is an instance of.
    fn definition(&self, ty: &TypeDesc) -> Option<&TypeDef>;

    /// Every type `ty` can be used as: itself, then its implemented
    /// services and base types (transitively), closed over `ty`'s arguments.
    fn assignable_types(&self, ty: &TypeDesc) -> Vec<TypeDesc> {
        let mut out = vec![ty.clone()];
        collect_supertypes(self, ty, &mut out, 0);
        out
    }

    /// Whether a value of `concrete` can be used where `target` is expected.
    fn is_assignable(&self, concrete: &TypeDesc, target: &TypeDesc) -> bool {
        concrete == target || self.assignable_types(concrete).iter().any(|t| t == target)
    }

    /// Whether `concrete` satisfies every constraint of `param`, given the
    /// bindings chosen for the remaining parameters.
    fn satisfies(&self, param: &GenericParam, concrete: &TypeDesc, bindings: &TypeBindings) -> bool {
        param.constraints().iter().all(|c| match c {
            Constraint::Class => self
                .definition(concrete)
                .is_some_and(|d| d.kind() != TypeKind::Struct),
            Constraint::Struct => self
                .definition(concrete)
                .is_some_and(|d| d.kind() == TypeKind::Struct),
            Constraint::DefaultConstructor => self
                .definition(concrete)
                .is_some_and(TypeDef::has_default_constructor),
            Constraint::Implements(target) => self.is_assignable(concrete, &target.substitute(bindings)),
        })
    }
}

fn collect_supertypes<O: TypeOracle + ?Sized>(oracle: &O, ty: &TypeDesc, out: &mut Vec<TypeDesc>, depth: usize) {
    if depth >= MAX_HIERARCHY_DEPTH {
        return;
    }
    let Some(def) = oracle.definition(ty) else {
        return;
    };
    let bindings = def.bindings_for(ty);
    for implemented in def.implemented() {
        let closed = implemented.substitute(&bindings);
        if !out.contains(&closed) {
            out.push(closed.clone());
            collect_supertypes(oracle, &closed, out, depth + 1);
        }
    }
}

/// Finds the generic arguments that close `def` into an implementation of
/// `requested`.
///
/// The definition's own type and each declared supertype are unified against
/// the request; supertypes that are themselves generic definitions in the
/// oracle are walked with the partially-bound arguments substituted. Returns
/// `None` when a parameter stays unbound or a constraint is violated.
pub fn bind_generic_arguments<O: TypeOracle + ?Sized>(
    oracle: &O,
    def: &TypeDef,
    requested: &TypeDesc,
) -> Option<Vec<TypeDesc>> {
    let mut candidates = vec![def.self_type()];
    let mut index = 0;
    while index < candidates.len() && index < MAX_HIERARCHY_DEPTH * 4 {
        let candidate = candidates[index].clone();
        index += 1;

        if candidate.same_definition(requested) {
            let mut bindings = TypeBindings::new();
            if TypeDesc::unify(&candidate, requested, &mut bindings) {
                if let Some(args) = complete_bindings(oracle, def, &bindings) {
                    return Some(args);
                }
            }
        }

        let declared: Vec<TypeDesc> = if index == 1 {
            def.implemented().to_vec()
        } else {
            match oracle.definition(&candidate) {
                Some(parent) => {
                    let parent_bindings = parent.bindings_for(&candidate);
                    parent
                        .implemented()
                        .iter()
                        .map(|t| t.substitute(&parent_bindings))
                        .collect()
                }
                None => Vec::new(),
            }
        };
        for next in declared {
            if !candidates.contains(&next) {
                candidates.push(next);
            }
        }
    }
    None
}

fn complete_bindings<O: TypeOracle + ?Sized>(oracle: &O, def: &TypeDef, bindings: &TypeBindings) -> Option<Vec<TypeDesc>> {
    let mut args = Vec::with_capacity(def.generic_params().len());
    for param in def.generic_params() {
        let bound = bindings.get(param.name())?;
        if bound.is_open() {
            return None;
        }
        args.push(bound.clone());
    }
    def.generic_params()
        .iter()
        .zip(&args)
        .all(|(param, arg)| oracle.satisfies(param, arg, bindings))
        .then_some(args)
}

/// In-memory [`TypeOracle`] filled by the application or a code generator.
///
/// Common primitives are pre-registered as value types and `String` as a
/// reference type so `Class`/`Struct` constraints work out of the box.
#[derive(Clone, Default)]
pub struct TypeCatalog {
    defs: AHashMap<Arc<str>, Arc<TypeDef>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        let mut catalog = Self::default();
        macro_rules! values {
            ($c:ident: $($t:ty),*) => { $( $c.define(TypeDef::of::<$t>(TypeKind::Struct)); )* };
        }
        values!(catalog: bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
        catalog.define(TypeDef::of::<String>(TypeKind::Class));
        catalog
    }

    /// Adds or replaces a definition.
    pub fn define(&mut self, def: TypeDef) -> &mut Self {
        self.defs.insert(def.name.clone(), Arc::new(def));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TypeDef>> {
        self.defs.get(name)
    }

    pub fn contains(&self, ty: &TypeDesc) -> bool {
        self.definition(ty).is_some()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl TypeOracle for TypeCatalog {
    fn definition(&self, ty: &TypeDesc) -> Option<&TypeDef> {
        match ty {
            TypeDesc::Type { name, args } => self
                .defs
                .get(name)
                .filter(|d| d.generic_params().len() == args.len())
                .map(|d| d.as_ref()),
            TypeDesc::Param(_) => None,
        }
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog").field("definitions", &self.defs.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> TypeDesc {
        TypeDesc::param(name)
    }

    fn g<const N: usize>(name: &str, args: [TypeDesc; N]) -> TypeDesc {
        TypeDesc::generic(name, args)
    }

    fn catalog() -> TypeCatalog {
        let mut c = TypeCatalog::new();
        c.define(TypeDef::interface("IFace").param("A").param("B"));
        c.define(
            TypeDef::class("Swapped")
                .param("T2")
                .param("T1")
                .implements(g("IFace", [p("T1"), p("T2")])),
        );
        c.define(
            TypeDef::class("BaseRepo")
                .param("E")
                .implements(g("IRepo", [p("E")])),
        );
        c.define(TypeDef::class("UserRepo").param("X").implements(g("BaseRepo", [p("X")])));
        c.define(
            TypeDef::class("Structs")
                .generic_param(GenericParam::new("T").constraint(Constraint::Struct))
                .implements(g("IBox", [p("T")])),
        );
        c
    }

    #[test]
    fn binds_reordered_parameters() {
        let c = catalog();
        let def = c.get("Swapped").unwrap();
        let req = g("IFace", [TypeDesc::of::<i32>(), TypeDesc::of::<String>()]);
        let args = bind_generic_arguments(&c, def, &req).unwrap();
        assert_eq!(args, vec![TypeDesc::of::<String>(), TypeDesc::of::<i32>()]);
    }

    #[test]
    fn walks_base_types() {
        let c = catalog();
        let def = c.get("UserRepo").unwrap();
        let req = g("IRepo", [TypeDesc::named("User")]);
        assert_eq!(bind_generic_arguments(&c, def, &req), Some(vec![TypeDesc::named("User")]));
    }

    #[test]
    fn constraint_violation_is_silent() {
        let c = catalog();
        let def = c.get("Structs").unwrap();
        assert!(bind_generic_arguments(&c, def, &g("IBox", [TypeDesc::of::<i32>()])).is_some());
        assert!(bind_generic_arguments(&c, def, &g("IBox", [TypeDesc::of::<String>()])).is_none());
    }

    #[test]
    fn assignability_follows_closed_hierarchy() {
        let c = catalog();
        let user_repo = g("UserRepo", [TypeDesc::named("User")]);
        assert!(c.is_assignable(&user_repo, &g("IRepo", [TypeDesc::named("User")])));
        assert!(!c.is_assignable(&user_repo, &g("IRepo", [TypeDesc::named("Order")])));
    }
}
