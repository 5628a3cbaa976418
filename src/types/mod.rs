//! Runtime type descriptors.
//!
//! Rust has no runtime reflection, so the container works against a small
//! structural model of types: a [`TypeDesc`] names a type definition together
//! with its generic arguments, and a [`TypeOracle`] (usually a [`TypeCatalog`])
//! answers the questions resolution needs: which constructors and properties a
//! type has, which services it implements and whether generic constraints hold.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

pub mod catalog;
pub mod convert;

pub use catalog::{
    Constraint, ConstructorArgs, ConstructorDef, GenericParam, ParamDef, PropertyDef, TypeCatalog,
    TypeDef, TypeKind, TypeOracle,
};

pub(crate) const LAZY: &str = "ferrous_ioc::Lazy";
pub(crate) const META: &str = "ferrous_ioc::Meta";
pub(crate) const COLLECTION: &str = "ferrous_ioc::Collection";

/// Structural descriptor of a type.
///
/// A descriptor is *closed* when none of its arguments contain a generic
/// parameter, and *open* otherwise. `Repository<T>` is written
/// `TypeDesc::generic("Repository", [TypeDesc::param("T")])`.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::TypeDesc;
///
/// let open = TypeDesc::generic("Repository", [TypeDesc::param("T")]);
/// let closed = TypeDesc::generic("Repository", [TypeDesc::of::<i32>()]);
///
/// assert!(open.is_open());
/// assert!(!closed.is_open());
/// assert!(open.same_definition(&closed));
/// assert_eq!(closed.to_string(), "Repository<i32>");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeDesc {
    /// A named type definition with its (possibly empty) argument list.
    Type { name: Arc<str>, args: Arc<[TypeDesc]> },
    /// A generic parameter of an open definition.
    Param(Arc<str>),
}

impl TypeDesc {
    /// Descriptor for a Rust type, named by `std::any::type_name`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Non-generic named type.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        TypeDesc::Type {
            name: name.into(),
            args: Arc::from(Vec::new()),
        }
    }

    /// Generic type with the given arguments.
    pub fn generic(name: impl Into<Arc<str>>, args: impl IntoIterator<Item = TypeDesc>) -> Self {
        TypeDesc::Type {
            name: name.into(),
            args: args.into_iter().collect::<Vec<_>>().into(),
        }
    }

    /// Generic parameter placeholder.
    pub fn param(name: impl Into<Arc<str>>) -> Self {
        TypeDesc::Param(name.into())
    }

    /// `Lazy<inner>`, resolved by the lazy adapter.
    pub fn lazy(inner: TypeDesc) -> Self {
        Self::generic(LAZY, [inner])
    }

    /// `Meta<inner>`, resolved by the metadata adapter.
    pub fn meta(inner: TypeDesc) -> Self {
        Self::generic(META, [inner])
    }

    /// `Collection<inner>`, resolved by the collection adapter.
    pub fn collection(inner: TypeDesc) -> Self {
        Self::generic(COLLECTION, [inner])
    }

    pub(crate) fn wrapped_by(&self, wrapper: &str) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Type { name, args } if &**name == wrapper && args.len() == 1 => args.first(),
            _ => None,
        }
    }

    /// Element type when this is `Lazy<T>`.
    pub fn lazy_element(&self) -> Option<&TypeDesc> {
        self.wrapped_by(LAZY)
    }

    /// Element type when this is `Meta<T>`.
    pub fn meta_element(&self) -> Option<&TypeDesc> {
        self.wrapped_by(META)
    }

    /// Element type when this is `Collection<T>`.
    pub fn collection_element(&self) -> Option<&TypeDesc> {
        self.wrapped_by(COLLECTION)
    }

    /// Definition name (or parameter name).
    pub fn name(&self) -> &str {
        match self {
            TypeDesc::Type { name, .. } => name,
            TypeDesc::Param(name) => name,
        }
    }

    /// Generic arguments; empty for non-generic types and parameters.
    pub fn args(&self) -> &[TypeDesc] {
        match self {
            TypeDesc::Type { args, .. } => args,
            TypeDesc::Param(_) => &[],
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, TypeDesc::Param(_))
    }

    pub fn is_generic(&self) -> bool {
        !self.args().is_empty()
    }

    /// True when any generic parameter appears anywhere in the descriptor.
    pub fn is_open(&self) -> bool {
        match self {
            TypeDesc::Param(_) => true,
            TypeDesc::Type { args, .. } => args.iter().any(TypeDesc::is_open),
        }
    }

    /// True for `Name<T1, .., Tn>` where every argument is a distinct parameter.
    pub fn is_generic_definition(&self) -> bool {
        let args = self.args();
        if args.is_empty() || !args.iter().all(TypeDesc::is_param) {
            return false;
        }
        args.iter()
            .enumerate()
            .all(|(i, a)| !args[..i].contains(a))
    }

    /// Same definition name and arity (arguments ignored).
    pub fn same_definition(&self, other: &TypeDesc) -> bool {
        match (self, other) {
            (TypeDesc::Type { name: a, args: x }, TypeDesc::Type { name: b, args: y }) => {
                a == b && x.len() == y.len()
            }
            _ => false,
        }
    }

    /// Replaces bound parameters; unbound parameters are kept as they are.
    pub fn substitute(&self, bindings: &TypeBindings) -> TypeDesc {
        match self {
            TypeDesc::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeDesc::Type { name, args } if !args.is_empty() => TypeDesc::Type {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect::<Vec<_>>().into(),
            },
            TypeDesc::Type { .. } => self.clone(),
        }
    }

    /// Unifies `pattern` against `concrete`, extending `bindings`.
    ///
    /// Parameters in the pattern bind to whole sub-trees of the concrete
    /// descriptor, so nested uses (`Wrapper<T>`) and reordered argument lists
    /// both resolve. Returns `false` on the first conflict.
    pub fn unify(pattern: &TypeDesc, concrete: &TypeDesc, bindings: &mut TypeBindings) -> bool {
        match pattern {
            TypeDesc::Param(name) => match bindings.get(name) {
                Some(bound) => bound == concrete,
                None => {
                    bindings.insert(name.clone(), concrete.clone());
                    true
                }
            },
            TypeDesc::Type { name, args } => match concrete {
                TypeDesc::Type { name: cname, args: cargs } => {
                    name == cname
                        && args.len() == cargs.len()
                        && args
                            .iter()
                            .zip(cargs.iter())
                            .all(|(p, c)| TypeDesc::unify(p, c, bindings))
                }
                TypeDesc::Param(_) => false,
            },
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Param(name) => f.write_str(name),
            TypeDesc::Type { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDesc({})", self)
    }
}

/// Parameter-name to concrete-type bindings produced by unification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBindings(SmallVec<[(Arc<str>, TypeDesc); 4]>);

impl TypeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TypeDesc> {
        self.0.iter().find(|(n, _)| &**n == name).map(|(_, t)| t)
    }

    pub fn insert(&mut self, name: Arc<str>, ty: TypeDesc) {
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = ty,
            None => self.0.push((name, ty)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> TypeDesc {
        TypeDesc::named(name)
    }

    #[test]
    fn unify_binds_reordered_parameters() {
        let pattern = TypeDesc::generic("IFace", [TypeDesc::param("T1"), TypeDesc::param("T2")]);
        let concrete = TypeDesc::generic("IFace", [t("int"), t("string")]);
        let mut b = TypeBindings::new();
        assert!(TypeDesc::unify(&pattern, &concrete, &mut b));
        assert_eq!(b.get("T1"), Some(&t("int")));
        assert_eq!(b.get("T2"), Some(&t("string")));
    }

    #[test]
    fn unify_walks_nested_arguments() {
        let pattern = TypeDesc::generic("IFace", [TypeDesc::generic("Wrapper", [TypeDesc::param("T")])]);
        let good = TypeDesc::generic("IFace", [TypeDesc::generic("Wrapper", [t("int")])]);
        let bad = TypeDesc::generic("IFace", [t("int")]);

        let mut b = TypeBindings::new();
        assert!(TypeDesc::unify(&pattern, &good, &mut b));
        assert_eq!(b.get("T"), Some(&t("int")));
        assert!(!TypeDesc::unify(&pattern, &bad, &mut TypeBindings::new()));
    }

    #[test]
    fn unify_rejects_conflicting_bindings() {
        let pattern = TypeDesc::generic("Pair", [TypeDesc::param("T"), TypeDesc::param("T")]);
        let concrete = TypeDesc::generic("Pair", [t("int"), t("string")]);
        assert!(!TypeDesc::unify(&pattern, &concrete, &mut TypeBindings::new()));
    }

    #[test]
    fn generic_definition_requires_distinct_parameters() {
        assert!(TypeDesc::generic("G", [TypeDesc::param("T")]).is_generic_definition());
        assert!(!TypeDesc::generic("G", [TypeDesc::param("T"), TypeDesc::param("T")]).is_generic_definition());
        assert!(!TypeDesc::generic("G", [t("int")]).is_generic_definition());
        assert!(!t("G").is_generic_definition());
    }

    #[test]
    fn substitute_closes_open_types() {
        let open = TypeDesc::generic("Map", [TypeDesc::param("K"), TypeDesc::generic("List", [TypeDesc::param("V")])]);
        let mut b = TypeBindings::new();
        b.insert("K".into(), t("string"));
        b.insert("V".into(), t("int"));
        assert_eq!(open.substitute(&b).to_string(), "Map<string, List<int>>");
    }

    #[test]
    fn adapter_descriptors_expose_elements() {
        let lazy = TypeDesc::lazy(t("Db"));
        assert_eq!(lazy.lazy_element(), Some(&t("Db")));
        assert_eq!(lazy.meta_element(), None);
        assert_eq!(TypeDesc::collection(t("Db")).collection_element(), Some(&t("Db")));
    }
}
