//! Service identifiers for the dependency injection container.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::TypeDesc;

/// Key distinguishing several registrations of the same service type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKey {
    Name(Arc<str>),
    Int(i64),
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Name(name) => write!(f, "\"{}\"", name),
            ServiceKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for ServiceKey {
    fn from(name: &str) -> Self {
        ServiceKey::Name(name.into())
    }
}

impl From<String> for ServiceKey {
    fn from(name: String) -> Self {
        ServiceKey::Name(name.into())
    }
}

impl From<i64> for ServiceKey {
    fn from(i: i64) -> Self {
        ServiceKey::Int(i)
    }
}

/// Identifies what is being asked for.
///
/// Equality is structural: two equal services always resolve to the same
/// registration set.
///
/// # Variants
///
/// - **Typed**: by type descriptor
/// - **Keyed**: type descriptor plus a [`ServiceKey`]
/// - **Unique**: an opaque token, used for adapter plumbing
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Service, TypeDesc};
///
/// let plain = Service::of::<u32>();
/// let keyed = Service::keyed(TypeDesc::of::<u32>(), "port");
///
/// assert_ne!(plain, keyed);
/// assert_eq!(keyed, Service::keyed(TypeDesc::of::<u32>(), "port"));
/// assert_eq!(keyed.service_type(), Some(&TypeDesc::of::<u32>()));
/// assert!(Service::unique() != Service::unique());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    Typed(TypeDesc),
    Keyed(TypeDesc, ServiceKey),
    Unique(u64),
}

impl Service {
    /// Typed service for a Rust type.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Service::Typed(TypeDesc::of::<T>())
    }

    pub fn typed(ty: TypeDesc) -> Self {
        Service::Typed(ty)
    }

    pub fn keyed(ty: TypeDesc, key: impl Into<ServiceKey>) -> Self {
        Service::Keyed(ty, key.into())
    }

    /// A fresh token never equal to any other service.
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Service::Unique(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Type descriptor for typed and keyed services.
    pub fn service_type(&self) -> Option<&TypeDesc> {
        match self {
            Service::Typed(ty) | Service::Keyed(ty, _) => Some(ty),
            Service::Unique(_) => None,
        }
    }

    pub fn key(&self) -> Option<&ServiceKey> {
        match self {
            Service::Keyed(_, key) => Some(key),
            _ => None,
        }
    }

    /// Same service kind and key, with a different type.
    ///
    /// Adapters use this to move between `Lazy<T>` and `T` while keeping keys.
    pub fn with_type(&self, ty: TypeDesc) -> Option<Service> {
        match self {
            Service::Typed(_) => Some(Service::Typed(ty)),
            Service::Keyed(_, key) => Some(Service::Keyed(ty, key.clone())),
            Service::Unique(_) => None,
        }
    }

    /// Human-readable description used in diagnostics.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Typed(ty) => write!(f, "{}", ty),
            Service::Keyed(ty, key) => write!(f, "({}) {}", key, ty),
            Service::Unique(id) => write!(f, "unique#{}", id),
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service({})", self)
    }
}

impl From<TypeDesc> for Service {
    fn from(ty: TypeDesc) -> Self {
        Service::Typed(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn keyed_description_names_key_and_type() {
        let s = Service::keyed(TypeDesc::named("Db"), "primary");
        assert_eq!(s.description(), "(\"primary\") Db");
        let s = Service::keyed(TypeDesc::named("Db"), 3i64);
        assert_eq!(s.description(), "(3) Db");
    }

    #[test]
    fn with_type_keeps_key() {
        let s = Service::keyed(TypeDesc::named("Db"), "primary");
        let lazy = s.with_type(TypeDesc::lazy(TypeDesc::named("Db"))).unwrap();
        assert_eq!(lazy.key(), Some(&ServiceKey::from("primary")));
        assert!(Service::unique().with_type(TypeDesc::named("Db")).is_none());
    }

    proptest! {
        #[test]
        fn equality_is_structural(name in "[A-Za-z]{1,8}", key in "[a-z]{0,6}", arg in "[A-Z]{1,4}") {
            let ty = TypeDesc::generic(name.as_str(), [TypeDesc::named(arg.as_str())]);
            let a = Service::keyed(ty.clone(), key.as_str());
            let b = Service::keyed(TypeDesc::generic(name.as_str(), [TypeDesc::named(arg.as_str())]), key.as_str());
            prop_assert_eq!(&a, &b);

            let mut set = HashSet::new();
            set.insert(a.clone());
            prop_assert!(set.contains(&b));
            prop_assert_ne!(a, Service::typed(ty));
        }
    }
}
