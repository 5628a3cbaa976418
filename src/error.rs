//! Error types for the dependency injection container.

use std::sync::Arc;

/// Boxed error returned by constructors, factories and lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependency injection errors
///
/// Represents the various error conditions that can occur while configuring a
/// container or resolving components from it.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ContainerBuilder, DiError, Resolver};
///
/// let container = ContainerBuilder::new().build().unwrap();
/// match container.resolve::<String>() {
///     Err(DiError::NotRegistered { service }) => {
///         assert!(service.contains("String"));
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_ioc::DiError;
///
/// let circular = DiError::Circular(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(circular.to_string(), "Circular component dependency detected: A -> B -> A");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No implementation is known for the requested service.
    #[error("The requested service '{service}' has not been registered")]
    NotRegistered { service: String },

    /// The registration being entered is already on the active resolve stack.
    #[error("Circular component dependency detected: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// A constructor, factory or lifecycle hook failed.
    #[error("An error occurred during the activation of '{component}'")]
    Activation {
        component: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// No constructor of a reflection component could be satisfied.
    #[error("None of the constructors found on '{component}' can be invoked: {details}")]
    NoConstructor { component: String, details: String },

    /// Several satisfiable constructors share the highest parameter count.
    #[error("Cannot choose between multiple constructors with equal length on '{component}': {}", .candidates.join("; "))]
    AmbiguousConstructor {
        component: String,
        candidates: Vec<String>,
    },

    /// A per-matching-scope component was requested outside any scope with the tag.
    #[error("No scope with a tag matching [{}] is visible from the scope in which '{component}' was requested", .tags.join(", "))]
    NoMatchingScope { component: String, tags: Vec<String> },

    /// A property declared as required could not be resolved.
    #[error("Required property '{property}' on '{component}' could not be resolved")]
    RequiredProperty { component: String, property: String },

    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),

    /// The lifetime scope has already been disposed.
    #[error("Instances cannot be resolved from scope '{0}' because it has been disposed")]
    Disposed(String),

    /// Maximum recursion depth exceeded
    #[error("Max resolve depth {0} exceeded")]
    DepthExceeded(usize),

    /// Build-time invariant violation.
    #[error("Invalid container configuration: {0}")]
    Configuration(String),
}

impl DiError {
    /// Wraps an error raised while activating `component`.
    ///
    /// Errors that already are [`DiError`]s pass through unchanged so nested
    /// failures keep their kind (a circular dependency stays circular).
    pub fn activation(component: impl Into<String>, err: BoxError) -> Self {
        match err.downcast::<DiError>() {
            Ok(di) => *di,
            Err(other) => DiError::Activation {
                component: component.into(),
                source: Arc::from(other),
            },
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        DiError::Configuration(msg.into())
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-ioc.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn activation_preserves_cause() {
        let inner: BoxError = "socket closed".into();
        let err = DiError::activation("Database", inner);
        assert!(matches!(err, DiError::Activation { .. }));
        assert_eq!(err.source().unwrap().to_string(), "socket closed");
    }

    #[test]
    fn activation_passes_di_errors_through() {
        let inner: BoxError = Box::new(DiError::Circular(vec!["A".into(), "A".into()]));
        let err = DiError::activation("Outer", inner);
        assert!(matches!(err, DiError::Circular(path) if path.len() == 2));
    }
}
