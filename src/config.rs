//! Container configuration.
//!
//! Options can be set in code through
//! [`ContainerBuilder::with_options`](crate::ContainerBuilder::with_options)
//! or loaded from JSON, where every field is optional and falls back to its
//! default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult};

/// Default limit on nested resolve depth.
pub const DEFAULT_MAX_RESOLVE_DEPTH: usize = 50;

/// Largest accepted `max_resolve_depth`. Nested activations recurse on the
/// calling thread, so deeper limits overflow a 2 MiB thread stack in debug
/// builds before the limit is reached.
pub const MAX_RESOLVE_DEPTH_LIMIT: usize = 128;

/// Tunables for a built container.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::ContainerOptions;
///
/// let options = ContainerOptions::from_json(r#"{ "max_resolve_depth": 64, "root_tag": "app" }"#).unwrap();
/// assert_eq!(options.max_resolve_depth, 64);
/// assert_eq!(options.root_tag, "app");
/// assert!(options.update_initialized_adapters);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerOptions {
    /// Maximum number of nested activations in one resolve operation, at
    /// most [`MAX_RESOLVE_DEPTH_LIMIT`].
    ///
    /// Catches runaway graphs that never repeat a registration, such as an
    /// open generic whose constructor needs a deeper closing of itself.
    pub max_resolve_depth: usize,
    /// Re-run adapter sources for services that were already initialized
    /// when a registration is added after resolution started.
    pub update_initialized_adapters: bool,
    /// Tag carried by the root lifetime scope.
    pub root_tag: String,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_resolve_depth: DEFAULT_MAX_RESOLVE_DEPTH,
            update_initialized_adapters: true,
            root_tag: "root".to_string(),
        }
    }
}

impl ContainerOptions {
    pub fn from_json(json: &str) -> DiResult<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| DiError::config(format!("invalid container options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> DiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DiError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> DiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DiError::config(e.to_string()))
    }

    pub(crate) fn validate(&self) -> DiResult<()> {
        if self.max_resolve_depth == 0 {
            return Err(DiError::config("max_resolve_depth must be at least 1"));
        }
        if self.max_resolve_depth > MAX_RESOLVE_DEPTH_LIMIT {
            return Err(DiError::config(format!(
                "max_resolve_depth {} exceeds the limit of {}",
                self.max_resolve_depth, MAX_RESOLVE_DEPTH_LIMIT
            )));
        }
        if self.root_tag.is_empty() {
            return Err(DiError::config("root_tag must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let options = ContainerOptions::from_json("{}").unwrap();
        assert_eq!(options, ContainerOptions::default());
    }

    #[test]
    fn rejects_unknown_fields_and_zero_depth() {
        assert!(matches!(
            ContainerOptions::from_json(r#"{ "max_depth": 3 }"#),
            Err(DiError::Configuration(_))
        ));
        assert!(matches!(
            ContainerOptions::from_json(r#"{ "max_resolve_depth": 0 }"#),
            Err(DiError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_depths_beyond_the_stack_budget() {
        let options = ContainerOptions::from_json(&format!(r#"{{ "max_resolve_depth": {} }}"#, MAX_RESOLVE_DEPTH_LIMIT)).unwrap();
        assert_eq!(options.max_resolve_depth, MAX_RESOLVE_DEPTH_LIMIT);
        assert!(matches!(
            ContainerOptions::from_json(r#"{ "max_resolve_depth": 1024 }"#),
            Err(DiError::Configuration(msg)) if msg.contains("1024")
        ));
    }

    #[test]
    fn json_round_trip() {
        let options = ContainerOptions {
            max_resolve_depth: 12,
            update_initialized_adapters: false,
            root_tag: "app".into(),
        };
        let parsed = ContainerOptions::from_json(&options.to_json().unwrap()).unwrap();
        assert_eq!(parsed, options);
    }
}
