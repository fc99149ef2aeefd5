//! Framework configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```rust
//! use eki::FrameworkConfig;
//!
//! let config = FrameworkConfig::from_yaml_str("default_redirect_status: 302\n").unwrap();
//! assert_eq!(config.default_redirect_status, 302);
//! assert!(config.emit_doctype);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Tunables for request dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Largest request body read, in bytes.
    pub body_limit: usize,
    /// Status for redirects that do not name one.
    pub default_redirect_status: u16,
    /// Writes `<!DOCTYPE html>` and an HTML content type before rendering a
    /// view.
    pub emit_doctype: bool,
    /// Includes error details in 500 responses.
    pub expose_error_details: bool,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            body_limit: 2 * 1024 * 1024,
            default_redirect_status: 303,
            emit_doctype: true,
            expose_error_details: false,
        }
    }
}

impl FrameworkConfig {
    /// Parses and validates YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Rejects values dispatch cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(300..400).contains(&self.default_redirect_status) {
            return Err(ConfigError::Invalid(format!(
                "default_redirect_status {} is not a redirect",
                self.default_redirect_status
            )));
        }
        if self.body_limit == 0 {
            return Err(ConfigError::Invalid("body_limit must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_default() {
        assert_eq!(FrameworkConfig::from_yaml_str("").unwrap(), FrameworkConfig::default());
        assert_eq!(FrameworkConfig::from_yaml_str("{}").unwrap(), FrameworkConfig::default());
    }

    #[test]
    fn overrides() {
        let yaml = "body_limit: 1024\nemit_doctype: false\nexpose_error_details: true\n";
        let config = FrameworkConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.body_limit, 1024);
        assert!(!config.emit_doctype);
        assert!(config.expose_error_details);
        assert_eq!(config.default_redirect_status, 303);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            FrameworkConfig::from_yaml_str("default_redirect_status: 200"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FrameworkConfig::from_yaml_str("body_limit: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FrameworkConfig::from_yaml_str("body_limit: [1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file() {
        let err = FrameworkConfig::from_path("/nonexistent/eki.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
