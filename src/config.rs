//! Builder configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_types() -> Vec<String> {
    vec!["json".to_string()]
}

/// Configuration shared by every node of a resource tree.
///
/// # Example
///
/// ```
/// use restmount::Config;
///
/// let config = Config::new().base_path("/api").version("1.0");
/// assert_eq!(config.base_path_str(), Some("api"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version segment inserted after the base path, e.g. `1.0`.
    pub version: Option<String>,
    /// Base path prefixed to every resource, without separators.
    #[serde(alias = "basePath")]
    pub base_path: Option<String>,
    /// Accept a `.type` suffix after the last path segment.
    #[serde(alias = "typeSuffix")]
    pub type_suffix: bool,
    /// Serialization types announced by this API.
    pub types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: None,
            base_path: None,
            type_suffix: false,
            types: default_types(),
        }
    }
}

impl Config {
    /// Create a configuration with the default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the version segment.
    #[must_use]
    pub fn version(self, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..self
        }
    }

    /// Sets the base path. Surrounding `/` are stripped.
    #[must_use]
    pub fn base_path(self, base_path: impl Into<String>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            ..self
        }
        .normalized()
    }

    /// Enables or disables the `.type` suffix.
    #[must_use]
    pub fn type_suffix(self, enable: bool) -> Self {
        Self {
            type_suffix: enable,
            ..self
        }
    }

    /// Sets the announced serialization types.
    #[must_use]
    pub fn types<I, T>(self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Returns the normalized base path, if any.
    pub fn base_path_str(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Parses a configuration from a TOML document.
    ///
    /// ```
    /// use restmount::Config;
    ///
    /// let config = Config::from_toml_str(
    ///     r#"
    ///     version = "1.0"
    ///     basePath = "/api"
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.base_path_str(), Some("api"));
    /// assert_eq!(config.types, vec!["json".to_string()]);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        Ok(config.normalized())
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub(crate) fn normalized(self) -> Self {
        let base_path = self
            .base_path
            .map(|path| path.trim_matches('/').to_string())
            .filter(|path| !path.is_empty());
        let version = self.version.filter(|version| !version.is_empty());
        Self {
            base_path,
            version,
            ..self
        }
    }
}
