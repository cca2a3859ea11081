//! Engine configuration.
//!
//! Layered lowest precedence first: built-in defaults, a TOML file,
//! `BLI_*` environment variables, then whatever the caller sets last
//! (typically command-line flags).

use std::path::Path;

use bli_dataset::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Default number of districts kept in `top_problem_districts`.
pub const DEFAULT_TOP_N: usize = 10;

/// Environment variable overriding [`EngineConfig::top_n`].
pub const ENV_TOP_N: &str = "BLI_TOP_N";
/// Environment variable overriding [`EngineConfig::error_tolerance`].
pub const ENV_ERROR_TOLERANCE: &str = "BLI_ERROR_TOLERANCE";
/// Environment variable overriding [`EngineConfig::chunk_size`].
pub const ENV_CHUNK_SIZE: &str = "BLI_CHUNK_SIZE";

/// Tunables for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Districts kept in the ranked top list.
    pub top_n: usize,
    /// Rejected rows a file may contain before the whole file fails.
    pub error_tolerance: usize,
    /// Rows per parse chunk and per parallel aggregation chunk.
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            error_tolerance: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn config_error(message: impl Into<String>) -> EngineError {
    EngineError::Config {
        message: message.into(),
    }
}

impl EngineConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Config`] if the document is malformed, has unknown
    ///   keys, or sets an invalid value.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(text).map_err(|e| config_error(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Config`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Applies overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Config`] if a variable is set but is not a valid
    ///   non-negative integer, or the result fails [`Self::validate`].
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EngineError> {
        let read = |name: &str| -> Result<Option<usize>, EngineError> {
            lookup(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<usize>()
                        .map_err(|_| config_error(format!("{name} must be a non-negative integer, got '{raw}'")))
                })
                .transpose()
        };

        if let Some(v) = read(ENV_TOP_N)? {
            self.top_n = v;
        }
        if let Some(v) = read(ENV_ERROR_TOLERANCE)? {
            self.error_tolerance = v;
        }
        if let Some(v) = read(ENV_CHUNK_SIZE)? {
            self.chunk_size = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_overrides`].
    pub fn apply_env(self) -> Result<Self, EngineError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Defaults, then the optional TOML file, then the environment.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Config`] if any layer is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let base = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        let config = base.apply_env()?;
        log::debug!("Loaded config: {config:?}");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Config`] if `top_n` or `chunk_size` is zero.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.top_n == 0 {
            return Err(config_error("top_n must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(config_error("chunk_size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.top_n, 10);
        assert_eq!(config.error_tolerance, 0);
        assert_eq!(config.chunk_size, 10_000);
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = EngineConfig::from_toml_str("top_n = 5\n").unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn toml_rejects_unknown_keys_and_zero_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("top_k = 5"),
            Err(EngineError::Config { .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("chunk_size = 0"),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn environment_beats_file() {
        let file = EngineConfig::from_toml_str("top_n = 5\nerror_tolerance = 2").unwrap();
        let config = file
            .apply_overrides(vars(&[(ENV_TOP_N, "20"), (ENV_CHUNK_SIZE, " 64 ")]))
            .unwrap();
        assert_eq!(config.top_n, 20);
        assert_eq!(config.error_tolerance, 2);
        assert_eq!(config.chunk_size, 64);
    }

    #[test]
    fn bad_environment_values_are_config_errors() {
        let err = EngineConfig::default()
            .apply_overrides(vars(&[(ENV_ERROR_TOLERANCE, "-1")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ERROR_TOLERANCE), "{err}");
        assert!(
            EngineConfig::default()
                .apply_overrides(vars(&[(ENV_TOP_N, "0")]))
                .is_err()
        );
    }
}
