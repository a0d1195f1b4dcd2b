use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "GOMAFIA";

/// Runtime settings for the verifier. Every key can be overridden with a
/// `GOMAFIA_`-prefixed environment variable, e.g. `GOMAFIA_CHUNK_SIZE=16`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Where markup of pages that failed verification is written.
    pub fixtures_dir: PathBuf,
    /// Used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub fail_on_error: bool,
    /// Pages handed to the thread pool per batch.
    pub chunk_size: usize,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("fixtures_dir", "tests/fixtures/failures")?
            .set_default("log_filter", "info")?
            .set_default("fail_on_error", false)?
            .set_default("chunk_size", 64)?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        if settings.chunk_size == 0 {
            return Err(ConfigError::Message("chunk_size must be at least 1".into()));
        }
        Ok(settings)
    }

    #[cfg(test)]
    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let vars: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::from_env(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }
}

// ── Tests ──
