//! # bufstore Configuration
//!
//! Layered configuration for the packet buffer pool and its telemetry.
//!
//! ## Hierarchy
//! 1. Built-in defaults
//! 2. `config/bufstore.yaml`
//! 3. `config/<BUFSTORE_ENV>.yaml` (`production` when unset)
//! 4. `BUFSTORE_*` environment variables, `__` separating nested keys
//!    (`BUFSTORE_POOL__BUFFER_COUNT=4096`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

mod error;
mod pool;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use pool::PoolConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/bufstore.yaml";
const ENV_PREFIX: &str = "BUFSTORE_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq, Eq)]
pub struct BufferStoreConfig {
    /// Pool sizing.
    #[validate(nested)]
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging and metrics.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BufferStoreConfig {
    /// Load configuration from default files and environment.
    ///
    /// Missing files are skipped; the result is validated before it is
    /// returned.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(BufferStoreConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        } else {
            debug!("{} not found, using default configuration", BASE_FILE);
        }

        let env = std::env::var("BUFSTORE_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific file, with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Self::extract(
            Figment::from(Serialized::defaults(BufferStoreConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn full_config_validation() {
        let config = BufferStoreConfig::default();
        config.validate().expect("Default config should validate");
    }

    #[test]
    fn loads_defaults_without_files() {
        Jail::expect_with(|_jail| {
            let config = BufferStoreConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config, BufferStoreConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_environment_override() {
        Jail::expect_with(|jail| {
            std::fs::create_dir("config").map_err(|e| e.to_string())?;
            jail.create_file(
                "config/bufstore.yaml",
                "pool:\n  buffer_count: 256\n  buffer_size: \"1KiB\"\ntelemetry:\n  log_level: debug\n",
            )?;
            jail.set_env("BUFSTORE_POOL__BUFFER_COUNT", 512);

            let config = BufferStoreConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.pool.buffer_count, 512);
            assert_eq!(config.pool.buffer_size, 1024);
            assert_eq!(config.telemetry.log_level, "debug");
            assert!(config.telemetry.metrics);
            Ok(())
        });
    }

    #[test]
    fn environment_file_overrides_base_file() {
        Jail::expect_with(|jail| {
            std::fs::create_dir("config").map_err(|e| e.to_string())?;
            jail.create_file("config/bufstore.yaml", "pool:\n  buffer_count: 64\n")?;
            jail.create_file("config/staging.yaml", "pool:\n  buffer_count: 32\n")?;
            jail.set_env("BUFSTORE_ENV", "staging");

            let config = BufferStoreConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.pool.buffer_count, 32);
            assert_eq!(config.pool.buffer_size, 2048);
            Ok(())
        });
    }

    #[test]
    fn zero_buffer_count_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("pool.yaml", "pool:\n  buffer_count: 0\n")?;
            let err = BufferStoreConfig::load_from_path("pool.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(err.to_string().contains("pool.buffer_count"));
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let err = BufferStoreConfig::load_from_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn unknown_size_unit_is_a_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("pool.yaml", "pool:\n  buffer_size: \"3 furlongs\"\n")?;
            let err = BufferStoreConfig::load_from_path("pool.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Parsing(_)));
            Ok(())
        });
    }
}
