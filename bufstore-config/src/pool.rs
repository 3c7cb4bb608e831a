//! Buffer pool sizing.
//!
//! Both parameters are fixed for the lifetime of a pool; the arena they
//! describe is allocated once when the pool is built.

use bufstore_core::BufferStore;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{self, Validate};

use crate::{validation, ConfigError};

/// Packet buffer pool configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
#[validate(schema(function = validation::validate_arena_size))]
pub struct PoolConfig {
    /// Number of fixed-size buffers in the arena.
    #[validate(range(min = 1, message = "buffer_count must be greater than zero"))]
    #[serde(default = "default_buffer_count")]
    pub buffer_count: usize,

    /// Size of each buffer in bytes. Accepts plain numbers or sizes like "2KiB".
    #[validate(range(min = 1, message = "buffer_size must be greater than zero"))]
    #[serde(default = "default_buffer_size", deserialize_with = "deserialize_size")]
    pub buffer_size: usize,
}

fn default_buffer_count() -> usize {
    1024
}

fn default_buffer_size() -> usize {
    2048 // Fits a standard Ethernet frame.
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_count: default_buffer_count(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl PoolConfig {
    /// Validates the configuration and builds the pool it describes.
    pub fn build_store(&self) -> Result<BufferStore, ConfigError> {
        self.validate()?;
        Ok(BufferStore::new(self.buffer_count, self.buffer_size)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Num(usize),
    Str(String),
}

/// Accepts either a byte count or a human-friendly size ("1500", "2KiB", "1MiB").
fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Num(n) => Ok(n),
        SizeValue::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

pub(crate) fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (num_part, unit_part) = s.split_at(split);

    let number: usize = num_part
        .parse()
        .map_err(|e| format!("invalid size '{}': {}", s, e))?;
    let multiplier: usize = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "kb" | "kib" => 1024,
        "mb" | "mib" => 1024 * 1024,
        "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("unknown size unit '{}'", other)),
    };
    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' overflows", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_config_is_valid() {
        PoolConfig::default()
            .validate()
            .expect("Default config should be valid");
    }

    #[test]
    fn zero_parameters_are_invalid() {
        let mut config = PoolConfig::default();
        config.buffer_count = 0;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overflowing_arena_is_invalid() {
        let config = PoolConfig {
            buffer_count: usize::MAX / 2,
            buffer_size: 4,
        };
        assert!(config.validate().is_err());
        assert!(matches!(
            config.build_store(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn parses_human_sizes() {
        assert_eq!(parse_size("1500"), Ok(1500));
        assert_eq!(parse_size("2KiB"), Ok(2048));
        assert_eq!(parse_size(" 1 MiB "), Ok(1024 * 1024));
        assert!(parse_size("12 parsecs").is_err());
        assert!(parse_size("KiB").is_err());
    }

    #[test]
    fn builds_store_from_config() {
        let config = PoolConfig {
            buffer_count: 8,
            buffer_size: 512,
        };
        let store = config.build_store().unwrap();
        assert_eq!(store.capacity(), 8);
        assert_eq!(store.buffer_size(), 512);
        assert_eq!(store.available_count(), 8);
    }
}
