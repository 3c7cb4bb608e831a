//! Custom validation functions for configuration.

use bufstore_core::ArenaLayout;
use validator::ValidationError;

use crate::pool::PoolConfig;

/// Rejects pools whose arena size cannot be represented.
///
/// Zero parameters are reported by the field-level range checks.
pub fn validate_arena_size(config: &PoolConfig) -> Result<(), ValidationError> {
    if config.buffer_count == 0 || config.buffer_size == 0 {
        return Ok(());
    }
    ArenaLayout::new(config.buffer_count, config.buffer_size)
        .map(|_| ())
        .map_err(|e| {
            let mut error = ValidationError::new("arena_size");
            error.message = Some(e.to_string().into());
            error
        })
}

/// Validate a tracing level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(?i)(trace|debug|info|warn|error|off)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(level) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
