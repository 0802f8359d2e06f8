//! Checks run on the merged configuration before it is handed out.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a merged configuration, stopping at the first problem.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;
    one_of("logging.level", &logging.level, LOG_LEVELS)?;
    one_of("logging.format", &logging.format, LOG_FORMATS)?;

    let policy = &config.policy;
    if policy.agent_id.trim().is_empty() {
        return Err(ConfigError::invalid("policy.agent_id", "must not be empty"));
    }
    if policy.initial_version == 0 {
        return Err(ConfigError::invalid(
            "policy.initial_version",
            "versions start at 1",
        ));
    }
    if policy.source.is_some() && policy.source_path.is_some() {
        return Err(ConfigError::invalid(
            "policy.source",
            "conflicts with policy.source_path; set only one",
        ));
    }

    if config.gateway.call_id_prefix.is_empty() {
        return Err(ConfigError::invalid("gateway.call_id_prefix", "must not be empty"));
    }
    Ok(())
}

/// Case-insensitive membership check.
fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("'{value}' is not one of {}", allowed.join("/")),
        ))
    }
}
