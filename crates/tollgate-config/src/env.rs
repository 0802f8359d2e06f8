//! `TOLLGATE_*` environment variables.
//!
//! Variables fill in fields that no config file set; a value written in a
//! file always beats the environment. Fields that hold only a built-in
//! default can be filled.

use std::collections::HashMap;

use toml::Value;
use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// `(variable, dotted field path)` pairs.
const ENV_FALLBACKS: &[(&str, &str)] = &[
    ("TOLLGATE_LOG_LEVEL", "logging.level"),
    ("TOLLGATE_LOG_FORMAT", "logging.format"),
    ("TOLLGATE_AGENT_ID", "policy.agent_id"),
    ("TOLLGATE_POLICY_PATH", "policy.source_path"),
    ("TOLLGATE_SELF_CHECK", "policy.self_check"),
    ("TOLLGATE_CALL_ID_PREFIX", "gateway.call_id_prefix"),
];

/// Fields that take a boolean rather than a string.
const BOOL_FIELDS: &[&str] = &["policy.self_check"];

/// Write env values into `merged` for every field no file set.
///
/// Returns how many variables were applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut applied: usize = 0;

    for &(var, field) in ENV_FALLBACKS {
        if sources.get(field).is_some_and(|layer| layer.is_file()) {
            continue;
        }
        let Some(raw) = env_vars.get(var) else {
            continue;
        };

        debug!(var, field, "applying env var fallback");
        set_path(merged, field, typed(field, raw));
        sources.insert(field.to_owned(), ConfigLayer::Environment);
        applied = applied.saturating_add(1);
    }

    applied
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Store `value` at the dotted `path`, creating tables on the way.
fn set_path(root: &mut Value, path: &str, value: Value) {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), value);
        }
        return;
    };

    let mut node = root;
    for segment in parents.split('.') {
        let Some(table) = node.as_table_mut() else {
            return;
        };
        node = table
            .entry(segment)
            .or_insert(Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = node.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Parse `raw` as the type `field` expects. Unparseable booleans stay
/// strings and fail at deserialization with the field named.
fn typed(field: &str, raw: &str) -> Value {
    if BOOL_FIELDS.contains(&field)
        && let Ok(flag) = raw.trim().parse::<bool>()
    {
        return Value::Boolean(flag);
    }
    Value::String(raw.to_owned())
}
