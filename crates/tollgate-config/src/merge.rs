//! Layering of raw TOML trees.
//!
//! Layers are merged as [`toml::Value`] trees before deserialization, so a key
//! an overlay omits keeps the value from the layer below. Every leaf written
//! is attributed to its layer in a [`FieldSources`] map keyed by dotted path
//! (`policy.agent_id`).

use std::collections::HashMap;
use std::fmt;

use toml::Value;

/// Where a configuration value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// The embedded `defaults.toml`.
    Defaults,
    /// `~/.tollgate/config.toml`, or `config.toml` in an overridden home.
    User,
    /// The file passed to [`Config::load`](crate::Config::load).
    Explicit,
    /// A `TOLLGATE_*` environment variable.
    Environment,
}

impl ConfigLayer {
    /// Whether a file (user or explicit) supplied the value.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, Self::User | Self::Explicit)
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "built-in default",
            Self::User => "user config",
            Self::Explicit => "explicit config",
            Self::Environment => "environment",
        })
    }
}

/// Dotted field path to the layer that last wrote it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Attribute every leaf of `value` to `layer`.
pub fn mark(value: &Value, layer: ConfigLayer, sources: &mut FieldSources) {
    mark_at(value, "", layer, sources);
}

/// Merge `overlay` into `base` and attribute the leaves it wrote to `layer`.
///
/// Tables merge key by key. Anything else, arrays included, replaces the
/// base value whole.
pub fn overlay(base: &mut Value, overlay: &Value, layer: ConfigLayer, sources: &mut FieldSources) {
    overlay_at(base, overlay, "", layer, sources);
}

fn overlay_at(base: &mut Value, top: &Value, path: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    let (Value::Table(below), Value::Table(above)) = (&mut *base, top) else {
        *base = top.clone();
        mark_at(top, path, layer, sources);
        return;
    };

    for (key, value) in above {
        let child = join(path, key);
        match below.get_mut(key) {
            Some(existing) => overlay_at(existing, value, &child, layer, sources),
            None => {
                below.insert(key.clone(), value.clone());
                mark_at(value, &child, layer, sources);
            },
        }
    }
}

fn mark_at(value: &Value, path: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    match value {
        Value::Table(table) => {
            for (key, child) in table {
                mark_at(child, &join(path, key), layer, sources);
            }
        },
        _ => {
            sources.insert(path.to_owned(), layer);
        },
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}
