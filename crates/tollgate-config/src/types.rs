//! Configuration struct definitions.
//!
//! Every section uses `#[serde(default)]`, so a file only needs to name the
//! keys it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Tollgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Active policy and proposal settings.
    pub policy: PolicySection,
    /// Gateway middleware settings.
    pub gateway: GatewaySection,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tollgate_approval=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PolicySection
// ---------------------------------------------------------------------------

/// The policy an engine starts with.
///
/// At most one of `source` and `source_path` may be set. With neither, the
/// engine starts from empty policy text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Agent whose policy and proposals are managed.
    pub agent_id: String,
    /// Inline policy source text.
    pub source: Option<String>,
    /// File to read the policy source from.
    pub source_path: Option<PathBuf>,
    /// Version the initial policy is loaded at.
    pub initial_version: u64,
    /// Run the self-check before activating candidate policies.
    pub self_check: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            agent_id: "default".to_owned(),
            source: None,
            source_path: None,
            initial_version: 1,
            self_check: true,
        }
    }
}

// ---------------------------------------------------------------------------
// GatewaySection
// ---------------------------------------------------------------------------

/// Gateway middleware settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Prefix for generated call ids.
    pub call_id_prefix: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            call_id_prefix: "pg:".to_owned(),
        }
    }
}
