//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_config::prelude::*;` to import all essential types.

pub use crate::{
    Config, ConfigError, ConfigLayer, ConfigResult, GatewaySection, LoggingSection, PolicySection,
    ResolvedConfig,
};
