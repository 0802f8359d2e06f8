//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for one intercepted tool call.
///
/// Unique for the lifetime of a gateway instance. Generated ids are a
/// prefix followed by the simple (hyphenless) form of a v4 UUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Create a call ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh call ID with the given prefix (e.g. `"pg:"`).
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}{}", Uuid::new_v4().simple()))
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the agent whose policy and proposals are managed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Create an agent ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent:{}", self.0)
    }
}

/// Identifier of a policy proposal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    /// Create a proposal ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random proposal ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProposalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_id_generate_uses_prefix() {
        let id = CallId::generate("pg:");
        assert!(id.as_str().starts_with("pg:"));
        // prefix + 32 hex chars
        assert_eq!(id.as_str().len(), 35);
        assert!(!id.as_str().contains('-'));
    }

    #[test]
    fn test_call_id_generate_is_unique() {
        let a = CallId::generate("pg:");
        let b = CallId::generate("pg:");
        assert_ne!(a, b);
    }

    #[test]
    fn test_call_id_serializes_as_plain_string() {
        let id = CallId::new("call-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"call-42\"");
    }

    #[test]
    fn test_agent_id_display() {
        assert_eq!(AgentId::new("alpha").to_string(), "agent:alpha");
    }

    #[test]
    fn test_proposal_id_generate() {
        let id = ProposalId::generate();
        assert_eq!(id.as_str().len(), 32);
    }
}
