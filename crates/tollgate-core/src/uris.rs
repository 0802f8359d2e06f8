//! Resource URIs passed to [`ResourceNotifier`](crate::ResourceNotifier).

use crate::ids::ProposalId;

/// The active policy text.
pub const POLICY_RESOURCE_URI: &str = "resource://approval-policy/policy.py";

/// The collection of policy proposals.
pub const PROPOSALS_INDEX_URI: &str = "resource://approval-policy/proposals";

/// The snapshot of tool calls awaiting a human decision.
pub const PENDING_CALLS_URI: &str = "pending://calls";

/// URI of a single proposal.
#[must_use]
pub fn proposal_uri(id: &ProposalId) -> String {
    format!("{PROPOSALS_INDEX_URI}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_uri() {
        assert_eq!(
            proposal_uri(&ProposalId::new("abc")),
            "resource://approval-policy/proposals/abc"
        );
    }
}
