//! Workflow configuration.

use chrono::Duration;

/// Knobs for the provisioning workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Prefix of redemption links: `<base>/accept-invite?token=<token>`.
    pub accept_url_base: String,
    /// Lifetime of a pending invitation.
    pub invitation_ttl: Duration,
}

impl WorkflowConfig {
    pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

    pub fn new(accept_url_base: impl Into<String>) -> Self {
        Self {
            accept_url_base: accept_url_base.into(),
            ..Self::default()
        }
    }

    pub fn with_invitation_ttl(mut self, ttl: Duration) -> Self {
        self.invitation_ttl = ttl;
        self
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            accept_url_base: "http://localhost:8080".to_string(),
            invitation_ttl: Duration::days(Self::DEFAULT_INVITATION_TTL_DAYS),
        }
    }
}
