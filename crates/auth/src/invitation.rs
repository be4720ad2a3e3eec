//! Invitations: token-bearing offers of tenant membership.
//!
//! ```text
//! pending ──redeem──▶ accepted
//!    │
//!    └──cancel / supersede / sweep──▶ expired
//! ```
//! Both `accepted` and `expired` are terminal.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use tenantgate_core::{
    ClientId, DomainError, DomainResult, Entity, InvitationId, PrincipalId, RoleId, TenantId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl core::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InvitationStatus::Pending => f.write_str("pending"),
            InvitationStatus::Accepted => f.write_str("accepted"),
            InvitationStatus::Expired => f.write_str("expired"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationType {
    Team,
    Client,
}

/// Access requested for an invitee or an existing member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessSpec {
    /// Reuse the shared `admin` system role.
    FullAccess,
    /// A fresh custom role built from the selected screens.
    CustomAccess { screens: BTreeSet<String> },
}

impl AccessSpec {
    pub fn custom<I, S>(screens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AccessSpec::CustomAccess {
            screens: screens.into_iter().map(Into::into).collect(),
        }
    }

    /// Rejects an empty custom selection (it is never read as "no access").
    pub fn validate(&self) -> DomainResult<()> {
        match self {
            AccessSpec::CustomAccess { screens } if screens.is_empty() => {
                Err(DomainError::validation("select at least one screen"))
            }
            _ => Ok(()),
        }
    }
}

/// An invitation row. Only the token's digest is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub email: String,
    /// `None` for client invitations until redemption resolves it.
    pub role_id: Option<RoleId>,
    pub tenant_id: TenantId,
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    pub status: InvitationStatus,
    pub invitation_type: InvitationType,
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `pending → accepted`.
    pub fn accept(&mut self) -> DomainResult<()> {
        self.transition(InvitationStatus::Accepted)
    }

    /// `pending → expired`.
    pub fn expire(&mut self) -> DomainResult<()> {
        self.transition(InvitationStatus::Expired)
    }

    fn transition(&mut self, to: InvitationStatus) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "invitation already {}",
                self.status
            )));
        }
        self.status = to;
        Ok(())
    }
}

impl Entity for Invitation {
    type Id = InvitationId;

    fn id(&self) -> InvitationId {
        self.id
    }
}

/// Raw, unguessable redemption token. Only ever handed to the inviter once.
#[derive(Clone, PartialEq, Eq)]
pub struct InvitationToken(String);

impl InvitationToken {
    /// 32 random bytes, base64url without padding.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> String {
        hash_token(&self.0)
    }

    /// `<base>/accept-invite?token=<token>`.
    pub fn redemption_link(&self, base: &str) -> String {
        format!("{}/accept-invite?token={}", base.trim_end_matches('/'), self.0)
    }
}

impl core::fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("InvitationToken(..)")
    }
}

/// SHA-256 of a raw token, hex-encoded. This is what the store indexes.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.trim().as_bytes());
    hex::encode(hasher.finalize())
}
