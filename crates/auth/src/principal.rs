//! Principals: authenticated actors the engine reasons about.

use serde::{Deserialize, Serialize};

use tenantgate_core::{DomainError, DomainResult, Entity, PrincipalId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    #[default]
    Active,
    /// Known to the account system but not yet through redemption. The
    /// engine never writes this state itself; redemption promotes it to
    /// `Active` and the evaluator denies it until then.
    Invited,
    Suspended,
}

/// A user or agent profile.
///
/// # Invariants
/// - At most one tenant per principal; once set, `tenant_id` only changes
///   through an explicit re-affiliation (never implicitly by a second grant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub tenant_id: Option<TenantId>,
    pub status: PrincipalStatus,
    pub is_agent: bool,
    pub avatar_ref: Option<String>,
}

impl Principal {
    /// Builds an unaffiliated principal from an externally authenticated identity.
    pub fn from_identity(identity: &PrincipalIdentity) -> DomainResult<Self> {
        let display_name = identity.display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        Ok(Self {
            id: identity.id,
            email: normalize_email(&identity.email)?,
            display_name: display_name.to_string(),
            tenant_id: None,
            status: PrincipalStatus::Active,
            is_agent: identity.is_agent,
            avatar_ref: identity.avatar_ref.clone(),
        })
    }

    pub fn is_suspended(&self) -> bool {
        self.status == PrincipalStatus::Suspended
    }

    /// Binds the principal to `tenant_id`. Rebinding to the same tenant is a no-op.
    pub fn affiliate(&mut self, tenant_id: TenantId) -> DomainResult<()> {
        match self.tenant_id {
            Some(current) if current != tenant_id => Err(DomainError::conflict(
                "principal already belongs to another tenant",
            )),
            _ => {
                self.tenant_id = Some(tenant_id);
                Ok(())
            }
        }
    }
}

impl Entity for Principal {
    type Id = PrincipalId;

    fn id(&self) -> PrincipalId {
        self.id
    }
}

/// Identity handed over by the external account system (first sign-in,
/// signup). The engine never authenticates; it only records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalIdentity {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub is_agent: bool,
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

/// Trims, lowercases and validates an email address.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("invalid email format"));
    };

    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("invalid email format"));
    }

    Ok(email)
}

/// Domain part of an already normalized email.
pub fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, d)| d).unwrap_or_default()
}
