//! Tenants and their 1:1 configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tenantgate_core::{DomainError, DomainResult, Entity, PrincipalId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
    Decommissioned,
}

/// An isolated workspace. Never deleted; decommissioning is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub owner_principal_id: PrincipalId,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    pub fn transition(&mut self, to: TenantStatus) -> DomainResult<()> {
        if self.status == TenantStatus::Decommissioned && to != TenantStatus::Decommissioned {
            return Err(DomainError::conflict("tenant is decommissioned"));
        }
        self.status = to;
        Ok(())
    }
}

impl Entity for Tenant {
    type Id = TenantId;

    fn id(&self) -> TenantId {
        self.id
    }
}

/// Derives a URL-safe slug from a tenant name.
///
/// Lowercase ASCII alphanumerics, runs of anything else collapse into a single
/// `-`, no leading/trailing dash.
pub fn slugify(name: &str) -> DomainResult<String> {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        return Err(DomainError::validation(
            "tenant name must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// Named feature switches. Unknown keys are ignored when deserialising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub client_portal: bool,
    pub content_studio: bool,
    pub finance: bool,
    pub chat: bool,
    pub calendar: bool,
    pub ai_agents: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            client_portal: true,
            content_studio: false,
            finance: true,
            chat: true,
            calendar: true,
            ai_agents: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_users: u32,
    pub max_projects: u32,
    pub max_storage_mb: u64,
    pub max_api_calls_per_month: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_users: 25,
            max_projects: 50,
            max_storage_mb: 5_120,
            max_api_calls_per_month: 100_000,
        }
    }
}

impl ResourceLimits {
    pub fn validate(&self) -> DomainResult<()> {
        if self.max_users == 0
            || self.max_projects == 0
            || self.max_storage_mb == 0
            || self.max_api_calls_per_month == 0
        {
            return Err(DomainError::validation("resource limits must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub require_mfa: bool,
    pub session_timeout_minutes: u32,
    /// When non-empty, invitations may only target these email domains.
    pub allowed_email_domains: Vec<String>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            require_mfa: false,
            session_timeout_minutes: 480,
            allowed_email_domains: Vec::new(),
        }
    }
}

impl SecuritySettings {
    pub fn allows_domain(&self, domain: &str) -> bool {
        self.allowed_email_domains.is_empty()
            || self
                .allowed_email_domains
                .iter()
                .any(|d| d.eq_ignore_ascii_case(domain))
    }
}

/// Per-tenant configuration, co-created with its tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: TenantId,
    pub branding: Map<String, Value>,
    pub feature_flags: FeatureFlags,
    pub resource_limits: ResourceLimits,
    pub security: SecuritySettings,
    pub updated_at: DateTime<Utc>,
}

impl TenantConfig {
    /// Hard-coded defaults used at signup.
    pub fn defaults(tenant_id: TenantId, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            branding: Map::new(),
            feature_flags: FeatureFlags::default(),
            resource_limits: ResourceLimits::default(),
            security: SecuritySettings::default(),
            updated_at: now,
        }
    }

    /// Applies a partial update; nothing changes if validation fails.
    pub fn apply(&mut self, patch: TenantConfigPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(limits) = &patch.resource_limits {
            limits.validate()?;
        }
        if let Some(security) = &patch.security {
            if security.session_timeout_minutes == 0 {
                return Err(DomainError::validation("session timeout must be positive"));
            }
        }

        if let Some(branding) = patch.branding {
            self.branding = branding;
        }
        if let Some(flags) = patch.feature_flags {
            self.feature_flags = flags;
        }
        if let Some(limits) = patch.resource_limits {
            self.resource_limits = limits;
        }
        if let Some(security) = patch.security {
            self.security = security;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Partial update of a [`TenantConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfigPatch {
    pub branding: Option<Map<String, Value>>,
    pub feature_flags: Option<FeatureFlags>,
    pub resource_limits: Option<ResourceLimits>,
    pub security: Option<SecuritySettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Acme, Inc. ").unwrap(), "acme-inc");
        assert_eq!(slugify("Über Studio 42").unwrap(), "ber-studio-42");
        assert!(slugify("!!!").is_err());
    }

    #[test]
    fn decommissioned_is_terminal() {
        let mut tenant = Tenant {
            id: TenantId::new(),
            name: "Acme".into(),
            slug: "acme".into(),
            owner_principal_id: PrincipalId::new(),
            status: TenantStatus::Active,
            created_at: Utc::now(),
        };
        tenant.transition(TenantStatus::Suspended).unwrap();
        tenant.transition(TenantStatus::Decommissioned).unwrap();
        assert!(tenant.transition(TenantStatus::Active).is_err());
        assert!(!tenant.is_active());
    }

    #[test]
    fn unknown_feature_flags_are_ignored() {
        let flags: FeatureFlags =
            serde_json::from_str(r#"{"chat": false, "hoverboards": true}"#).unwrap();
        assert!(!flags.chat);
        assert!(flags.calendar);
    }

    #[test]
    fn zero_limits_are_rejected_atomically() {
        let mut config = TenantConfig::defaults(TenantId::new(), Utc::now());
        let before = config.clone();
        let patch = TenantConfigPatch {
            feature_flags: Some(FeatureFlags {
                ai_agents: true,
                ..FeatureFlags::default()
            }),
            resource_limits: Some(ResourceLimits {
                max_users: 0,
                ..ResourceLimits::default()
            }),
            ..TenantConfigPatch::default()
        };
        assert!(matches!(config.apply(patch, Utc::now()), Err(DomainError::Validation(_))));
        assert_eq!(config, before);
    }

    #[test]
    fn domain_allow_list() {
        let mut security = SecuritySettings::default();
        assert!(security.allows_domain("anything.io"));
        security.allowed_email_domains = vec!["Acme.com".into()];
        assert!(security.allows_domain("acme.com"));
        assert!(!security.allows_domain("evil.com"));
    }
}
