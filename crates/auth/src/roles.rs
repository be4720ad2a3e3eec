//! Roles: shared system roles and tenant-scoped custom roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantgate_core::{Entity, RoleId, TenantId};

use crate::permissions::{CATALOG, CatalogEntry};

/// Where a role lives.
///
/// System roles are seeded once and visible to every tenant. Custom roles are
/// generated by provisioning flows and belong to exactly one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleKind {
    System,
    Custom { tenant_id: TenantId },
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub kind: RoleKind,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn is_system(&self) -> bool {
        matches!(self.kind, RoleKind::System)
    }

    /// Owning tenant; `None` for system roles.
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self.kind {
            RoleKind::System => None,
            RoleKind::Custom { tenant_id } => Some(tenant_id),
        }
    }

    /// True if a principal of `tenant_id` may hold this role.
    pub fn is_visible_to(&self, tenant_id: TenantId) -> bool {
        match self.kind {
            RoleKind::System => true,
            RoleKind::Custom { tenant_id: owner } => owner == tenant_id,
        }
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

/// The seeded, immutable system roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Owner,
    Admin,
    Manager,
    Sales,
    Finance,
    Viewer,
    Client,
}

impl SystemRole {
    pub const ALL: [SystemRole; 7] = [
        SystemRole::Owner,
        SystemRole::Admin,
        SystemRole::Manager,
        SystemRole::Sales,
        SystemRole::Finance,
        SystemRole::Viewer,
        SystemRole::Client,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SystemRole::Owner => "owner",
            SystemRole::Admin => "admin",
            SystemRole::Manager => "manager",
            SystemRole::Sales => "sales",
            SystemRole::Finance => "finance",
            SystemRole::Viewer => "viewer",
            SystemRole::Client => "client",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SystemRole::Owner => "Tenant owner with every permission",
            SystemRole::Admin => "Administrator with full workspace access",
            SystemRole::Manager => "Operational manager without finance edits or settings",
            SystemRole::Sales => "Sales staff with client and pipeline access",
            SystemRole::Finance => "Finance staff with ledger and invoice access",
            SystemRole::Viewer => "Read-only access to every module",
            SystemRole::Client => "External client limited to their own projects and invoices",
        }
    }

    fn grants_by_default(self, module: &str, action: &str) -> bool {
        match self {
            SystemRole::Owner | SystemRole::Admin => true,
            SystemRole::Manager => {
                !matches!((module, action), ("finance", "edit") | ("settings", "manage"))
            }
            SystemRole::Sales => matches!(
                (module, action),
                ("dashboard", "view")
                    | ("projects", "view_all")
                    | ("clients", _)
                    | ("invoices", "view")
                    | ("calendar", "view")
                    | ("chat", "access")
            ),
            SystemRole::Finance => matches!(
                (module, action),
                ("dashboard", "view") | ("finance", _) | ("invoices", _) | ("reports", "view")
            ),
            SystemRole::Viewer => matches!(action, "view" | "view_all"),
            SystemRole::Client => matches!(
                (module, action),
                ("projects", "view_assigned")
                    | ("invoices", "view")
                    | ("documents", "view")
                    | ("chat", "access")
            ),
        }
    }

    /// Catalog entries granted to this role by the bootstrap seed.
    pub fn default_grants(self) -> impl Iterator<Item = &'static CatalogEntry> {
        CATALOG
            .iter()
            .filter(move |e| self.grants_by_default(e.module, e.action))
    }
}

impl core::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Prefix of every generated custom role name.
pub const CUSTOM_ROLE_PREFIX: &str = "custom";

/// Candidate name for a custom role minted at `at`.
///
/// `attempt` 0 yields `custom-<unix millis>`; later attempts append `-2`,
/// `-3`, ... so callers can probe until the name is free.
pub fn custom_role_name(at: DateTime<Utc>, attempt: u32) -> String {
    let millis = at.timestamp_millis();
    if attempt == 0 {
        format!("{CUSTOM_ROLE_PREFIX}-{millis}")
    } else {
        format!("{CUSTOM_ROLE_PREFIX}-{millis}-{}", attempt + 1)
    }
}
