//! Permission vocabulary: `(module, action)` keys and the base catalog.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use tenantgate_core::{Entity, PermissionId};

/// Capability key: a free-form module namespace plus a free-form verb.
///
/// Displayed as `module.action` (e.g. `calendar.view`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    module: Cow<'static, str>,
    action: Cow<'static, str>,
}

impl PermissionKey {
    pub fn new(module: impl Into<Cow<'static, str>>, action: impl Into<Cow<'static, str>>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
        }
    }

    pub const fn from_static(module: &'static str, action: &'static str) -> Self {
        Self {
            module: Cow::Borrowed(module),
            action: Cow::Borrowed(action),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn matches(&self, module: &str, action: &str) -> bool {
        self.module == module && self.action == action
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.module, self.action)
    }
}

/// A catalog permission row. Global (not tenant-scoped), unique on its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub key: PermissionKey,
    pub description: String,
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }
}

/// Static description of one catalog entry (seed data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub module: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    pub const fn key(&self) -> PermissionKey {
        PermissionKey::from_static(self.module, self.action)
    }
}

const fn entry(module: &'static str, action: &'static str, description: &'static str) -> CatalogEntry {
    CatalogEntry {
        module,
        action,
        description,
    }
}

/// Base permission catalog seeded at deployment time.
pub const CATALOG: &[CatalogEntry] = &[
    entry("dashboard", "view", "View the workspace dashboard"),
    entry("projects", "view_all", "View every project in the tenant"),
    entry("projects", "view_assigned", "View projects the principal is assigned to"),
    entry("projects", "create", "Create projects"),
    entry("projects", "edit", "Edit projects"),
    entry("projects", "delete", "Delete projects"),
    entry("tasks", "view", "View tasks and boards"),
    entry("tasks", "manage", "Create, assign and close tasks"),
    entry("calendar", "view", "View the shared calendar"),
    entry("calendar", "manage", "Create and edit calendar events"),
    entry("clients", "view", "View client records"),
    entry("clients", "manage", "Create and edit client records"),
    entry("finance", "view", "View finance widgets and balances"),
    entry("finance", "edit", "Record and edit finance entries"),
    entry("invoices", "view", "View invoices"),
    entry("invoices", "manage", "Issue and edit invoices"),
    entry("documents", "view", "View shared documents"),
    entry("documents", "manage", "Upload and organise documents"),
    entry("content", "view", "View the content library"),
    entry("content", "publish", "Publish content"),
    entry("chat", "access", "Use workspace chat"),
    entry("team", "view", "View team members"),
    entry("team", "manage", "Invite members and edit their access"),
    entry("reports", "view", "View reports"),
    entry("agents", "manage", "Configure agent collaborators"),
    entry("settings", "manage", "Change workspace settings"),
];

/// Permission required to invite members or edit their access.
pub const TEAM_MANAGE: PermissionKey = PermissionKey::from_static("team", "manage");

/// Permission required to register client records.
pub const CLIENTS_MANAGE: PermissionKey = PermissionKey::from_static("clients", "manage");

/// Looks up a catalog entry by key.
pub fn catalog_entry(module: &str, action: &str) -> Option<&'static CatalogEntry> {
    CATALOG
        .iter()
        .find(|e| e.module == module && e.action == action)
}
