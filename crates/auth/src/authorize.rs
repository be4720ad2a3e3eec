//! Pure authorization decisions.
//!
//! Every predicate here is composed from three joins (principal→tenant,
//! principal→role, role→permission) read through [`AccessGraph`].
//!
//! - No IO
//! - No panics
//! - Unknown or malformed input degrades to a denial

use std::collections::BTreeSet;

use serde::Serialize;

use tenantgate_core::{PrincipalId, RoleId, TenantId};

use crate::permissions::PermissionKey;
use crate::principal::{Principal, PrincipalStatus};
use crate::roles::Role;
use crate::tenant::Tenant;

/// Read access to the permission graph, as seen by the decision functions.
///
/// Implementations must not fail loudly: a missing row is `None`/empty.
pub trait AccessGraph {
    fn principal(&self, id: PrincipalId) -> Option<Principal>;
    fn tenant(&self, id: TenantId) -> Option<Tenant>;
    /// Roles reachable through the principal's memberships.
    fn held_roles(&self, principal_id: PrincipalId) -> Vec<Role>;
    /// Permission keys granted to a role.
    fn granted_keys(&self, role_id: RoleId) -> Vec<PermissionKey>;
}

/// Why a check was denied. Internal/audit only: callers must not tell an
/// unknown principal apart from a denied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    UnknownPrincipal,
    NoTenant,
    PrincipalSuspended,
    PrincipalInvited,
    TenantInactive,
    MissingPermission,
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    OwnerBypass,
    GrantedByRole { role: String },
    Denied { reason: DenialKind },
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        !matches!(self, Decision::Denied { .. })
    }
}

/// A principal in good standing together with its (active) tenant.
struct Standing {
    principal: Principal,
    tenant: Tenant,
}

fn standing<G>(graph: &G, principal_id: PrincipalId) -> Result<Standing, DenialKind>
where
    G: AccessGraph + ?Sized,
{
    let principal = graph
        .principal(principal_id)
        .ok_or(DenialKind::UnknownPrincipal)?;
    match principal.status {
        PrincipalStatus::Active => {}
        PrincipalStatus::Suspended => return Err(DenialKind::PrincipalSuspended),
        PrincipalStatus::Invited => return Err(DenialKind::PrincipalInvited),
    }
    let tenant_id = principal.tenant_id.ok_or(DenialKind::NoTenant)?;
    let tenant = graph.tenant(tenant_id).ok_or(DenialKind::NoTenant)?;
    if !tenant.is_active() {
        return Err(DenialKind::TenantInactive);
    }
    Ok(Standing { principal, tenant })
}

/// Roles that count for the principal: system roles plus custom roles of its
/// own tenant. Foreign custom roles are ignored even if an edge exists.
fn scoped_roles<G>(graph: &G, standing: &Standing) -> Vec<Role>
where
    G: AccessGraph + ?Sized,
{
    graph
        .held_roles(standing.principal.id)
        .into_iter()
        .filter(|r| r.is_visible_to(standing.tenant.id))
        .collect()
}

/// The principal's tenant affiliation, if any.
pub fn current_tenant<G>(graph: &G, principal_id: PrincipalId) -> Option<TenantId>
where
    G: AccessGraph + ?Sized,
{
    graph.principal(principal_id).and_then(|p| p.tenant_id)
}

/// The tenant-isolation gate.
pub fn can_access_tenant<G>(graph: &G, principal_id: PrincipalId, target: TenantId) -> bool
where
    G: AccessGraph + ?Sized,
{
    standing(graph, principal_id)
        .map(|s| s.tenant.id == target)
        .unwrap_or(false)
}

/// True iff the principal is the registered owner of `tenant_id` (defaults to
/// its own tenant) and belongs to it.
pub fn is_tenant_owner<G>(graph: &G, principal_id: PrincipalId, tenant_id: Option<TenantId>) -> bool
where
    G: AccessGraph + ?Sized,
{
    let Ok(s) = standing(graph, principal_id) else {
        return false;
    };
    let target = tenant_id.unwrap_or(s.tenant.id);
    target == s.tenant.id && s.tenant.owner_principal_id == principal_id
}

/// Checks `(module, action)`: owner bypass first, then role enumeration.
pub fn decide<G>(graph: &G, principal_id: PrincipalId, module: &str, action: &str) -> Decision
where
    G: AccessGraph + ?Sized,
{
    let s = match standing(graph, principal_id) {
        Ok(s) => s,
        Err(reason) => return Decision::Denied { reason },
    };

    if s.tenant.owner_principal_id == principal_id {
        return Decision::OwnerBypass;
    }

    for role in scoped_roles(graph, &s) {
        if graph
            .granted_keys(role.id)
            .iter()
            .any(|k| k.matches(module, action))
        {
            return Decision::GrantedByRole { role: role.name };
        }
    }

    Decision::Denied {
        reason: DenialKind::MissingPermission,
    }
}

pub fn has_permission<G>(graph: &G, principal_id: PrincipalId, module: &str, action: &str) -> bool
where
    G: AccessGraph + ?Sized,
{
    decide(graph, principal_id, module, action).is_granted()
}

/// Names of every role the principal holds. Display only.
pub fn roles_of<G>(graph: &G, principal_id: PrincipalId) -> BTreeSet<String>
where
    G: AccessGraph + ?Sized,
{
    graph
        .held_roles(principal_id)
        .into_iter()
        .map(|r| r.name)
        .collect()
}

/// Union of explicit grants across in-scope roles (owner bypass not expanded).
pub fn effective_permissions<G>(graph: &G, principal_id: PrincipalId) -> BTreeSet<PermissionKey>
where
    G: AccessGraph + ?Sized,
{
    let Ok(s) = standing(graph, principal_id) else {
        return BTreeSet::new();
    };
    scoped_roles(graph, &s)
        .iter()
        .flat_map(|r| graph.granted_keys(r.id))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed, serialisable account of a permission check.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub principal_id: PrincipalId,
    /// The permission being checked, as `module.action`.
    pub required_permission: String,
    pub granted: bool,
    pub decision: Decision,
    pub tenant_id: Option<TenantId>,
    pub is_owner: bool,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
}

/// Explain why a check would be allowed or denied.
pub fn explain<G>(graph: &G, principal_id: PrincipalId, module: &str, action: &str) -> AccessExplanation
where
    G: AccessGraph + ?Sized,
{
    let decision = decide(graph, principal_id, module, action);
    AccessExplanation {
        principal_id,
        required_permission: format!("{module}.{action}"),
        granted: decision.is_granted(),
        is_owner: matches!(decision, Decision::OwnerBypass),
        decision,
        tenant_id: current_tenant(graph, principal_id),
        roles: roles_of(graph, principal_id).into_iter().collect(),
        effective_permissions: effective_permissions(graph, principal_id)
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}
