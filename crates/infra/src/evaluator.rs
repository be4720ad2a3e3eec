//! Authorization Evaluator.
//!
//! The single gate every tenant-scoped read or write passes through before it
//! touches tenant-scoped rows.
//!
//! ## Failure semantics
//!
//! Nothing here returns an error. A store that cannot be read, an unknown
//! principal, a suspended principal or an inactive tenant all come out as
//! `false` / empty. Callers cannot tell "denied" from "unknown" and must not
//! try to.
//!
//! ## Evaluation order
//!
//! ```text
//! principal ──▶ tenant (active?) ──▶ owner? ──yes──▶ allow
//!                                      │
//!                                      no
//!                                      ▼
//!                    held roles (system + own tenant) ──▶ permission keys
//! ```

use std::collections::BTreeSet;

use tracing::debug;

use tenantgate_auth::authorize::{self, AccessExplanation, AccessGraph};
use tenantgate_auth::PermissionKey;
use tenantgate_core::{DomainError, DomainResult, PrincipalId, TenantId};

use crate::store::AuthzStore;

/// Read-only, fail-closed view of the permission graph.
#[derive(Debug, Clone)]
pub struct Evaluator<S> {
    store: S,
}

impl<S> Evaluator<S>
where
    S: AuthzStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The principal's tenant affiliation, or `None` for unknown or
    /// unaffiliated principals.
    pub fn current_tenant(&self, principal_id: PrincipalId) -> Option<TenantId> {
        self.store
            .read(|t| authorize::current_tenant(t, principal_id))
            .ok()
            .flatten()
    }

    pub fn can_access_tenant(&self, principal_id: PrincipalId, target: TenantId) -> bool {
        let allowed = self
            .store
            .read(|t| authorize::can_access_tenant(t, principal_id, target))
            .unwrap_or(false);
        debug!(%principal_id, tenant_id = %target, allowed, "tenant access check");
        allowed
    }

    /// With `tenant_id = None` the principal's own tenant is used.
    pub fn is_tenant_owner(&self, principal_id: PrincipalId, tenant_id: Option<TenantId>) -> bool {
        self.store
            .read(|t| authorize::is_tenant_owner(t, principal_id, tenant_id))
            .unwrap_or(false)
    }

    pub fn has_permission(&self, principal_id: PrincipalId, module: &str, action: &str) -> bool {
        let decision = match self
            .store
            .read(|t| authorize::decide(t, principal_id, module, action))
        {
            Ok(d) => d,
            Err(e) => {
                debug!(%principal_id, module, action, error = %e, "permission check failed closed");
                return false;
            }
        };
        debug!(%principal_id, module, action, ?decision, "permission check");
        decision.is_granted()
    }

    /// Role names for display. Not a security boundary.
    pub fn roles_of(&self, principal_id: PrincipalId) -> BTreeSet<String> {
        self.store
            .read(|t| authorize::roles_of(t, principal_id))
            .unwrap_or_default()
    }

    pub fn effective_permissions(&self, principal_id: PrincipalId) -> BTreeSet<PermissionKey> {
        self.store
            .read(|t| authorize::effective_permissions(t, principal_id))
            .unwrap_or_default()
    }

    /// Audit view of a check. `None` only when the store is unusable.
    pub fn explain(&self, principal_id: PrincipalId, module: &str, action: &str) -> Option<AccessExplanation> {
        self.store
            .read(|t| authorize::explain(t, principal_id, module, action))
            .ok()
    }
}

/// Workflow guard: the actor must pass the tenant gate for `tenant_id` and
/// hold `required` (owner bypass applies). Anything else is `Unauthorized`,
/// including an unknown tenant.
pub(crate) fn require_permission<G>(
    graph: &G,
    actor: PrincipalId,
    tenant_id: TenantId,
    required: &PermissionKey,
) -> DomainResult<()>
where
    G: AccessGraph + ?Sized,
{
    if authorize::can_access_tenant(graph, actor, tenant_id)
        && authorize::has_permission(graph, actor, required.module(), required.action())
    {
        Ok(())
    } else {
        debug!(%actor, %tenant_id, permission = %required, "workflow call rejected");
        Err(DomainError::Unauthorized)
    }
}
