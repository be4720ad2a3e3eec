//! Off-hot-path reconciliation passes.
//!
//! Custom roles are minted per invitation and per access edit, so roles with
//! no members pile up once members are re-promoted. These passes are meant to
//! be run periodically by an external scheduler.

use chrono::{DateTime, Utc};
use tracing::info;

use tenantgate_auth::InvitationStatus;
use tenantgate_core::{DomainResult, InvitationId, RoleId};

use crate::store::{AuthzStore, InvitationStore, MembershipStore, RoleStore};

/// Deletes custom roles with zero memberships that no pending invitation
/// still points at. Returns the removed ids.
pub fn reap_orphaned_roles<S>(store: &S) -> DomainResult<Vec<RoleId>>
where
    S: AuthzStore,
{
    let reaped = store.write(|t| {
        let referenced: Vec<RoleId> = t
            .pending_invitations()
            .into_iter()
            .filter_map(|i| i.role_id)
            .collect();

        let orphans: Vec<RoleId> = t
            .roles()
            .into_iter()
            .filter(|r| !r.is_system())
            .filter(|r| t.members_of(r.id).is_empty() && !referenced.contains(&r.id))
            .map(|r| r.id)
            .collect();

        for id in &orphans {
            t.delete_role(*id)?;
        }
        Ok(orphans)
    })?;

    if !reaped.is_empty() {
        info!(count = reaped.len(), "orphaned custom roles reaped");
    }
    Ok(reaped)
}

/// Moves pending invitations whose deadline has passed to `expired`.
pub fn expire_stale_invitations<S>(store: &S, now: DateTime<Utc>) -> DomainResult<Vec<InvitationId>>
where
    S: AuthzStore,
{
    let expired = store.write(|t| {
        let stale: Vec<InvitationId> = t
            .pending_invitations()
            .into_iter()
            .filter(|i| i.is_past_deadline(now))
            .map(|i| i.id)
            .collect();

        for id in &stale {
            t.transition_invitation(*id, InvitationStatus::Pending, InvitationStatus::Expired)?;
        }
        Ok(stale)
    })?;

    if !expired.is_empty() {
        info!(count = expired.len(), "stale invitations expired");
    }
    Ok(expired)
}
