//! Invitation Workflow.
//!
//! ```text
//! create ──▶ pending ──redeem──▶ accepted
//!               │
//!               └──cancel / supersede / sweep──▶ expired
//! ```
//!
//! Every operation runs inside a single store write, so a failure at any step
//! leaves no partial rows behind (no role without an invitation, no principal
//! without its membership).
//!
//! ## Redemption
//!
//! The pending → accepted move is a conditional transition. Two concurrent
//! redemptions of the same token serialize on the store; the loser finds the
//! invitation already accepted and gets `Conflict`.
//!
//! ## Policies
//!
//! - A new invitation for a (tenant, email) pair expires the pending ones it
//!   supersedes, in the same transaction.
//! - Only the SHA-256 digest of a token is stored. The raw token is returned
//!   once, inside the redemption link.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use tenantgate_auth::invitation::hash_token;
use tenantgate_auth::principal::{email_domain, normalize_email};
use tenantgate_auth::screens;
use tenantgate_auth::{
    AccessGraph, AccessSpec, Invitation, InvitationStatus, InvitationToken, InvitationType,
    PermissionKey, Principal, PrincipalIdentity, PrincipalStatus, SystemRole, TEAM_MANAGE,
};
use tenantgate_core::{
    ClientId, DomainError, DomainResult, InvitationId, PrincipalId, RoleId, TenantId,
};

use crate::config::WorkflowConfig;
use crate::evaluator::require_permission;
use crate::store::{
    AuthzStore, AuthzTables, ClientDirectory, InvitationStore, MembershipStore,
    PrincipalDirectory, RoleStore, TenantRegistry,
};

/// Who an invitation is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invitee {
    /// A team member with full or screen-selected access.
    Member(AccessSpec),
    /// The principal of an existing client record (client portal).
    Client(ClientId),
}

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub actor: PrincipalId,
    pub tenant_id: TenantId,
    pub email: String,
    pub invitee: Invitee,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub token: InvitationToken,
    /// `<base>/accept-invite?token=<token>`; delivery is up to the caller.
    pub link: String,
    /// Pending invitations for the same email that this one replaced.
    pub superseded: Vec<InvitationId>,
}

#[derive(Debug, Clone)]
pub struct RedeemInvitation {
    pub token: String,
    pub identity: PrincipalIdentity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redemption {
    pub invitation: Invitation,
    pub principal: Principal,
    pub role_id: RoleId,
}

#[derive(Debug, Clone)]
pub struct EditAccess {
    pub actor: PrincipalId,
    pub principal_id: PrincipalId,
    pub access: AccessSpec,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessChange {
    pub role_id: RoleId,
    /// True when an exclusive custom role was rewritten instead of replaced.
    pub in_place: bool,
    pub permissions: BTreeSet<PermissionKey>,
}

#[derive(Debug, Clone)]
pub struct InvitationWorkflow<S> {
    store: S,
    config: WorkflowConfig,
}

impl<S> InvitationWorkflow<S>
where
    S: AuthzStore,
{
    pub fn new(store: S, config: WorkflowConfig) -> Self {
        Self { store, config }
    }

    pub fn create_invitation(&self, cmd: CreateInvitation) -> DomainResult<IssuedInvitation> {
        let email = normalize_email(&cmd.email)?;
        if let Invitee::Member(access) = &cmd.invitee {
            access.validate()?;
        }

        let token = InvitationToken::generate();
        let token_hash = token.digest();
        let now = cmd.occurred_at;
        let expires_at = now + self.config.invitation_ttl;

        let (invitation, superseded) = self
            .store
            .write(|t| {
                require_permission(t, cmd.actor, cmd.tenant_id, &TEAM_MANAGE)?;

                let config = t.config(cmd.tenant_id).ok_or_else(|| {
                    error!(tenant_id = %cmd.tenant_id, "tenant without configuration");
                    DomainError::state("tenant has no configuration")
                })?;
                if !config.security.allows_domain(email_domain(&email)) {
                    return Err(DomainError::validation(
                        "email domain is not allowed for this tenant",
                    ));
                }
                if t.principal_by_email(&email).is_some() {
                    return Err(DomainError::conflict("email already belongs to a member"));
                }
                let active = t
                    .tenant_members(cmd.tenant_id)
                    .iter()
                    .filter(|p| !p.is_suspended())
                    .count();
                if active >= config.resource_limits.max_users as usize {
                    return Err(DomainError::conflict("tenant user limit reached"));
                }

                let (invitation_type, role_id, client_id) = match &cmd.invitee {
                    Invitee::Member(access) => {
                        let role_id = role_for_access(t, cmd.tenant_id, access, &email, now)?;
                        (InvitationType::Team, Some(role_id), None)
                    }
                    Invitee::Client(client_id) => {
                        let client = t
                            .client(*client_id)
                            .filter(|c| c.tenant_id == cmd.tenant_id)
                            .ok_or(DomainError::NotFound)?;
                        if client.principal_id.is_some() {
                            return Err(DomainError::conflict("client already has a portal user"));
                        }
                        (InvitationType::Client, None, Some(client.id))
                    }
                };

                let superseded = supersede_pending(t, cmd.tenant_id, &email)?;

                let invitation = Invitation {
                    id: InvitationId::new(),
                    email: email.clone(),
                    role_id,
                    tenant_id: cmd.tenant_id,
                    client_id,
                    token_hash,
                    status: InvitationStatus::Pending,
                    invitation_type,
                    created_by: cmd.actor,
                    created_at: now,
                    expires_at,
                };
                t.insert_invitation(invitation.clone())?;
                Ok((invitation, superseded))
            })?;

        info!(
            invitation_id = %invitation.id,
            tenant_id = %invitation.tenant_id,
            kind = ?invitation.invitation_type,
            superseded = superseded.len(),
            "invitation created"
        );

        let link = token.redemption_link(&self.config.accept_url_base);
        Ok(IssuedInvitation {
            invitation,
            token,
            link,
            superseded,
        })
    }

    /// `pending → expired`. Anything else is a `Conflict`.
    pub fn cancel_invitation(&self, actor: PrincipalId, invitation_id: InvitationId) -> DomainResult<Invitation> {
        let invitation = self.store.write(|t| {
            let invitation = t.invitation(invitation_id).ok_or(DomainError::NotFound)?;
            require_permission(t, actor, invitation.tenant_id, &TEAM_MANAGE)?;
            t.transition_invitation(invitation_id, InvitationStatus::Pending, InvitationStatus::Expired)
        })?;

        info!(%invitation_id, %actor, "invitation cancelled");
        Ok(invitation)
    }

    /// Redeems a token for a newly authenticated identity.
    ///
    /// Affiliation, membership, client binding and the accepted transition
    /// commit together or not at all.
    pub fn redeem_invitation(&self, cmd: RedeemInvitation) -> DomainResult<Redemption> {
        let result = self.redeem(&cmd);
        match &result {
            Ok(r) => info!(
                invitation_id = %r.invitation.id,
                principal_id = %r.principal.id,
                tenant_id = %r.invitation.tenant_id,
                "invitation redeemed"
            ),
            Err(DomainError::State(msg)) => {
                error!(principal_id = %cmd.identity.id, %msg, "redemption aborted")
            }
            Err(e) => warn!(principal_id = %cmd.identity.id, error = %e, "redemption rejected"),
        }
        result
    }

    fn redeem(&self, cmd: &RedeemInvitation) -> DomainResult<Redemption> {
        if cmd.token.trim().is_empty() {
            return Err(DomainError::NotFound);
        }
        let token_hash = hash_token(&cmd.token);
        let email = normalize_email(&cmd.identity.email)?;
        let now = cmd.occurred_at;

        self.store.write(|t| {
            let invitation = t
                .invitation_by_token_hash(&token_hash)
                .ok_or(DomainError::NotFound)?;
            if !invitation.is_pending() {
                return Err(DomainError::conflict(format!(
                    "invitation already {}",
                    invitation.status
                )));
            }
            if invitation.is_past_deadline(now) {
                return Err(DomainError::conflict("invitation has expired"));
            }
            if invitation.email != email {
                return Err(DomainError::validation(
                    "email does not match the invitation",
                ));
            }

            let tenant = t.tenant_by_id(invitation.tenant_id).ok_or_else(|| {
                DomainError::state("invitation points at a missing tenant")
            })?;
            if !tenant.is_active() {
                return Err(DomainError::conflict("tenant is not active"));
            }

            // The stored email is authoritative for a known principal.
            let mut principal = match t.principal_by_id(cmd.identity.id) {
                Some(existing) => {
                    if existing.email != invitation.email {
                        return Err(DomainError::validation(
                            "email does not match the invitation",
                        ));
                    }
                    if existing.tenant_id == Some(tenant.id) {
                        return Err(DomainError::conflict(
                            "principal already belongs to this tenant",
                        ));
                    }
                    existing
                }
                None => Principal::from_identity(&cmd.identity)?,
            };
            principal.affiliate(tenant.id)?;
            principal.status = PrincipalStatus::Active;
            t.upsert_principal(principal.clone())?;

            let role_id = match invitation.invitation_type {
                InvitationType::Team => invitation
                    .role_id
                    .ok_or_else(|| DomainError::state("team invitation without a role"))?,
                InvitationType::Client => t
                    .system_role(SystemRole::Client)
                    .map(|r| r.id)
                    .ok_or_else(|| DomainError::state("system roles are not seeded"))?,
            };
            let role = t
                .role(role_id)
                .ok_or_else(|| DomainError::state("invitation role no longer exists"))?;
            if !role.is_visible_to(tenant.id) {
                return Err(DomainError::state("invitation role belongs to another tenant"));
            }
            t.assign_role(principal.id, role_id)?;

            if let Some(client_id) = invitation.client_id {
                t.bind_client_principal(client_id, principal.id)?;
            }

            let invitation = t.transition_invitation(
                invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Accepted,
            )?;

            Ok(Redemption {
                invitation,
                principal,
                role_id,
            })
        })
    }

    /// Changes an existing member's access.
    ///
    /// An exclusive custom role is rewritten in place (revoke all, re-grant).
    /// A shared role is swapped for a fresh custom role, or for `admin` on
    /// `FullAccess`. Roles the member held besides the new one are dropped.
    pub fn edit_access(&self, cmd: EditAccess) -> DomainResult<AccessChange> {
        cmd.access.validate()?;
        let now = cmd.occurred_at;

        let change = self.store.write(|t| {
            let target = t.principal_by_id(cmd.principal_id).ok_or(DomainError::NotFound)?;
            let tenant_id = target.tenant_id.ok_or(DomainError::NotFound)?;
            require_permission(t, cmd.actor, tenant_id, &TEAM_MANAGE)?;

            let tenant = t
                .tenant_by_id(tenant_id)
                .ok_or_else(|| DomainError::state("principal affiliated with a missing tenant"))?;
            if tenant.owner_principal_id == cmd.principal_id {
                return Err(DomainError::validation("the tenant owner's access cannot be edited"));
            }

            let held = t.roles_held(cmd.principal_id);
            let (role_id, in_place) = match &cmd.access {
                AccessSpec::FullAccess => {
                    let admin = t
                        .system_role(SystemRole::Admin)
                        .ok_or_else(|| DomainError::state("system roles are not seeded"))?;
                    (admin.id, false)
                }
                AccessSpec::CustomAccess { screens } => {
                    match exclusive_custom_role(t, cmd.principal_id, tenant_id, &held) {
                        Some(role_id) => {
                            t.revoke_all_permissions(role_id)?;
                            grant_screens(t, role_id, screens)?;
                            (role_id, true)
                        }
                        None => {
                            let label = format!("custom access for {}", target.email);
                            let role_id = t.create_custom_role(tenant_id, &label, now)?;
                            grant_screens(t, role_id, screens)?;
                            (role_id, false)
                        }
                    }
                }
            };

            match held.iter().copied().find(|r| *r != role_id) {
                Some(first) if !held.contains(&role_id) => {
                    t.replace_role(cmd.principal_id, first, role_id)?;
                }
                _ => {
                    t.assign_role(cmd.principal_id, role_id)?;
                }
            }
            for other in held.iter().filter(|r| **r != role_id) {
                t.unassign_role(cmd.principal_id, *other);
            }

            Ok(AccessChange {
                role_id,
                in_place,
                permissions: t.granted_keys(role_id).into_iter().collect(),
            })
        })?;

        info!(
            principal_id = %cmd.principal_id,
            role_id = %change.role_id,
            in_place = change.in_place,
            permissions = change.permissions.len(),
            "member access updated"
        );
        Ok(change)
    }
}

/// Role an invitee will receive: the shared `admin` role, or a fresh custom
/// role granting the selected screens.
fn role_for_access<T>(
    tables: &mut T,
    tenant_id: TenantId,
    access: &AccessSpec,
    email: &str,
    now: DateTime<Utc>,
) -> DomainResult<RoleId>
where
    T: AuthzTables + ?Sized,
{
    match access {
        AccessSpec::FullAccess => tables
            .system_role(SystemRole::Admin)
            .map(|r| r.id)
            .ok_or_else(|| DomainError::state("system roles are not seeded")),
        AccessSpec::CustomAccess { screens } => {
            let label = format!("custom access for {email}");
            let role_id = tables.create_custom_role(tenant_id, &label, now)?;
            grant_screens(tables, role_id, screens)?;
            Ok(role_id)
        }
    }
}

/// Grants the permissions behind `screens`. Unknown screens grant nothing.
fn grant_screens<T>(tables: &mut T, role_id: RoleId, screens: &BTreeSet<String>) -> DomainResult<()>
where
    T: AuthzTables + ?Sized,
{
    let resolved = screens::resolve(screens.iter().map(String::as_str), |key| {
        tables.permission_by_key(key).map(|p| p.id)
    });
    for permission_id in resolved {
        tables.grant_permission(role_id, permission_id)?;
    }
    Ok(())
}

/// A custom role of `tenant_id` that only `principal_id` holds.
fn exclusive_custom_role<T>(
    tables: &T,
    principal_id: PrincipalId,
    tenant_id: TenantId,
    held: &[RoleId],
) -> Option<RoleId>
where
    T: AuthzTables + ?Sized,
{
    held.iter().copied().find(|role_id| {
        tables
            .role(*role_id)
            .is_some_and(|r| r.tenant_id() == Some(tenant_id))
            && tables.members_of(*role_id) == [principal_id]
    })
}

/// Expires every pending invitation for (tenant, email).
fn supersede_pending<T>(tables: &mut T, tenant_id: TenantId, email: &str) -> DomainResult<Vec<InvitationId>>
where
    T: AuthzTables + ?Sized,
{
    let stale: Vec<InvitationId> = tables
        .pending_invitations()
        .into_iter()
        .filter(|i| i.tenant_id == tenant_id && i.email == email)
        .map(|i| i.id)
        .collect();
    for id in &stale {
        tables.transition_invitation(*id, InvitationStatus::Pending, InvitationStatus::Expired)?;
    }
    Ok(stale)
}
