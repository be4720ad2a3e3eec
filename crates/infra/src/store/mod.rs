//! Storage boundary for the permission graph.
//!
//! One trait per store named by the engine (catalog, roles + role-permission
//! graph, memberships, tenant registry, principals, invitations, client
//! records). A backing store exposes all of them through [`AuthzTables`] and
//! hands them out inside read or read-modify-write transactions.

pub mod in_memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantgate_auth::{
    AccessGraph, Invitation, InvitationStatus, Permission, PermissionKey, Principal, Role,
    SystemRole, Tenant, TenantConfig,
};
use tenantgate_core::{
    ClientId, DomainResult, Entity, InvitationId, PermissionId, PrincipalId, RoleId, TenantId,
};

pub use in_memory::{InMemoryAuthzStore, MemoryTables};

/// Global permission catalog. Read-mostly after bootstrap.
pub trait PermissionCatalog {
    fn permission(&self, id: PermissionId) -> Option<Permission>;
    fn permission_by_key(&self, key: &PermissionKey) -> Option<Permission>;
    fn permissions(&self) -> Vec<Permission>;
    /// Inserts the key if absent. Returns the id and whether a row was created.
    fn upsert_permission(&mut self, key: PermissionKey, description: &str) -> (PermissionId, bool);
}

/// Role Store and Role-Permission Graph.
///
/// Tenant-agnostic storage: callers check that custom roles are only handed
/// to principals of their tenant.
pub trait RoleStore {
    fn role(&self, id: RoleId) -> Option<Role>;
    fn system_role(&self, role: SystemRole) -> Option<Role>;
    fn roles(&self) -> Vec<Role>;
    /// Idempotent by name. Returns the id and whether a row was created.
    fn create_system_role(&mut self, name: &str, description: &str, now: DateTime<Utc>) -> (RoleId, bool);
    /// Creates a tenant-scoped role under a freshly generated, unused name.
    fn create_custom_role(&mut self, tenant_id: TenantId, label: &str, now: DateTime<Utc>) -> DomainResult<RoleId>;
    /// Removes a custom role and its edges. System roles cannot be deleted.
    fn delete_role(&mut self, id: RoleId) -> DomainResult<()>;
    /// Adds an edge. Returns false if it already existed.
    fn grant_permission(&mut self, role_id: RoleId, permission_id: PermissionId) -> DomainResult<bool>;
    /// Drops every edge of the role. Returns how many were removed.
    fn revoke_all_permissions(&mut self, role_id: RoleId) -> DomainResult<usize>;
    fn permissions_of(&self, role_id: RoleId) -> Vec<Permission>;
}

/// Principal ↔ role edges.
pub trait MembershipStore {
    /// Idempotent. Returns false if the edge already existed.
    fn assign_role(&mut self, principal_id: PrincipalId, role_id: RoleId) -> DomainResult<bool>;
    /// Idempotent. Returns false if there was no edge.
    fn unassign_role(&mut self, principal_id: PrincipalId, role_id: RoleId) -> bool;
    /// Swaps `old` for `new`. The new role is validated before the old edge is
    /// touched; a failed assign restores the old edge.
    fn replace_role(&mut self, principal_id: PrincipalId, old: RoleId, new: RoleId) -> DomainResult<()>;
    fn roles_held(&self, principal_id: PrincipalId) -> Vec<RoleId>;
    fn members_of(&self, role_id: RoleId) -> Vec<PrincipalId>;
}

/// Tenants and their 1:1 configuration.
pub trait TenantRegistry {
    fn tenant_by_id(&self, id: TenantId) -> Option<Tenant>;
    fn tenant_owned_by(&self, principal_id: PrincipalId) -> Option<Tenant>;
    fn slug_taken(&self, slug: &str) -> bool;
    /// Co-creates a tenant and its configuration. Slugs are globally unique.
    fn insert_tenant(&mut self, tenant: Tenant, config: TenantConfig) -> DomainResult<()>;
    fn update_tenant(&mut self, tenant: Tenant) -> DomainResult<()>;
    fn config(&self, tenant_id: TenantId) -> Option<TenantConfig>;
    fn put_config(&mut self, config: TenantConfig) -> DomainResult<()>;
}

pub trait PrincipalDirectory {
    fn principal_by_id(&self, id: PrincipalId) -> Option<Principal>;
    fn principal_by_email(&self, email: &str) -> Option<Principal>;
    /// Emails are unique across principals.
    fn upsert_principal(&mut self, principal: Principal) -> DomainResult<()>;
    fn tenant_members(&self, tenant_id: TenantId) -> Vec<Principal>;
}

pub trait InvitationStore {
    fn invitation(&self, id: InvitationId) -> Option<Invitation>;
    fn invitation_by_token_hash(&self, token_hash: &str) -> Option<Invitation>;
    fn pending_invitations(&self) -> Vec<Invitation>;
    fn insert_invitation(&mut self, invitation: Invitation) -> DomainResult<()>;
    /// Conditional update: moves `id` from `from` to `to` only if it is still
    /// in `from`; otherwise `Conflict`.
    fn transition_invitation(
        &mut self,
        id: InvitationId,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> DomainResult<Invitation>;
}

/// External client record, owned by the client-portal collaborator. The
/// engine only reads it and binds its principal on redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub tenant_id: TenantId,
    pub name: String,
    pub principal_id: Option<PrincipalId>,
}

impl Entity for ClientRecord {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }
}

pub trait ClientDirectory {
    fn client(&self, id: ClientId) -> Option<ClientRecord>;
    fn register_client(&mut self, record: ClientRecord) -> DomainResult<()>;
    /// Binds the client's principal reference. Rebinding to a different
    /// principal is a `Conflict`.
    fn bind_client_principal(&mut self, client_id: ClientId, principal_id: PrincipalId) -> DomainResult<()>;
}

/// Everything a transaction can see.
pub trait AuthzTables:
    PermissionCatalog
    + RoleStore
    + MembershipStore
    + TenantRegistry
    + PrincipalDirectory
    + InvitationStore
    + ClientDirectory
    + AccessGraph
{
}

impl<T> AuthzTables for T where
    T: PermissionCatalog
        + RoleStore
        + MembershipStore
        + TenantRegistry
        + PrincipalDirectory
        + InvitationStore
        + ClientDirectory
        + AccessGraph
{
}

/// Transactional access to the tables.
///
/// `write` is all-or-nothing: if the closure returns `Err`, none of its
/// mutations are visible afterwards. Writers are serialized.
pub trait AuthzStore: Send + Sync {
    type Tables: AuthzTables;

    fn read<T>(&self, f: impl FnOnce(&Self::Tables) -> T) -> DomainResult<T>;
    fn write<T>(&self, f: impl FnOnce(&mut Self::Tables) -> DomainResult<T>) -> DomainResult<T>;
}

impl<S> AuthzStore for Arc<S>
where
    S: AuthzStore,
{
    type Tables = S::Tables;

    fn read<T>(&self, f: impl FnOnce(&Self::Tables) -> T) -> DomainResult<T> {
        (**self).read(f)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Self::Tables) -> DomainResult<T>) -> DomainResult<T> {
        (**self).write(f)
    }
}
