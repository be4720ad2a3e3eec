use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use tenantgate_auth::roles::custom_role_name;
use tenantgate_auth::{
    AccessGraph, Invitation, InvitationStatus, Permission, PermissionKey, Principal, Role,
    RoleKind, SystemRole, Tenant, TenantConfig,
};
use tenantgate_core::{
    ClientId, DomainError, DomainResult, Entity, InvitationId, PermissionId, PrincipalId, RoleId,
    TenantId,
};

use super::{
    AuthzStore, ClientDirectory, ClientRecord, InvitationStore, MembershipStore,
    PermissionCatalog, PrincipalDirectory, RoleStore, TenantRegistry,
};

/// Rows of one entity type keyed by id.
#[derive(Debug, Clone)]
struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<E: Entity + Clone> Table<E> {
    fn get(&self, id: E::Id) -> Option<E> {
        self.rows.get(&id).cloned()
    }

    fn contains(&self, id: E::Id) -> bool {
        self.rows.contains_key(&id)
    }

    fn put(&mut self, row: E) {
        self.rows.insert(row.id(), row);
    }

    fn remove(&mut self, id: E::Id) -> Option<E> {
        self.rows.remove(&id)
    }

    fn find(&self, pred: impl Fn(&E) -> bool) -> Option<E> {
        self.rows.values().find(|r| pred(r)).cloned()
    }

    fn filter(&self, pred: impl Fn(&E) -> bool) -> Vec<E> {
        self.rows.values().filter(|r| pred(r)).cloned().collect()
    }
}

/// The in-memory rows. Cloned per write transaction so a failed closure
/// leaves the committed copy untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    permissions: Table<Permission>,
    roles: Table<Role>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    memberships: BTreeSet<(PrincipalId, RoleId)>,
    tenants: Table<Tenant>,
    configs: HashMap<TenantId, TenantConfig>,
    principals: Table<Principal>,
    invitations: Table<Invitation>,
    clients: Table<ClientRecord>,
}

/// In-memory transactional store for tests/dev.
///
/// Readers share a lock; writers are serialized and commit by swapping in the
/// mutated draft.
#[derive(Debug, Default)]
pub struct InMemoryAuthzStore {
    inner: RwLock<MemoryTables>,
}

impl InMemoryAuthzStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthzStore for InMemoryAuthzStore {
    type Tables = MemoryTables;

    fn read<T>(&self, f: impl FnOnce(&MemoryTables) -> T) -> DomainResult<T> {
        let tables = self
            .inner
            .read()
            .map_err(|_| DomainError::storage("lock poisoned"))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryTables) -> DomainResult<T>) -> DomainResult<T> {
        let mut committed = self
            .inner
            .write()
            .map_err(|_| DomainError::storage("lock poisoned"))?;

        let mut draft = committed.clone();
        let out = f(&mut draft)?;
        *committed = draft;
        Ok(out)
    }
}

impl PermissionCatalog for MemoryTables {
    fn permission(&self, id: PermissionId) -> Option<Permission> {
        self.permissions.get(id)
    }

    fn permission_by_key(&self, key: &PermissionKey) -> Option<Permission> {
        self.permissions.find(|p| &p.key == key)
    }

    fn permissions(&self) -> Vec<Permission> {
        let mut all = self.permissions.filter(|_| true);
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    fn upsert_permission(&mut self, key: PermissionKey, description: &str) -> (PermissionId, bool) {
        if let Some(existing) = self.permission_by_key(&key) {
            return (existing.id, false);
        }
        let id = PermissionId::new();
        self.permissions.put(Permission {
            id,
            key,
            description: description.to_string(),
        });
        (id, true)
    }
}

impl RoleStore for MemoryTables {
    fn role(&self, id: RoleId) -> Option<Role> {
        self.roles.get(id)
    }

    fn system_role(&self, role: SystemRole) -> Option<Role> {
        self.roles.find(|r| r.is_system() && r.name == role.name())
    }

    fn roles(&self) -> Vec<Role> {
        self.roles.filter(|_| true)
    }

    fn create_system_role(&mut self, name: &str, description: &str, now: DateTime<Utc>) -> (RoleId, bool) {
        if let Some(existing) = self.roles.find(|r| r.is_system() && r.name == name) {
            return (existing.id, false);
        }
        let id = RoleId::new();
        self.roles.put(Role {
            id,
            name: name.to_string(),
            description: description.to_string(),
            kind: RoleKind::System,
            created_at: now,
        });
        (id, true)
    }

    fn create_custom_role(&mut self, tenant_id: TenantId, label: &str, now: DateTime<Utc>) -> DomainResult<RoleId> {
        if !self.tenants.contains(tenant_id) {
            return Err(DomainError::not_found());
        }

        let name = (0u32..)
            .map(|attempt| custom_role_name(now, attempt))
            .find(|candidate| self.roles.find(|r| &r.name == candidate).is_none())
            .ok_or_else(|| DomainError::state("custom role names exhausted"))?;

        let id = RoleId::new();
        self.roles.put(Role {
            id,
            name,
            description: label.to_string(),
            kind: RoleKind::Custom { tenant_id },
            created_at: now,
        });
        Ok(id)
    }

    fn delete_role(&mut self, id: RoleId) -> DomainResult<()> {
        let role = self.roles.get(id).ok_or(DomainError::NotFound)?;
        if role.is_system() {
            return Err(DomainError::conflict("system roles are immutable"));
        }
        self.roles.remove(id);
        self.role_permissions.retain(|(r, _)| *r != id);
        self.memberships.retain(|(_, r)| *r != id);
        Ok(())
    }

    fn grant_permission(&mut self, role_id: RoleId, permission_id: PermissionId) -> DomainResult<bool> {
        if !self.roles.contains(role_id) || !self.permissions.contains(permission_id) {
            return Err(DomainError::NotFound);
        }
        Ok(self.role_permissions.insert((role_id, permission_id)))
    }

    fn revoke_all_permissions(&mut self, role_id: RoleId) -> DomainResult<usize> {
        if !self.roles.contains(role_id) {
            return Err(DomainError::NotFound);
        }
        let before = self.role_permissions.len();
        self.role_permissions.retain(|(r, _)| *r != role_id);
        Ok(before - self.role_permissions.len())
    }

    fn permissions_of(&self, role_id: RoleId) -> Vec<Permission> {
        self.role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| self.permissions.get(*p))
            .collect()
    }
}

impl MembershipStore for MemoryTables {
    fn assign_role(&mut self, principal_id: PrincipalId, role_id: RoleId) -> DomainResult<bool> {
        if !self.principals.contains(principal_id) || !self.roles.contains(role_id) {
            return Err(DomainError::NotFound);
        }
        Ok(self.memberships.insert((principal_id, role_id)))
    }

    fn unassign_role(&mut self, principal_id: PrincipalId, role_id: RoleId) -> bool {
        self.memberships.remove(&(principal_id, role_id))
    }

    fn replace_role(&mut self, principal_id: PrincipalId, old: RoleId, new: RoleId) -> DomainResult<()> {
        if old == new {
            return self.assign_role(principal_id, new).map(|_| ());
        }
        if !self.roles.contains(new) {
            return Err(DomainError::NotFound);
        }

        let had_old = self.unassign_role(principal_id, old);
        if let Err(e) = self.assign_role(principal_id, new) {
            if had_old {
                self.memberships.insert((principal_id, old));
            }
            return Err(e);
        }
        Ok(())
    }

    fn roles_held(&self, principal_id: PrincipalId) -> Vec<RoleId> {
        self.memberships
            .iter()
            .filter(|(p, _)| *p == principal_id)
            .map(|(_, r)| *r)
            .collect()
    }

    fn members_of(&self, role_id: RoleId) -> Vec<PrincipalId> {
        self.memberships
            .iter()
            .filter(|(_, r)| *r == role_id)
            .map(|(p, _)| *p)
            .collect()
    }
}

impl TenantRegistry for MemoryTables {
    fn tenant_by_id(&self, id: TenantId) -> Option<Tenant> {
        self.tenants.get(id)
    }

    fn tenant_owned_by(&self, principal_id: PrincipalId) -> Option<Tenant> {
        self.tenants.find(|t| t.owner_principal_id == principal_id)
    }

    fn slug_taken(&self, slug: &str) -> bool {
        self.tenants.find(|t| t.slug == slug).is_some()
    }

    fn insert_tenant(&mut self, tenant: Tenant, config: TenantConfig) -> DomainResult<()> {
        if config.tenant_id != tenant.id {
            return Err(DomainError::state("tenant config belongs to another tenant"));
        }
        if self.tenants.contains(tenant.id) {
            return Err(DomainError::conflict("tenant already exists"));
        }
        if self.slug_taken(&tenant.slug) {
            return Err(DomainError::conflict(format!("slug '{}' is taken", tenant.slug)));
        }
        self.configs.insert(tenant.id, config);
        self.tenants.put(tenant);
        Ok(())
    }

    fn update_tenant(&mut self, tenant: Tenant) -> DomainResult<()> {
        if !self.tenants.contains(tenant.id) {
            return Err(DomainError::NotFound);
        }
        self.tenants.put(tenant);
        Ok(())
    }

    fn config(&self, tenant_id: TenantId) -> Option<TenantConfig> {
        self.configs.get(&tenant_id).cloned()
    }

    fn put_config(&mut self, config: TenantConfig) -> DomainResult<()> {
        if !self.tenants.contains(config.tenant_id) {
            return Err(DomainError::NotFound);
        }
        self.configs.insert(config.tenant_id, config);
        Ok(())
    }
}

impl PrincipalDirectory for MemoryTables {
    fn principal_by_id(&self, id: PrincipalId) -> Option<Principal> {
        self.principals.get(id)
    }

    fn principal_by_email(&self, email: &str) -> Option<Principal> {
        self.principals.find(|p| p.email == email)
    }

    fn upsert_principal(&mut self, principal: Principal) -> DomainResult<()> {
        if let Some(other) = self.principal_by_email(&principal.email) {
            if other.id != principal.id {
                return Err(DomainError::conflict("email is already registered"));
            }
        }
        self.principals.put(principal);
        Ok(())
    }

    fn tenant_members(&self, tenant_id: TenantId) -> Vec<Principal> {
        self.principals.filter(|p| p.tenant_id == Some(tenant_id))
    }
}

impl InvitationStore for MemoryTables {
    fn invitation(&self, id: InvitationId) -> Option<Invitation> {
        self.invitations.get(id)
    }

    fn invitation_by_token_hash(&self, token_hash: &str) -> Option<Invitation> {
        self.invitations.find(|i| i.token_hash == token_hash)
    }

    fn pending_invitations(&self) -> Vec<Invitation> {
        self.invitations.filter(Invitation::is_pending)
    }

    fn insert_invitation(&mut self, invitation: Invitation) -> DomainResult<()> {
        if self.invitations.contains(invitation.id)
            || self.invitation_by_token_hash(&invitation.token_hash).is_some()
        {
            return Err(DomainError::conflict("duplicate invitation"));
        }
        self.invitations.put(invitation);
        Ok(())
    }

    fn transition_invitation(
        &mut self,
        id: InvitationId,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> DomainResult<Invitation> {
        let mut invitation = self.invitations.get(id).ok_or(DomainError::NotFound)?;
        if invitation.status != from {
            return Err(DomainError::conflict(format!(
                "invitation already {}",
                invitation.status
            )));
        }
        match to {
            InvitationStatus::Accepted => invitation.accept()?,
            InvitationStatus::Expired => invitation.expire()?,
            InvitationStatus::Pending => {
                return Err(DomainError::state("invitations never return to pending"));
            }
        }
        self.invitations.put(invitation.clone());
        Ok(invitation)
    }
}

impl ClientDirectory for MemoryTables {
    fn client(&self, id: ClientId) -> Option<ClientRecord> {
        self.clients.get(id)
    }

    fn register_client(&mut self, record: ClientRecord) -> DomainResult<()> {
        if !self.tenants.contains(record.tenant_id) {
            return Err(DomainError::NotFound);
        }
        if self.clients.contains(record.id) {
            return Err(DomainError::conflict("client already registered"));
        }
        self.clients.put(record);
        Ok(())
    }

    fn bind_client_principal(&mut self, client_id: ClientId, principal_id: PrincipalId) -> DomainResult<()> {
        let mut record = self.clients.get(client_id).ok_or(DomainError::NotFound)?;
        match record.principal_id {
            Some(bound) if bound != principal_id => {
                Err(DomainError::conflict("client is linked to another principal"))
            }
            _ => {
                record.principal_id = Some(principal_id);
                self.clients.put(record);
                Ok(())
            }
        }
    }
}

impl AccessGraph for MemoryTables {
    fn principal(&self, id: PrincipalId) -> Option<Principal> {
        self.principal_by_id(id)
    }

    fn tenant(&self, id: TenantId) -> Option<Tenant> {
        self.tenant_by_id(id)
    }

    fn held_roles(&self, principal_id: PrincipalId) -> Vec<Role> {
        self.roles_held(principal_id)
            .into_iter()
            .filter_map(|r| self.roles.get(r))
            .collect()
    }

    fn granted_keys(&self, role_id: RoleId) -> Vec<PermissionKey> {
        self.permissions_of(role_id)
            .into_iter()
            .map(|p| p.key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use tenantgate_auth::TenantStatus;
    use tenantgate_auth::principal::PrincipalStatus;

    fn tables_with_tenant() -> (MemoryTables, TenantId, PrincipalId) {
        let mut t = MemoryTables::default();
        let owner = PrincipalId::new();
        let tenant_id = TenantId::new();
        t.insert_tenant(
            Tenant {
                id: tenant_id,
                name: "Acme".into(),
                slug: "acme".into(),
                owner_principal_id: owner,
                status: TenantStatus::Active,
                created_at: Utc::now(),
            },
            TenantConfig::defaults(tenant_id, Utc::now()),
        )
        .unwrap();
        t.upsert_principal(Principal {
            id: owner,
            email: "alice@acme.com".into(),
            display_name: "Alice".into(),
            tenant_id: Some(tenant_id),
            status: PrincipalStatus::Active,
            is_agent: false,
            avatar_ref: None,
        })
        .unwrap();
        (t, tenant_id, owner)
    }

    #[test]
    fn assign_role_is_idempotent() {
        let (mut t, _, owner) = tables_with_tenant();
        let (role, _) = t.create_system_role("viewer", "", Utc::now());

        assert!(t.assign_role(owner, role).unwrap());
        assert!(!t.assign_role(owner, role).unwrap());
        assert_eq!(t.roles_held(owner), vec![role]);
        assert_eq!(t.members_of(role), vec![owner]);
    }

    #[test]
    fn system_roles_are_idempotent_by_name() {
        let mut t = MemoryTables::default();
        let (a, created_a) = t.create_system_role("admin", "first", Utc::now());
        let (b, created_b) = t.create_system_role("admin", "second", Utc::now());
        assert_eq!(a, b);
        assert!(created_a);
        assert!(!created_b);
        assert!(t.delete_role(a).is_err());
    }

    #[test]
    fn custom_role_names_never_collide() {
        let (mut t, tenant, _) = tables_with_tenant();
        let now = Utc::now();
        let a = t.create_custom_role(tenant, "first", now).unwrap();
        let b = t.create_custom_role(tenant, "second", now).unwrap();
        let name_a = t.role(a).unwrap().name;
        let name_b = t.role(b).unwrap().name;
        assert_ne!(name_a, name_b);
        assert!(name_b.starts_with(&name_a));
        assert_eq!(t.role(a).unwrap().tenant_id(), Some(tenant));
    }

    #[test]
    fn replace_role_keeps_old_edge_when_new_role_is_missing() {
        let (mut t, _, owner) = tables_with_tenant();
        let (old, _) = t.create_system_role("viewer", "", Utc::now());
        t.assign_role(owner, old).unwrap();

        assert!(t.replace_role(owner, old, RoleId::new()).is_err());
        assert_eq!(t.roles_held(owner), vec![old]);
    }

    #[test]
    fn revoke_all_then_regrant() {
        let (mut t, tenant, _) = tables_with_tenant();
        let role = t.create_custom_role(tenant, "x", Utc::now()).unwrap();
        let (p1, _) = t.upsert_permission(PermissionKey::new("calendar", "view"), "");
        let (p2, _) = t.upsert_permission(PermissionKey::new("calendar", "manage"), "");
        t.grant_permission(role, p1).unwrap();
        assert!(!t.grant_permission(role, p1).unwrap());

        assert_eq!(t.revoke_all_permissions(role).unwrap(), 1);
        t.grant_permission(role, p2).unwrap();
        let keys: Vec<_> = t.granted_keys(role).iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["calendar.manage"]);
    }

    #[test]
    fn invitation_transition_is_conditional() {
        let (mut t, tenant, owner) = tables_with_tenant();
        let now = Utc::now();
        let id = InvitationId::new();
        t.insert_invitation(Invitation {
            id,
            email: "bob@x.com".into(),
            role_id: None,
            tenant_id: tenant,
            client_id: None,
            token_hash: "abc".into(),
            status: InvitationStatus::Pending,
            invitation_type: tenantgate_auth::InvitationType::Team,
            created_by: owner,
            created_at: now,
            expires_at: now,
        })
        .unwrap();

        t.transition_invitation(id, InvitationStatus::Pending, InvitationStatus::Accepted)
            .unwrap();
        let second =
            t.transition_invitation(id, InvitationStatus::Pending, InvitationStatus::Accepted);
        assert!(matches!(second, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn failed_write_rolls_back() {
        let store = InMemoryAuthzStore::new();
        let result: DomainResult<()> = store.write(|t| {
            t.create_system_role("admin", "", Utc::now());
            Err(DomainError::validation("abort"))
        });
        assert!(result.is_err());
        assert!(store.read(|t| t.roles().is_empty()).unwrap());
    }

    #[test]
    fn emails_are_unique_across_principals() {
        let (mut t, _, _) = tables_with_tenant();
        let dup = Principal {
            id: PrincipalId::new(),
            email: "alice@acme.com".into(),
            display_name: "Impostor".into(),
            tenant_id: None,
            status: PrincipalStatus::Active,
            is_agent: false,
            avatar_ref: None,
        };
        assert!(matches!(t.upsert_principal(dup), Err(DomainError::Conflict(_))));
    }

    proptest! {
        #[test]
        fn membership_edges_behave_like_a_set(ops in prop::collection::vec((0usize..3, any::<bool>()), 0..40)) {
            let (mut t, _, owner) = tables_with_tenant();
            let roles: Vec<RoleId> = ["a", "b", "c"]
                .iter()
                .map(|n| t.create_system_role(n, "", Utc::now()).0)
                .collect();

            let mut model = std::collections::BTreeSet::new();
            for (i, assign) in ops {
                if assign {
                    let created = t.assign_role(owner, roles[i]).unwrap();
                    prop_assert_eq!(created, model.insert(roles[i]));
                } else {
                    let removed = t.unassign_role(owner, roles[i]);
                    prop_assert_eq!(removed, model.remove(&roles[i]));
                }
            }
            let mut held = t.roles_held(owner);
            held.sort();
            prop_assert_eq!(held, model.into_iter().collect::<Vec<_>>());
        }
    }
}
