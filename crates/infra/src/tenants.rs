//! Tenant provisioning and administration.
//!
//! Signup creates the tenant, its configuration, the owner's affiliation and
//! the owner-role membership in one transaction. Retrying signup for an owner
//! who already has a tenant returns that tenant instead of minting another.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use tenantgate_auth::authorize;
use tenantgate_auth::tenant::slugify;
use tenantgate_auth::{
    CLIENTS_MANAGE, Principal, PrincipalIdentity, SystemRole, Tenant, TenantConfig, TenantConfigPatch,
    TenantStatus,
};
use tenantgate_core::{ClientId, DomainError, DomainResult, PrincipalId, TenantId};

use crate::evaluator::require_permission;
use crate::store::{
    AuthzStore, AuthzTables, ClientDirectory, ClientRecord, MembershipStore, PrincipalDirectory,
    RoleStore, TenantRegistry,
};

/// Result of [`TenantService::provision_tenant`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub config: TenantConfig,
    /// False when an existing tenant of the same owner was returned.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct TenantService<S> {
    store: S,
}

impl<S> TenantService<S>
where
    S: AuthzStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// First-time signup: `owner` becomes the registered owner of a new tenant.
    ///
    /// A retry with the same name returns the owner's tenant unchanged. A
    /// different name for an owner who already has a tenant is a `Conflict`.
    pub fn provision_tenant(
        &self,
        owner: &PrincipalIdentity,
        name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<ProvisionedTenant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name cannot be empty"));
        }
        let base_slug = slugify(name)?;
        let profile = Principal::from_identity(owner)?;

        let provisioned = self.store.write(|t| {
            if let Some(tenant) = t.tenant_owned_by(owner.id) {
                if tenant.name != name {
                    return Err(DomainError::conflict("owner already has a tenant"));
                }
                let config = t.config(tenant.id).ok_or_else(|| {
                    error!(tenant_id = %tenant.id, "tenant without configuration");
                    DomainError::state("tenant has no configuration")
                })?;
                return Ok(ProvisionedTenant {
                    tenant,
                    config,
                    created: false,
                });
            }

            let mut principal = t.principal_by_id(owner.id).unwrap_or(profile);
            if principal.tenant_id.is_some() {
                return Err(DomainError::conflict(
                    "principal already belongs to another tenant",
                ));
            }

            let tenant = Tenant {
                id: TenantId::new(),
                name: name.to_string(),
                slug: free_slug(t, &base_slug),
                owner_principal_id: owner.id,
                status: TenantStatus::Active,
                created_at: now,
            };
            let config = TenantConfig::defaults(tenant.id, now);
            t.insert_tenant(tenant.clone(), config.clone())?;

            principal.affiliate(tenant.id)?;
            t.upsert_principal(principal)?;

            let owner_role = t.system_role(SystemRole::Owner).ok_or_else(|| {
                error!("owner role missing; bootstrap seed has not run");
                DomainError::state("system roles are not seeded")
            })?;
            t.assign_role(owner.id, owner_role.id)?;

            Ok(ProvisionedTenant {
                tenant,
                config,
                created: true,
            })
        })?;

        if provisioned.created {
            info!(
                tenant_id = %provisioned.tenant.id,
                slug = %provisioned.tenant.slug,
                owner = %owner.id,
                "tenant provisioned"
            );
        }
        Ok(provisioned)
    }

    /// Readable by every member of the tenant.
    pub fn config(&self, actor: PrincipalId, tenant_id: TenantId) -> DomainResult<TenantConfig> {
        self.store.read(|t| {
            if !authorize::can_access_tenant(t, actor, tenant_id) {
                return Err(DomainError::Unauthorized);
            }
            t.config(tenant_id).ok_or(DomainError::NotFound)
        })?
    }

    /// Owner only.
    pub fn update_config(
        &self,
        actor: PrincipalId,
        tenant_id: TenantId,
        patch: TenantConfigPatch,
        now: DateTime<Utc>,
    ) -> DomainResult<TenantConfig> {
        let config = self.store.write(|t| {
            if !authorize::is_tenant_owner(t, actor, Some(tenant_id)) {
                return Err(DomainError::Unauthorized);
            }
            let mut config = t.config(tenant_id).ok_or(DomainError::NotFound)?;
            config.apply(patch, now)?;
            t.put_config(config.clone())?;
            Ok(config)
        })?;

        info!(%tenant_id, %actor, "tenant configuration updated");
        Ok(config)
    }

    /// Owner only. Works on suspended tenants too, so an owner can reactivate.
    pub fn set_tenant_status(
        &self,
        actor: PrincipalId,
        tenant_id: TenantId,
        status: TenantStatus,
    ) -> DomainResult<Tenant> {
        let tenant = self.store.write(|t| {
            let mut tenant = t.tenant_by_id(tenant_id).ok_or(DomainError::Unauthorized)?;
            let actor_ok = t
                .principal_by_id(actor)
                .is_some_and(|p| !p.is_suspended() && p.tenant_id == Some(tenant_id));
            if !actor_ok || tenant.owner_principal_id != actor {
                return Err(DomainError::Unauthorized);
            }
            tenant.transition(status)?;
            t.update_tenant(tenant.clone())?;
            Ok(tenant)
        })?;

        info!(%tenant_id, status = ?tenant.status, "tenant status changed");
        Ok(tenant)
    }

    /// Registers a client record that client invitations can point at.
    pub fn register_client(
        &self,
        actor: PrincipalId,
        tenant_id: TenantId,
        name: &str,
    ) -> DomainResult<ClientRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("client name cannot be empty"));
        }

        let record = self.store.write(|t| {
            require_permission(t, actor, tenant_id, &CLIENTS_MANAGE)?;
            let record = ClientRecord {
                id: ClientId::new(),
                tenant_id,
                name: name.to_string(),
                principal_id: None,
            };
            t.register_client(record.clone())?;
            Ok(record)
        })?;

        info!(%tenant_id, client_id = %record.id, "client registered");
        Ok(record)
    }
}

/// `base`, or `base-2`, `base-3`, ... whichever is free first.
fn free_slug<T>(tables: &T, base: &str) -> String
where
    T: AuthzTables + ?Sized,
{
    if !tables.slug_taken(base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !tables.slug_taken(candidate))
        .unwrap_or_else(|| format!("{base}-{}", TenantId::new()))
}
