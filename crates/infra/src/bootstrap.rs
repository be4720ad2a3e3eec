//! Bootstrap seed: permission catalog, system roles and their default grants.
//!
//! Runs once per deployment and is safe to re-run; every step is an upsert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use tenantgate_auth::{CATALOG, SystemRole};
use tenantgate_core::{DomainError, DomainResult};

use crate::store::{AuthzStore, PermissionCatalog, RoleStore};

/// What a seed run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub permissions_existing: usize,
    pub roles_created: usize,
    pub roles_existing: usize,
    pub grants_created: usize,
}

impl SeedReport {
    /// True when the run found everything already in place.
    pub fn is_noop(&self) -> bool {
        self.permissions_created == 0 && self.roles_created == 0 && self.grants_created == 0
    }
}

pub fn seed<S>(store: &S, now: DateTime<Utc>) -> DomainResult<SeedReport>
where
    S: AuthzStore,
{
    let report = store.write(|t| {
        let mut report = SeedReport::default();

        for entry in CATALOG {
            let (_, created) = t.upsert_permission(entry.key(), entry.description);
            if created {
                report.permissions_created += 1;
            } else {
                report.permissions_existing += 1;
            }
        }

        for role in SystemRole::ALL {
            let (role_id, created) = t.create_system_role(role.name(), role.description(), now);
            if created {
                report.roles_created += 1;
            } else {
                report.roles_existing += 1;
            }

            for entry in role.default_grants() {
                let permission = t.permission_by_key(&entry.key()).ok_or_else(|| {
                    DomainError::state(format!("catalog entry {} was not seeded", entry.key()))
                })?;
                if t.grant_permission(role_id, permission.id)? {
                    report.grants_created += 1;
                }
            }
        }

        Ok(report)
    })?;

    info!(
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        grants_created = report.grants_created,
        "authorization catalog seeded"
    );
    Ok(report)
}
