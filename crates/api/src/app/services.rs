//! Engine wiring: one in-memory store shared by the evaluator and the
//! provisioning workflows.

use std::sync::Arc;

use chrono::Utc;

use tenantgate_core::DomainResult;
use tenantgate_infra::{
    Evaluator, InMemoryAuthzStore, InvitationWorkflow, TenantService, WorkflowConfig, seed,
};

pub type Store = Arc<InMemoryAuthzStore>;

pub struct AppServices {
    pub evaluator: Evaluator<Store>,
    pub tenants: TenantService<Store>,
    pub invitations: InvitationWorkflow<Store>,
}

/// Builds the services over a freshly seeded store.
pub fn build_services(workflow: WorkflowConfig) -> DomainResult<AppServices> {
    let store: Store = Arc::new(InMemoryAuthzStore::new());
    let report = seed(&store, Utc::now())?;
    tracing::debug!(?report, "store seeded");

    Ok(AppServices {
        evaluator: Evaluator::new(store.clone()),
        tenants: TenantService::new(store.clone()),
        invitations: InvitationWorkflow::new(store, workflow),
    })
}
