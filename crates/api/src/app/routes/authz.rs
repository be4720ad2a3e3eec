//! Authorization checks for the calling principal.
//!
//! Every answer is about the caller only; there is no way to probe another
//! principal from here.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tenantgate_core::DomainError;

use crate::app::dto::{permission_strings, CheckResponse, PermissionQuery, RolesResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/check", get(check))
        .route("/explain", get(explain))
        .route("/roles", get(roles))
}

/// GET /authz/check?module=&action=
pub async fn check(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<PermissionQuery>,
) -> Json<CheckResponse> {
    let allowed = services
        .evaluator
        .has_permission(principal.principal_id(), &q.module, &q.action);
    Json(CheckResponse { allowed })
}

/// GET /authz/explain?module=&action=
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<PermissionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let explanation = services
        .evaluator
        .explain(principal.principal_id(), &q.module, &q.action)
        .ok_or_else(|| DomainError::storage("authorization store unavailable"))?;
    Ok(Json(explanation))
}

/// GET /authz/roles
pub async fn roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Json<RolesResponse> {
    let id = principal.principal_id();
    let evaluator = &services.evaluator;
    Json(RolesResponse {
        principal_id: id,
        tenant_id: evaluator.current_tenant(id),
        is_owner: evaluator.is_tenant_owner(id, None),
        roles: evaluator.roles_of(id),
        permissions: permission_strings(&evaluator.effective_permissions(id)),
    })
}
