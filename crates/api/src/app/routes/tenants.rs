//! Tenant signup and administration.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use tenantgate_auth::{PrincipalIdentity, TenantConfigPatch};
use tenantgate_core::TenantId;

use crate::app::dto::{CreateTenantRequest, RegisterClientRequest, SetTenantStatusRequest};
use crate::app::errors::{parse_id, ApiError};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// POST /tenants - provision a tenant owned by the caller.
///
/// `201` on creation, `200` when the caller already owns a tenant.
pub async fn create_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = PrincipalIdentity {
        id: principal.principal_id(),
        email: body.email,
        display_name: body.display_name,
        is_agent: false,
        avatar_ref: None,
    };
    let provisioned = services
        .tenants
        .provision_tenant(&owner, &body.name, Utc::now())?;

    let status = if provisioned.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(provisioned)))
}

/// GET /tenants/:id/config
pub async fn get_config(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id(&id)?;
    let config = services.tenants.config(principal.principal_id(), tenant_id)?;
    Ok(Json(config))
}

/// PATCH /tenants/:id/config - owner only.
pub async fn update_config(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(patch): Json<TenantConfigPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id(&id)?;
    let config = services
        .tenants
        .update_config(principal.principal_id(), tenant_id, patch, Utc::now())?;
    Ok(Json(config))
}

/// PUT /tenants/:id/status - owner only.
pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<SetTenantStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id(&id)?;
    let tenant = services
        .tenants
        .set_tenant_status(principal.principal_id(), tenant_id, body.status)?;
    Ok(Json(tenant))
}

/// POST /tenants/:id/clients
pub async fn register_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<RegisterClientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id(&id)?;
    let record = services
        .tenants
        .register_client(principal.principal_id(), tenant_id, &body.name)?;
    Ok((StatusCode::CREATED, Json(record)))
}
