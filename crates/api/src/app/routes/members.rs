use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use tenantgate_core::PrincipalId;
use tenantgate_infra::EditAccess;

use crate::app::dto::{permission_strings, EditAccessRequest};
use crate::app::errors::{parse_id, ApiError};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// PUT /members/:principal_id/access
pub async fn edit_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<EditAccessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member: PrincipalId = parse_id(&id)?;
    let change = services.invitations.edit_access(EditAccess {
        actor: principal.principal_id(),
        principal_id: member,
        access: body.access,
        occurred_at: Utc::now(),
    })?;

    Ok(Json(serde_json::json!({
        "role_id": change.role_id,
        "in_place": change.in_place,
        "permissions": permission_strings(&change.permissions),
    })))
}
