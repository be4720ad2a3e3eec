//! Invitation endpoints: create, cancel, redeem.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use tenantgate_auth::PrincipalIdentity;
use tenantgate_core::{InvitationId, TenantId};
use tenantgate_infra::{CreateInvitation, RedeemInvitation};

use crate::app::dto::{AcceptInviteRequest, CreateInvitationRequest, InvitationCreatedResponse};
use crate::app::errors::{parse_id, ApiError};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// POST /tenants/:id/invitations
///
/// The raw token only ever leaves the server inside `link`.
pub async fn create_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id(&id)?;
    let invitee = body.invitee()?;

    let issued = services.invitations.create_invitation(CreateInvitation {
        actor: principal.principal_id(),
        tenant_id,
        email: body.email,
        invitee,
        occurred_at: Utc::now(),
    })?;

    Ok((StatusCode::CREATED, Json(InvitationCreatedResponse::from(issued))))
}

/// DELETE /invitations/:id
pub async fn cancel_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invitation_id: InvitationId = parse_id(&id)?;
    let invitation = services
        .invitations
        .cancel_invitation(principal.principal_id(), invitation_id)?;
    Ok(Json(invitation))
}

/// POST /accept-invite - the authenticated caller becomes the invitee.
pub async fn accept_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<AcceptInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let redemption = services.invitations.redeem_invitation(RedeemInvitation {
        token: body.token,
        identity: PrincipalIdentity {
            id: principal.principal_id(),
            email: body.email,
            display_name: body.display_name,
            is_agent: body.is_agent,
            avatar_ref: body.avatar_ref,
        },
        occurred_at: Utc::now(),
    })?;

    Ok(Json(serde_json::json!({
        "principal_id": redemption.principal.id,
        "tenant_id": redemption.invitation.tenant_id,
        "role_id": redemption.role_id,
        "invitation_id": redemption.invitation.id,
    })))
}
