use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantgate_auth::screens::{self, SCREEN_CATALOG_VERSION};
use tenantgate_auth::{AccessSpec, PermissionKey, Screen, ScreenMode, TenantStatus};
use tenantgate_core::{ClientId, DomainError, InvitationId, PrincipalId, TenantId};
use tenantgate_infra::{Invitee, IssuedInvitation};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetTenantStatusRequest {
    pub status: TenantStatus,
}

#[derive(Debug, Deserialize)]
pub struct RegisterClientRequest {
    pub name: String,
}

/// Either `access` (team member) or `client_id` (client portal user).
#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    #[serde(default)]
    pub access: Option<AccessSpec>,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

impl CreateInvitationRequest {
    pub fn invitee(&self) -> Result<Invitee, DomainError> {
        match (&self.access, self.client_id) {
            (Some(_), Some(_)) => Err(DomainError::validation(
                "give either access or client_id, not both",
            )),
            (Some(access), None) => Ok(Invitee::Member(access.clone())),
            (None, Some(client_id)) => Ok(Invitee::Client(client_id)),
            (None, None) => Err(DomainError::validation("access is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub is_agent: bool,
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditAccessRequest {
    pub access: AccessSpec,
}

#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    pub module: String,
    pub action: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct InvitationCreatedResponse {
    pub invitation_id: InvitationId,
    pub link: String,
    pub expires_at: DateTime<Utc>,
    pub superseded: Vec<InvitationId>,
}

impl From<IssuedInvitation> for InvitationCreatedResponse {
    fn from(issued: IssuedInvitation) -> Self {
        Self {
            invitation_id: issued.invitation.id,
            link: issued.link,
            expires_at: issued.invitation.expires_at,
            superseded: issued.superseded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub principal_id: PrincipalId,
    pub tenant_id: Option<TenantId>,
    pub is_owner: bool,
    pub roles: BTreeSet<String>,
    pub permissions: Vec<String>,
}

pub fn permission_strings(keys: &BTreeSet<PermissionKey>) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Serialize)]
pub struct ScreenDto {
    pub id: &'static str,
    pub label: &'static str,
    pub permission: String,
}

impl From<&Screen> for ScreenDto {
    fn from(screen: &Screen) -> Self {
        Self {
            id: screen.id,
            label: screen.label,
            permission: screen.permission.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScreenGroupDto {
    pub mode: ScreenMode,
    pub label: &'static str,
    pub screens: Vec<ScreenDto>,
}

#[derive(Debug, Serialize)]
pub struct ScreenCatalogResponse {
    pub version: u32,
    pub modes: Vec<ScreenGroupDto>,
}

impl ScreenCatalogResponse {
    pub fn current() -> Self {
        Self {
            version: SCREEN_CATALOG_VERSION,
            modes: ScreenMode::ALL
                .into_iter()
                .map(|mode| ScreenGroupDto {
                    mode,
                    label: mode.label(),
                    screens: screens::screens_in(mode).map(ScreenDto::from).collect(),
                })
                .collect(),
        }
    }
}
