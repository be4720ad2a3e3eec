//! `tenantgate-auth`: pure authorization domain (zero-trust).
//!
//! Permission catalog, roles, screens, principals, tenants, invitations and
//! the decision functions. This crate is intentionally decoupled from HTTP
//! and storage.

pub mod authorize;
pub mod claims;
pub mod invitation;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod screens;
pub mod tenant;

pub use authorize::{AccessExplanation, AccessGraph, Decision, DenialKind};
pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use invitation::{AccessSpec, Invitation, InvitationStatus, InvitationToken, InvitationType};
pub use permissions::{CATALOG, CLIENTS_MANAGE, Permission, PermissionKey, TEAM_MANAGE};
pub use principal::{Principal, PrincipalIdentity, PrincipalStatus};
pub use roles::{Role, RoleKind, SystemRole};
pub use screens::{Screen, ScreenMode};
pub use tenant::{Tenant, TenantConfig, TenantConfigPatch, TenantStatus};
