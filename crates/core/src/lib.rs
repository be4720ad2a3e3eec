//! `tenantgate-core`: shared identifiers, entity trait and error taxonomy.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ClientId, InvitationId, PermissionId, PrincipalId, RoleId, TenantId};
