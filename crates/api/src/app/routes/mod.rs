use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub mod authz;
pub mod invitations;
pub mod members;
pub mod system;
pub mod tenants;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/accept-invite", post(invitations::accept_invite))
        .route("/tenants", post(tenants::create_tenant))
        .route(
            "/tenants/:id/config",
            get(tenants::get_config).patch(tenants::update_config),
        )
        .route("/tenants/:id/status", put(tenants::set_status))
        .route("/tenants/:id/clients", post(tenants::register_client))
        .route("/tenants/:id/invitations", post(invitations::create_invitation))
        .route("/invitations/:id", delete(invitations::cancel_invitation))
        .route("/members/:principal_id/access", put(members::edit_access))
        .nest("/authz", authz::router())
}
