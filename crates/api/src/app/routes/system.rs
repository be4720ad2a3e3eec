use axum::{http::StatusCode, Json};

use crate::app::dto::ScreenCatalogResponse;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /screens - the screen catalogue, grouped by mode (public).
pub async fn screens() -> Json<ScreenCatalogResponse> {
    Json(ScreenCatalogResponse::current())
}
