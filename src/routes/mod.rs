use axum::{Json, Router, http::{StatusCode, Uri}};

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod doc;
pub mod events;
pub mod health;
pub mod pages;
pub mod params;
pub mod purchases;
pub mod session;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/session", session::router())
        .nest("/auth", auth::router())
        .nest("/events", events::router())
        .nest("/cart", cart::router())
        .nest("/checkout", checkout::router())
        .nest("/purchases", purchases::router())
        .nest("/admin", admin::router())
        .fallback(api_not_found)
}

pub async fn api_not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
