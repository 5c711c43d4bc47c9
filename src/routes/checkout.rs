use axum::{Json, Router, http::StatusCode, routing::post};

use crate::{
    error::AppResult,
    middleware::session::SessionCtx,
    models::CheckoutInfo,
    response::ApiResponse,
    services::checkout_service::{self, CheckoutReceipt},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutInfo,
    responses(
        (status = 201, description = "Cart converted to purchases", body = ApiResponse<CheckoutReceipt>),
        (status = 400, description = "Empty cart, invalid contact info or sold out"),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout(
    session: SessionCtx,
    Json(payload): Json<CheckoutInfo>,
) -> AppResult<(StatusCode, Json<ApiResponse<CheckoutReceipt>>)> {
    let receipt = checkout_service::checkout(&session, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Checkout completed", receipt, None)),
    ))
}
