use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};

use crate::{
    dto::auth::SessionToken,
    error::AppResult,
    middleware::session::{SessionCtx, issue_session_token},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_session).delete(dispose_session))
}

#[utoipa::path(
    post,
    path = "/api/session",
    responses(
        (status = 201, description = "New session token", body = ApiResponse<SessionToken>)
    ),
    tag = "Session"
)]
pub async fn create_session(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<ApiResponse<SessionToken>>)> {
    let session = state.sessions.create().await?;
    let token = issue_session_token(&state.jwt_secret, session.id)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Session created",
            SessionToken {
                token: format!("Bearer {}", token),
            },
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/session",
    responses(
        (status = 200, description = "Session disposed", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Unknown session"),
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
pub async fn dispose_session(
    State(state): State<AppState>,
    session: SessionCtx,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.sessions.dispose(session.id).await?;
    Ok(Json(ApiResponse::success(
        "Session disposed",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
