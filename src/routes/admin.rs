use axum::{
    Json, Router,
    extract::Path,
    routing::patch,
};
use uuid::Uuid;

use crate::{
    dto::auth::UpdateRoleRequest,
    error::AppResult,
    middleware::session::{SessionCtx, current_user, ensure_admin},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{id}/role", patch(update_user_role))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/role",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Role update failed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user_role(
    session: SessionCtx,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let admin = current_user(&session).await?;
    ensure_admin(&admin)?;

    session
        .auth
        .lock()
        .await
        .update_user_role(id, payload.role)
        .await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, role = ?payload.role, "user role updated");

    Ok(Json(ApiResponse::success(
        "Role updated",
        serde_json::json!({ "user_id": id, "role": payload.role }),
        Some(Meta::empty()),
    )))
}
