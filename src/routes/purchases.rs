use axum::{
    Json, Router,
    extract::Path,
    routing::{delete, get, patch},
};
use uuid::Uuid;

use crate::{
    dto::purchases::PurchaseList,
    error::{AppError, AppResult},
    middleware::session::{SessionCtx, current_user},
    models::{Purchase, PurchaseUpdate, Role},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases))
        .route("/user-info", delete(clear_user_info))
        .route("/{id}", patch(update_purchase))
}

#[utoipa::path(
    get,
    path = "/api/purchases",
    responses(
        (status = 200, description = "Purchases of the signed-in user", body = ApiResponse<PurchaseList>),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn list_purchases(session: SessionCtx) -> AppResult<Json<ApiResponse<PurchaseList>>> {
    let user = current_user(&session).await?;
    let store = session.purchases.lock().await;
    let items = store.get_user_purchases(user.id);
    let meta = Meta::total(items.len());
    Ok(Json(ApiResponse::success(
        "OK",
        PurchaseList {
            items,
            user_info: store.user_info().cloned(),
        },
        Some(meta),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/purchases/{id}",
    params(
        ("id" = Uuid, Path, description = "Purchase ID")
    ),
    request_body = PurchaseUpdate,
    responses(
        (status = 200, description = "Purchase updated", body = ApiResponse<Purchase>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn update_purchase(
    session: SessionCtx,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseUpdate>,
) -> AppResult<Json<ApiResponse<Purchase>>> {
    let user = current_user(&session).await?;
    let mut store = session.purchases.lock().await;
    let owned = store
        .purchases()
        .iter()
        .any(|p| p.id == id && (p.user_id == user.id || user.role == Role::Admin));
    if !owned || !store.update_purchase(id, payload) {
        return Err(AppError::NotFound);
    }
    let purchase = store
        .purchases()
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or(AppError::NotFound)?;
    Ok(Json(ApiResponse::success("Purchase updated", purchase, None)))
}

#[utoipa::path(
    delete,
    path = "/api/purchases/user-info",
    responses(
        (status = 200, description = "Saved checkout contact info cleared", body = ApiResponse<serde_json::Value>)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn clear_user_info(session: SessionCtx) -> Json<ApiResponse<serde_json::Value>> {
    session.purchases.lock().await.clear_user_info();
    Json(ApiResponse::success(
        "User info cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
