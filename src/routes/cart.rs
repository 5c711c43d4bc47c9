use axum::{
    Json, Router,
    extract::Path,
    routing::{get, patch},
};

use crate::{
    dto::cart::{AddToCartRequest, UpdateQuantityRequest},
    error::{AppError, AppResult},
    middleware::session::SessionCtx,
    models::NewCartItem,
    response::ApiResponse,
    state::AppState,
    stores::CartSnapshot,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route(
            "/items/{event_id}/{ticket_type_id}",
            patch(update_quantity).delete(remove_from_cart),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines and total", body = ApiResponse<CartSnapshot>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(session: SessionCtx) -> Json<ApiResponse<CartSnapshot>> {
    let snapshot = session.cart.lock().await.snapshot();
    Json(ApiResponse::ok(snapshot))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Add or merge a cart line", body = ApiResponse<CartSnapshot>),
        (status = 400, description = "Bad request"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    session: SessionCtx,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartSnapshot>>> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    if !session.events.is_loaded().await {
        session.events.load_events().await;
    }
    let event = session
        .events
        .get_event_by_id(&payload.event_id)
        .await
        .ok_or_else(|| AppError::BadRequest("event not found".to_string()))?;
    let ticket = event
        .ticket_type(&payload.ticket_type_id)
        .ok_or_else(|| AppError::BadRequest("ticket type not found".to_string()))?;

    let mut cart = session.cart.lock().await;
    let in_cart = cart
        .items()
        .iter()
        .find(|i| i.matches(&payload.event_id, &payload.ticket_type_id))
        .map_or(0, |i| i.quantity);
    if in_cart + quantity > ticket.available {
        return Err(AppError::BadRequest(format!(
            "Solo quedan {} entradas {}",
            ticket.available, ticket.name
        )));
    }

    cart.add_item(NewCartItem {
        price: ticket.price,
        event_title: event.title.clone(),
        ticket_type_name: ticket.name.clone(),
        event_id: payload.event_id,
        ticket_type_id: payload.ticket_type_id,
        quantity: Some(quantity),
    });
    Ok(Json(ApiResponse::success("Added to cart", cart.snapshot(), None)))
}

#[utoipa::path(
    patch,
    path = "/api/cart/items/{event_id}/{ticket_type_id}",
    params(
        ("event_id" = String, Path, description = "Event ID"),
        ("ticket_type_id" = String, Path, description = "Ticket type ID")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Set line quantity; zero or less removes it", body = ApiResponse<CartSnapshot>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_quantity(
    session: SessionCtx,
    Path((event_id, ticket_type_id)): Path<(String, String)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Json<ApiResponse<CartSnapshot>> {
    let mut cart = session.cart.lock().await;
    cart.update_quantity(&event_id, &ticket_type_id, payload.quantity);
    Json(ApiResponse::success("Cart updated", cart.snapshot(), None))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{event_id}/{ticket_type_id}",
    params(
        ("event_id" = String, Path, description = "Event ID"),
        ("ticket_type_id" = String, Path, description = "Ticket type ID")
    ),
    responses(
        (status = 200, description = "Removed from cart", body = ApiResponse<CartSnapshot>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    session: SessionCtx,
    Path((event_id, ticket_type_id)): Path<(String, String)>,
) -> Json<ApiResponse<CartSnapshot>> {
    let mut cart = session.cart.lock().await;
    cart.remove_item(&event_id, &ticket_type_id);
    Json(ApiResponse::success("Removed from cart", cart.snapshot(), None))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartSnapshot>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(session: SessionCtx) -> Json<ApiResponse<CartSnapshot>> {
    let mut cart = session.cart.lock().await;
    cart.clear_cart();
    Json(ApiResponse::success("Cart cleared", cart.snapshot(), None))
}
