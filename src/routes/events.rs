use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::events::{EventList, FeaturedQuery},
    error::{AppError, AppResult},
    middleware::session::{SessionCtx, current_user, ensure_organizer},
    models::{Event, Role, User},
    response::{ApiResponse, Meta},
    routes::params::EventFilterQuery,
    services::event_service::{EventDraft, EventRecord, NewEvent},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/featured", get(featured_events))
        .route("/reload", post(reload_events))
        .route(
            "/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}

async fn ensure_loaded(session: &SessionCtx) {
    if !session.events.is_loaded().await {
        session.events.load_events().await;
    }
}

async fn event_list(session: &SessionCtx, query: &EventFilterQuery) -> ApiResponse<EventList> {
    let state = session.events.snapshot().await;
    let (page, limit, _) = query.pagination().normalize();
    let (items, meta) = Meta::paginate(state.filtered_events, page, limit);
    ApiResponse::success(
        "OK",
        EventList {
            items,
            filters: state.filters,
            error: state.error,
        },
        Some(meta),
    )
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(EventFilterQuery),
    responses(
        (status = 200, description = "Filtered catalog for this session", body = ApiResponse<EventList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn list_events(
    session: SessionCtx,
    Query(query): Query<EventFilterQuery>,
) -> Json<ApiResponse<EventList>> {
    ensure_loaded(&session).await;
    if query.has_filters() {
        let merged = query.merge_into(session.events.filters().await);
        session.events.set_filters(merged).await;
    }
    Json(event_list(&session, &query).await)
}

#[utoipa::path(
    post,
    path = "/api/events/reload",
    responses(
        (status = 200, description = "Reload catalog from the backend", body = ApiResponse<EventList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn reload_events(session: SessionCtx) -> Json<ApiResponse<EventList>> {
    session.events.load_events().await;
    Json(event_list(&session, &EventFilterQuery::default()).await)
}

#[utoipa::path(
    get,
    path = "/api/events/featured",
    params(
        ("refresh" = Option<bool>, Query, description = "Force a reload")
    ),
    responses(
        (status = 200, description = "Featured events", body = ApiResponse<Vec<Event>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn featured_events(
    session: SessionCtx,
    Query(query): Query<FeaturedQuery>,
) -> Json<ApiResponse<Vec<Event>>> {
    let mut featured = session.events.featured_events().await;
    if featured.is_empty() || query.refresh.unwrap_or(false) {
        session.events.load_featured_events().await;
        featured = session.events.featured_events().await;
    }
    let meta = Meta::total(featured.len());
    Json(ApiResponse::success("OK", featured, Some(meta)))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event detail", body = ApiResponse<Event>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    session: SessionCtx,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Event>>> {
    ensure_loaded(&session).await;
    if let Some(event) = session.events.get_event_by_id(&id).await {
        return Ok(Json(ApiResponse::ok(event)));
    }
    let record = state
        .collaborators()
        .events
        .get_by_id(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(ApiResponse::ok(Event::from(record))))
}

async fn owned_record(state: &AppState, user: &User, id: &str) -> AppResult<EventRecord> {
    let record = state
        .collaborators()
        .events
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if user.role != Role::Admin && record.organizador_id != user.id.to_string() {
        return Err(AppError::Forbidden);
    }
    Ok(record)
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = EventDraft,
    responses(
        (status = 201, description = "Event created", body = ApiResponse<Event>),
        (status = 400, description = "Invalid event"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    session: SessionCtx,
    Json(payload): Json<EventDraft>,
) -> AppResult<(StatusCode, Json<ApiResponse<Event>>)> {
    let user = current_user(&session).await?;
    ensure_organizer(&user)?;
    payload.validate()?;

    let record = state
        .collaborators()
        .events
        .create(NewEvent {
            organizer_id: user.id,
            organizer_name: user.name.clone(),
            draft: payload,
        })
        .await?;
    refresh_catalogs(&state, &session).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Event created", Event::from(record), None)),
    ))
}

/// Writes are visible to the writer's session and to anonymous visitors at once.
async fn refresh_catalogs(state: &AppState, session: &SessionCtx) {
    session.events.load_events().await;
    state.catalog.load_events().await;
    if !state.catalog.featured_events().await.is_empty() {
        state.catalog.load_featured_events().await;
    }
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    request_body = EventDraft,
    responses(
        (status = 200, description = "Event updated", body = ApiResponse<Event>),
        (status = 403, description = "Not the organizer of this event"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    session: SessionCtx,
    Path(id): Path<String>,
    Json(payload): Json<EventDraft>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let user = current_user(&session).await?;
    ensure_organizer(&user)?;
    payload.validate()?;
    owned_record(&state, &user, &id).await?;

    let record = state.collaborators().events.update(&id, payload, user.id).await?;
    refresh_catalogs(&state, &session).await;
    Ok(Json(ApiResponse::success("Event updated", Event::from(record), None)))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Not the organizer of this event"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    session: SessionCtx,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let user = current_user(&session).await?;
    ensure_organizer(&user)?;
    owned_record(&state, &user, &id).await?;

    state.collaborators().events.delete(&id, user.id).await?;
    refresh_catalogs(&state, &session).await;
    Ok(Json(ApiResponse::success(
        "Event deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
