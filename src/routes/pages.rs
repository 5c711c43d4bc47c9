//! Page endpoints. Each renders a JSON view model for its page after applying
//! the page's access rule; admins landing on public pages are redirected.

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    guards::{AdminRedirect, GuardDecision, Page, ROOT_PATH},
    middleware::session::SessionCtx,
    models::{Role, User},
    response::ApiResponse,
    state::AppState,
    stores::EventStore,
};

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// `user` marks navigation the user started explicitly.
    pub nav: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageView {
    pub page: &'static str,
    pub user: Option<User>,
    pub data: serde_json::Value,
}

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/events", get(events_page))
        .route("/events/{id}", get(event_detail_page))
        .route("/login", get(login_page))
        .route_layer(middleware::from_fn_with_state(state, admin_redirect));

    Router::new()
        .route("/", get(home_page))
        .route("/dashboard", get(dashboard_page))
        .route("/checkout", get(checkout_page))
        .route("/profile", get(profile_page))
        .route("/tickets", get(tickets_page))
        .route("/admin", get(admin_page))
        .merge(public)
}

async fn session_user(session: &Option<SessionCtx>) -> Option<User> {
    match session {
        Some(session) => session.auth.lock().await.user().cloned(),
        None => None,
    }
}

fn view(page: &'static str, user: Option<User>, data: serde_json::Value) -> Response {
    Json(ApiResponse::ok(PageView { page, user, data })).into_response()
}

/// Applies the page rule; `Err` carries the redirect to send instead.
async fn authorize(session: &Option<SessionCtx>, page: Page) -> Result<Option<User>, Response> {
    let user = session_user(session).await;
    match page.authorize(user.as_ref().map(|u| u.role)) {
        GuardDecision::Render => Ok(user),
        GuardDecision::Redirect(to) => Err(Redirect::to(to).into_response()),
    }
}

async fn admin_redirect(session: Option<SessionCtx>, request: Request, next: Next) -> Response {
    let role = session_user(&session).await.map(|u| u.role);
    match AdminRedirect::decide(role) {
        GuardDecision::Redirect(to) => {
            tracing::debug!(path = %request.uri().path(), to, "admin redirected off public page");
            Redirect::to(to).into_response()
        }
        GuardDecision::Render => next.run(request).await,
    }
}

/// Visitors without a session share the app-wide catalog.
fn catalog<'a>(state: &'a AppState, session: &'a Option<SessionCtx>) -> &'a EventStore {
    match session {
        Some(session) => &session.events,
        None => state.catalog.as_ref(),
    }
}

/// Unknown paths land on the home page.
pub async fn fallback() -> Redirect {
    Redirect::to(ROOT_PATH)
}

async fn home_page(
    State(state): State<AppState>,
    session: Option<SessionCtx>,
    Query(query): Query<HomeQuery>,
) -> Response {
    let user = session_user(&session).await;
    let store = catalog(&state, &session);
    if store.featured_events().await.is_empty() {
        store.load_featured_events().await;
    }
    let snapshot = store.snapshot().await;

    let user_initiated = query.nav.as_deref() == Some("user");
    let pending = state
        .route_guard
        .pending_redirect(ROOT_PATH, user_initiated, user.as_ref().map(|u| u.role));

    let mut response = view(
        "home",
        user,
        json!({ "featured_events": snapshot.featured_events, "error": snapshot.error }),
    );
    if let Some(delay) = pending {
        let secs = delay.as_millis().div_ceil(1000);
        if let Ok(value) = HeaderValue::from_str(&format!("{secs}; url=/admin")) {
            response.headers_mut().insert(header::REFRESH, value);
        }
    }
    response
}

async fn events_page(State(state): State<AppState>, session: Option<SessionCtx>) -> Response {
    let user = session_user(&session).await;
    let store = catalog(&state, &session);
    if !store.is_loaded().await {
        store.load_events().await;
    }
    let snapshot = store.snapshot().await;
    view(
        "events",
        user,
        json!({
            "events": snapshot.filtered_events,
            "filters": snapshot.filters,
            "error": snapshot.error,
        }),
    )
}

async fn event_detail_page(
    State(state): State<AppState>,
    session: Option<SessionCtx>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let user = session_user(&session).await;
    let store = catalog(&state, &session);
    if !store.is_loaded().await {
        store.load_events().await;
    }
    let event = store.get_event_by_id(&id).await.ok_or(AppError::NotFound)?;
    Ok(view("event_detail", user, json!({ "event": event })))
}

async fn login_page() -> Response {
    view("login", None, json!({ "providers": ["google", "facebook"] }))
}

async fn dashboard_page(session: Option<SessionCtx>) -> Response {
    let user = match authorize(&session, Page::Dashboard).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to(ROOT_PATH).into_response(),
        Err(redirect) => return redirect,
    };
    let Some(session) = session else {
        return Redirect::to(ROOT_PATH).into_response();
    };
    if !session.events.is_loaded().await {
        session.events.load_events().await;
    }
    let owner = user.id.to_string();
    let events: Vec<_> = session
        .events
        .snapshot()
        .await
        .events
        .into_iter()
        .filter(|e| user.role == Role::Admin || e.organizer_id == owner)
        .collect();
    let attendees: i64 = events.iter().map(|e| i64::from(e.current_attendees)).sum();
    view(
        "dashboard",
        Some(user),
        json!({ "events": events, "total_attendees": attendees }),
    )
}

async fn checkout_page(session: Option<SessionCtx>) -> Response {
    let user = match authorize(&session, Page::Checkout).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let Some(session) = session else {
        return Redirect::to(ROOT_PATH).into_response();
    };
    let cart = session.cart.lock().await.snapshot();
    let user_info = session.purchases.lock().await.user_info().cloned();
    view("checkout", user, json!({ "cart": cart, "user_info": user_info }))
}

async fn profile_page(session: Option<SessionCtx>) -> Response {
    match authorize(&session, Page::Profile).await {
        Ok(user) => view("profile", user, json!({})),
        Err(redirect) => redirect,
    }
}

async fn tickets_page(session: Option<SessionCtx>) -> Response {
    let user = match authorize(&session, Page::Tickets).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to(ROOT_PATH).into_response(),
        Err(redirect) => return redirect,
    };
    let Some(session) = session else {
        return Redirect::to(ROOT_PATH).into_response();
    };
    let purchases = session.purchases.lock().await.get_user_purchases(user.id);
    view("tickets", Some(user), json!({ "purchases": purchases }))
}

async fn admin_page(State(state): State<AppState>, session: Option<SessionCtx>) -> Response {
    let user = match authorize(&session, Page::Admin).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let sessions = state.sessions.len().await;
    view("admin", user, json!({ "active_sessions": sessions }))
}
