use axum::{
    Json, Router,
    extract::Path,
    routing::{get, patch, post},
};

use crate::{
    dto::auth::{LoginRequest, OAuthRedirect, SessionUser},
    error::{AppError, AppResult},
    middleware::session::SessionCtx,
    models::{ProfileUpdate, User},
    response::ApiResponse,
    services::oauth_service::OAuthProvider,
    state::AppState,
    stores::auth::RegisterData,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", patch(update_profile))
        .route("/oauth/{provider}", get(oauth_redirect))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterData,
    responses(
        (status = 200, description = "Register and sign in", body = ApiResponse<User>),
        (status = 400, description = "Registration rejected")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register(
    session: SessionCtx,
    Json(payload): Json<RegisterData>,
) -> AppResult<Json<ApiResponse<User>>> {
    if payload.email.trim().is_empty() || payload.password.is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("email, password and name are required".into()));
    }
    let user = session.auth.lock().await.register(payload).await?;
    Ok(Json(ApiResponse::success("User created", user, None)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<User>),
        (status = 401, description = "Invalid credentials")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn login(
    session: SessionCtx,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let LoginRequest { email, password } = payload;
    let user = session.auth.lock().await.login(&email, &password).await?;
    Ok(Json(ApiResponse::success("Logged in", user, None)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session is anonymous again", body = ApiResponse<SessionUser>)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(session: SessionCtx) -> Json<ApiResponse<SessionUser>> {
    let mut auth = session.auth.lock().await;
    auth.logout();
    Json(ApiResponse::success(
        "Logged out",
        SessionUser {
            user: None,
            is_authenticated: auth.is_authenticated(),
        },
        None,
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current session identity", body = ApiResponse<SessionUser>)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(session: SessionCtx) -> Json<ApiResponse<SessionUser>> {
    let snapshot = session.auth.lock().await.snapshot();
    Json(ApiResponse::ok(SessionUser {
        user: snapshot.user,
        is_authenticated: snapshot.is_authenticated,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/auth/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_profile(
    session: SessionCtx,
    Json(payload): Json<ProfileUpdate>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut auth = session.auth.lock().await;
    let user = auth
        .update_profile(payload)
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Debes iniciar sesión".to_string()))?;
    Ok(Json(ApiResponse::success("Profile updated", user, None)))
}

#[utoipa::path(
    get,
    path = "/api/auth/oauth/{provider}",
    params(
        ("provider" = OAuthProvider, Path, description = "google or facebook")
    ),
    responses(
        (status = 200, description = "Provider authorize URL", body = ApiResponse<OAuthRedirect>),
        (status = 400, description = "Provider not configured")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn oauth_redirect(
    session: SessionCtx,
    Path(provider): Path<OAuthProvider>,
) -> AppResult<Json<ApiResponse<OAuthRedirect>>> {
    let auth = session.auth.lock().await;
    let url = match provider {
        OAuthProvider::Google => auth.login_with_google().await?,
        OAuthProvider::Facebook => auth.login_with_facebook().await?,
    };
    Ok(Json(ApiResponse::ok(OAuthRedirect { url })))
}
