use std::{ops::Deref, sync::Arc};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::{Role, User},
    session::Session,
    state::AppState,
};

pub const SESSION_TTL_HOURS: i64 = 24;

/// The session addressed by the request's bearer token.
#[derive(Clone)]
pub struct SessionCtx(pub Arc<Session>);

impl Deref for SessionCtx {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.0
    }
}

pub fn issue_session_token(secret: &str, session_id: Uuid) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(SESSION_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: session_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_session_token(secret: &str, token: &str) -> AppResult<Uuid> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

    Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid session id in token".into()))
}

fn bearer_token(parts: &Parts) -> AppResult<Option<&str>> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?;
    Ok(Some(token.trim()))
}

impl FromRequestParts<AppState> for SessionCtx {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;
        let session_id = decode_session_token(&state.jwt_secret, token)?;
        Ok(SessionCtx(state.sessions.get(session_id).await?))
    }
}

impl OptionalFromRequestParts<AppState> for SessionCtx {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if bearer_token(parts)?.is_none() {
            return Ok(None);
        }
        <SessionCtx as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

/// The authenticated user of the session.
pub async fn current_user(session: &Session) -> AppResult<User> {
    session
        .auth
        .lock()
        .await
        .user()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Debes iniciar sesión".to_string()))
}

pub fn ensure_role(user: &User, roles: &[Role]) -> AppResult<()> {
    if !roles.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &User) -> AppResult<()> {
    ensure_role(user, &[Role::Admin])
}

pub fn ensure_organizer(user: &User) -> AppResult<()> {
    ensure_role(user, &[Role::Organizer, Role::Admin])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_yields_session_id() {
        let id = Uuid::new_v4();
        let token = issue_session_token("secret", id).unwrap();
        assert_eq!(decode_session_token("secret", &token).unwrap(), id);
        assert!(decode_session_token("other", &token).is_err());
    }
}
