use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::OAuthConfig,
    error::{AppError, AppResult},
};

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const FACEBOOK_AUTHORIZE_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthProvider::Google => f.write_str("google"),
            OAuthProvider::Facebook => f.write_str("facebook"),
        }
    }
}

/// Starts a provider redirect. The callback leg is handled by the provider
/// integration, not here.
#[async_trait]
pub trait OAuthService: Send + Sync {
    async fn start_redirect(&self, provider: OAuthProvider) -> AppResult<String>;
}

pub struct RedirectOAuthService {
    config: OAuthConfig,
}

impl RedirectOAuthService {
    pub fn new(config: OAuthConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl OAuthService for RedirectOAuthService {
    async fn start_redirect(&self, provider: OAuthProvider) -> AppResult<String> {
        let (endpoint, client_id, scope) = match provider {
            OAuthProvider::Google => (
                GOOGLE_AUTHORIZE_URL,
                self.config.google_client_id.as_deref(),
                "openid email profile",
            ),
            OAuthProvider::Facebook => (
                FACEBOOK_AUTHORIZE_URL,
                self.config.facebook_client_id.as_deref(),
                "email,public_profile",
            ),
        };
        let client_id = client_id.ok_or_else(|| {
            AppError::BadRequest(format!("{provider} login is not configured"))
        })?;

        let state = Uuid::new_v4().to_string();
        let url = Url::parse_with_params(
            endpoint,
            &[
                ("client_id", client_id),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(google: Option<&str>) -> OAuthConfig {
        OAuthConfig {
            google_client_id: google.map(str::to_string),
            facebook_client_id: None,
            redirect_url: "http://localhost:3000/auth/callback".into(),
        }
    }

    #[tokio::test]
    async fn builds_google_authorize_url() {
        let service = RedirectOAuthService::new(config(Some("client-123")));
        let url = service.start_redirect(OAuthProvider::Google).await.unwrap();
        assert!(url.starts_with(GOOGLE_AUTHORIZE_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
    }

    #[tokio::test]
    async fn unconfigured_provider_is_an_error() {
        let service = RedirectOAuthService::new(config(None));
        let err = service
            .start_redirect(OAuthProvider::Facebook)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
