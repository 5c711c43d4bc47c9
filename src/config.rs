use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub google_client_id: Option<String>,
    pub facebook_client_id: Option<String>,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Root directory for per-session snapshots.
    pub storage_dir: PathBuf,
    pub admin_redirect_delay: Duration,
    pub oauth: OAuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let storage_dir = env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".eventhub"));
        let delay_ms = env::var("ADMIN_REDIRECT_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);

        let oauth = OAuthConfig {
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            facebook_client_id: env::var("FACEBOOK_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            redirect_url: env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string()),
        };

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            storage_dir,
            admin_redirect_delay: Duration::from_millis(delay_ms),
            oauth,
        })
    }
}
