use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Role, User};

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionToken {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    /// Session id.
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OAuthRedirect {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}
