use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ProfileUpdate, Role, User, UserPreferences},
    services::{
        oauth_service::{OAuthProvider, OAuthService},
        user_service::{NewUserRecord, UserRecord, UserRecordUpdate, UserService},
    },
    storage::{self, AUTH_STORAGE_KEY, LocalStorage},
};

pub const INVALID_CREDENTIALS: &str = "Credenciales inválidas";
pub const USER_NOT_FOUND: &str = "Usuario no encontrado";
pub const REGISTRATION_FAILED: &str = "No se pudo completar el registro";
pub const ROLE_UPDATE_FAILED: &str = "No se pudo actualizar el rol";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

impl AuthSnapshot {
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let preferences = if record.categorias_favoritas.is_some() || record.ubicacion.is_some() {
            Some(UserPreferences {
                favorite_categories: record.categorias_favoritas.unwrap_or_default(),
                location: record.ubicacion,
            })
        } else {
            None
        };

        User {
            id: record.id,
            email: record.email,
            name: record.nombre,
            role: Role::from_backend(&record.rol),
            avatar: record.avatar_url,
            preferences,
        }
    }
}

/// Session identity: Anonymous (`user == None`) or Authenticated.
pub struct AuthStore {
    user: Option<User>,
    users: Arc<dyn UserService>,
    oauth: Arc<dyn OAuthService>,
    storage: Arc<dyn LocalStorage>,
}

impl AuthStore {
    pub fn new(
        users: Arc<dyn UserService>,
        oauth: Arc<dyn OAuthService>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        Self {
            user: None,
            users,
            oauth,
            storage,
        }
    }

    /// Restores the persisted session without contacting the backend.
    pub fn restore(
        users: Arc<dyn UserService>,
        oauth: Arc<dyn OAuthService>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let snapshot: AuthSnapshot =
            storage::restore(storage.as_ref(), AUTH_STORAGE_KEY).unwrap_or_default();
        let user = if snapshot.is_authenticated { snapshot.user } else { None };
        Self {
            user,
            users,
            oauth,
            storage,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            user: self.user.clone(),
            is_authenticated: self.is_authenticated(),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> AppResult<User> {
        let valid = self
            .users
            .verify_credentials(email, password)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "credential check failed");
                AppError::Unauthorized(INVALID_CREDENTIALS.to_string())
            })?;
        if !valid {
            tracing::info!(email, "login rejected");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let record = self
            .users
            .get_by_email(email)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "user lookup failed");
                AppError::Unauthorized(USER_NOT_FOUND.to_string())
            })?
            .ok_or_else(|| AppError::Unauthorized(USER_NOT_FOUND.to_string()))?;

        let user = User::from(record);
        tracing::info!(user_id = %user.id, role = ?user.role, "logged in");
        self.authenticate(user.clone());
        Ok(user)
    }

    /// New accounts are always attendees.
    pub async fn register(&mut self, data: RegisterData) -> AppResult<User> {
        let record = self
            .users
            .create(NewUserRecord {
                email: data.email,
                password: data.password,
                nombre: data.name,
                rol: Role::Attendee.as_backend().to_string(),
            })
            .await
            .map_err(|err| match err {
                AppError::BadRequest(_) => err,
                other => {
                    tracing::error!(error = %other, "registration failed");
                    AppError::BadRequest(REGISTRATION_FAILED.to_string())
                }
            })?;

        let user = User::from(record);
        tracing::info!(user_id = %user.id, "registered");
        self.authenticate(user.clone());
        Ok(user)
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!(user_id = %user.id, "logged out");
        }
        self.persist();
    }

    pub async fn login_with_google(&self) -> AppResult<String> {
        self.start_oauth(OAuthProvider::Google).await
    }

    pub async fn login_with_facebook(&self) -> AppResult<String> {
        self.start_oauth(OAuthProvider::Facebook).await
    }

    /// Returns the provider URL to redirect to.
    pub async fn start_oauth(&self, provider: OAuthProvider) -> AppResult<String> {
        self.oauth.start_redirect(provider).await.inspect_err(|err| {
            tracing::error!(%provider, error = %err, "oauth redirect failed");
        })
    }

    /// Shallow-merges into the current user; no-op when anonymous.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Option<&User> {
        let user = self.user.as_mut()?;
        update.merge_into(user);
        self.persist();
        self.user.as_ref()
    }

    /// Changes a user's role in the backend. The cached session user is left
    /// as is, even when it is the target.
    pub async fn update_user_role(&self, user_id: Uuid, role: Role) -> AppResult<()> {
        if self.user.as_ref().is_some_and(|u| u.id == user_id) {
            tracing::warn!(%user_id, "own role changed; session keeps the old role until next login");
        }
        self.users
            .update(
                user_id,
                UserRecordUpdate {
                    rol: Some(role.as_backend().to_string()),
                    ..UserRecordUpdate::default()
                },
            )
            .await
            .map_err(|err| match err {
                AppError::NotFound => AppError::NotFound,
                other => {
                    tracing::error!(%user_id, error = %other, "role update failed");
                    AppError::BadRequest(ROLE_UPDATE_FAILED.to_string())
                }
            })?;
        Ok(())
    }

    fn authenticate(&mut self, user: User) {
        self.user = Some(user);
        self.persist();
    }

    fn persist(&self) {
        storage::persist(self.storage.as_ref(), AUTH_STORAGE_KEY, &self.snapshot());
    }
}
