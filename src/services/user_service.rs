use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use password_hash::rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::audit,
    db::DbPool,
    error::{AppError, AppResult},
};

/// User row as stored by the backend; `rol` is the raw backend role string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub nombre: String,
    pub rol: String,
    pub avatar_url: Option<String>,
    pub categorias_favoritas: Option<Vec<String>>,
    pub ubicacion: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub password: String,
    pub nombre: String,
    pub rol: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserRecordUpdate {
    pub nombre: Option<String>,
    pub rol: Option<String>,
    pub avatar_url: Option<String>,
    pub ubicacion: Option<String>,
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;
    async fn create(&self, data: NewUserRecord) -> AppResult<UserRecord>;
    async fn update(&self, id: Uuid, data: UserRecordUpdate) -> AppResult<UserRecord>;
    async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<bool>;
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

const USER_COLUMNS: &str =
    "id, email, nombre, rol, avatar_url, categorias_favoritas, ubicacion";

pub struct PgUserService {
    pool: DbPool,
}

impl PgUserService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserService for PgUserService {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, data: NewUserRecord) -> AppResult<UserRecord> {
        let NewUserRecord {
            email,
            password,
            nombre,
            rol,
        } = data;

        let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM usuarios WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if exist.is_some() {
            return Err(AppError::BadRequest("El correo ya está registrado".to_string()));
        }

        let password_hash = hash_password(&password)?;
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO usuarios (id, email, nombre, rol, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email.as_str())
        .bind(nombre)
        .bind(rol)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        audit(
            &self.pool,
            Some(user.id),
            "user_register",
            "usuarios",
            serde_json::json!({ "user_id": user.id }),
        )
        .await;
        Ok(user)
    }

    async fn update(&self, id: Uuid, data: UserRecordUpdate) -> AppResult<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE usuarios
            SET nombre = COALESCE($2, nombre),
                rol = COALESCE($3, rol),
                avatar_url = COALESCE($4, avatar_url),
                ubicacion = COALESCE($5, ubicacion)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.nombre)
        .bind(data.rol.as_deref())
        .bind(data.avatar_url)
        .bind(data.ubicacion)
        .fetch_optional(&self.pool)
        .await?;
        let user = match user {
            Some(u) => u,
            None => return Err(AppError::NotFound),
        };

        audit(
            &self.pool,
            None,
            "user_update",
            "usuarios",
            serde_json::json!({ "user_id": user.id, "rol": data.rol }),
        )
        .await;
        Ok(user)
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM usuarios WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        let Some((password_hash,)) = row else {
            return Ok(false);
        };

        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
