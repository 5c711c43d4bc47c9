//! In-process collaborators for tests and offline runs.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::ALL_CATEGORIES,
    services::{
        event_service::{
            EventDraft, EventQuery, EventRecord, EventService, NewEvent, TicketTypeDraft,
            TicketTypeRecord, plan_ticket_types,
        },
        user_service::{NewUserRecord, UserRecord, UserRecordUpdate, UserService},
    },
};

fn unavailable() -> AppError {
    AppError::Internal(anyhow::anyhow!("backend unavailable"))
}

/// A write as the audit log would record it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventWrite {
    pub action: &'static str,
    pub event_id: String,
    pub actor_id: Uuid,
}

#[derive(Default)]
pub struct InMemoryEventService {
    records: RwLock<Vec<EventRecord>>,
    writes: RwLock<Vec<EventWrite>>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
}

impl InMemoryEventService {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Every call fails while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub async fn writes(&self) -> Vec<EventWrite> {
        self.writes.read().await.clone()
    }

    async fn record_write(&self, action: &'static str, event_id: &str, actor_id: Uuid) {
        self.writes.write().await.push(EventWrite {
            action,
            event_id: event_id.to_string(),
            actor_id,
        });
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

fn record_from_draft(id: String, organizer_id: String, organizer_name: Option<String>, draft: EventDraft) -> EventRecord {
    EventRecord {
        id,
        titulo: draft.title,
        descripcion: draft.description,
        imagen_url: draft.image,
        fecha_evento: draft.date.format("%Y-%m-%d").to_string(),
        hora_evento: draft.time,
        ubicacion: Some(draft.location),
        categoria: Some(draft.category),
        precio: Some(draft.price),
        capacidad_maxima: Some(draft.max_attendees),
        asistentes_actuales: Some(0),
        organizador_id: organizer_id,
        organizador_nombre: organizer_name,
        estado: Some(draft.status.unwrap_or_default().as_backend().to_string()),
        etiquetas: draft.tags,
        tipos_entrada: draft.ticket_types.into_iter().map(new_ticket_record).collect(),
    }
}

fn new_ticket_record(t: TicketTypeDraft) -> TicketTypeRecord {
    TicketTypeRecord {
        id: Uuid::new_v4().to_string(),
        nombre: t.name,
        precio: t.price,
        descripcion: t.description,
        cantidad_maxima: t.max_quantity,
        cantidad_disponible: t.max_quantity,
    }
}

#[async_trait]
impl EventService for InMemoryEventService {
    async fn list(&self, query: &EventQuery) -> AppResult<Vec<EventRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let records = self.records.read().await;
        let search = query.search.as_deref().map(str::to_lowercase);
        let mut items: Vec<EventRecord> = records
            .iter()
            .filter(|r| match query.category.as_deref() {
                Some(c) if !c.is_empty() && c != ALL_CATEGORIES => r.categoria.as_deref() == Some(c),
                _ => true,
            })
            .filter(|r| match search.as_deref() {
                Some(s) if !s.is_empty() => {
                    r.titulo.to_lowercase().contains(s)
                        || r.descripcion
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(s))
                }
                _ => true,
            })
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            items.truncate(limit as usize);
        }
        Ok(items)
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<EventRecord>> {
        self.check()?;
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, data: NewEvent) -> AppResult<EventRecord> {
        self.check()?;
        data.draft.validate()?;
        let actor_id = data.organizer_id;
        let record = record_from_draft(
            Uuid::new_v4().to_string(),
            data.organizer_id.to_string(),
            Some(data.organizer_name),
            data.draft,
        );
        self.records.write().await.push(record.clone());
        self.record_write("event_create", &record.id, actor_id).await;
        Ok(record)
    }

    async fn update(&self, id: &str, mut data: EventDraft, actor_id: Uuid) -> AppResult<EventRecord> {
        self.check()?;
        data.validate()?;
        let updated = {
            let mut records = self.records.write().await;
            let existing = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(AppError::NotFound)?;
            let plan = plan_ticket_types(&existing.tipos_entrada, std::mem::take(&mut data.ticket_types));
            let mut updated = record_from_draft(
                existing.id.clone(),
                existing.organizador_id.clone(),
                existing.organizador_nombre.clone(),
                data,
            );
            updated.tipos_entrada = plan.kept;
            updated
                .tipos_entrada
                .extend(plan.added.into_iter().map(new_ticket_record));
            updated.asistentes_actuales = existing.asistentes_actuales;
            *existing = updated.clone();
            updated
        };
        self.record_write("event_update", id, actor_id).await;
        Ok(updated)
    }

    async fn delete(&self, id: &str, actor_id: Uuid) -> AppResult<()> {
        self.check()?;
        {
            let mut records = self.records.write().await;
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return Err(AppError::NotFound);
            }
        }
        self.record_write("event_delete", id, actor_id).await;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserService {
    users: RwLock<HashMap<Uuid, (UserRecord, String)>>,
    failing: AtomicBool,
}

impl InMemoryUserService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user with a plaintext password and raw backend role.
    pub async fn insert(&self, email: &str, password: &str, nombre: &str, rol: &str) -> UserRecord {
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            nombre: nombre.to_string(),
            rol: rol.to_string(),
            avatar_url: None,
            categorias_favoritas: None,
            ubicacion: None,
        };
        self.users
            .write()
            .await
            .insert(record.id, (record.clone(), password.to_string()));
        record
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl UserService for InMemoryUserService {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        self.check()?;
        Ok(self.users.read().await.get(&id).map(|(u, _)| u.clone()))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.check()?;
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn create(&self, data: NewUserRecord) -> AppResult<UserRecord> {
        self.check()?;
        if self.get_by_email(&data.email).await?.is_some() {
            return Err(AppError::BadRequest("El correo ya está registrado".to_string()));
        }
        Ok(self
            .insert(&data.email, &data.password, &data.nombre, &data.rol)
            .await)
    }

    async fn update(&self, id: Uuid, data: UserRecordUpdate) -> AppResult<UserRecord> {
        self.check()?;
        let mut users = self.users.write().await;
        let (user, _) = users.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(nombre) = data.nombre {
            user.nombre = nombre;
        }
        if let Some(rol) = data.rol {
            user.rol = rol;
        }
        if let Some(avatar_url) = data.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(ubicacion) = data.ubicacion {
            user.ubicacion = Some(ubicacion);
        }
        Ok(user.clone())
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<bool> {
        self.check()?;
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|(u, p)| u.email == email && p == password))
    }
}
