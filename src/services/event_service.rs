use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    audit::audit,
    db::{DbPool, OrmConn},
    entity::{
        eventos::{ActiveModel as EventoActive, Column as EventoCol, Entity as Eventos, Model as EventoModel},
        tipos_entrada::{
            ActiveModel as TipoActive, Column as TipoCol, Entity as TiposEntrada, Model as TipoModel,
        },
    },
    error::{AppError, AppResult},
    models::{ALL_CATEGORIES, EventStatus},
};

/// Ticket tier as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TicketTypeRecord {
    pub id: String,
    pub nombre: String,
    pub precio: i64,
    pub descripcion: Option<String>,
    pub cantidad_maxima: i32,
    pub cantidad_disponible: i32,
}

/// Event as stored by the backend, before mapping into [`crate::models::Event`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    pub id: String,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub imagen_url: Option<String>,
    pub fecha_evento: String,
    pub hora_evento: Option<String>,
    pub ubicacion: Option<String>,
    pub categoria: Option<String>,
    pub precio: Option<i64>,
    pub capacidad_maxima: Option<i32>,
    pub asistentes_actuales: Option<i32>,
    pub organizador_id: String,
    pub organizador_nombre: Option<String>,
    pub estado: Option<String>,
    pub etiquetas: Vec<String>,
    pub tipos_entrada: Vec<TicketTypeRecord>,
}

/// Server-side filters for [`EventService::list`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TicketTypeDraft {
    /// Set when editing an existing ticket type; otherwise matched by name.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub max_quantity: i32,
}

/// Organizer-submitted event form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub time: Option<String>,
    pub location: String,
    pub category: String,
    pub price: i64,
    pub max_attendees: i32,
    pub status: Option<EventStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ticket_types: Vec<TicketTypeDraft>,
}

impl EventDraft {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".into()));
        }
        if self.price < 0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        if self.max_attendees < 0 {
            return Err(AppError::BadRequest("max_attendees must not be negative".into()));
        }
        if self
            .ticket_types
            .iter()
            .any(|t| t.price < 0 || t.max_quantity < 0)
        {
            return Err(AppError::BadRequest("invalid ticket type".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub organizer_id: Uuid,
    pub organizer_name: String,
    pub draft: EventDraft,
}

#[async_trait]
pub trait EventService: Send + Sync {
    async fn list(&self, query: &EventQuery) -> AppResult<Vec<EventRecord>>;
    async fn get_by_id(&self, id: &str) -> AppResult<Option<EventRecord>>;
    async fn create(&self, data: NewEvent) -> AppResult<EventRecord>;
    async fn update(&self, id: &str, data: EventDraft, actor_id: Uuid) -> AppResult<EventRecord>;
    async fn delete(&self, id: &str, actor_id: Uuid) -> AppResult<()>;
}

/// How an edited form maps onto an event's current ticket types.
#[derive(Debug, Default)]
pub struct TicketTypePlan {
    /// Existing ticket types with their new fields; ids are unchanged.
    pub kept: Vec<TicketTypeRecord>,
    pub added: Vec<TicketTypeDraft>,
    /// Ids of ticket types no longer on the form.
    pub removed: Vec<String>,
}

/// Matches drafts to existing ticket types by id, then by name. Tickets
/// already sold stay sold: availability is the new maximum minus the sold
/// count, floored at zero.
pub fn plan_ticket_types(existing: &[TicketTypeRecord], drafts: Vec<TicketTypeDraft>) -> TicketTypePlan {
    let mut unmatched: Vec<&TicketTypeRecord> = existing.iter().collect();
    let mut plan = TicketTypePlan::default();

    for draft in drafts {
        let position = match draft.id.as_deref() {
            Some(id) => unmatched.iter().position(|t| t.id == id),
            None => unmatched
                .iter()
                .position(|t| t.nombre.trim().eq_ignore_ascii_case(draft.name.trim())),
        };
        let Some(position) = position else {
            plan.added.push(draft);
            continue;
        };
        let current = unmatched.remove(position);
        let sold = (current.cantidad_maxima - current.cantidad_disponible).max(0);
        plan.kept.push(TicketTypeRecord {
            id: current.id.clone(),
            nombre: draft.name,
            precio: draft.price,
            descripcion: draft.description,
            cantidad_maxima: draft.max_quantity,
            cantidad_disponible: (draft.max_quantity - sold).max(0),
        });
    }

    plan.removed = unmatched.into_iter().map(|t| t.id.clone()).collect();
    plan
}

pub struct PgEventService {
    orm: OrmConn,
    pool: DbPool,
}

impl PgEventService {
    pub fn new(orm: OrmConn, pool: DbPool) -> Self {
        Self { orm, pool }
    }

    async fn ticket_types_for(&self, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, Vec<TipoModel>>> {
        let mut grouped: HashMap<Uuid, Vec<TipoModel>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }
        let tipos = TiposEntrada::find()
            .filter(TipoCol::EventoId.is_in(ids))
            .order_by_asc(TipoCol::Precio)
            .all(&self.orm)
            .await?;
        for tipo in tipos {
            grouped.entry(tipo.evento_id).or_default().push(tipo);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl EventService for PgEventService {
    async fn list(&self, query: &EventQuery) -> AppResult<Vec<EventRecord>> {
        let mut condition = Condition::all();

        if let Some(category) = query
            .category
            .as_ref()
            .filter(|c| !c.is_empty() && c.as_str() != ALL_CATEGORIES)
        {
            condition = condition.add(EventoCol::Categoria.eq(category.clone()));
        }

        if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(EventoCol::Titulo).ilike(pattern.clone()))
                    .add(Expr::col(EventoCol::Descripcion).ilike(pattern)),
            );
        }

        let mut finder = Eventos::find()
            .filter(condition)
            .order_by_asc(EventoCol::FechaEvento);
        if let Some(limit) = query.limit {
            finder = finder.limit(limit);
        }
        let eventos = finder.all(&self.orm).await?;

        let mut tipos = self
            .ticket_types_for(eventos.iter().map(|e| e.id).collect())
            .await?;

        Ok(eventos
            .into_iter()
            .map(|evento| {
                let own = tipos.remove(&evento.id).unwrap_or_default();
                record_from_entity(evento, own)
            })
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<EventRecord>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let Some(evento) = Eventos::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut tipos = self.ticket_types_for(vec![evento.id]).await?;
        let own = tipos.remove(&evento.id).unwrap_or_default();
        Ok(Some(record_from_entity(evento, own)))
    }

    async fn create(&self, data: NewEvent) -> AppResult<EventRecord> {
        let NewEvent {
            organizer_id,
            organizer_name,
            draft,
        } = data;
        draft.validate()?;

        let txn = self.orm.begin().await?;
        let evento = EventoActive {
            id: Set(Uuid::new_v4()),
            titulo: Set(draft.title),
            descripcion: Set(draft.description),
            imagen_url: Set(draft.image),
            fecha_evento: Set(draft.date),
            hora_evento: Set(draft.time),
            ubicacion: Set(Some(draft.location)),
            categoria: Set(Some(draft.category)),
            precio: Set(Some(draft.price)),
            capacidad_maxima: Set(Some(draft.max_attendees)),
            asistentes_actuales: Set(Some(0)),
            organizador_id: Set(organizer_id),
            organizador_nombre: Set(Some(organizer_name)),
            estado: Set(draft.status.unwrap_or_default().as_backend().to_string()),
            etiquetas: Set(Some(serde_json::json!(draft.tags))),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut tipos = Vec::with_capacity(draft.ticket_types.len());
        for ticket in draft.ticket_types {
            tipos.push(insert_ticket_type(&txn, evento.id, ticket).await?);
        }
        txn.commit().await?;

        audit(
            &self.pool,
            Some(organizer_id),
            "event_create",
            "eventos",
            serde_json::json!({ "event_id": evento.id }),
        )
        .await;
        tracing::info!(event_id = %evento.id, "event created");

        Ok(record_from_entity(evento, tipos))
    }

    async fn update(&self, id: &str, data: EventDraft, actor_id: Uuid) -> AppResult<EventRecord> {
        data.validate()?;
        let id = Uuid::parse_str(id).map_err(|_| AppError::NotFound)?;

        let txn = self.orm.begin().await?;
        let existing = Eventos::find_by_id(id).one(&txn).await?;
        let existing = match existing {
            Some(e) => e,
            None => return Err(AppError::NotFound),
        };
        let current: Vec<TicketTypeRecord> = TiposEntrada::find()
            .filter(TipoCol::EventoId.eq(existing.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(ticket_record)
            .collect();

        let plan = plan_ticket_types(&current, data.ticket_types.clone());

        let mut active: EventoActive = existing.into();
        active.titulo = Set(data.title);
        active.descripcion = Set(data.description);
        active.imagen_url = Set(data.image);
        active.fecha_evento = Set(data.date);
        active.hora_evento = Set(data.time);
        active.ubicacion = Set(Some(data.location));
        active.categoria = Set(Some(data.category));
        active.precio = Set(Some(data.price));
        active.capacidad_maxima = Set(Some(data.max_attendees));
        if let Some(status) = data.status {
            active.estado = Set(status.as_backend().to_string());
        }
        active.etiquetas = Set(Some(serde_json::json!(data.tags)));
        let evento = active.update(&txn).await?;

        if !plan.removed.is_empty() {
            let removed = plan
                .removed
                .iter()
                .map(|id| parse_ticket_id(id))
                .collect::<AppResult<Vec<Uuid>>>()?;
            TiposEntrada::delete_many()
                .filter(TipoCol::Id.is_in(removed))
                .exec(&txn)
                .await?;
        }
        let mut tipos = Vec::with_capacity(plan.kept.len() + plan.added.len());
        for kept in plan.kept {
            let tipo = TipoActive {
                id: Set(parse_ticket_id(&kept.id)?),
                evento_id: Set(evento.id),
                nombre: Set(kept.nombre),
                precio: Set(kept.precio),
                descripcion: Set(kept.descripcion),
                cantidad_maxima: Set(kept.cantidad_maxima),
                cantidad_disponible: Set(kept.cantidad_disponible),
            }
            .update(&txn)
            .await?;
            tipos.push(tipo);
        }
        for ticket in plan.added {
            tipos.push(insert_ticket_type(&txn, evento.id, ticket).await?);
        }
        txn.commit().await?;

        audit(
            &self.pool,
            Some(actor_id),
            "event_update",
            "eventos",
            serde_json::json!({ "event_id": evento.id }),
        )
        .await;

        Ok(record_from_entity(evento, tipos))
    }

    async fn delete(&self, id: &str, actor_id: Uuid) -> AppResult<()> {
        let id = Uuid::parse_str(id).map_err(|_| AppError::NotFound)?;
        let result = Eventos::delete_by_id(id).exec(&self.orm).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        audit(
            &self.pool,
            Some(actor_id),
            "event_delete",
            "eventos",
            serde_json::json!({ "event_id": id }),
        )
        .await;
        Ok(())
    }
}

fn parse_ticket_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|e| AppError::Internal(anyhow::anyhow!("bad ticket type id {id}: {e}")))
}

async fn insert_ticket_type<C: sea_orm::ConnectionTrait>(
    conn: &C,
    evento_id: Uuid,
    ticket: TicketTypeDraft,
) -> AppResult<TipoModel> {
    let tipo = TipoActive {
        id: Set(Uuid::new_v4()),
        evento_id: Set(evento_id),
        nombre: Set(ticket.name),
        precio: Set(ticket.price),
        descripcion: Set(ticket.description),
        cantidad_maxima: Set(ticket.max_quantity),
        cantidad_disponible: Set(ticket.max_quantity),
    }
    .insert(conn)
    .await?;
    Ok(tipo)
}

fn record_from_entity(model: EventoModel, tipos: Vec<TipoModel>) -> EventRecord {
    let etiquetas = model
        .etiquetas
        .and_then(|value| serde_json::from_value::<Vec<String>>(value).ok())
        .unwrap_or_default();

    EventRecord {
        id: model.id.to_string(),
        titulo: model.titulo,
        descripcion: model.descripcion,
        imagen_url: model.imagen_url,
        fecha_evento: model.fecha_evento.format("%Y-%m-%d").to_string(),
        hora_evento: model.hora_evento,
        ubicacion: model.ubicacion,
        categoria: model.categoria,
        precio: model.precio,
        capacidad_maxima: model.capacidad_maxima,
        asistentes_actuales: model.asistentes_actuales,
        organizador_id: model.organizador_id.to_string(),
        organizador_nombre: model.organizador_nombre,
        estado: Some(model.estado),
        etiquetas,
        tipos_entrada: tipos.into_iter().map(ticket_record).collect(),
    }
}

fn ticket_record(tipo: TipoModel) -> TicketTypeRecord {
    TicketTypeRecord {
        id: tipo.id.to_string(),
        nombre: tipo.nombre,
        precio: tipo.precio,
        descripcion: tipo.descripcion,
        cantidad_maxima: tipo.cantidad_maxima,
        cantidad_disponible: tipo.cantidad_disponible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(id: &str, nombre: &str, max: i32, available: i32) -> TicketTypeRecord {
        TicketTypeRecord {
            id: id.into(),
            nombre: nombre.into(),
            precio: 100_000,
            descripcion: None,
            cantidad_maxima: max,
            cantidad_disponible: available,
        }
    }

    fn draft(id: Option<&str>, name: &str, max: i32) -> TicketTypeDraft {
        TicketTypeDraft {
            id: id.map(str::to_string),
            name: name.into(),
            price: 120_000,
            description: None,
            max_quantity: max,
        }
    }

    #[test]
    fn edits_keep_ids_and_sold_tickets() {
        let current = vec![
            existing("a", "General", 100, 40),
            existing("b", "VIP", 20, 0),
            existing("c", "Palco", 10, 10),
        ];
        let plan = plan_ticket_types(
            &current,
            vec![
                draft(None, "general", 120),
                draft(Some("b"), "VIP Oro", 10),
                draft(None, "Estudiantes", 50),
            ],
        );

        assert_eq!(plan.kept.len(), 2);
        assert_eq!(plan.kept[0].id, "a");
        assert_eq!(plan.kept[0].precio, 120_000);
        // 60 sold out of 100; raising the cap to 120 leaves 60.
        assert_eq!(plan.kept[0].cantidad_disponible, 60);
        assert_eq!(plan.kept[1].id, "b");
        assert_eq!(plan.kept[1].nombre, "VIP Oro");
        assert_eq!(plan.kept[1].cantidad_disponible, 0);
        assert_eq!(plan.added.len(), 1);
        assert_eq!(plan.added[0].name, "Estudiantes");
        assert_eq!(plan.removed, vec!["c".to_string()]);
    }

    #[test]
    fn unknown_id_is_added_not_matched_by_name() {
        let current = vec![existing("a", "General", 10, 10)];
        let plan = plan_ticket_types(&current, vec![draft(Some("zzz"), "General", 10)]);
        assert!(plan.kept.is_empty());
        assert_eq!(plan.added.len(), 1);
        assert_eq!(plan.removed, vec!["a".to_string()]);
    }
}
