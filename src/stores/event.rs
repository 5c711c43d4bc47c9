//! Event catalog cache, active filters, and the derived filtered/featured views.
//!
//! Loads are fenced: each call to [`EventStore::load_events`] or
//! [`EventStore::load_featured_events`] takes a fresh token, and a result that
//! arrives after a newer load of the same kind has started is dropped.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::{
    models::{Event, EventStatus, FilterCriteria, PriceRange, TicketType},
    services::event_service::{EventQuery, EventRecord, EventService, TicketTypeRecord},
};

pub const LOAD_ERROR: &str = "No se pudieron cargar los eventos";
pub const FEATURED_LIMIT: usize = 3;

const PLACEHOLDER_IMAGE: &str = "https://images.unsplash.com/photo-1501281668745-f7f57925c3b4";
const DEFAULT_TIME: &str = "00:00";
const DEFAULT_LOCATION: &str = "Por definir";
const DEFAULT_CATEGORY: &str = "Otros";
const DEFAULT_CAPACITY: i32 = 100;
const DEFAULT_ORGANIZER: &str = "Organizador";

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct EventState {
    pub events: Vec<Event>,
    pub filtered_events: Vec<Event>,
    pub featured_events: Vec<Event>,
    pub filters: FilterCriteria,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pending_events: Option<u64>,
    #[serde(skip)]
    pending_featured: Option<u64>,
}

impl EventState {
    pub fn filter_events(&mut self) {
        self.filtered_events = self
            .events
            .iter()
            .filter(|e| self.filters.matches(e))
            .cloned()
            .collect();
    }

    fn refresh_loading(&mut self) {
        self.loading = self.pending_events.is_some() || self.pending_featured.is_some();
    }
}

pub struct EventStore {
    service: Arc<dyn EventService>,
    state: RwLock<EventState>,
    next_token: AtomicU64,
}

impl EventStore {
    pub fn new(service: Arc<dyn EventService>) -> Self {
        Self {
            service,
            state: RwLock::new(EventState::default()),
            next_token: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> EventState {
        self.state.read().await.clone()
    }

    pub async fn filtered_events(&self) -> Vec<Event> {
        self.state.read().await.filtered_events.clone()
    }

    pub async fn featured_events(&self) -> Vec<Event> {
        self.state.read().await.featured_events.clone()
    }

    pub async fn filters(&self) -> FilterCriteria {
        self.state.read().await.filters.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        !self.state.read().await.events.is_empty()
    }

    pub async fn set_search_query(&self, query: impl Into<String>) {
        let mut state = self.state.write().await;
        state.filters.search_query = query.into();
        state.filter_events();
    }

    pub async fn set_selected_category(&self, category: impl Into<String>) {
        let mut state = self.state.write().await;
        state.filters.selected_category = category.into();
        state.filter_events();
    }

    pub async fn set_selected_location(&self, location: impl Into<String>) {
        let mut state = self.state.write().await;
        state.filters.selected_location = location.into();
        state.filter_events();
    }

    pub async fn set_price_range(&self, range: PriceRange) {
        let mut state = self.state.write().await;
        state.filters.price_range = range;
        state.filter_events();
    }

    /// Replaces all four criteria and recomputes once.
    pub async fn set_filters(&self, filters: FilterCriteria) {
        let mut state = self.state.write().await;
        state.filters = filters;
        state.filter_events();
    }

    pub async fn filter_events(&self) {
        self.state.write().await.filter_events();
    }

    pub async fn get_event_by_id(&self, id: &str) -> Option<Event> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .chain(state.featured_events.iter())
            .find(|e| e.id == id)
            .cloned()
    }

    /// Hydrates the catalog. Failures and empty results fall back to the
    /// sample catalog; filters are not reapplied.
    pub async fn load_events(&self) {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write().await;
            state.pending_events = Some(token);
            state.error = None;
            state.refresh_loading();
        }

        let outcome = self.service.list(&EventQuery::default()).await;

        let mut state = self.state.write().await;
        if state.pending_events != Some(token) {
            tracing::debug!(token, "discarding stale event load");
            return;
        }
        let events = match outcome {
            Ok(records) if !records.is_empty() => {
                records.into_iter().map(Event::from).collect()
            }
            Ok(_) => {
                tracing::info!("event service returned no events, using sample catalog");
                sample_events()
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load events");
                state.error = Some(LOAD_ERROR.to_string());
                sample_events()
            }
        };
        tracing::debug!(count = events.len(), "events loaded");
        state.filtered_events = events.clone();
        state.events = events;
        state.pending_events = None;
        state.refresh_loading();
    }

    /// Hydrates `featured_events` with the first three results.
    pub async fn load_featured_events(&self) {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write().await;
            state.pending_featured = Some(token);
            state.error = None;
            state.refresh_loading();
        }

        let query = EventQuery {
            limit: Some(FEATURED_LIMIT as u64),
            ..EventQuery::default()
        };
        let outcome = self.service.list(&query).await;

        let mut state = self.state.write().await;
        if state.pending_featured != Some(token) {
            tracing::debug!(token, "discarding stale featured load");
            return;
        }
        let mut featured: Vec<Event> = match outcome {
            Ok(records) if !records.is_empty() => {
                records.into_iter().map(Event::from).collect()
            }
            Ok(_) => sample_events(),
            Err(err) => {
                tracing::error!(error = %err, "failed to load featured events");
                state.error = Some(LOAD_ERROR.to_string());
                sample_events()
            }
        };
        featured.truncate(FEATURED_LIMIT);
        state.featured_events = featured;
        state.pending_featured = None;
        state.refresh_loading();
    }
}

impl From<TicketTypeRecord> for TicketType {
    fn from(record: TicketTypeRecord) -> Self {
        TicketType {
            id: record.id,
            name: record.nombre,
            price: record.precio,
            description: record.descripcion.unwrap_or_default(),
            max_quantity: record.cantidad_maxima,
            available: record.cantidad_disponible,
        }
    }
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        let price = record.precio.unwrap_or(0);
        let max_attendees = record.capacidad_maxima.unwrap_or(DEFAULT_CAPACITY);
        let mut ticket_types: Vec<TicketType> =
            record.tipos_entrada.into_iter().map(TicketType::from).collect();
        if ticket_types.is_empty() {
            ticket_types.push(TicketType {
                id: format!("{}-general", record.id),
                name: "General".to_string(),
                price,
                description: "Entrada general".to_string(),
                max_quantity: max_attendees,
                available: max_attendees,
            });
        }

        Event {
            id: record.id,
            title: record.titulo,
            description: record.descripcion.unwrap_or_default(),
            image: record
                .imagen_url
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            date: record.fecha_evento,
            time: record.hora_evento.unwrap_or_else(|| DEFAULT_TIME.to_string()),
            location: record
                .ubicacion
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            category: record
                .categoria
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            price,
            max_attendees,
            current_attendees: record.asistentes_actuales.unwrap_or(0),
            organizer_id: record.organizador_id,
            organizer_name: record
                .organizador_nombre
                .unwrap_or_else(|| DEFAULT_ORGANIZER.to_string()),
            status: EventStatus::from_backend(record.estado.as_deref()),
            tags: record.etiquetas,
            ticket_types,
        }
    }
}

fn ticket(id: &str, name: &str, price: i64, description: &str, max: i32, available: i32) -> TicketType {
    TicketType {
        id: id.to_string(),
        name: name.to_string(),
        price,
        description: description.to_string(),
        max_quantity: max,
        available,
    }
}

/// Built-in demonstration catalog shown when the backend has nothing to offer.
pub fn sample_events() -> Vec<Event> {
    vec![
        Event {
            id: "1".into(),
            title: "Festival Estéreo Picnic".into(),
            description: "Tres días de música en vivo con artistas nacionales e internacionales."
                .into(),
            image: "https://images.unsplash.com/photo-1459749411175-04bf5292ceea".into(),
            date: "2026-03-20".into(),
            time: "14:00".into(),
            location: "Parque Simón Bolívar, Bogotá".into(),
            category: "Música".into(),
            price: 350_000,
            max_attendees: 50_000,
            current_attendees: 32_000,
            organizer_id: "org-1".into(),
            organizer_name: "Páramo Presenta".into(),
            status: EventStatus::Upcoming,
            tags: vec!["festival".into(), "rock".into(), "pop".into()],
            ticket_types: vec![
                ticket("1-general", "General", 350_000, "Acceso general los tres días", 40_000, 12_000),
                ticket("1-vip", "VIP", 900_000, "Zona preferencial y bar exclusivo", 10_000, 6_000),
            ],
        },
        Event {
            id: "2".into(),
            title: "Colombia Tech Summit".into(),
            description: "Conferencias y talleres sobre inteligencia artificial, nube y startups."
                .into(),
            image: "https://images.unsplash.com/photo-1540575467063-178a50c2df87".into(),
            date: "2026-05-14".into(),
            time: "08:30".into(),
            location: "Plaza Mayor, Medellín".into(),
            category: "Tecnología".into(),
            price: 180_000,
            max_attendees: 3_000,
            current_attendees: 1_250,
            organizer_id: "org-2".into(),
            organizer_name: "Ruta N".into(),
            status: EventStatus::Upcoming,
            tags: vec!["tecnología".into(), "ia".into(), "startups".into()],
            ticket_types: vec![
                ticket("2-general", "General", 180_000, "Acceso a conferencias", 2_500, 1_300),
                ticket("2-taller", "Taller + Conferencias", 320_000, "Incluye talleres prácticos", 500, 450),
            ],
        },
        Event {
            id: "3".into(),
            title: "Festival Gastronómico del Pacífico".into(),
            description: "Cocina tradicional del Pacífico colombiano con chefs invitados.".into(),
            image: "https://images.unsplash.com/photo-1555939594-58d7cb561ad1".into(),
            date: "2026-08-08".into(),
            time: "11:00".into(),
            location: "Bulevar del Río, Cali".into(),
            category: "Gastronomía".into(),
            price: 60_000,
            max_attendees: 5_000,
            current_attendees: 900,
            organizer_id: "org-3".into(),
            organizer_name: "Sabores de Cali".into(),
            status: EventStatus::Upcoming,
            tags: vec!["comida".into(), "cultura".into()],
            ticket_types: vec![ticket(
                "3-general",
                "General",
                60_000,
                "Incluye degustación de bienvenida",
                5_000,
                4_100,
            )],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{AppError, AppResult},
        models::ALL_CATEGORIES,
        services::{
            event_service::{EventDraft, NewEvent},
            memory::InMemoryEventService,
        },
    };
    use async_trait::async_trait;
    use uuid::Uuid;
    use tokio::sync::{Mutex, oneshot};

    fn record(id: &str, titulo: &str, categoria: &str, ubicacion: &str, precio: i64) -> EventRecord {
        EventRecord {
            id: id.into(),
            titulo: titulo.into(),
            descripcion: Some(format!("Descripción de {titulo}")),
            fecha_evento: "2026-10-01".into(),
            ubicacion: Some(ubicacion.into()),
            categoria: Some(categoria.into()),
            precio: Some(precio),
            organizador_id: "org".into(),
            ..EventRecord::default()
        }
    }

    fn catalog() -> Vec<EventRecord> {
        vec![
            record("a", "Concierto Sinfónico", "Música", "Teatro Colón, Bogotá", 90_000),
            record("b", "Hackatón Bogotá", "Tecnología", "Bogotá", 0),
            record("c", "Salsa al Parque", "Música", "Cali", 40_000),
            record("d", "Meetup Rust", "Tecnología", "Medellín", 20_000),
        ]
    }

    async fn loaded_store() -> EventStore {
        let store = EventStore::new(Arc::new(InMemoryEventService::new(catalog())));
        store.load_events().await;
        store
    }

    #[tokio::test]
    async fn load_maps_records_and_sets_both_lists() {
        let store = loaded_store().await;
        let state = store.snapshot().await;
        assert_eq!(state.events.len(), 4);
        assert_eq!(state.filtered_events, state.events);
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.events[0].title, "Concierto Sinfónico");
    }

    #[tokio::test]
    async fn failure_falls_back_to_samples_with_error() {
        let service = Arc::new(InMemoryEventService::new(catalog()));
        service.set_failing(true);
        let store = EventStore::new(service);
        store.load_events().await;

        let state = store.snapshot().await;
        assert_eq!(state.events, sample_events());
        assert_eq!(state.filtered_events.len(), 3);
        assert_eq!(state.error.as_deref(), Some(LOAD_ERROR));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn empty_result_falls_back_to_samples() {
        let store = EventStore::new(Arc::new(InMemoryEventService::new(vec![])));
        store.load_events().await;
        let state = store.snapshot().await;
        assert_eq!(state.events.len(), 3);
        assert_eq!(state.filtered_events.len(), 3);
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn featured_takes_first_three_without_touching_catalog() {
        let store = EventStore::new(Arc::new(InMemoryEventService::new(catalog())));
        store.load_featured_events().await;
        let state = store.snapshot().await;
        assert_eq!(
            state.featured_events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(state.events.is_empty());
        assert!(state.filtered_events.is_empty());
    }

    #[tokio::test]
    async fn category_filter_wins_over_search_matching_both() {
        let store = loaded_store().await;
        store.set_search_query("o").await;
        store.set_selected_category("Música").await;
        let filtered = store.filtered_events().await;
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|e| e.category == "Música"));
    }

    #[tokio::test]
    async fn filtered_is_exactly_the_conjunction() {
        let store = loaded_store().await;
        store.set_selected_location("bogotá").await;
        store.set_price_range(PriceRange::new(0, 50_000)).await;
        let ids: Vec<String> = store.filtered_events().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["b".to_string()]);

        store.set_selected_category(ALL_CATEGORIES).await;
        store.set_selected_location("").await;
        store.set_price_range(PriceRange::default()).await;
        store.set_search_query("RUST").await;
        let ids: Vec<String> = store.filtered_events().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["d".to_string()]);
    }

    #[tokio::test]
    async fn reload_does_not_reapply_filters() {
        let store = loaded_store().await;
        store.set_selected_category("Tecnología").await;
        assert_eq!(store.filtered_events().await.len(), 2);
        store.load_events().await;
        assert_eq!(store.filtered_events().await.len(), 4);
    }

    #[tokio::test]
    async fn missing_event_is_none() {
        let store = loaded_store().await;
        assert!(store.get_event_by_id("zzz").await.is_none());
        assert_eq!(store.get_event_by_id("c").await.unwrap().title, "Salsa al Parque");
    }

    #[test]
    fn mapping_applies_defaults() {
        let event = Event::from(EventRecord {
            id: "x".into(),
            titulo: "Sin datos".into(),
            fecha_evento: "2026-01-01".into(),
            organizador_id: "o".into(),
            ..EventRecord::default()
        });
        assert_eq!(event.price, 0);
        assert_eq!(event.max_attendees, 100);
        assert_eq!(event.current_attendees, 0);
        assert_eq!(event.location, "Por definir");
        assert_eq!(event.category, "Otros");
        assert_eq!(event.time, "00:00");
        assert_eq!(event.status, EventStatus::Upcoming);
        assert_eq!(event.ticket_types.len(), 1);
        assert_eq!(event.ticket_types[0].available, 100);
    }

    /// Holds the first `list` call until released; later calls answer at once.
    struct GatedService {
        calls: AtomicU64,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl EventService for GatedService {
        async fn list(&self, _query: &EventQuery) -> AppResult<Vec<EventRecord>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                let rx = self.gate.lock().await.take().expect("gate");
                let _ = rx.await;
                return Ok(vec![record("old", "Respuesta vieja", "Música", "Cali", 1)]);
            }
            Ok(vec![record("new", "Respuesta nueva", "Música", "Cali", 1)])
        }
        async fn get_by_id(&self, _id: &str) -> AppResult<Option<EventRecord>> {
            Ok(None)
        }
        async fn create(&self, _data: NewEvent) -> AppResult<EventRecord> {
            Err(AppError::Forbidden)
        }
        async fn update(&self, _id: &str, _data: EventDraft, _actor_id: Uuid) -> AppResult<EventRecord> {
            Err(AppError::Forbidden)
        }
        async fn delete(&self, _id: &str, _actor_id: Uuid) -> AppResult<()> {
            Err(AppError::Forbidden)
        }
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let (tx, rx) = oneshot::channel();
        let service = Arc::new(GatedService {
            calls: AtomicU64::new(0),
            gate: Mutex::new(Some(rx)),
        });
        let store = Arc::new(EventStore::new(service.clone()));

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.load_events().await })
        };
        // Wait until the slow load is parked inside the service.
        while service.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        store.load_events().await;
        assert_eq!(store.snapshot().await.events[0].id, "new");
        assert!(!store.snapshot().await.loading);

        tx.send(()).unwrap();
        slow.await.unwrap();
        let state = store.snapshot().await;
        assert_eq!(state.events[0].id, "new");
        assert!(!state.loading);
    }
}
