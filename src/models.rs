use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Category sentinel meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

pub const CATEGORIES: [&str; 8] = [
    "Música",
    "Tecnología",
    "Deportes",
    "Arte",
    "Gastronomía",
    "Negocios",
    "Educación",
    "Otros",
];

pub const DEFAULT_MAX_PRICE: i64 = 5_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    /// Maps a backend status string; anything unknown is treated as upcoming.
    pub fn from_backend(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("en_curso") | Some("ongoing") => EventStatus::Ongoing,
            Some("finalizado") | Some("completed") => EventStatus::Completed,
            Some("cancelado") | Some("cancelled") => EventStatus::Cancelled,
            _ => EventStatus::Upcoming,
        }
    }

    pub fn as_backend(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "proximo",
            EventStatus::Ongoing => "en_curso",
            EventStatus::Completed => "finalizado",
            EventStatus::Cancelled => "cancelado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TicketType {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub description: String,
    pub max_quantity: i32,
    pub available: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub category: String,
    pub price: i64,
    pub max_attendees: i32,
    pub current_attendees: i32,
    pub organizer_id: String,
    pub organizer_name: String,
    pub status: EventStatus,
    pub tags: Vec<String>,
    pub ticket_types: Vec<TicketType>,
}

impl Event {
    pub fn ticket_type(&self, ticket_type_id: &str) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.id == ticket_type_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub event_id: String,
    pub ticket_type_id: String,
    pub quantity: i32,
    pub price: i64,
    pub event_title: String,
    pub ticket_type_name: String,
}

impl CartItem {
    pub fn matches(&self, event_id: &str, ticket_type_id: &str) -> bool {
        self.event_id == event_id && self.ticket_type_id == ticket_type_id
    }

    pub fn subtotal(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

/// A cart line as submitted by "add to cart"; quantity defaults to 1.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCartItem {
    pub event_id: String,
    pub ticket_type_id: String,
    pub price: i64,
    pub event_title: String,
    pub ticket_type_name: String,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: String,
    pub event_title: String,
    pub ticket_type_id: String,
    pub ticket_type_name: String,
    pub quantity: i32,
    pub price: i64,
    pub total: i64,
    pub purchase_date: DateTime<Utc>,
    pub status: PurchaseStatus,
    pub qr_code: String,
    pub order_id: String,
}

/// Partial overwrite of a purchase; fields are applied as given.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PurchaseUpdate {
    pub quantity: Option<i32>,
    pub price: Option<i64>,
    pub total: Option<i64>,
    pub status: Option<PurchaseStatus>,
    pub qr_code: Option<String>,
}

impl PurchaseUpdate {
    pub fn apply(self, purchase: &mut Purchase) {
        if let Some(quantity) = self.quantity {
            purchase.quantity = quantity;
        }
        if let Some(price) = self.price {
            purchase.price = price;
        }
        if let Some(total) = self.total {
            purchase.total = total;
        }
        if let Some(status) = self.status {
            purchase.status = status;
        }
        if let Some(qr_code) = self.qr_code {
            purchase.qr_code = qr_code;
        }
    }
}

/// Contact details entered on the checkout form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Organizer,
    Attendee,
}

impl Role {
    /// Backend role strings are Spanish; English names map to themselves.
    /// Unrecognized values fall back to attendee.
    pub fn from_backend(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "administrador" | "admin" => Role::Admin,
            "organizador" | "organizer" => Role::Organizer,
            "asistente" | "attendee" => Role::Attendee,
            _ => Role::Attendee,
        }
    }

    pub fn as_backend(&self) -> &'static str {
        match self {
            Role::Admin => "administrador",
            Role::Organizer => "organizador",
            Role::Attendee => "asistente",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserPreferences {
    pub favorite_categories: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub preferences: Option<UserPreferences>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<UserPreferences>,
}

impl ProfileUpdate {
    pub fn merge_into(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(avatar) = self.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(preferences) = self.preferences {
            user.preferences = Some(preferences);
        }
    }
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

impl PriceRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, price: i64) -> bool {
        price >= self.min && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilterCriteria {
    pub search_query: String,
    pub selected_category: String,
    pub selected_location: String,
    pub price_range: PriceRange,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            selected_category: ALL_CATEGORIES.to_string(),
            selected_location: String::new(),
            price_range: PriceRange::default(),
        }
    }
}

impl FilterCriteria {
    /// All four predicates must hold.
    pub fn matches(&self, event: &Event) -> bool {
        let query = self.search_query.to_lowercase();
        let matches_search = event.title.to_lowercase().contains(&query)
            || event.description.to_lowercase().contains(&query);

        let matches_category = self.selected_category == ALL_CATEGORIES
            || event.category == self.selected_category;

        let location = self.selected_location.to_lowercase();
        let matches_location =
            location.is_empty() || event.location.to_lowercase().contains(&location);

        matches_search && matches_category && matches_location && self.price_range.contains(event.price)
    }
}
