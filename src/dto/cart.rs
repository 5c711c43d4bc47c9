use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Price and display names are resolved from the catalog, never the client.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub event_id: String,
    pub ticket_type_id: String,
    pub quantity: Option<i32>,
}
