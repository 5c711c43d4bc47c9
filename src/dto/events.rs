use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Event, FilterCriteria};

#[derive(Debug, Serialize, ToSchema)]
pub struct EventList {
    pub items: Vec<Event>,
    pub filters: FilterCriteria,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FeaturedQuery {
    pub refresh: Option<bool>,
}
