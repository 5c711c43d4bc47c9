use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::models::{FilterCriteria, PriceRange};

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

/// Catalog filters; any field given replaces the session's current value.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilterQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl EventFilterQuery {
    pub fn has_filters(&self) -> bool {
        self.q.is_some()
            || self.category.is_some()
            || self.location.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
    }

    pub fn merge_into(&self, mut current: FilterCriteria) -> FilterCriteria {
        if let Some(q) = &self.q {
            current.search_query = q.clone();
        }
        if let Some(category) = &self.category {
            current.selected_category = category.clone();
        }
        if let Some(location) = &self.location {
            current.selected_location = location.clone();
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            current.price_range = PriceRange::new(
                self.min_price.unwrap_or(current.price_range.min),
                self.max_price.unwrap_or(current.price_range.max),
            );
        }
        current
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
