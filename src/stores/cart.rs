use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{CartItem, NewCartItem},
    storage::{self, CART_STORAGE_KEY, LocalStorage},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total: i64,
}

/// Shopping-cart lines for one session, at most one per (event, ticket type).
pub struct CartStore {
    items: Vec<CartItem>,
    total: i64,
    storage: Arc<dyn LocalStorage>,
}

impl CartStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            storage,
        }
    }

    /// Opens the store from its persisted snapshot, if any.
    pub fn restore(storage: Arc<dyn LocalStorage>) -> Self {
        let snapshot: CartSnapshot =
            storage::restore(storage.as_ref(), CART_STORAGE_KEY).unwrap_or_default();
        let mut store = Self {
            items: snapshot.items,
            total: 0,
            storage,
        };
        store.calculate_total();
        store
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total: self.total,
        }
    }

    pub fn add_item(&mut self, item: NewCartItem) {
        let quantity = item.quantity.unwrap_or(1);
        let existing = self
            .items
            .iter()
            .find(|i| i.matches(&item.event_id, &item.ticket_type_id))
            .map(|i| i.quantity);

        match existing {
            Some(current) => {
                self.update_quantity(&item.event_id, &item.ticket_type_id, current + quantity);
                return;
            }
            None => self.items.push(CartItem {
                event_id: item.event_id,
                ticket_type_id: item.ticket_type_id,
                quantity,
                price: item.price,
                event_title: item.event_title,
                ticket_type_name: item.ticket_type_name,
            }),
        }
        self.calculate_total();
        self.persist();
    }

    pub fn remove_item(&mut self, event_id: &str, ticket_type_id: &str) {
        self.items.retain(|i| !i.matches(event_id, ticket_type_id));
        self.calculate_total();
        self.persist();
    }

    /// A quantity of zero or less removes the line.
    pub fn update_quantity(&mut self, event_id: &str, ticket_type_id: &str, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(event_id, ticket_type_id);
            return;
        }
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.matches(event_id, ticket_type_id))
        {
            item.quantity = quantity;
        }
        self.calculate_total();
        self.persist();
    }

    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.total = 0;
        self.persist();
    }

    pub fn calculate_total(&mut self) -> i64 {
        self.total = self.items.iter().map(CartItem::subtotal).sum();
        self.total
    }

    fn persist(&self) {
        storage::persist(self.storage.as_ref(), CART_STORAGE_KEY, &self.snapshot());
    }
}
