use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{CheckoutInfo, Purchase, PurchaseUpdate},
    storage::{self, LocalStorage, PURCHASE_STORAGE_KEY},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseSnapshot {
    pub purchases: Vec<Purchase>,
    pub user_info: Option<CheckoutInfo>,
}

/// Append-only purchase history plus the last checkout contact form.
pub struct PurchaseStore {
    purchases: Vec<Purchase>,
    user_info: Option<CheckoutInfo>,
    storage: Arc<dyn LocalStorage>,
}

impl PurchaseStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            purchases: Vec::new(),
            user_info: None,
            storage,
        }
    }

    pub fn restore(storage: Arc<dyn LocalStorage>) -> Self {
        let snapshot: PurchaseSnapshot =
            storage::restore(storage.as_ref(), PURCHASE_STORAGE_KEY).unwrap_or_default();
        Self {
            purchases: snapshot.purchases,
            user_info: snapshot.user_info,
            storage,
        }
    }

    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }

    pub fn user_info(&self) -> Option<&CheckoutInfo> {
        self.user_info.as_ref()
    }

    pub fn add_purchase(&mut self, purchase: Purchase) {
        tracing::debug!(purchase_id = %purchase.id, order_id = %purchase.order_id, "purchase recorded");
        self.purchases.push(purchase);
        self.persist();
    }

    /// Overwrites the given fields on the matching purchase. Totals are not
    /// recomputed. Returns whether a purchase matched.
    pub fn update_purchase(&mut self, id: Uuid, update: PurchaseUpdate) -> bool {
        let Some(purchase) = self.purchases.iter_mut().find(|p| p.id == id) else {
            tracing::debug!(purchase_id = %id, "update for unknown purchase ignored");
            return false;
        };
        update.apply(purchase);
        self.persist();
        true
    }

    pub fn get_user_purchases(&self, user_id: Uuid) -> Vec<Purchase> {
        self.purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn set_user_info(&mut self, info: CheckoutInfo) {
        self.user_info = Some(info);
        self.persist();
    }

    pub fn clear_user_info(&mut self) {
        self.user_info = None;
        self.persist();
    }

    fn persist(&self) {
        let snapshot = PurchaseSnapshot {
            purchases: self.purchases.clone(),
            user_info: self.user_info.clone(),
        };
        storage::persist(self.storage.as_ref(), PURCHASE_STORAGE_KEY, &snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::PurchaseStatus, storage::MemoryStorage};
    use chrono::Utc;

    fn purchase(user_id: Uuid, quantity: i32, price: i64) -> Purchase {
        let id = Uuid::new_v4();
        Purchase {
            id,
            user_id,
            event_id: "E1".into(),
            event_title: "Estéreo Picnic".into(),
            ticket_type_id: "T1".into(),
            ticket_type_name: "General".into(),
            quantity,
            price,
            total: price * i64::from(quantity),
            purchase_date: Utc::now(),
            status: PurchaseStatus::Pending,
            qr_code: format!("QR-{id}"),
            order_id: "ORD-1".into(),
        }
    }

    fn store() -> PurchaseStore {
        PurchaseStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn user_purchases_are_isolated() {
        let mut store = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_purchase(purchase(a, 1, 100));
        store.add_purchase(purchase(b, 2, 100));
        store.add_purchase(purchase(a, 3, 100));

        let for_a = store.get_user_purchases(a);
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|p| p.user_id == a));
        assert_eq!(store.get_user_purchases(b).len(), 1);
        assert!(store.get_user_purchases(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut store = store();
        let p = purchase(Uuid::new_v4(), 2, 100);
        let id = p.id;
        store.add_purchase(p);

        let matched = store.update_purchase(
            id,
            PurchaseUpdate {
                status: Some(PurchaseStatus::Completed),
                quantity: Some(5),
                ..PurchaseUpdate::default()
            },
        );
        assert!(matched);
        let updated = &store.purchases()[0];
        assert_eq!(updated.status, PurchaseStatus::Completed);
        assert_eq!(updated.quantity, 5);
        // total is left as it was
        assert_eq!(updated.total, 200);
    }

    #[test]
    fn update_of_unknown_purchase_is_ignored() {
        let mut store = store();
        store.add_purchase(purchase(Uuid::new_v4(), 1, 100));
        assert!(!store.update_purchase(Uuid::new_v4(), PurchaseUpdate::default()));
        assert_eq!(store.purchases().len(), 1);
    }

    #[test]
    fn user_info_is_stored_and_cleared() {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let mut store = PurchaseStore::new(storage.clone());
        let info = CheckoutInfo {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: "3001234567".into(),
            address: "Calle 1 # 2-3".into(),
        };
        store.set_user_info(info.clone());
        assert_eq!(PurchaseStore::restore(storage.clone()).user_info(), Some(&info));

        store.clear_user_info();
        assert!(store.user_info().is_none());
        assert!(PurchaseStore::restore(storage).user_info().is_none());
    }
}
