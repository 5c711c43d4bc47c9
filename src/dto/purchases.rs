use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CheckoutInfo, Purchase};

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseList {
    pub items: Vec<Purchase>,
    pub user_info: Option<CheckoutInfo>,
}
