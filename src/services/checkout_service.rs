use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CartItem, CheckoutInfo, Purchase, PurchaseStatus},
    session::Session,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub total: i64,
    pub purchases: Vec<Purchase>,
}

/// Turns the session's cart into completed purchases.
pub async fn checkout(session: &Session, info: CheckoutInfo) -> AppResult<CheckoutReceipt> {
    validate_contact(&info)?;

    let user_id = {
        let auth = session.auth.lock().await;
        auth.user()
            .map(|u| u.id)
            .ok_or_else(|| AppError::Unauthorized("Debes iniciar sesión".to_string()))?
    };

    let mut cart = session.cart.lock().await;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    if !session.events.is_loaded().await {
        session.events.load_events().await;
    }
    let mut lines = Vec::with_capacity(cart.items().len());
    for item in cart.items() {
        lines.push(check_availability(session, item).await?);
    }

    let order_id = build_order_id(Uuid::new_v4());
    let purchase_date = Utc::now();
    let purchases: Vec<Purchase> = lines
        .iter()
        .map(|item| {
            let id = Uuid::new_v4();
            Purchase {
                id,
                user_id,
                event_id: item.event_id.clone(),
                event_title: item.event_title.clone(),
                ticket_type_id: item.ticket_type_id.clone(),
                ticket_type_name: item.ticket_type_name.clone(),
                quantity: item.quantity,
                price: item.price,
                total: item.subtotal(),
                purchase_date,
                status: PurchaseStatus::Completed,
                qr_code: qr_payload(&order_id, id, item),
                order_id: order_id.clone(),
            }
        })
        .collect();
    let total = purchases.iter().map(|p| p.total).sum();

    {
        let mut store = session.purchases.lock().await;
        for purchase in &purchases {
            store.add_purchase(purchase.clone());
        }
        store.set_user_info(info);
    }
    cart.clear_cart();

    tracing::info!(%user_id, %order_id, total, lines = purchases.len(), "checkout completed");
    Ok(CheckoutReceipt {
        order_id,
        total,
        purchases,
    })
}

fn validate_contact(info: &CheckoutInfo) -> AppResult<()> {
    let missing = [
        ("name", &info.name),
        ("email", &info.email),
        ("phone", &info.phone),
        ("address", &info.address),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());
    if let Some((field, _)) = missing {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    if !info.email.contains('@') {
        return Err(AppError::BadRequest("email is invalid".into()));
    }
    Ok(())
}

/// Returns the line as the catalog prices and names it.
async fn check_availability(session: &Session, item: &CartItem) -> AppResult<CartItem> {
    let event = session
        .events
        .get_event_by_id(&item.event_id)
        .await
        .ok_or_else(|| AppError::BadRequest(format!("Evento no disponible: {}", item.event_title)))?;
    let ticket = event.ticket_type(&item.ticket_type_id).ok_or_else(|| {
        AppError::BadRequest(format!("Tipo de entrada no disponible: {}", item.ticket_type_name))
    })?;
    if item.quantity > ticket.available {
        return Err(AppError::BadRequest(format!(
            "Solo quedan {} entradas {} para {}",
            ticket.available, ticket.name, event.title
        )));
    }
    if item.price != ticket.price {
        return Err(AppError::BadRequest(format!(
            "El precio de {} cambió, actualiza tu carrito",
            ticket.name
        )));
    }
    Ok(CartItem {
        event_title: event.title.clone(),
        ticket_type_name: ticket.name.clone(),
        price: ticket.price,
        ..item.clone()
    })
}

fn build_order_id(id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = id.to_string();
    format!("ORD-{}-{}", date, &suffix[..8])
}

fn qr_payload(order_id: &str, purchase_id: Uuid, item: &CartItem) -> String {
    format!(
        "EVENTHUB|{}|{}|{}|{}|{}",
        order_id, purchase_id, item.event_id, item.ticket_type_id, item.quantity
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_has_date_and_short_suffix() {
        let id = Uuid::new_v4();
        let order = build_order_id(id);
        assert!(order.starts_with("ORD-"));
        assert!(order.ends_with(&id.to_string()[..8]));
        assert_eq!(order.len(), "ORD-".len() + 8 + 1 + 8);
    }

    #[test]
    fn contact_fields_are_required() {
        let mut info = CheckoutInfo {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: "3001234567".into(),
            address: "Cra 7 # 32-16".into(),
        };
        assert!(validate_contact(&info).is_ok());
        info.phone = "  ".into();
        assert!(validate_contact(&info).is_err());
        info.phone = "300".into();
        info.email = "sin-arroba".into();
        assert!(validate_contact(&info).is_err());
    }
}
