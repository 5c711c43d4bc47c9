use std::{sync::Arc, time::Duration};

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use eventhub::{
    config::OAuthConfig,
    dto::{
        auth::{LoginRequest, UpdateRoleRequest},
        cart::{AddToCartRequest, UpdateQuantityRequest},
        events::FeaturedQuery,
    },
    error::AppError,
    middleware::session::SessionCtx,
    models::{CheckoutInfo, NewCartItem, PurchaseStatus, PurchaseUpdate, Role},
    routes::{admin, auth, cart, checkout, events, params::EventFilterQuery, purchases},
    services::{
        Collaborators,
        event_service::{EventDraft, TicketTypeDraft},
        memory::{EventWrite, InMemoryEventService, InMemoryUserService},
        oauth_service::RedirectOAuthService,
    },
    session::StorageBackend,
    state::AppState,
};
use uuid::Uuid;

struct Harness {
    state: AppState,
    users: Arc<InMemoryUserService>,
    events: Arc<InMemoryEventService>,
}

fn harness() -> Harness {
    harness_with(StorageBackend::Memory, Arc::new(InMemoryUserService::new()))
}

fn harness_with(backend: StorageBackend, users: Arc<InMemoryUserService>) -> Harness {
    let events = Arc::new(InMemoryEventService::new(vec![]));
    let collaborators = Collaborators {
        events: events.clone(),
        users: users.clone(),
        oauth: Arc::new(RedirectOAuthService::new(OAuthConfig {
            google_client_id: Some("google-client".into()),
            facebook_client_id: None,
            redirect_url: "http://localhost:3000/auth/callback".into(),
        })),
    };
    let state = AppState::new(collaborators, backend, "test-secret", Duration::from_secs(1));
    Harness {
        state,
        users,
        events,
    }
}

async fn signed_in(h: &Harness, email: &str, rol: &str) -> anyhow::Result<SessionCtx> {
    h.users.insert(email, "secret123", "Usuario", rol).await;
    let ctx = SessionCtx(h.state.sessions.create().await?);
    auth::login(
        ctx.clone(),
        Json(LoginRequest {
            email: email.into(),
            password: "secret123".into(),
        }),
    )
    .await?;
    Ok(ctx)
}

fn line(event_id: &str, ticket_type_id: &str, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        event_id: event_id.into(),
        ticket_type_id: ticket_type_id.into(),
        quantity: Some(quantity),
    }
}

fn contact() -> CheckoutInfo {
    CheckoutInfo {
        name: "Ana Pérez".into(),
        email: "ana@example.com".into(),
        phone: "3001234567".into(),
        address: "Cra 7 # 32-16".into(),
    }
}

// Attendee browses, fills the cart, checks out and manages the resulting tickets.
#[tokio::test]
async fn cart_checkout_and_purchase_flow() -> anyhow::Result<()> {
    let h = harness();
    let ctx = signed_in(&h, "ana@example.com", "asistente").await?;

    let event = events::get_event(State(h.state.clone()), ctx.clone(), Path("1".into()))
        .await?
        .0
        .data
        .expect("event");
    let general = event.ticket_type("1-general").expect("ticket type").clone();

    cart::add_to_cart(ctx.clone(), Json(line("1", "1-general", 1))).await?;
    cart::add_to_cart(ctx.clone(), Json(line("1", "1-general", 1))).await?;
    let snapshot = cart::add_to_cart(ctx.clone(), Json(line("2", "2-taller", 1)))
        .await?
        .0
        .data
        .expect("cart");
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.items[0].quantity, 2);
    assert_eq!(snapshot.total, general.price * 2 + 320_000);

    let sold_out = cart::add_to_cart(ctx.clone(), Json(line("2", "2-taller", 450))).await;
    assert!(matches!(sold_out, Err(AppError::BadRequest(_))));

    let snapshot = cart::update_quantity(
        ctx.clone(),
        Path(("2".into(), "2-taller".into())),
        Json(UpdateQuantityRequest { quantity: 0 }),
    )
    .await
    .0
    .data
    .expect("cart");
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.total, general.price * 2);

    let receipt = checkout::checkout(ctx.clone(), Json(contact()))
        .await?
        .1
        .0
        .data
        .expect("receipt");
    assert!(receipt.order_id.starts_with("ORD-"));
    assert_eq!(receipt.total, general.price * 2);
    assert_eq!(receipt.purchases.len(), 1);
    assert!(receipt.purchases[0].qr_code.starts_with("EVENTHUB|"));

    let cart_after = cart::get_cart(ctx.clone()).await.0.data.expect("cart");
    assert!(cart_after.items.is_empty());
    assert_eq!(cart_after.total, 0);

    let list = purchases::list_purchases(ctx.clone()).await?.0.data.expect("purchases");
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.user_info, Some(contact()));

    let purchase_id = list.items[0].id;
    let updated = purchases::update_purchase(
        ctx.clone(),
        Path(purchase_id),
        Json(PurchaseUpdate {
            status: Some(PurchaseStatus::Cancelled),
            ..PurchaseUpdate::default()
        }),
    )
    .await?
    .0
    .data
    .expect("purchase");
    assert_eq!(updated.status, PurchaseStatus::Cancelled);
    assert_eq!(updated.total, general.price * 2);

    let missing = purchases::update_purchase(
        ctx.clone(),
        Path(Uuid::new_v4()),
        Json(PurchaseUpdate::default()),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    purchases::clear_user_info(ctx.clone()).await;
    let list = purchases::list_purchases(ctx).await?.0.data.expect("purchases");
    assert_eq!(list.user_info, None);
    Ok(())
}

#[tokio::test]
async fn checkout_requires_login_and_items() -> anyhow::Result<()> {
    let h = harness();
    let anonymous = SessionCtx(h.state.sessions.create().await?);
    cart::add_to_cart(anonymous.clone(), Json(line("3", "3-general", 1))).await?;
    let result = checkout::checkout(anonymous.clone(), Json(contact())).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    // Cart survives a rejected checkout.
    assert!(!cart::get_cart(anonymous).await.0.data.expect("cart").items.is_empty());

    let ctx = signed_in(&h, "luis@example.com", "asistente").await?;
    let result = checkout::checkout(ctx, Json(contact())).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn cart_lines_are_priced_from_the_catalog() -> anyhow::Result<()> {
    let h = harness();
    let ctx = signed_in(&h, "vip@example.com", "asistente").await?;

    let snapshot = cart::add_to_cart(ctx.clone(), Json(line("1", "1-vip", 1)))
        .await?
        .0
        .data
        .expect("cart");
    let event = ctx.events.get_event_by_id("1").await.expect("event");
    assert_eq!(snapshot.items[0].price, 900_000);
    assert_eq!(snapshot.items[0].event_title, event.title);
    assert_eq!(snapshot.items[0].ticket_type_name, "VIP");

    // A line whose price no longer matches the catalog never reaches a purchase.
    ctx.cart.lock().await.add_item(NewCartItem {
        event_id: "1".into(),
        ticket_type_id: "1-general".into(),
        price: 1,
        event_title: "Gratis".into(),
        ticket_type_name: "General".into(),
        quantity: Some(3),
    });
    let result = checkout::checkout(ctx.clone(), Json(contact())).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    let list = purchases::list_purchases(ctx.clone()).await?.0.data.expect("purchases");
    assert!(list.items.is_empty());
    assert_eq!(cart::get_cart(ctx).await.0.data.expect("cart").items.len(), 2);
    Ok(())
}

#[tokio::test]
async fn restored_session_checks_out() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let users = Arc::new(InMemoryUserService::new());
    let session_id = {
        let h = harness_with(StorageBackend::Files(dir.path().into()), users.clone());
        let ctx = signed_in(&h, "vuelve@example.com", "asistente").await?;
        cart::add_to_cart(ctx.clone(), Json(line("3", "3-general", 2))).await?;
        ctx.id
    };

    let h = harness_with(StorageBackend::Files(dir.path().into()), users);
    let session = h.state.sessions.get(session_id).await?;
    assert!(!session.events.is_loaded().await);
    let receipt = checkout::checkout(SessionCtx(session), Json(contact()))
        .await?
        .1
        .0
        .data
        .expect("receipt");
    assert_eq!(receipt.total, 120_000);
    assert_eq!(receipt.purchases[0].ticket_type_name, "General");
    Ok(())
}

#[tokio::test]
async fn catalog_filters_are_per_session() -> anyhow::Result<()> {
    let h = harness();
    let a = SessionCtx(h.state.sessions.create().await?);
    let b = SessionCtx(h.state.sessions.create().await?);

    let filtered = events::list_events(
        a.clone(),
        Query(EventFilterQuery {
            category: Some("Tecnología".into()),
            ..EventFilterQuery::default()
        }),
    )
    .await
    .0
    .data
    .expect("events");
    assert!(filtered.items.iter().all(|e| e.category == "Tecnología"));
    assert_eq!(filtered.filters.selected_category, "Tecnología");

    let unfiltered = events::list_events(b.clone(), Query(EventFilterQuery::default()))
        .await
        .0
        .data
        .expect("events");
    assert_eq!(unfiltered.items.len(), 3);

    let far = events::list_events(
        b.clone(),
        Query(EventFilterQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..EventFilterQuery::default()
        }),
    )
    .await
    .0
    .data
    .expect("events");
    assert!(far.items.is_empty());

    let featured = events::featured_events(a, Query(FeaturedQuery::default()))
        .await
        .0
        .data
        .expect("featured");
    assert_eq!(featured.len(), 3);
    Ok(())
}

fn draft(title: &str) -> EventDraft {
    EventDraft {
        title: title.into(),
        description: None,
        image: None,
        date: NaiveDate::from_ymd_opt(2026, 11, 20).expect("date"),
        time: None,
        location: "Medellín".into(),
        category: "Arte".into(),
        price: 60_000,
        max_attendees: 200,
        status: None,
        tags: vec![],
        ticket_types: vec![],
    }
}

#[tokio::test]
async fn organizers_manage_only_their_events() -> anyhow::Result<()> {
    let h = harness();
    let owner = signed_in(&h, "org@example.com", "organizador").await?;
    let other = signed_in(&h, "otro@example.com", "organizador").await?;
    let attendee = signed_in(&h, "asis@example.com", "asistente").await?;

    let created = events::create_event(State(h.state.clone()), owner.clone(), Json(draft("Salón de Arte")))
        .await?
        .1
        .0
        .data
        .expect("event");
    assert_eq!(created.ticket_types.len(), 1);
    assert_eq!(created.ticket_types[0].name, "General");

    let denied = events::create_event(State(h.state.clone()), attendee, Json(draft("Intruso"))).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let denied = events::update_event(
        State(h.state.clone()),
        other.clone(),
        Path(created.id.clone()),
        Json(draft("Robado")),
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let updated = events::update_event(
        State(h.state.clone()),
        owner.clone(),
        Path(created.id.clone()),
        Json(draft("Salón de Arte 2026")),
    )
    .await?
    .0
    .data
    .expect("event");
    assert_eq!(updated.title, "Salón de Arte 2026");

    events::delete_event(State(h.state.clone()), owner.clone(), Path(created.id.clone())).await?;
    let gone = events::get_event(State(h.state.clone()), owner.clone(), Path(created.id.clone())).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    let owner_id = owner.auth.lock().await.user().expect("user").id;
    let writes: Vec<_> = h.events.writes().await;
    assert_eq!(
        writes,
        ["event_create", "event_update", "event_delete"]
            .into_iter()
            .map(|action| EventWrite {
                action,
                event_id: created.id.clone(),
                actor_id: owner_id,
            })
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[tokio::test]
async fn editing_an_event_keeps_ticket_ids_in_carts() -> anyhow::Result<()> {
    let h = harness();
    let owner = signed_in(&h, "sala@example.com", "organizador").await?;
    let attendee = signed_in(&h, "fan@example.com", "asistente").await?;

    let mut form = draft("Concierto de Cámara");
    form.ticket_types = vec![TicketTypeDraft {
        id: None,
        name: "Platea".into(),
        price: 80_000,
        description: None,
        max_quantity: 100,
    }];
    let created = events::create_event(State(h.state.clone()), owner.clone(), Json(form.clone()))
        .await?
        .1
        .0
        .data
        .expect("event");
    let ticket_id = created.ticket_types[0].id.clone();

    events::reload_events(attendee.clone()).await;
    cart::add_to_cart(attendee.clone(), Json(line(&created.id, &ticket_id, 2))).await?;
    checkout::checkout(attendee.clone(), Json(contact())).await?;

    form.ticket_types[0].id = Some(ticket_id.clone());
    form.ticket_types[0].description = Some("Filas 1 a 10".into());
    form.ticket_types[0].max_quantity = 120;
    let updated = events::update_event(
        State(h.state.clone()),
        owner,
        Path(created.id.clone()),
        Json(form),
    )
    .await?
    .0
    .data
    .expect("event");
    assert_eq!(updated.ticket_types.len(), 1);
    assert_eq!(updated.ticket_types[0].id, ticket_id);
    assert_eq!(updated.ticket_types[0].max_quantity, 120);

    events::reload_events(attendee.clone()).await;
    cart::add_to_cart(attendee.clone(), Json(line(&created.id, &ticket_id, 1))).await?;
    let receipt = checkout::checkout(attendee, Json(contact()))
        .await?
        .1
        .0
        .data
        .expect("receipt");
    assert_eq!(receipt.total, 80_000);
    Ok(())
}

#[tokio::test]
async fn only_admins_change_roles() -> anyhow::Result<()> {
    let h = harness();
    let target = h.users.insert("meta@example.com", "x", "Meta", "asistente").await;
    let admin = signed_in(&h, "admin@example.com", "administrador").await?;
    let attendee = signed_in(&h, "plain@example.com", "asistente").await?;

    let denied = admin::update_user_role(
        attendee,
        Path(target.id),
        Json(UpdateRoleRequest { role: Role::Organizer }),
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    admin::update_user_role(
        admin.clone(),
        Path(target.id),
        Json(UpdateRoleRequest { role: Role::Organizer }),
    )
    .await?;

    let ctx = SessionCtx(h.state.sessions.create().await?);
    let user = auth::login(
        ctx,
        Json(LoginRequest {
            email: "meta@example.com".into(),
            password: "x".into(),
        }),
    )
    .await?
    .0
    .data
    .expect("user");
    assert_eq!(user.role, Role::Organizer);

    let missing = admin::update_user_role(
        admin,
        Path(Uuid::new_v4()),
        Json(UpdateRoleRequest { role: Role::Admin }),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn oauth_redirect_uses_configured_provider() -> anyhow::Result<()> {
    use eventhub::services::oauth_service::OAuthProvider;

    let h = harness();
    let ctx = SessionCtx(h.state.sessions.create().await?);
    let redirect = auth::oauth_redirect(ctx.clone(), Path(OAuthProvider::Google))
        .await?
        .0
        .data
        .expect("redirect");
    assert!(redirect.url.starts_with("https://accounts.google.com/"));
    assert!(redirect.url.contains("client_id=google-client"));

    let unconfigured = auth::oauth_redirect(ctx, Path(OAuthProvider::Facebook)).await;
    assert!(matches!(unconfigured, Err(AppError::BadRequest(_))));
    Ok(())
}
