use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, OAuthRedirect, SessionToken, SessionUser, UpdateRoleRequest},
        cart::{AddToCartRequest, UpdateQuantityRequest},
        events::EventList,
        purchases::PurchaseList,
    },
    models::{
        CartItem, CheckoutInfo, Event, EventStatus, FilterCriteria, NewCartItem, PriceRange,
        ProfileUpdate, Purchase, PurchaseStatus, PurchaseUpdate, Role, TicketType, User,
        UserPreferences,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, checkout, events, health, params, purchases, session},
    services::{
        checkout_service::CheckoutReceipt,
        event_service::{EventDraft, TicketTypeDraft},
        oauth_service::OAuthProvider,
    },
    stores::{CartSnapshot, auth::RegisterData},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        session::create_session,
        session::dispose_session,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::update_profile,
        auth::oauth_redirect,
        events::list_events,
        events::reload_events,
        events::featured_events,
        events::get_event,
        events::create_event,
        events::update_event,
        events::delete_event,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        cart::clear_cart,
        checkout::checkout,
        purchases::list_purchases,
        purchases::update_purchase,
        purchases::clear_user_info,
        admin::update_user_role
    ),
    components(
        schemas(
            User,
            UserPreferences,
            Role,
            Event,
            EventStatus,
            TicketType,
            CartItem,
            NewCartItem,
            Purchase,
            PurchaseStatus,
            PurchaseUpdate,
            CheckoutInfo,
            FilterCriteria,
            PriceRange,
            ProfileUpdate,
            RegisterData,
            LoginRequest,
            SessionToken,
            SessionUser,
            OAuthProvider,
            OAuthRedirect,
            UpdateRoleRequest,
            AddToCartRequest,
            UpdateQuantityRequest,
            EventDraft,
            TicketTypeDraft,
            EventList,
            CartSnapshot,
            PurchaseList,
            CheckoutReceipt,
            params::Pagination,
            params::EventFilterQuery,
            Meta,
            ApiResponse<Event>,
            ApiResponse<EventList>,
            ApiResponse<CartSnapshot>,
            ApiResponse<PurchaseList>,
            ApiResponse<CheckoutReceipt>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Session", description = "Client session lifecycle"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Events", description = "Event catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Checkout endpoint"),
        (name = "Purchases", description = "Purchase history endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
