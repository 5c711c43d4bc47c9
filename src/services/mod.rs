pub mod checkout_service;
pub mod event_service;
pub mod memory;
pub mod oauth_service;
pub mod user_service;

use std::sync::Arc;

use event_service::EventService;
use oauth_service::OAuthService;
use user_service::UserService;

/// Backend collaborators shared by every session.
#[derive(Clone)]
pub struct Collaborators {
    pub events: Arc<dyn EventService>,
    pub users: Arc<dyn UserService>,
    pub oauth: Arc<dyn OAuthService>,
}
