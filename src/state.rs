use std::{sync::Arc, time::Duration};

use crate::{
    guards::AdminRouteGuard,
    services::Collaborators,
    session::{SessionRegistry, StorageBackend},
    stores::EventStore,
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub route_guard: AdminRouteGuard,
    pub jwt_secret: Arc<str>,
    /// Catalog shown to visitors without a session.
    pub catalog: Arc<EventStore>,
}

impl AppState {
    pub fn new(
        collaborators: Collaborators,
        backend: StorageBackend,
        jwt_secret: &str,
        admin_redirect_delay: Duration,
    ) -> Self {
        let catalog = Arc::new(EventStore::new(collaborators.events.clone()));
        Self {
            sessions: Arc::new(SessionRegistry::new(collaborators, backend)),
            route_guard: AdminRouteGuard::new(admin_redirect_delay),
            jwt_secret: Arc::from(jwt_secret),
            catalog,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        self.sessions.collaborators()
    }
}
