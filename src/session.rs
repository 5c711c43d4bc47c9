//! Explicitly constructed per-client store bundles and their registry.
//!
//! A [`Session`] owns one instance of every store. Sessions are created via
//! [`SessionRegistry::create`], looked up per request, and dropped with
//! [`SessionRegistry::dispose`]. With file-backed storage a session that is
//! no longer in memory is reopened from its snapshots. Sessions idle for
//! longer than the registry's TTL are evicted by [`SessionRegistry::sweep_expired`].

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime},
};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::session::SESSION_TTL_HOURS,
    services::Collaborators,
    storage::{FileStorage, LocalStorage, MemoryStorage, SNAPSHOT_KEYS},
    stores::{AuthStore, CartStore, EventStore, PurchaseStore},
};

pub const SESSION_NOT_FOUND: &str = "Sesión no encontrada";

/// Matches the lifetime of the session token.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(SESSION_TTL_HOURS as u64 * 3600);

pub struct Session {
    pub id: Uuid,
    pub auth: Mutex<AuthStore>,
    pub cart: Mutex<CartStore>,
    pub purchases: Mutex<PurchaseStore>,
    pub events: EventStore,
    pub storage: Arc<dyn LocalStorage>,
    /// Milliseconds since the registry epoch at the last lookup.
    last_seen: AtomicU64,
}

impl Session {
    pub fn open(id: Uuid, collaborators: &Collaborators, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            id,
            auth: Mutex::new(AuthStore::restore(
                collaborators.users.clone(),
                collaborators.oauth.clone(),
                storage.clone(),
            )),
            cart: Mutex::new(CartStore::restore(storage.clone())),
            purchases: Mutex::new(PurchaseStore::restore(storage.clone())),
            events: EventStore::new(collaborators.events.clone()),
            storage,
            last_seen: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// One directory per session under this root.
    Files(PathBuf),
    Memory,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    backend: StorageBackend,
    collaborators: Collaborators,
    idle_ttl: Duration,
    epoch: Instant,
}

impl SessionRegistry {
    pub fn new(collaborators: Collaborators, backend: StorageBackend) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            backend,
            collaborators,
            idle_ttl: SESSION_IDLE_TTL,
            epoch: Instant::now(),
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn touch(&self, session: &Session) {
        session.last_seen.store(self.now_ms(), Ordering::Relaxed);
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn session_dir(&self, id: Uuid) -> Option<PathBuf> {
        match &self.backend {
            StorageBackend::Files(root) => Some(root.join(id.to_string())),
            StorageBackend::Memory => None,
        }
    }

    fn storage_for(&self, id: Uuid) -> AppResult<Arc<dyn LocalStorage>> {
        Ok(match self.session_dir(id) {
            Some(dir) => Arc::new(FileStorage::new(dir)?),
            None => Arc::new(MemoryStorage::new()),
        })
    }

    pub async fn create(&self) -> AppResult<Arc<Session>> {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::open(id, &self.collaborators, self.storage_for(id)?));
        self.touch(&session);
        self.sessions.write().await.insert(id, session.clone());
        tracing::info!(session_id = %id, "session created");
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Arc<Session>> {
        if let Some(session) = self.sessions.read().await.get(&id) {
            self.touch(session);
            return Ok(session.clone());
        }

        let Some(dir) = self.session_dir(id).filter(|dir| dir.is_dir()) else {
            return Err(AppError::Unauthorized(SESSION_NOT_FOUND.to_string()));
        };

        let mut sessions = self.sessions.write().await;
        // Another request may have reopened it while we waited for the lock.
        if let Some(session) = sessions.get(&id) {
            self.touch(session);
            return Ok(session.clone());
        }
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(dir)?);
        let session = Arc::new(Session::open(id, &self.collaborators, storage));
        self.touch(&session);
        sessions.insert(id, session.clone());
        tracing::info!(session_id = %id, "session restored from storage");
        Ok(session)
    }

    /// Drops the session and its persisted snapshots.
    pub async fn dispose(&self, id: Uuid) -> AppResult<()> {
        let removed = self.sessions.write().await.remove(&id);
        let storage = match removed {
            Some(session) => session.storage.clone(),
            None => match self.session_dir(id).filter(|dir| dir.is_dir()) {
                Some(dir) => Arc::new(FileStorage::new(dir)?) as Arc<dyn LocalStorage>,
                None => return Err(AppError::Unauthorized(SESSION_NOT_FOUND.to_string())),
            },
        };
        self.purge(id, storage.as_ref())?;
        tracing::info!(session_id = %id, "session disposed");
        Ok(())
    }

    /// Evicts sessions idle for at least the TTL, in memory and on disk.
    /// Returns how many were removed.
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let ttl = u64::try_from(self.idle_ttl.as_millis()).unwrap_or(u64::MAX);
        let now = self.now_ms();

        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|s| now.saturating_sub(s.last_seen.load(Ordering::Relaxed)) >= ttl)
            .map(|s| s.id)
            .collect();
        let mut evicted = 0;
        for id in expired {
            if let Some(session) = sessions.remove(&id) {
                self.purge(id, session.storage.as_ref())?;
                evicted += 1;
            }
        }

        // Snapshots left by earlier processes. The map stays locked so a
        // concurrent `get` cannot reopen a directory being removed.
        if let StorageBackend::Files(root) = &self.backend {
            for id in stale_dirs(root, self.idle_ttl)? {
                if sessions.contains_key(&id) {
                    continue;
                }
                let storage = FileStorage::new(root.join(id.to_string()))?;
                self.purge(id, &storage)?;
                evicted += 1;
            }
        }
        drop(sessions);

        if evicted > 0 {
            tracing::info!(evicted, "expired sessions swept");
        }
        Ok(evicted)
    }

    /// Runs [`Self::sweep_expired`] on a fixed period until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep_expired().await {
                    tracing::warn!(error = %err, "session sweep failed");
                }
            }
        })
    }

    fn purge(&self, id: Uuid, storage: &dyn LocalStorage) -> AppResult<()> {
        for key in SNAPSHOT_KEYS {
            storage.remove_item(key)?;
        }
        if let Some(dir) = self.session_dir(id) {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

/// Session directories under `root` not modified for at least `ttl`.
fn stale_dirs(root: &std::path::Path, ttl: Duration) -> AppResult<Vec<Uuid>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let now = SystemTime::now();
    let mut stale = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Some(id) = entry.file_name().to_str().and_then(|name| Uuid::parse_str(name).ok()) else {
            continue;
        };
        let metadata = entry.metadata()?;
        if !metadata.is_dir() {
            continue;
        }
        let idle = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if idle >= ttl {
            stale.push(id);
        }
    }
    Ok(stale)
}
