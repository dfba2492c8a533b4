//! ============================================================================
//! Session / Token Store
//! ============================================================================
//! Injected storage for in-flight PKCE sessions (keyed by `state`) and issued
//! tokens (keyed by generated `user_id`). Two backends:
//! - MemoryStore: process-local maps, lost on restart
//! - RedbStore: embedded database file, survives restarts
//! ============================================================================

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use crate::types::{AuthSession, TokenRecord};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_session(&self, session: AuthSession) -> Result<()>;

    async fn get_session(&self, state: &str) -> Result<Option<AuthSession>>;

    /// Remove and return the session in one atomic step.
    /// At most one caller ever receives `Some` for a given state.
    async fn take_session(&self, state: &str) -> Result<Option<AuthSession>>;

    async fn list_sessions(&self) -> Result<Vec<AuthSession>>;

    /// Drop sessions created more than `older_than_secs` ago.
    /// Returns the number of sessions removed.
    async fn prune_sessions(&self, older_than_secs: i64) -> Result<usize> {
        let cutoff = chrono::Utc::now().timestamp() - older_than_secs;
        let mut pruned = 0;
        for session in self.list_sessions().await? {
            if session.created_at < cutoff && self.take_session(&session.state).await?.is_some() {
                pruned += 1;
            }
        }
        if pruned > 0 {
            info!("Pruned {} abandoned auth sessions", pruned);
        }
        Ok(pruned)
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert or overwrite the record for `user_id`
    async fn put_token(&self, user_id: &str, record: TokenRecord) -> Result<()>;

    async fn lookup(&self, user_id: &str) -> Result<Option<TokenRecord>>;

    /// Idempotent: returns `false` when nothing was stored under `user_id`
    async fn delete(&self, user_id: &str) -> Result<bool>;

    async fn list_tokens(&self) -> Result<Vec<(String, TokenRecord)>>;
}

/// Both halves together; what the handshake and front ends depend on
pub trait AuthStore: SessionStore + TokenStore {}

impl<T: SessionStore + TokenStore + ?Sized> AuthStore for T {}

/// Open the backend selected in config
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn AuthStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory session/token store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redb => {
            let store = RedbStore::open(config.db_path.as_deref())?;
            Ok(Arc::new(store))
        }
    }
}
