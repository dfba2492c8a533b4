use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{SessionStore, TokenStore};
use crate::error::Result;
use crate::types::{AuthSession, TokenRecord};

/// Process-local store. Safe to share across concurrent requests.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, AuthSession>>,
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put_session(&self, session: AuthSession) -> Result<()> {
        debug!("Stored auth session");
        self.sessions
            .write()
            .await
            .insert(session.state.clone(), session);
        Ok(())
    }

    async fn get_session(&self, state: &str) -> Result<Option<AuthSession>> {
        Ok(self.sessions.read().await.get(state).cloned())
    }

    async fn take_session(&self, state: &str) -> Result<Option<AuthSession>> {
        Ok(self.sessions.write().await.remove(state))
    }

    async fn list_sessions(&self) -> Result<Vec<AuthSession>> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn put_token(&self, user_id: &str, record: TokenRecord) -> Result<()> {
        self.tokens
            .write()
            .await
            .insert(user_id.to_string(), record);
        debug!("Stored tokens for user {}", user_id);
        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.read().await.get(user_id).cloned())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let removed = self.tokens.write().await.remove(user_id).is_some();
        if removed {
            debug!("Deleted tokens for user {}", user_id);
        }
        Ok(removed)
    }

    async fn list_tokens(&self) -> Result<Vec<(String, TokenRecord)>> {
        let tokens = self.tokens.read().await;
        let mut out: Vec<_> = tokens
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}
