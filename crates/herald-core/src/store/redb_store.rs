// ============================================================================
// RedbStore - Embedded Database (redb)
// ============================================================================
// Persistent storage for auth sessions and issued tokens.
// Default path: ~/.herald/herald.redb (override via HERALD_DB_PATH env var)
// ============================================================================

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{SessionStore, TokenStore};
use crate::error::{HeraldError, Result};
use crate::types::{AuthSession, TokenRecord};

// Table definitions
type Table = TableDefinition<'static, &'static str, &'static [u8]>;

const SESSIONS: Table = TableDefinition::new("sessions");
const TOKENS: Table = TableDefinition::new("tokens");

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| HeraldError::storage("Failed to serialize record", e))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| HeraldError::storage("Failed to deserialize record", e))
}

/// Embedded database backing the session/token store
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses ~/.herald/herald.redb
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let db_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let home = dirs::home_dir()
                    .ok_or_else(|| HeraldError::Config("Cannot determine home directory".into()))?;
                let herald_dir = home.join(".herald");
                std::fs::create_dir_all(&herald_dir)
                    .map_err(|e| HeraldError::storage("Failed to create .herald directory", e))?;
                herald_dir.join("herald.redb")
            }
        };

        info!("Opening token store at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| HeraldError::storage("Failed to open database", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| HeraldError::storage("Failed to begin write", e))?;
        {
            write_txn
                .open_table(SESSIONS)
                .map_err(|e| HeraldError::storage("Failed to create sessions table", e))?;
            write_txn
                .open_table(TOKENS)
                .map_err(|e| HeraldError::storage("Failed to create tokens table", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| HeraldError::storage("Failed to commit init", e))?;

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn insert(&self, table: Table, key: &str, value: &[u8]) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| HeraldError::storage("Failed to begin write", e))?;
        {
            let mut table = write_txn
                .open_table(table)
                .map_err(|e| HeraldError::storage("Failed to open table", e))?;
            table
                .insert(key, value)
                .map_err(|e| HeraldError::storage("Failed to insert", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| HeraldError::storage("Failed to commit", e))
    }

    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| HeraldError::storage("Failed to begin read", e))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| HeraldError::storage("Failed to open table", e))?;

        let value = table
            .get(key)
            .map_err(|e| HeraldError::storage("Failed to get", e))?;
        let record = match value {
            Some(guard) => Some(decode(guard.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Remove `key` and return what was stored, inside one write transaction
    fn remove<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| HeraldError::storage("Failed to begin write", e))?;
        let removed;
        {
            let mut table = write_txn
                .open_table(table)
                .map_err(|e| HeraldError::storage("Failed to open table", e))?;
            let guard = table
                .remove(key)
                .map_err(|e| HeraldError::storage("Failed to remove", e))?;
            removed = match guard {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
        }
        write_txn
            .commit()
            .map_err(|e| HeraldError::storage("Failed to commit delete", e))?;
        Ok(removed)
    }

    fn entries<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<(String, T)>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| HeraldError::storage("Failed to begin read", e))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| HeraldError::storage("Failed to open table", e))?;

        let mut results = Vec::new();
        let iter = table
            .range::<&str>(..)
            .map_err(|e| HeraldError::storage("Failed to iterate", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| HeraldError::storage("Failed to read entry", e))?;
            results.push((key.value().to_string(), decode(value.value())?));
        }
        Ok(results)
    }
}

#[async_trait]
impl SessionStore for RedbStore {
    async fn put_session(&self, session: AuthSession) -> Result<()> {
        self.insert(SESSIONS, &session.state, &encode(&session)?)?;
        debug!("Stored auth session");
        Ok(())
    }

    async fn get_session(&self, state: &str) -> Result<Option<AuthSession>> {
        self.get(SESSIONS, state)
    }

    async fn take_session(&self, state: &str) -> Result<Option<AuthSession>> {
        self.remove(SESSIONS, state)
    }

    async fn list_sessions(&self) -> Result<Vec<AuthSession>> {
        Ok(self
            .entries::<AuthSession>(SESSIONS)?
            .into_iter()
            .map(|(_, session)| session)
            .collect())
    }
}

#[async_trait]
impl TokenStore for RedbStore {
    async fn put_token(&self, user_id: &str, record: TokenRecord) -> Result<()> {
        self.insert(TOKENS, user_id, &encode(&record)?)?;
        debug!("Stored tokens for user {}", user_id);
        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        self.get(TOKENS, user_id)
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let removed = self.remove::<TokenRecord>(TOKENS, user_id)?.is_some();
        if removed {
            debug!("Deleted tokens for user {}", user_id);
        }
        Ok(removed)
    }

    async fn list_tokens(&self) -> Result<Vec<(String, TokenRecord)>> {
        self.entries(TOKENS)
    }
}
