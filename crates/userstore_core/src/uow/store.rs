//! Store: owns the SQLite connection and hands out units of work.

use super::unit_of_work::UnitOfWork;
use crate::config::StoreConfig;
use crate::db::{open_db_in_memory, open_db_with_timeout, DEFAULT_BUSY_TIMEOUT};
use crate::model::user::User;
use crate::model::user_type::UserType;
use crate::repo::schema::ensure_entity_ready;
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::path::Path;

/// Unit-of-work provider, built once at startup and passed to callers.
///
/// # Invariants
/// - The wrapped connection is fully migrated and carries every table and
///   column the repositories map.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if needed) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::from_connection(open_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)?)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Opens the store described by `config`; in memory when no path is set.
    pub fn open_with_config(config: &StoreConfig) -> RepoResult<Self> {
        match config.db_path.as_deref() {
            Some(path) => Self::from_connection(open_db_with_timeout(path, config.busy_timeout())?),
            None => Self::from_connection(open_db_in_memory()?),
        }
    }

    /// Wraps an existing connection after checking its schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations are not fully applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   lacks something the repositories map.
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        ensure_entity_ready::<UserType>(&conn)?;
        ensure_entity_ready::<User>(&conn)?;
        Ok(Self { conn })
    }

    /// Starts a new unit of work. Only one can be open per store at a time.
    pub fn unit_of_work<'e>(&mut self) -> UnitOfWork<'_, 'e> {
        UnitOfWork::new(&mut self.conn)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
