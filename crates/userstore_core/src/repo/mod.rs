//! Repository layer: per-entity CRUD and query facades bound to a unit of work.
//!
//! # Responsibility
//! - Translate entity state into staged row operations.
//! - Hydrate rows (scalar row + child membership rows) back into entities.
//! - Keep SQLite details out of the model and service layers.
//!
//! # Invariants
//! - Writes only stage operations; nothing touches the store before commit.
//! - Reads see committed state only. Staged changes of any repository bound
//!   to the same unit of work stay invisible until commit.
//! - Absent ids are reported as `None` / omission, never as errors.

mod filter;
mod mapping;
pub(crate) mod schema;
mod sqlite_repo;

use crate::db::DbError;
use crate::model::validation::ValidationError;
use crate::query::Query;
use rusqlite::ErrorCode;

pub use mapping::{EntityMapping, Membership, Persistable};
pub use sqlite_repo::{SqliteRepository, UserRepository, UserTypeRepository};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository and unit-of-work error.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity failed stage-time validation; nothing was staged.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Infrastructure failure (I/O, busy timeout, driver error).
    #[error(transparent)]
    Db(#[from] DbError),
    /// Operation requires an entity that was already persisted.
    #[error("{entity} has no identity; `{operation}` requires a persisted entity")]
    MissingIdentity {
        entity: &'static str,
        operation: &'static str,
    },
    /// Store rejected the batch (unique key, foreign key, check).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// Update/delete targeted a row that no longer exists.
    #[error("{entity} {id} no longer exists")]
    StaleEntity { entity: &'static str, id: i64 },
    #[error("store requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("store requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("store requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, message) = &value {
            if err.code == ErrorCode::ConstraintViolation {
                let detail = message.clone().unwrap_or_else(|| err.to_string());
                return Self::ConstraintViolation(detail);
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// CRUD + query contract for one entity type.
///
/// `'e` is the lifetime of entities staged in the owning unit of work; a
/// staged entity stays mutably borrowed until the unit of work is committed
/// or dropped.
pub trait Repository<'e, E: EntityMapping> {
    /// Stages an insert (no identity) or an update of changed attributes and
    /// member diff (dirty). Clean persisted entities are skipped.
    fn add_or_update(&mut self, entity: &'e mut E) -> RepoResult<()>;
    /// Stages removal of the entity row and all its member rows.
    fn delete(&mut self, entity: &'e mut E) -> RepoResult<()>;
    fn get(&self, id: i64) -> RepoResult<Option<E>>;
    /// Every entity when `ids` is empty; otherwise the existing subset.
    fn get_all(&self, ids: &[i64]) -> RepoResult<Vec<E>>;
    fn get_by_query(&self, query: &Query<E::Field>) -> RepoResult<Vec<E>>;
    fn exists(&self, id: i64) -> RepoResult<bool>;
    fn count(&self, query: &Query<E::Field>) -> RepoResult<u64>;
}
