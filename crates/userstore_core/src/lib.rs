//! Core persistence logic for user accounts.
//! This crate is the single source of truth for user, user type and section
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod tracking;
pub mod uow;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::user::{User, UserField, UserId};
pub use model::user_type::{UserType, UserTypeField, UserTypeId};
pub use model::validation::ValidationError;
pub use query::{FieldValue, Query};
pub use repo::{RepoError, RepoResult, Repository, UserRepository, UserTypeRepository};
pub use service::user_service::{RegisterUserRequest, ServiceError, ServiceResult, UserService};
pub use uow::{CommitSummary, Store, UnitOfWork};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
