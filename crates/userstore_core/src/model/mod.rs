//! Domain aggregates persisted by the store.
//!
//! # Responsibility
//! - Define the user and user-type aggregates as plain data holders.
//! - Expose dirty state derived from their change trackers.
//!
//! # Invariants
//! - Identity is absent until the store assigns it and never changes after.
//! - Entities hydrated from storage start clean.

pub mod user;
pub mod user_type;
pub mod validation;
