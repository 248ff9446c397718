//! Unit of work: transaction-scoped batches of staged row operations.
//!
//! # Responsibility
//! - Collect row operations staged by repositories of any entity type.
//! - Execute them in one SQLite transaction on `commit`.
//! - Back-fill identities and re-baseline dirty tracking after success.
//!
//! # Invariants
//! - Nothing reaches the store before `commit`; dropping an uncommitted unit
//!   of work has no effect.
//! - `commit` consumes the unit of work. A failed commit rolls back the whole
//!   batch and leaves staged entities untouched.
//! - Staged entities stay mutably borrowed until commit, so one entity can
//!   never be staged twice in the same batch.

mod row_op;
mod store;
mod unit_of_work;

pub(crate) use row_op::{ChangeKind, RowOp, RowRef, StagedEntry};
pub use store::Store;
pub use unit_of_work::{CommitSummary, UnitOfWork};
