//! Change tracking for persisted entities.
//!
//! # Responsibility
//! - Keep a shadow snapshot of scalar attributes taken at load/commit.
//! - Track set-valued child attributes and compute minimal row diffs.
//!
//! # Invariants
//! - Dirty state is derived by diffing, never by setter hooks.
//! - Only net membership of a tracked set is ever persisted.

mod dirty;
mod member_set;

pub use dirty::ChangeTracker;
pub use member_set::{diff_sets, normalize_member, MemberSet, SetDiff};
