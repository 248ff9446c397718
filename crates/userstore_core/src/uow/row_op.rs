//! Row-level operations staged by repositories.

use crate::repo::{Membership, Persistable};
use rusqlite::types::Value;

/// Owner reference of a member row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowRef {
    /// Id produced by the `Insert` earlier in the same entry.
    Pending,
    Id(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RowOp {
    Insert {
        table: &'static str,
        values: Vec<(&'static str, Value)>,
    },
    Update {
        entity: &'static str,
        table: &'static str,
        id: i64,
        values: Vec<(&'static str, Value)>,
    },
    /// Fails the batch when the row is gone; used by member-only updates.
    RequireRow {
        entity: &'static str,
        table: &'static str,
        id: i64,
    },
    Delete {
        entity: &'static str,
        table: &'static str,
        id: i64,
    },
    ClearMembers {
        membership: Membership,
        owner: i64,
    },
    InsertMember {
        membership: Membership,
        owner: RowRef,
        member: String,
    },
    DeleteMember {
        membership: Membership,
        owner: RowRef,
        member: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// All row operations for one entity plus the entity itself, kept for
/// post-commit identity back-fill.
pub(crate) struct StagedEntry<'e> {
    pub(crate) entity: &'static str,
    pub(crate) kind: ChangeKind,
    pub(crate) ops: Vec<RowOp>,
    pub(crate) target: &'e mut dyn Persistable,
}

impl<'e> StagedEntry<'e> {
    pub(crate) fn new(
        entity: &'static str,
        kind: ChangeKind,
        ops: Vec<RowOp>,
        target: &'e mut dyn Persistable,
    ) -> Self {
        Self {
            entity,
            kind,
            ops,
            target,
        }
    }
}
