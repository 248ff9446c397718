//! Transactional executor for staged row operations.

use super::row_op::{ChangeKind, RowOp, RowRef, StagedEntry};
use crate::model::user::User;
use crate::model::user_type::UserType;
use crate::repo::{
    EntityMapping, Membership, RepoError, RepoResult, SqliteRepository, UserRepository,
    UserTypeRepository,
};
use log::{debug, info, warn};
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::time::Instant;

/// Row counts produced by one successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub members_inserted: usize,
    pub members_deleted: usize,
}

impl CommitSummary {
    /// Number of entity-level changes.
    pub fn entities(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Transaction-scoped batch of staged operations.
///
/// Obtained from [`crate::Store::unit_of_work`]. Repositories resolved from
/// it stage operations here; [`UnitOfWork::commit`] executes them atomically.
pub struct UnitOfWork<'conn, 'e> {
    conn: &'conn mut Connection,
    staged: Vec<StagedEntry<'e>>,
}

impl<'conn, 'e> UnitOfWork<'conn, 'e> {
    pub(crate) fn new(conn: &'conn mut Connection) -> Self {
        Self {
            conn,
            staged: Vec::new(),
        }
    }

    pub(crate) fn connection(&self) -> &Connection {
        &*self.conn
    }

    pub(crate) fn stage(&mut self, entry: StagedEntry<'e>) {
        self.staged.push(entry);
    }

    /// Resolves the repository for entity type `E`, bound to this unit of work.
    pub fn repository<E: EntityMapping + 'e>(&mut self) -> SqliteRepository<'_, 'conn, 'e, E> {
        SqliteRepository::new(self)
    }

    pub fn users(&mut self) -> UserRepository<'_, 'conn, 'e> {
        self.repository::<User>()
    }

    pub fn user_types(&mut self) -> UserTypeRepository<'_, 'conn, 'e> {
        self.repository::<UserType>()
    }

    /// Number of staged entity changes.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Executes every staged operation in one `BEGIN IMMEDIATE` transaction.
    ///
    /// On success, inserted entities receive their store-assigned id and all
    /// staged entities are re-baselined as clean. On failure the transaction
    /// is rolled back and staged entities are left untouched.
    ///
    /// # Errors
    /// - `ConstraintViolation` when the store rejects a row.
    /// - `StaleEntity` when an update or delete targets a missing row.
    /// - `Db` for infrastructure failures (busy timeout, I/O).
    pub fn commit(self) -> RepoResult<CommitSummary> {
        let Self { conn, mut staged } = self;
        if staged.is_empty() {
            debug!("event=uow_commit module=uow status=ok staged=0 reason=empty");
            return Ok(CommitSummary::default());
        }

        let started_at = Instant::now();
        info!(
            "event=uow_commit module=uow status=start staged={}",
            staged.len()
        );

        let (summary, assigned) = match execute_batch(conn, &staged) {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    "event=uow_commit module=uow status=error staged={} duration_ms={} error_code={} error={err}",
                    staged.len(),
                    started_at.elapsed().as_millis(),
                    error_code(&err)
                );
                return Err(err);
            }
        };

        for (entry, id) in staged.iter_mut().zip(assigned) {
            if let Some(id) = id {
                entry.target.assign_identity(id);
            }
            entry.target.mark_clean();
        }

        info!(
            "event=uow_commit module=uow status=ok inserted={} updated={} deleted={} members_inserted={} members_deleted={} duration_ms={}",
            summary.inserted,
            summary.updated,
            summary.deleted,
            summary.members_inserted,
            summary.members_deleted,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }
}

/// Runs the batch; returns the summary and the id assigned per entry.
fn execute_batch(
    conn: &mut Connection,
    staged: &[StagedEntry<'_>],
) -> RepoResult<(CommitSummary, Vec<Option<i64>>)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut summary = CommitSummary::default();
    let mut assigned = Vec::with_capacity(staged.len());

    for entry in staged {
        let mut inserted_id = None;
        for op in &entry.ops {
            execute_op(&tx, op, &mut inserted_id, &mut summary)?;
        }
        match entry.kind {
            ChangeKind::Insert => summary.inserted += 1,
            ChangeKind::Update => summary.updated += 1,
            ChangeKind::Delete => summary.deleted += 1,
        }
        debug!(
            "event=uow_apply module=uow status=ok entity={} change={} ops={}",
            entry.entity,
            entry.kind.as_str(),
            entry.ops.len()
        );
        assigned.push(inserted_id);
    }

    tx.commit()?;
    Ok((summary, assigned))
}

fn execute_op(
    tx: &Transaction<'_>,
    op: &RowOp,
    inserted_id: &mut Option<i64>,
    summary: &mut CommitSummary,
) -> RepoResult<()> {
    match op {
        RowOp::Insert { table, values } => {
            let columns = values
                .iter()
                .map(|(column, _)| *column)
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; values.len()].join(", ");
            tx.execute(
                &format!("INSERT INTO {table} ({columns}) VALUES ({placeholders});"),
                params_from_iter(values.iter().map(|(_, value)| value)),
            )?;
            *inserted_id = Some(tx.last_insert_rowid());
        }
        RowOp::Update {
            entity,
            table,
            id,
            values,
        } => {
            let assignments = values
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let id_value = rusqlite::types::Value::Integer(*id);
            let changed = tx.execute(
                &format!("UPDATE {table} SET {assignments} WHERE id = ?;"),
                params_from_iter(
                    values
                        .iter()
                        .map(|(_, value)| value)
                        .chain(std::iter::once(&id_value)),
                ),
            )?;
            if changed == 0 {
                return Err(stale(*entity, *id));
            }
        }
        RowOp::RequireRow { entity, table, id } => {
            let exists: bool = tx.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
                [id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(stale(*entity, *id));
            }
        }
        RowOp::Delete { entity, table, id } => {
            let changed = tx.execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
            if changed == 0 {
                return Err(stale(*entity, *id));
            }
        }
        RowOp::ClearMembers { membership, owner } => {
            summary.members_deleted += tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1;",
                    membership.table, membership.owner_column
                ),
                [owner],
            )?;
        }
        RowOp::InsertMember {
            membership,
            owner,
            member,
        } => {
            let owner = resolve_owner(*owner, *inserted_id, membership)?;
            summary.members_inserted += tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}) VALUES (?1, ?2);",
                    membership.table, membership.owner_column, membership.member_column
                ),
                params![owner, member],
            )?;
        }
        RowOp::DeleteMember {
            membership,
            owner,
            member,
        } => {
            let owner = resolve_owner(*owner, *inserted_id, membership)?;
            summary.members_deleted += tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1 AND {} = ?2;",
                    membership.table, membership.owner_column, membership.member_column
                ),
                params![owner, member],
            )?;
        }
    }
    Ok(())
}

fn resolve_owner(
    owner: RowRef,
    inserted_id: Option<i64>,
    membership: &Membership,
) -> RepoResult<i64> {
    match owner {
        RowRef::Id(id) => Ok(id),
        RowRef::Pending => inserted_id.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "{} row staged before its owner was inserted",
                membership.table
            ))
        }),
    }
}

fn stale(entity: &'static str, id: i64) -> RepoError {
    RepoError::StaleEntity { entity, id }
}

fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::ConstraintViolation(_) => "constraint_violation",
        RepoError::StaleEntity { .. } => "stale_entity",
        RepoError::Db(_) => "db_error",
        _ => "commit_failed",
    }
}
