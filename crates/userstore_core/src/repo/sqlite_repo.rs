//! Generic SQLite repository over any [`EntityMapping`].

use crate::model::user::User;
use crate::model::user_type::UserType;
use crate::query::{Field, FieldValue, Query};
use crate::repo::filter::{
    placeholders, render_where, single_field_disjunction, to_sql_value, MAX_IN_BINDS,
};
use crate::repo::{EntityMapping, RepoError, RepoResult, Repository};
use crate::uow::{ChangeKind, RowOp, RowRef, StagedEntry, UnitOfWork};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::time::Instant;

/// Repository for one entity type, bound to a unit of work.
pub struct SqliteRepository<'u, 'conn, 'e, E> {
    uow: &'u mut UnitOfWork<'conn, 'e>,
    _entity: PhantomData<fn() -> E>,
}

pub type UserRepository<'u, 'conn, 'e> = SqliteRepository<'u, 'conn, 'e, User>;
pub type UserTypeRepository<'u, 'conn, 'e> = SqliteRepository<'u, 'conn, 'e, UserType>;

impl<'u, 'conn, 'e, E: EntityMapping> SqliteRepository<'u, 'conn, 'e, E> {
    pub(crate) fn new(uow: &'u mut UnitOfWork<'conn, 'e>) -> Self {
        Self {
            uow,
            _entity: PhantomData,
        }
    }

    fn conn(&self) -> &Connection {
        self.uow.connection()
    }

    fn load_where(&self, op: &'static str, clause: &str, binds: Vec<Value>) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        let sql = format!("{} WHERE {clause} ORDER BY id ASC;", select_sql::<E>());
        let mut stmt = self.conn().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get("id")?;
            let members = self.load_members(id)?;
            entities.push(E::hydrate(row, members)?);
        }
        debug!(
            "event=repo_read module=repo status=ok op={op} entity={} rows={} duration_ms={}",
            E::ENTITY,
            entities.len(),
            started_at.elapsed().as_millis()
        );
        Ok(entities)
    }

    /// Loads rows whose `column` is in `values`, one statement per chunk.
    ///
    /// `values` must be distinct so chunks never return the same row twice.
    fn load_in_chunks(
        &self,
        op: &'static str,
        column: &str,
        values: &[Value],
    ) -> RepoResult<Vec<E>> {
        let mut entities = Vec::new();
        for chunk in values.chunks(MAX_IN_BINDS) {
            let clause = format!("{column} IN ({})", placeholders(chunk.len()));
            entities.extend(self.load_where(op, &clause, chunk.to_vec())?);
        }
        entities.sort_by_key(|entity| entity.identity());
        Ok(entities)
    }

    fn count_in_chunks(&self, column: &str, values: &[Value]) -> RepoResult<u64> {
        let mut total = 0;
        for chunk in values.chunks(MAX_IN_BINDS) {
            total += self.count_where(
                &format!("{column} IN ({})", placeholders(chunk.len())),
                chunk.to_vec(),
            )?;
        }
        Ok(total)
    }

    fn count_where(&self, clause: &str, binds: Vec<Value>) -> RepoResult<u64> {
        let count: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE {clause};", E::TABLE),
            params_from_iter(binds),
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn load_members(&self, owner: i64) -> RepoResult<Vec<String>> {
        let Some(membership) = E::MEMBERSHIP else {
            return Ok(Vec::new());
        };
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {member}
             FROM {table}
             WHERE {owner_column} = ?1
             ORDER BY {member} ASC;",
            member = membership.member_column,
            table = membership.table,
            owner_column = membership.owner_column,
        ))?;
        let members = stmt
            .query_map([owner], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }
}

impl<'u, 'conn, 'e, E: EntityMapping + 'e> Repository<'e, E> for SqliteRepository<'u, 'conn, 'e, E> {
    fn add_or_update(&mut self, entity: &'e mut E) -> RepoResult<()> {
        let (kind, ops) = match entity.identity() {
            None => (ChangeKind::Insert, plan_insert(&*entity)),
            Some(_) if !entity.is_dirty() => {
                debug!(
                    "event=repo_stage module=repo status=skipped op=add_or_update entity={} reason=clean",
                    E::ENTITY
                );
                return Ok(());
            }
            Some(id) => (ChangeKind::Update, plan_update(id, &*entity)),
        };

        if let Err(err) = entity.validate() {
            warn!(
                "event=repo_stage module=repo status=rejected op=add_or_update entity={} error={err}",
                E::ENTITY
            );
            return Err(err.into());
        }

        debug!(
            "event=repo_stage module=repo status=ok op=add_or_update entity={} kind={} row_ops={} fields={}",
            E::ENTITY,
            kind.as_str(),
            ops.len(),
            field_names(&entity.changed_values())
        );
        self.uow.stage(StagedEntry::new(E::ENTITY, kind, ops, entity));
        Ok(())
    }

    fn delete(&mut self, entity: &'e mut E) -> RepoResult<()> {
        let Some(id) = entity.identity() else {
            warn!(
                "event=repo_stage module=repo status=rejected op=delete entity={} error_code=missing_identity",
                E::ENTITY
            );
            return Err(RepoError::MissingIdentity {
                entity: E::ENTITY,
                operation: "delete",
            });
        };

        let mut ops = Vec::with_capacity(2);
        if let Some(membership) = E::MEMBERSHIP {
            ops.push(RowOp::ClearMembers {
                membership,
                owner: id,
            });
        }
        ops.push(RowOp::Delete {
            entity: E::ENTITY,
            table: E::TABLE,
            id,
        });

        debug!(
            "event=repo_stage module=repo status=ok op=delete entity={} id={id}",
            E::ENTITY
        );
        self.uow
            .stage(StagedEntry::new(E::ENTITY, ChangeKind::Delete, ops, entity));
        Ok(())
    }

    fn get(&self, id: i64) -> RepoResult<Option<E>> {
        let found = self.load_where("get", "id = ?", vec![Value::Integer(id)])?;
        Ok(found.into_iter().next())
    }

    fn get_all(&self, ids: &[i64]) -> RepoResult<Vec<E>> {
        if ids.is_empty() {
            return self.load_where("get_all", "1 = 1", Vec::new());
        }
        let ids = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|id| Value::Integer(*id))
            .collect::<Vec<_>>();
        self.load_in_chunks("get_all", "id", &ids)
    }

    fn get_by_query(&self, query: &Query<E::Field>) -> RepoResult<Vec<E>> {
        if let Some((field, values)) = single_field_disjunction(query) {
            let values = values.iter().map(to_sql_value).collect::<Vec<_>>();
            return self.load_in_chunks("get_by_query", field.column(), &values);
        }
        let mut binds = Vec::new();
        let clause = render_where(query, &mut binds);
        self.load_where("get_by_query", &clause, binds)
    }

    fn exists(&self, id: i64) -> RepoResult<bool> {
        let exists: i64 = self.conn().query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);", E::TABLE),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn count(&self, query: &Query<E::Field>) -> RepoResult<u64> {
        if let Some((field, values)) = single_field_disjunction(query) {
            let values = values.iter().map(to_sql_value).collect::<Vec<_>>();
            return self.count_in_chunks(field.column(), &values);
        }
        let mut binds = Vec::new();
        let clause = render_where(query, &mut binds);
        self.count_where(&clause, binds)
    }
}

fn select_sql<E: EntityMapping>() -> String {
    let columns = E::fields()
        .iter()
        .map(|field| field.column())
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT id, {columns} FROM {}", E::TABLE)
}

fn to_columns<F: Field>(values: Vec<(F, FieldValue)>) -> Vec<(&'static str, Value)> {
    values
        .into_iter()
        .map(|(field, value)| (field.column(), to_sql_value(&value)))
        .collect()
}

/// Comma-separated attribute names, for diagnostics; values are never logged.
fn field_names<F: Field>(values: &[(F, FieldValue)]) -> String {
    values
        .iter()
        .map(|(field, _)| field.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// Insert of every scalar plus the full initial member set.
fn plan_insert<E: EntityMapping>(entity: &E) -> Vec<RowOp> {
    let mut ops = vec![RowOp::Insert {
        table: E::TABLE,
        values: to_columns(entity.scalar_values()),
    }];
    if let (Some(membership), Some(members)) = (E::MEMBERSHIP, entity.members()) {
        ops.extend(members.iter().map(|member| RowOp::InsertMember {
            membership,
            owner: RowRef::Pending,
            member: member.to_string(),
        }));
    }
    ops
}

/// Update of changed scalars plus the member diff (deletes first).
fn plan_update<E: EntityMapping>(id: i64, entity: &E) -> Vec<RowOp> {
    let changed = entity.changed_values();
    let mut ops = if changed.is_empty() {
        vec![RowOp::RequireRow {
            entity: E::ENTITY,
            table: E::TABLE,
            id,
        }]
    } else {
        vec![RowOp::Update {
            entity: E::ENTITY,
            table: E::TABLE,
            id,
            values: to_columns(changed),
        }]
    };

    if let (Some(membership), Some(members)) = (E::MEMBERSHIP, entity.members()) {
        let diff = members.pending();
        ops.extend(diff.to_delete.into_iter().map(|member| RowOp::DeleteMember {
            membership,
            owner: RowRef::Id(id),
            member,
        }));
        ops.extend(diff.to_insert.into_iter().map(|member| RowOp::InsertMember {
            membership,
            owner: RowRef::Id(id),
            member,
        }));
    }
    ops
}
