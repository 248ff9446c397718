//! Readiness checks for connections handed to the store.

use crate::db::migrations::{current_user_version, latest_version};
use crate::query::Field;
use crate::repo::{EntityMapping, RepoError, RepoResult};
use rusqlite::Connection;

/// Rejects connections that are not migrated or lack the mapped columns.
pub(crate) fn ensure_entity_ready<E: EntityMapping>(conn: &Connection) -> RepoResult<()> {
    ensure_schema_version(conn)?;

    if !table_exists(conn, E::TABLE)? {
        return Err(RepoError::MissingRequiredTable(E::TABLE));
    }
    if !table_has_column(conn, E::TABLE, "id")? {
        return Err(RepoError::MissingRequiredColumn {
            table: E::TABLE,
            column: "id",
        });
    }
    for field in E::fields() {
        let column = field.column();
        if !table_has_column(conn, E::TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: E::TABLE,
                column,
            });
        }
    }

    if let Some(membership) = E::MEMBERSHIP {
        if !table_exists(conn, membership.table)? {
            return Err(RepoError::MissingRequiredTable(membership.table));
        }
        for column in [membership.owner_column, membership.member_column] {
            if !table_has_column(conn, membership.table, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: membership.table,
                    column,
                });
            }
        }
    }

    Ok(())
}

fn ensure_schema_version(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
