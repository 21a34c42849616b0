//! On-disk layout versioning.
//!
//! Steps are cumulative: step `n` assumes steps `1..n` already ran. The
//! current version lives in SQLite's `user_version` and only pending steps
//! are applied, all inside the migration transaction that opening the store
//! runs.

use rusqlite::types::Value;
use rusqlite::{params, Connection, Transaction};
use rusqlite_migration::{HookResult, Migrations, M};
use tracing::info;

use crate::app::Result;

/// Version reached once every migration step has run.
pub const SCHEMA_VERSION: usize = 3;

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("../../migrations/001-entries/up.sql")),
        M::up(include_str!("../../migrations/002-feeds/up.sql")),
        M::up_with_hook(
            include_str!("../../migrations/003-state-index/up.sql"),
            rewrite_read_flags,
        ),
    ])
}

/// Bring `conn` up to [`SCHEMA_VERSION`].
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let from = version(conn)?;
    migrations().to_latest(conn)?;
    let to = version(conn)?;

    if from != to {
        info!(from, to, "Migrated store schema");
    }

    Ok(())
}

pub fn version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version.max(0) as usize)
}

/// Forward scan over the entry store rewriting every `read` flag into the
/// 0/1 integer encoding the composite index can key on.
///
/// 0 and 1 map to themselves, so running this twice changes nothing.
pub fn rewrite_read_flags(tx: &Transaction) -> HookResult {
    let mut pending = Vec::new();
    {
        let mut stmt = tx.prepare("SELECT id, read FROM entries ORDER BY id")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let raw: Value = row.get(1)?;
            let encoded = encode_read_flag(&raw);
            if encoded != raw {
                pending.push((id, encoded));
            }
        }
    }

    let mut update = tx.prepare("UPDATE entries SET read = ?1 WHERE id = ?2")?;
    for (id, encoded) in &pending {
        update.execute(params![encoded, id])?;
    }

    if !pending.is_empty() {
        info!(rewritten = pending.len(), "Rewrote entry read flags");
    }

    Ok(())
}

fn encode_read_flag(raw: &Value) -> Value {
    match raw {
        Value::Integer(0) => Value::Integer(0),
        Value::Integer(_) => Value::Integer(1),
        Value::Real(f) => Value::Integer(if *f == 0.0 { 0 } else { 1 }),
        Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Value::Integer(1),
            "false" | "0" => Value::Integer(0),
            _ => Value::Null,
        },
        Value::Null | Value::Blob(_) => Value::Null,
    }
}
