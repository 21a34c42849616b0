use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::app::{Result, StoreError};
use crate::domain::entry::{join_tags, parse_tags};
use crate::domain::{Entry, EntryInput, Revision};

pub(crate) const ENTRY_COLUMNS: &str = "id, feed_id, read, marked_unread_on_update, starred, \
     tags, deleted, provided_id, entry_url, primary_hash, secondary_hash, date, bookmarked, bookmark_id, revisions";

const REVISION_COLUMNS: &str = "id, authors, title, content, updated";

pub(crate) fn to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Maps a row selected with [`ENTRY_COLUMNS`].
pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        read: row.get::<_, Option<i64>>(2)?.map(|v| v != 0),
        marked_unread_on_update: row.get(3)?,
        starred: row.get(4)?,
        tags: parse_tags(&row.get::<_, String>(5)?),
        deleted: row.get::<_, i64>(6)? != 0,
        provided_id: row.get(7)?,
        entry_url: row.get(8)?,
        primary_hash: row.get(9)?,
        secondary_hash: row.get(10)?,
        date: from_millis(row.get(11)?),
        bookmarked: row.get(12)?,
        bookmark_id: row.get(13)?,
        revisions: json_column(row, 14)?,
    })
}

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<Revision> {
    Ok(Revision {
        id: row.get(0)?,
        authors: json_column(row, 1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        updated: from_millis(row.get(4)?),
    })
}

pub(crate) fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
}

fn revisions_of(conn: &Connection, id: i64) -> Result<Option<Vec<i64>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT revisions FROM entries WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// First entry other than `except` whose revision list holds `revision`.
fn revision_owner(conn: &Connection, revision: i64, except: Option<i64>) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM entries
             WHERE id IS NOT ?1
               AND EXISTS (SELECT 1 FROM json_each(entries.revisions) WHERE value = ?2)
             LIMIT 1",
            params![except, revision],
            |row| row.get(0),
        )
        .optional()?)
}

/// Split `input` into its revision and entry records and upsert both.
///
/// Returns the entry id. Revisions the entry previously referenced and no
/// longer does are removed. An explicit `revision_id` that another entry
/// already references is rejected, so every revision keeps exactly one owner.
pub(crate) fn write_entry(conn: &Connection, input: EntryInput) -> Result<i64> {
    if let Some(revision) = input.revision_id {
        if let Some(owner) = revision_owner(conn, revision, input.id)? {
            return Err(StoreError::RevisionOwned { revision, owner });
        }
    }

    let previous = match input.id {
        Some(id) => revisions_of(conn, id)?.unwrap_or_default(),
        None => Vec::new(),
    };

    conn.execute(
        "INSERT INTO revisions (id, authors, title, content, updated)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             authors = excluded.authors,
             title = excluded.title,
             content = excluded.content,
             updated = excluded.updated",
        params![
            input.revision_id,
            serde_json::to_string(&input.authors)?,
            input.title,
            input.content,
            to_millis(&input.updated),
        ],
    )?;
    let revision_id = input
        .revision_id
        .unwrap_or_else(|| conn.last_insert_rowid());

    let revisions = vec![revision_id];
    let tags = input.normalized_tags();

    conn.execute(
        "INSERT INTO entries (id, feed_id, read, marked_unread_on_update, starred, tags, deleted,
                              provided_id, entry_url, primary_hash, secondary_hash, date,
                              bookmarked, bookmark_id, revisions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
         ON CONFLICT(id) DO UPDATE SET
             feed_id = excluded.feed_id,
             read = excluded.read,
             marked_unread_on_update = excluded.marked_unread_on_update,
             starred = excluded.starred,
             tags = excluded.tags,
             deleted = excluded.deleted,
             provided_id = excluded.provided_id,
             entry_url = excluded.entry_url,
             primary_hash = excluded.primary_hash,
             secondary_hash = excluded.secondary_hash,
             date = excluded.date,
             bookmarked = excluded.bookmarked,
             bookmark_id = excluded.bookmark_id,
             revisions = excluded.revisions",
        params![
            input.id,
            input.feed_id,
            input.read,
            input.marked_unread_on_update,
            input.starred,
            join_tags(&tags),
            input.deleted,
            input.provided_id,
            input.entry_url,
            input.primary_hash,
            input.secondary_hash,
            to_millis(&input.date),
            input.is_bookmarked(),
            input.stored_bookmark_id(),
            serde_json::to_string(&revisions)?,
        ],
    )?;
    let entry_id = input.id.unwrap_or_else(|| conn.last_insert_rowid());

    conn.execute("DELETE FROM entry_tags WHERE entry_id = ?1", params![entry_id])?;
    let mut insert_tag = conn.prepare("INSERT INTO entry_tags (entry_id, tag) VALUES (?1, ?2)")?;
    for tag in &tags {
        insert_tag.execute(params![entry_id, tag])?;
    }

    for stale in previous.iter().filter(|id| !revisions.contains(id)) {
        conn.execute("DELETE FROM revisions WHERE id = ?1", params![stale])?;
    }

    Ok(entry_id)
}

/// Remove an entry, its tag rows and every revision it references.
/// Returns false when no such entry exists.
pub(crate) fn delete_entry(conn: &Connection, id: i64) -> Result<bool> {
    let Some(revisions) = revisions_of(conn, id)? else {
        return Ok(false);
    };

    for revision in revisions {
        conn.execute("DELETE FROM revisions WHERE id = ?1", params![revision])?;
    }
    // entry_tags rows cascade
    conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
    Ok(true)
}

pub(crate) fn clear(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM entry_tags;
         DELETE FROM entries;
         DELETE FROM revisions;",
    )?;
    Ok(())
}

pub(crate) fn list_ids(conn: &Connection) -> Result<Vec<i64>> {
    ids(conn, "SELECT id FROM entries ORDER BY id", None)
}

pub(crate) fn get_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    let sql = format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS);
    Ok(conn.query_row(&sql, params![id], entry_from_row).optional()?)
}

pub(crate) fn get_revision(conn: &Connection, id: i64) -> Result<Option<Revision>> {
    let sql = format!("SELECT {} FROM revisions WHERE id = ?1", REVISION_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], revision_from_row)
        .optional()?)
}

pub(crate) fn ids_by_primary_hash(conn: &Connection, hash: &str) -> Result<Vec<i64>> {
    ids(
        conn,
        "SELECT id FROM entries WHERE primary_hash = ?1 ORDER BY id",
        Some(hash),
    )
}

pub(crate) fn ids_by_url(conn: &Connection, url: &str) -> Result<Vec<i64>> {
    ids(
        conn,
        "SELECT id FROM entries WHERE entry_url = ?1 ORDER BY id",
        Some(url),
    )
}

pub(crate) fn ids_by_bookmark(conn: &Connection, bookmark_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM entries WHERE bookmark_id = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map(params![bookmark_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

pub(crate) fn ids_by_tag(conn: &Connection, tag: &str) -> Result<Vec<i64>> {
    ids(
        conn,
        "SELECT entry_id FROM entry_tags WHERE tag = ?1 ORDER BY entry_id",
        Some(tag),
    )
}

fn ids(conn: &Connection, sql: &str, key: Option<&str>) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = match key {
        Some(key) => stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?,
        None => stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?,
    };
    Ok(ids)
}
