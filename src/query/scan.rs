use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::app::Result;
use crate::domain::Entry;
use crate::query::compile::{KeyRange, Plan};
use crate::store::entries::{entry_from_row, ENTRY_COLUMNS};

fn scan_sql(range: &KeyRange) -> (String, Vec<i64>) {
    let mut sql = format!("SELECT {} FROM entries", ENTRY_COLUMNS);
    let mut keys = Vec::new();

    if let Some(deleted) = range.deleted {
        sql.push_str(" WHERE deleted = ?");
        keys.push(deleted);
        if let Some(read) = range.read {
            sql.push_str(" AND read = ?");
            keys.push(read);
        }
    }
    sql.push_str(" ORDER BY date DESC, id DESC");

    (sql, keys)
}

/// Walk entries newest first, handing every row that passes the plan's
/// predicate and pagination window to `visit`.
///
/// Rows failing the predicate consume nothing. Passing rows first use up
/// the offset and then count toward the limit. The cursor is not advanced
/// past the last row the limit admits.
pub(crate) fn scan<F>(conn: &Connection, plan: &Plan, mut visit: F) -> Result<()>
where
    F: FnMut(Entry),
{
    let mut offset = plan.offset;
    let mut limit = plan.limit;
    if limit == Some(0) {
        return Ok(());
    }

    let (sql, keys) = scan_sql(&plan.range);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(keys.iter()))?;

    let mut scanned = 0u64;
    let mut matched = 0u64;
    while let Some(row) = rows.next()? {
        scanned += 1;
        let entry = entry_from_row(row)?;
        if !plan.predicate.matches(&entry) {
            continue;
        }
        if offset > 0 {
            offset -= 1;
            continue;
        }

        matched += 1;
        visit(entry);

        if let Some(remaining) = limit.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                break;
            }
        }
    }

    debug!(index = plan.index.name(), scanned, matched, "Scanned entries");
    Ok(())
}
