use rusqlite::{params, Connection};

use crate::app::Result;
use crate::domain::Feed;

pub(crate) fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM feeds", [], |row| row.get(0))?)
}

pub(crate) fn read_all(conn: &Connection) -> Result<Vec<Feed>> {
    let mut stmt = conn.prepare("SELECT id, data FROM feeds ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, data)| {
            let mut feed: Feed = serde_json::from_str(&data)?;
            feed.id = id;
            Ok(feed)
        })
        .collect()
}

/// Swap the whole feed store for `feeds`.
///
/// Feeds with id `0` get a fresh id. Feeds that already carry one are
/// written first so a fresh id can never collide with them. The returned
/// list keeps the input order.
pub(crate) fn replace_all(conn: &Connection, mut feeds: Vec<Feed>) -> Result<Vec<Feed>> {
    conn.execute("DELETE FROM feeds", [])?;

    for feed in feeds.iter().filter(|f| f.id != 0) {
        conn.execute(
            "INSERT INTO feeds (id, data) VALUES (?1, ?2)",
            params![feed.id, serde_json::to_string(feed)?],
        )?;
    }

    for feed in feeds.iter_mut().filter(|f| f.id == 0) {
        conn.execute("INSERT INTO feeds (data) VALUES ('{}')", [])?;
        feed.id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE feeds SET data = ?1 WHERE id = ?2",
            params![serde_json::to_string(feed)?, feed.id],
        )?;
    }

    Ok(feeds)
}
