use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::app::{AppContext, Result};
use crate::cli::QueryArgs;
use crate::domain::Feed;
use crate::store::Store;

pub async fn status(ctx: &AppContext) -> Result<()> {
    let store = ctx.store()?;
    let version = store.schema_version().await?;
    let entries = store.list_entries().await?.len();

    println!("Schema version: {}", version);
    println!("Entries: {}", entries);
    println!("Feeds: {}", ctx.feeds().len());
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.feeds();

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for line in feed_tree(&feeds) {
        println!("{}", line);
    }
    Ok(())
}

/// Import a JSON array of feeds, replacing the current list.
pub async fn import_feeds(ctx: &AppContext, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let feeds: Vec<Feed> = serde_json::from_str(&content)?;

    if feeds.is_empty() {
        println!("No feeds found in {}", path.display());
        return Ok(());
    }

    let saved = ctx.save_feeds(feeds).await?;
    println!("Imported {} feeds", saved.len());
    Ok(())
}

pub async fn list_entries(ctx: &AppContext) -> Result<()> {
    let ids = ctx.list_entries().await?;

    if ids.is_empty() {
        println!("No entries");
        return Ok(());
    }

    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

pub async fn run_query(ctx: &AppContext, args: &QueryArgs) -> Result<()> {
    let handle = ctx.query(&args.to_filter())?;

    if args.count {
        let count = handle.count().await?;
        println!("{}", count);
        return Ok(());
    }

    let entries = handle.entries().await?;
    if entries.is_empty() {
        println!("No matching entries");
        return Ok(());
    }

    let feeds = ctx.feeds();
    let titles: HashMap<i64, &str> = feeds.iter().map(|f| (f.id, f.display_title())).collect();

    for entry in entries {
        let marker = match entry.read {
            Some(true) => " ",
            Some(false) => "●",
            None => "?",
        };
        let star = if entry.starred { "*" } else { " " };
        println!(
            "{}{} {:>6} {} [{}] {}",
            marker,
            star,
            entry.id,
            entry.date.format("%Y-%m-%d"),
            titles.get(&entry.feed_id).copied().unwrap_or("unknown feed"),
            entry.entry_url.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn delete_entries(ctx: &AppContext, ids: &[i64]) -> Result<()> {
    ctx.delete_entries(ids).await?;
    println!("Deleted {} entries", ids.len());
    Ok(())
}

pub async fn clear_entries(ctx: &AppContext) -> Result<()> {
    ctx.clear_entries().await?;
    println!("Cleared all entries");
    Ok(())
}

/// Indented outline of the feed list. Feeds whose parent is missing are
/// shown at the top level.
fn feed_tree(feeds: &[Feed]) -> Vec<String> {
    let ids: HashSet<i64> = feeds.iter().map(|f| f.id).collect();
    let mut children: HashMap<Option<i64>, Vec<&Feed>> = HashMap::new();
    for feed in feeds {
        let parent = feed.parent.filter(|p| ids.contains(p) && *p != feed.id);
        children.entry(parent).or_default().push(feed);
    }

    let mut lines = Vec::new();
    let mut visited = HashSet::new();
    let mut stack: Vec<(&Feed, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|f| (*f, 0)).collect())
        .unwrap_or_default();

    while let Some((feed, depth)) = stack.pop() {
        if !visited.insert(feed.id) {
            continue;
        }

        let mut flags = Vec::new();
        if feed.hidden {
            flags.push("hidden");
        }
        if feed.omit_in_unread {
            flags.push("omitted");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        lines.push(format!(
            "{}{} [{}]{}",
            "  ".repeat(depth),
            feed.display_title(),
            feed.id,
            flags
        ));

        if let Some(kids) = children.get(&Some(feed.id)) {
            stack.extend(kids.iter().rev().map(|f| (*f, depth + 1)));
        }
    }

    lines
}
