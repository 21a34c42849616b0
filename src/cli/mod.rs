pub mod commands;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::domain::{Filter, SortDirection, SortOrder};

#[derive(Parser)]
#[command(name = "rivulet-store")]
#[command(about = "Inspect and maintain the rivulet entry store", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/rivulet/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Use a throwaway in-memory store
    #[arg(long, global = true, conflicts_with = "db")]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show schema version and record counts
    Status,
    /// Print the feed tree
    Feeds,
    /// Replace the feed list with the feeds in a JSON file
    ImportFeeds {
        /// Path to a JSON array of feeds
        path: PathBuf,
    },
    /// List stored entry ids
    Entries,
    /// Run a filtered query
    Query(QueryArgs),
    /// Delete entries and their revisions
    Delete {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Remove every entry and revision
    Clear,
}

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Restrict to these feeds (repeatable)
    #[arg(long = "feed")]
    pub feeds: Vec<i64>,

    /// Restrict to everything below these folders (repeatable)
    #[arg(long = "folder")]
    pub folders: Vec<i64>,

    /// Match entries carrying any of these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub read: Option<bool>,

    #[arg(long)]
    pub starred: Option<bool>,

    #[arg(long)]
    pub deleted: Option<bool>,

    #[arg(long)]
    pub search: Option<String>,

    /// Oldest entry date, RFC 3339
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Newest entry date, RFC 3339
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,

    #[arg(long)]
    pub include_hidden: bool,

    #[arg(long)]
    pub include_omitted: bool,

    /// date, title, author or feed (only date is supported)
    #[arg(long, default_value = "date", value_parser = parse_sort)]
    pub sort: SortOrder,

    #[arg(long)]
    pub ascending: bool,

    #[arg(long)]
    pub limit: Option<u64>,

    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,
}

fn parse_sort(s: &str) -> Result<SortOrder, String> {
    s.parse().map_err(|e: crate::app::StoreError| e.to_string())
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

impl QueryArgs {
    pub fn to_filter(&self) -> Filter {
        Filter {
            feeds: non_empty(&self.feeds),
            folders: non_empty(&self.folders),
            tags: non_empty(&self.tags),
            read: self.read,
            starred: self.starred,
            deleted: self.deleted,
            search: self.search.clone(),
            date_from: self.since,
            date_to: self.until,
            include_hidden: self.include_hidden,
            include_omitted: self.include_omitted,
            sort_order: self.sort,
            sort_direction: if self.ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            },
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_args_to_filter() {
        let cli = Cli::try_parse_from([
            "rivulet-store",
            "query",
            "--feed",
            "1",
            "--feed",
            "2",
            "--read",
            "false",
            "--tag",
            "rust",
            "--since",
            "2024-01-01T00:00:00Z",
            "--limit",
            "10",
            "--offset",
            "5",
        ])
        .unwrap();

        let Commands::Query(args) = cli.command else {
            panic!("expected query command");
        };
        let filter = args.to_filter();

        assert_eq!(filter.feeds, Some(vec![1, 2]));
        assert_eq!(filter.folders, None);
        assert_eq!(filter.tags, Some(vec!["rust".to_string()]));
        assert_eq!(filter.read, Some(false));
        assert_eq!(filter.starred, None);
        assert_eq!(filter.date_from.unwrap().timestamp(), 1_704_067_200);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, 5);
        assert_eq!(filter.sort_order, SortOrder::Date);
        assert_eq!(filter.sort_direction, SortDirection::Descending);
    }

    #[test]
    fn test_sort_and_direction_flags() {
        let cli =
            Cli::try_parse_from(["rivulet-store", "query", "--sort", "title", "--ascending"])
                .unwrap();
        let Commands::Query(args) = cli.command else {
            panic!("expected query command");
        };
        let filter = args.to_filter();
        assert_eq!(filter.sort_order, SortOrder::Title);
        assert_eq!(filter.sort_direction, SortDirection::Ascending);

        assert!(Cli::try_parse_from(["rivulet-store", "query", "--sort", "random"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["rivulet-store", "status", "--ephemeral"]).unwrap();
        assert!(cli.ephemeral);
        assert!(matches!(cli.command, Commands::Status));

        assert!(
            Cli::try_parse_from(["rivulet-store", "--ephemeral", "--db", "x.db", "status"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["rivulet-store", "delete"]).is_err());
    }
}
