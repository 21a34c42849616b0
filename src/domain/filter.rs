use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::StoreError;

/// Declarative description of the entries a caller wants.
///
/// Every `None` dimension is unconstrained. A list dimension holding
/// `Some` of an empty list (`feeds`, `folders`, `tags`) matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filter {
    pub feeds: Option<Vec<i64>>,
    /// Expanded to every feed below these nodes, the nodes included.
    pub folders: Option<Vec<i64>>,
    /// Matches entries carrying at least one of these tags.
    pub tags: Option<Vec<String>>,
    pub read: Option<bool>,
    pub starred: Option<bool>,
    pub deleted: Option<bool>,
    /// Full-text search is not implemented; the term is accepted and ignored.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub include_hidden: bool,
    pub include_omitted: bool,
    pub sort_order: SortOrder,
    pub sort_direction: SortDirection,
    pub limit: Option<u64>,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Date,
    Title,
    Author,
    Feed,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::Date => "date",
            SortOrder::Title => "title",
            SortOrder::Author => "author",
            SortOrder::Feed => "feed",
        };
        f.write_str(name)
    }
}

impl FromStr for SortOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(SortOrder::Date),
            "title" => Ok(SortOrder::Title),
            "author" => Ok(SortOrder::Author),
            "feed" => Ok(SortOrder::Feed),
            other => Err(StoreError::Config(format!("unknown sort order: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Descending => f.write_str("descending"),
            SortDirection::Ascending => f.write_str("ascending"),
        }
    }
}
