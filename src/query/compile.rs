use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::app::{Result, StoreError};
use crate::domain::{Entry, Feed, Filter, SortDirection, SortOrder};

/// Index a plan scans. Only the composite state index exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanIndex {
    DeletedReadFeedDate,
}

impl ScanIndex {
    pub fn name(&self) -> &'static str {
        match self {
            ScanIndex::DeletedReadFeedDate => "idx_entries_deleted_read_feed_date",
        }
    }
}

/// Equality prefix of the composite index that SQL can seek on.
///
/// `read` is only set when `deleted` is, since it is the second key column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub deleted: Option<i64>,
    pub read: Option<i64>,
}

/// Row-level conditions, checked in memory for every scanned row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub feeds: HashSet<i64>,
    pub read: Option<i64>,
    pub starred: Option<i64>,
    pub deleted: Option<i64>,
    pub tags: Option<BTreeSet<String>>,
    /// Inclusive bounds in epoch milliseconds.
    pub date_from: Option<i64>,
    pub date_to: Option<i64>,
    pub search: Option<String>,
}

impl Predicate {
    pub fn matches(&self, entry: &Entry) -> bool {
        if !self.feeds.contains(&entry.feed_id) {
            return false;
        }
        // An unset read flag never satisfies a read constraint.
        if let Some(read) = self.read {
            if entry.read.map(i64::from) != Some(read) {
                return false;
            }
        }
        if let Some(starred) = self.starred {
            if i64::from(entry.starred) != starred {
                return false;
            }
        }
        if let Some(deleted) = self.deleted {
            if i64::from(entry.deleted) != deleted {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|tag| entry.tags.contains(tag)) {
                return false;
            }
        }

        let date = entry.date.timestamp_millis();
        if self.date_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }
}

/// A compiled filter. Building one never touches storage.
#[derive(Debug, Clone)]
pub struct Plan {
    pub index: ScanIndex,
    pub range: KeyRange,
    pub predicate: Predicate,
    pub offset: u64,
    pub limit: Option<u64>,
}

pub fn compile(filter: &Filter, feeds: &[Feed]) -> Result<Plan> {
    let predicate = Predicate {
        feeds: resolve_feeds(filter, feeds),
        read: filter.read.map(i64::from),
        starred: filter.starred.map(i64::from),
        deleted: filter.deleted.map(i64::from),
        tags: filter
            .tags
            .as_ref()
            .map(|tags| {
                tags.iter()
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect::<BTreeSet<_>>()
            }),
        date_from: filter.date_from.map(|d| d.timestamp_millis()),
        date_to: filter.date_to.map(|d| d.timestamp_millis()),
        search: filter.search.clone(),
    };

    if let Some(search) = &predicate.search {
        warn!(search = %search, "Full-text search is not supported; ignoring search term");
    }

    if filter.sort_order != SortOrder::Date {
        return Err(StoreError::UnsupportedSort(filter.sort_order.to_string()));
    }
    if filter.sort_direction == SortDirection::Ascending {
        return Err(StoreError::UnsupportedDirection(
            filter.sort_direction.to_string(),
        ));
    }

    let range = KeyRange {
        deleted: predicate.deleted,
        read: predicate.deleted.and(predicate.read),
    };

    let plan = Plan {
        index: ScanIndex::DeletedReadFeedDate,
        range,
        predicate,
        offset: filter.offset,
        limit: filter.limit,
    };
    debug!(
        index = plan.index.name(),
        feeds = plan.predicate.feeds.len(),
        offset = plan.offset,
        limit = ?plan.limit,
        "Compiled query"
    );
    Ok(plan)
}

/// Ids of the feeds whose entries a filter may return.
pub fn resolve_feeds(filter: &Filter, feeds: &[Feed]) -> HashSet<i64> {
    let mut selected: Vec<&Feed> = match &filter.folders {
        Some(folders) => {
            let reachable = descendants(feeds, folders);
            feeds.iter().filter(|f| reachable.contains(&f.id)).collect()
        }
        None => feeds.iter().collect(),
    };

    match &filter.feeds {
        Some(ids) => selected.retain(|f| ids.contains(&f.id)),
        None => selected.retain(|f| {
            (filter.include_hidden || !f.hidden) && (filter.include_omitted || !f.omit_in_unread)
        }),
    }

    selected.into_iter().map(|f| f.id).collect()
}

/// Breadth-first walk down the parent→children relation from `roots`,
/// roots included. Cycles in the tree are walked once.
pub fn descendants(feeds: &[Feed], roots: &[i64]) -> HashSet<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for feed in feeds {
        if let Some(parent) = feed.parent {
            children.entry(parent).or_default().push(feed.id);
        }
    }

    let mut reached = HashSet::new();
    let mut queue: VecDeque<i64> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if !reached.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(&id) {
            queue.extend(kids.iter().copied());
        }
    }
    reached
}
