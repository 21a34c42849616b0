pub mod entry;
pub mod feed;
pub mod filter;

pub use entry::{Entry, EntryInput, Revision, NO_BOOKMARK};
pub use feed::{Feed, MinimizedFeed};
pub use filter::{Filter, SortDirection, SortOrder};
