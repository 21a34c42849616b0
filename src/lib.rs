//! # rivulet-store
//!
//! Persistence and query layer of the rivulet feed reader.
//!
//! ## Architecture
//!
//! ```text
//! AppContext → Store (entries, revisions, feeds) → Backend worker → SQLite
//!            → FeedBackupService → local / sync backup targets
//!            → Query compile → QueryHandle scan
//! ```
//!
//! - [`store`]: migrations, the transaction bridge and the record store
//! - [`query`]: filter compilation and index-guided scans
//! - [`backup`]: feed list cache and backup/restore
//!
//! ## Quick Start
//!
//! ```bash
//! # Replace the feed list
//! rivulet-store import-feeds feeds.json
//!
//! # Unread entries of folder 3, newest first
//! rivulet-store query --folder 3 --read false --limit 20
//!
//! # How many starred entries
//! rivulet-store query --starred true --count
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: Durability and backup configuration
//! - [`domain`]: Core domain models (Entry, Revision, Feed, Filter)

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) owns the store, the feed cache and the
/// backup targets, and is the entry point for callers.
pub mod app;

/// Feed list backup and restore.
///
/// - [`FeedBackupService`](backup::FeedBackupService): load/save with fallback
/// - [`BackupTarget`](backup::BackupTarget): key/value backup trait
/// - [`FeedCache`](backup::FeedCache): in-memory feed list
pub mod backup;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/rivulet/config.toml`, supporting:
/// - Storage durability (persistent or ephemeral) and database path
/// - Backup file locations
pub mod config;

/// Core domain models.
///
/// - [`Entry`](domain::Entry) and [`Revision`](domain::Revision): stored records
/// - [`EntryInput`](domain::EntryInput): logical entry before it is split
/// - [`Feed`](domain::Feed): feed or folder node
/// - [`Filter`](domain::Filter): declarative query description
pub mod domain;

/// Query engine.
///
/// [`compile`](query::compile) turns a [`Filter`](domain::Filter) into a
/// [`Plan`](query::Plan) without touching storage;
/// [`QueryHandle`](query::QueryHandle) runs it.
pub mod query;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`Backend`](store::Backend): worker thread owning the connection
pub mod store;
