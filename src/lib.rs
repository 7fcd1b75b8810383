//! # logmill - Commit History Ingestion
//!
//! Reads change history from version-control repositories and log files and
//! exposes it as a single, time-ordered stream of commits.
//!
//! ## Overview
//!
//! Each location becomes a [`CommitSource`](source::CommitSource). Text logs are
//! parsed synchronously on demand; live repositories are walked by a background
//! thread that hands commits over through a bounded, closable channel. The
//! [`SourceMerger`](merge::SourceMerger) combines any number of sources into one
//! stream ordered by timestamp, with ties broken by source id.
//!
//! ## Key Features
//!
//! - **Text logs**: git raw log and pipe-delimited custom log, from files or stdin
//! - **Live repositories**: git2 history walk that keeps tailing new revisions
//! - **Generated logs**: `git log` output materialised into a temporary file
//! - **Deterministic merge**: strict ordering with a best-effort pool for
//!   sources that are still fetching
//! - **Filters**: regex allow/deny lists for usernames and file paths
//!
//! ## Architecture
//!
//! ```text
//!  text log ──► SeekableTextSource ─┐
//!                                   ├──► SourceMerger ──► consumer
//!  git repo ──► walker thread       │
//!               │ BoundedChannel    │
//!               ▼                   │
//!         LiveRepositorySource ─────┘
//! ```
//!
//! ## Modules
//!
//! - [`source`]: the source trait, text and live sources, log formats
//! - [`merge`]: multi-source merge
//! - [`channel`]: bounded producer/consumer queue
//! - [`commit`]: commit and file change model
//! - [`filters`]: compiled user and file filters
//! - [`mill`]: opening locations as sources
//! - [`config`]: configuration with environment variable overrides
//! - [`error`]: error types
//!
//! ## Usage Example
//!
//! ```no_run
//! use logmill::config::Config;
//! use logmill::source::CommitSource;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::new()?;
//!     let mut merged = logmill::mill::open_sources(&["./repo".to_string()], &config)?;
//!
//!     while !merged.is_finished() {
//!         match merged.next_commit(true) {
//!             Some(commit) => println!("{} {}", commit.timestamp, commit.username),
//!             None => std::thread::sleep(std::time::Duration::from_millis(10)),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

/// Closable, bounded producer/consumer queue
pub mod channel;

/// Commit and file change model
pub mod commit;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// User and file allow/deny filters
pub mod filters;

/// Time-ordered merge of several sources
pub mod merge;

/// Opening locations as sources
pub mod mill;

/// Platform directory computation
pub mod paths;

/// UTF-8 cleanup for names and paths
pub mod sanitize;

/// Commit sources: text logs and live repositories
pub mod source;

/// Optional timing instrumentation
pub mod timing;
