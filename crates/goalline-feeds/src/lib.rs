//! RSS and Atom ingestion for Goal Line Report.
//!
//! [`FeedFetcher`] downloads each configured source, parses it, derives a
//! stable GUID per entry and stores only unseen entries. Every attempt leaves
//! one fetch log behind. [`scheduler::spawn_scheduler`] runs fetch, cleanup
//! and health jobs on fixed intervals.

mod lock;

pub mod config;
pub mod error;
pub mod fetcher;
pub mod health;
pub mod normalize;
pub mod parse;
pub mod scheduler;

pub use config::FeedsConfig;
pub use error::{Error, Result};
pub use fetcher::{FeedFetcher, FetchOutcome, FetchSummary};
pub use health::FeedStats;
pub use scheduler::{SchedulerHandle, spawn_scheduler};
