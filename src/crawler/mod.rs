//! The crawl engine
//!
//! This module contains everything between configuration and output:
//! - URL admission policy and the frontier's enqueue protocol
//! - HTTP fetching with bounded retry
//! - The fetch/parse worker pipeline with content dedup
//! - Checkpointing and crash recovery
//! - Lifecycle coordination and idle-timeout termination
//! - The single-site watch mode built from the same parts

mod checkpoint;
mod coordinator;
mod fetcher;
mod filter;
mod frontier;
mod pipeline;
mod watcher;
mod workers;

pub use checkpoint::{Checkpoint, CheckpointManager};
pub use coordinator::{crawl, Coordinator};
pub use fetcher::{build_http_client, Fetcher};
pub use filter::ExclusionFilter;
pub use frontier::{Frontier, FrontierEntry, LinkLog};
pub use pipeline::{fingerprint, normalize_text, ParsePipeline, PendingFetch};
pub use watcher::{watch, SiteWatcher, WatchMarker};
