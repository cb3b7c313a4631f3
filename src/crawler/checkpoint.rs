//! Crawl state checkpointing
//!
//! A checkpoint is one JSON document capturing everything needed to resume:
//! both queues, the visited/parsed/identity sets, and the content
//! fingerprints. Raw page bodies held in the parse queue are base64-encoded
//! since they need not be valid text. Writes go to a temp file that is
//! renamed over the live path, so a crash mid-write leaves the previous
//! checkpoint intact; an unreadable checkpoint degrades to a fresh crawl.

use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::pipeline::{ParsePipeline, PendingFetch};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A parse-queue item in its serialized form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPage {
    pub url: String,
    /// base64-encoded raw body
    pub content: String,
    pub depth: u32,
}

/// Durable snapshot of the entire crawl state
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub fetch_queue: Vec<FrontierEntry>,
    pub parse_queue: Vec<PendingPage>,
    pub visited: Vec<String>,
    pub parsed: Vec<String>,
    pub seen_texts: Vec<String>,
    pub visited_identifiers: Vec<String>,
}

impl Checkpoint {
    /// Snapshots the live structures, taking each lock in a fixed order and
    /// never more than one at a time
    pub fn capture(frontier: &Frontier, pipeline: &ParsePipeline) -> Self {
        let fetch_queue = frontier.snapshot_queue();
        let parse_queue = pipeline
            .snapshot_queue()
            .into_iter()
            .map(|item| PendingPage {
                url: item.url,
                content: BASE64.encode(&item.content),
                depth: item.depth,
            })
            .collect();
        let visited = frontier.snapshot_visited();
        let parsed = frontier.snapshot_parsed();
        let seen_texts = pipeline.snapshot_seen_texts();
        let visited_identifiers = frontier.snapshot_identifiers();

        Self {
            fetch_queue,
            parse_queue,
            visited,
            parsed,
            seen_texts,
            visited_identifiers,
        }
    }

    /// Decodes the stored parse queue; entries with undecodable bodies are
    /// dropped with a warning
    pub fn pending_fetches(&self) -> Vec<PendingFetch> {
        self.parse_queue
            .iter()
            .filter_map(|page| match BASE64.decode(&page.content) {
                Ok(content) => Some(PendingFetch {
                    url: page.url.clone(),
                    content,
                    depth: page.depth,
                }),
                Err(e) => {
                    tracing::warn!("Dropping undecodable parse-queue entry {}: {}", page.url, e);
                    None
                }
            })
            .collect()
    }
}

/// Serializes checkpoints to disk and restores them on startup
pub struct CheckpointManager {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CheckpointManager {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the checkpoint at `path`; absent or unreadable files yield an
    /// empty state, never an error
    pub fn load(path: &Path) -> Checkpoint {
        if !path.exists() {
            tracing::info!("No checkpoint at {}, starting fresh", path.display());
            return Checkpoint::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot read checkpoint {}: {}, starting fresh", path.display(), e);
                return Checkpoint::default();
            }
        };

        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) => {
                tracing::info!(
                    "Restored checkpoint: {} queued, {} pending parse, {} visited, {} parsed",
                    checkpoint.fetch_queue.len(),
                    checkpoint.parse_queue.len(),
                    checkpoint.visited.len(),
                    checkpoint.parsed.len()
                );
                checkpoint
            }
            Err(e) => {
                tracing::warn!(
                    "Checkpoint {} is corrupt ({}), starting fresh",
                    path.display(),
                    e
                );
                Checkpoint::default()
            }
        }
    }

    /// Captures and persists the current state atomically
    pub fn save(&self, frontier: &Frontier, pipeline: &ParsePipeline) -> crate::Result<()> {
        let checkpoint = Checkpoint::capture(frontier, pipeline);
        self.write(&checkpoint)
    }

    fn write(&self, checkpoint: &Checkpoint) -> crate::Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        write_json_atomic(&self.path, checkpoint)?;
        tracing::info!(
            "Checkpoint saved: {} queued, {} pending parse",
            checkpoint.fetch_queue.len(),
            checkpoint.parse_queue.len()
        );
        Ok(())
    }
}

/// Writes a JSON document through a temp file plus atomic rename
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> crate::Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = PathBuf::from(format!("{}.tmp", path.display()));

    if let Err(e) = std::fs::write(&tmp_path, &json) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
