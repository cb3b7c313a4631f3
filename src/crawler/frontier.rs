//! Frontier: the fetch queue and its dedup gates
//!
//! The frontier owns the queue of URLs waiting to be fetched together with
//! the three sets that make enqueueing idempotent: `visited` (every URL ever
//! queued), `identifiers` (coarse content identities), and `parsed` (URLs
//! whose content is already persisted). Each structure sits behind its own
//! mutex; no lock is held across I/O.
//!
//! Every admitted URL is also appended to a small JSONL link log. The log is
//! a crash-safety net independent of the full checkpoint: links discovered
//! between two checkpoint saves survive a crash and are replayed through the
//! normal enqueue path on the next start.

use crate::crawler::filter::ExclusionFilter;
use crate::url::{content_identity, normalize_url, UrlPolicy};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One unit of frontier work: a normalized URL and its link depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

/// Append-only JSONL log of admitted `{url, depth}` pairs
pub struct LinkLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl LinkLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn append(&self, entry: &FrontierEntry) -> crate::Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().unwrap();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Reads every entry, then truncates the log
    ///
    /// Entries the caller re-admits get re-appended through `append`, so the
    /// log never holds an entry twice.
    pub fn drain(&self) -> crate::Result<Vec<FrontierEntry>> {
        let file = self.file.lock().unwrap();

        let content = std::fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<FrontierEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping malformed link log line: {}", e),
            }
        }

        file.set_len(0)?;
        Ok(entries)
    }

    pub fn clear(&self) -> crate::Result<()> {
        let file = self.file.lock().unwrap();
        file.set_len(0)?;
        Ok(())
    }
}

/// The shared fetch queue plus the visited/identity/parsed gates
pub struct Frontier {
    fetch_queue: Mutex<VecDeque<FrontierEntry>>,
    visited: Mutex<HashSet<String>>,
    identifiers: Mutex<HashSet<String>>,
    parsed: Mutex<HashSet<String>>,
    link_log: LinkLog,
    filter: ExclusionFilter,
    policy: UrlPolicy,
    identity_keys: Vec<String>,
    max_depth: Option<u32>,
}

impl Frontier {
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        filter: ExclusionFilter,
        policy: UrlPolicy,
        identity_keys: Vec<String>,
        max_depth: Option<u32>,
        link_log: LinkLog,
        fetch_queue: Vec<FrontierEntry>,
        visited: Vec<String>,
        parsed: Vec<String>,
        identifiers: Vec<String>,
    ) -> Self {
        Self {
            fetch_queue: Mutex::new(fetch_queue.into()),
            visited: Mutex::new(visited.into_iter().collect()),
            identifiers: Mutex::new(identifiers.into_iter().collect()),
            parsed: Mutex::new(parsed.into_iter().collect()),
            link_log,
            filter,
            policy,
            identity_keys,
            max_depth,
        }
    }

    pub fn new(
        filter: ExclusionFilter,
        policy: UrlPolicy,
        identity_keys: Vec<String>,
        max_depth: Option<u32>,
        link_log: LinkLog,
    ) -> Self {
        Self::restore(
            filter,
            policy,
            identity_keys,
            max_depth,
            link_log,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    /// Admits a discovered URL into the fetch queue, or rejects it
    ///
    /// Gates, in order: the URL must normalize (absolute HTTP(S)); its
    /// content identity must be unseen (checked-and-registered atomically
    /// under the identifier lock, so concurrent discoveries of the same item
    /// cannot both pass); the URL itself must be neither visited nor already
    /// parsed; the depth bound must hold; the exclusion filter must admit it.
    /// Admission appends to the queue, marks the URL visited, and logs the
    /// discovery.
    pub fn enqueue(&self, raw_url: &str, depth: u32) -> bool {
        let normalized = match normalize_url(raw_url, &self.policy) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Dropping unusable link {}: {}", raw_url, e);
                return false;
            }
        };

        let identity = content_identity(&normalized, &self.identity_keys);
        {
            let mut identifiers = self.identifiers.lock().unwrap();
            if identifiers.contains(&identity) {
                tracing::debug!("Identity already seen: {}", identity);
                return false;
            }
            identifiers.insert(identity);
        }

        let url_str = normalized.to_string();

        if self.visited.lock().unwrap().contains(&url_str) {
            return false;
        }
        if self.parsed.lock().unwrap().contains(&url_str) {
            return false;
        }

        if let Some(max) = self.max_depth {
            if depth > max {
                tracing::debug!("Depth {} exceeds bound for {}", depth, url_str);
                return false;
            }
        }

        if self.filter.is_excluded(&normalized) {
            tracing::debug!("Excluded by policy: {}", url_str);
            return false;
        }

        let entry = FrontierEntry {
            url: url_str.clone(),
            depth,
        };
        self.fetch_queue.lock().unwrap().push_back(entry.clone());
        self.visited.lock().unwrap().insert(url_str.clone());
        tracing::debug!("Queued {} (depth {})", url_str, depth);

        if let Err(e) = self.link_log.append(&entry) {
            tracing::error!("Failed to log discovered link {}: {}", url_str, e);
        }
        true
    }

    /// Pops the oldest queued entry, if any
    pub fn pop(&self) -> Option<FrontierEntry> {
        self.fetch_queue.lock().unwrap().pop_front()
    }

    /// Marks a URL as fully extracted and persisted
    pub fn mark_parsed(&self, url: &str) {
        self.parsed.lock().unwrap().insert(url.to_string());
    }

    /// Replays the link log through the enqueue path, then leaves the log
    /// holding only the entries that were re-admitted
    pub fn replay_link_log(&self) -> crate::Result<usize> {
        let entries = self.link_log.drain()?;
        if entries.is_empty() {
            return Ok(0);
        }

        let total = entries.len();
        let mut admitted = 0;
        for entry in entries {
            if self.enqueue(&entry.url, entry.depth) {
                admitted += 1;
            }
        }
        tracing::info!(
            "Replayed link log: {} of {} entries re-admitted",
            admitted,
            total
        );
        Ok(admitted)
    }

    pub fn queue_len(&self) -> usize {
        self.fetch_queue.lock().unwrap().len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.lock().unwrap().len()
    }

    pub fn parsed_len(&self) -> usize {
        self.parsed.lock().unwrap().len()
    }

    /// Direct access to the queue lock, for the coordinator's idle check
    /// (both queue locks must be observed at once)
    pub(crate) fn queue_guard(&self) -> MutexGuard<'_, VecDeque<FrontierEntry>> {
        self.fetch_queue.lock().unwrap()
    }

    // Snapshot accessors for checkpointing; each takes and releases a single
    // lock, never more than one at a time.

    pub(crate) fn snapshot_queue(&self) -> Vec<FrontierEntry> {
        self.fetch_queue.lock().unwrap().iter().cloned().collect()
    }

    pub(crate) fn snapshot_visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().iter().cloned().collect()
    }

    pub(crate) fn snapshot_parsed(&self) -> Vec<String> {
        self.parsed.lock().unwrap().iter().cloned().collect()
    }

    pub(crate) fn snapshot_identifiers(&self) -> Vec<String> {
        self.identifiers.lock().unwrap().iter().cloned().collect()
    }
}
