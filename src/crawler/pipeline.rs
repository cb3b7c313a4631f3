//! Fetch-to-parse hand-off queue and content dedup
//!
//! Fetch workers push raw page bodies here; parse workers drain them. The
//! pipeline also owns the set of content fingerprints already persisted, so
//! the same article reached through different URLs is stored once.

use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A fetched page awaiting extraction; consumed exactly once
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub url: String,
    pub content: Vec<u8>,
    pub depth: u32,
}

pub struct ParsePipeline {
    queue: Mutex<VecDeque<PendingFetch>>,
    seen_texts: Mutex<HashSet<String>>,
}

impl ParsePipeline {
    pub fn new() -> Self {
        Self::restore(Vec::new(), Vec::new())
    }

    pub fn restore(queue: Vec<PendingFetch>, seen_texts: Vec<String>) -> Self {
        Self {
            queue: Mutex::new(queue.into()),
            seen_texts: Mutex::new(seen_texts.into_iter().collect()),
        }
    }

    pub fn push(&self, item: PendingFetch) {
        self.queue.lock().unwrap().push_back(item);
    }

    pub fn pop(&self) -> Option<PendingFetch> {
        self.queue.lock().unwrap().pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Registers a content fingerprint; returns false when it was already
    /// known (check and insert are atomic under the set's lock)
    pub fn register_fingerprint(&self, hash: &str) -> bool {
        let mut seen = self.seen_texts.lock().unwrap();
        if seen.contains(hash) {
            return false;
        }
        seen.insert(hash.to_string());
        true
    }

    pub(crate) fn queue_guard(&self) -> MutexGuard<'_, VecDeque<PendingFetch>> {
        self.queue.lock().unwrap()
    }

    pub(crate) fn snapshot_queue(&self) -> Vec<PendingFetch> {
        self.queue.lock().unwrap().iter().cloned().collect()
    }

    pub(crate) fn snapshot_seen_texts(&self) -> Vec<String> {
        self.seen_texts.lock().unwrap().iter().cloned().collect()
    }
}

impl Default for ParsePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalizes extracted text for fingerprinting: casefold, strip
/// punctuation, collapse all whitespace runs to single spaces
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 hex digest of already-normalized text
pub fn fingerprint(normalized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hex::encode(hasher.finalize())
}
