//! Fetch and parse worker loops
//!
//! Workers poll their input queue with a short sleep when it is empty and
//! exit when the shared stop flag is raised. Per-item failures are logged
//! and dropped; nothing a single page does can stall the pipeline.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::pipeline::{fingerprint, normalize_text, ParsePipeline, PendingFetch};
use crate::extract::Extractor;
use crate::output::{Record, RecordWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How long a worker sleeps when its input queue is empty
const IDLE_POLL: Duration = Duration::from_millis(300);

/// Drains the fetch queue: fetch each URL, hand successes to the parse queue
///
/// A URL whose fetch fails stays in the visited set and is not retried this
/// run.
pub async fn fetch_worker(
    id: usize,
    frontier: Arc<Frontier>,
    pipeline: Arc<ParsePipeline>,
    fetcher: Arc<Fetcher>,
    stop: Arc<AtomicBool>,
) {
    tracing::debug!("Fetch worker {} started", id);

    while !stop.load(Ordering::Relaxed) {
        let entry = match frontier.pop() {
            Some(entry) => entry,
            None => {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
        };

        match fetcher.fetch(&entry.url).await {
            Some(content) => {
                pipeline.push(PendingFetch {
                    url: entry.url,
                    content,
                    depth: entry.depth,
                });
            }
            None => {
                tracing::warn!("[fetch-{}] Fetch failed, dropping {}", id, entry.url);
            }
        }
    }

    tracing::debug!("Fetch worker {} stopped", id);
}

/// Drains the parse queue: extract, dedup, persist, harvest links
pub async fn parse_worker(
    id: usize,
    frontier: Arc<Frontier>,
    pipeline: Arc<ParsePipeline>,
    extractor: Arc<dyn Extractor>,
    writer: Arc<RecordWriter>,
    stop: Arc<AtomicBool>,
) {
    tracing::debug!("Parse worker {} started", id);

    while !stop.load(Ordering::Relaxed) {
        let item = match pipeline.pop() {
            Some(item) => item,
            None => {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
        };

        process_page(id, &item, &frontier, &pipeline, extractor.as_ref(), &writer);
    }

    tracing::debug!("Parse worker {} stopped", id);
}

/// Runs one page through the parse stage; every early return is a dropped
/// item, never an error that propagates
fn process_page(
    id: usize,
    item: &PendingFetch,
    frontier: &Frontier,
    pipeline: &ParsePipeline,
    extractor: &dyn Extractor,
    writer: &RecordWriter,
) {
    let page_url = match Url::parse(&item.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("[parse-{}] Unparsable queued URL {}: {}", id, item.url, e);
            return;
        }
    };

    let merged_text = match extractor.extract_text(&item.content, &page_url) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("[parse-{}] Extraction failed for {}: {}", id, item.url, e);
            return;
        }
    };

    if merged_text.trim().is_empty() {
        tracing::info!("[parse-{}] Empty page, skipping {}", id, item.url);
        return;
    }

    let normalized = normalize_text(&merged_text);
    if normalized.is_empty() {
        tracing::info!(
            "[parse-{}] Nothing left after text normalization, skipping {}",
            id,
            item.url
        );
        return;
    }

    let hash = fingerprint(&normalized);
    if !pipeline.register_fingerprint(&hash) {
        tracing::info!("[parse-{}] Duplicate content, skipping {}", id, item.url);
        return;
    }

    let record = Record {
        url: item.url.clone(),
        merged_text,
        images: extractor.extract_images(&item.content, &page_url),
        files: extractor.extract_files(&item.content, &page_url),
        tables: extractor.extract_tables(&item.content, &page_url),
    };

    if let Err(e) = writer.append(&record) {
        tracing::error!("[parse-{}] Failed to persist record for {}: {}", id, item.url, e);
    } else {
        tracing::info!("[parse-{}] Stored {}", id, item.url);
    }

    frontier.mark_parsed(&item.url);

    for link in extractor.extract_links(&item.content, &page_url) {
        frontier.enqueue(&link, item.depth + 1);
    }
}
