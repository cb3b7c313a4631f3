//! Crawl lifecycle orchestration
//!
//! The coordinator wires the pieces together and owns the run: restore the
//! checkpoint, seed the frontier, replay the link log, start the worker
//! pools and the checkpoint timer, then watch for sustained idleness. There
//! is no natural "done" signal in an open-ended traversal, so the crawl ends
//! when both queues have stayed empty for the configured threshold, or on an
//! external interrupt; both paths run the same orderly shutdown.

use crate::config::Config;
use crate::crawler::checkpoint::CheckpointManager;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::filter::ExclusionFilter;
use crate::crawler::frontier::{Frontier, LinkLog};
use crate::crawler::pipeline::ParsePipeline;
use crate::crawler::workers::{fetch_worker, parse_worker};
use crate::extract::{Extractor, HtmlExtractor};
use crate::output::RecordWriter;
use crate::url::UrlPolicy;
use crate::UrlError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

pub struct Coordinator {
    config: Arc<Config>,
    frontier: Arc<Frontier>,
    pipeline: Arc<ParsePipeline>,
    fetcher: Arc<Fetcher>,
    extractor: Arc<dyn Extractor>,
    writer: Arc<RecordWriter>,
    checkpoints: Arc<CheckpointManager>,
    stop: Arc<AtomicBool>,
}

impl Coordinator {
    /// Builds a coordinator, restoring checkpointed state unless `fresh`
    pub fn new(config: Config, fresh: bool) -> crate::Result<Self> {
        let seed = Url::parse(&config.crawler.seed_url)?;
        let base_domain = seed
            .host_str()
            .ok_or(UrlError::MissingHost)?
            .to_string();

        let checkpoint_path = Path::new(&config.output.checkpoint_path);
        let checkpoint = if fresh {
            tracing::info!("Fresh crawl requested, ignoring any existing checkpoint");
            Default::default()
        } else {
            CheckpointManager::load(checkpoint_path)
        };

        let link_log = LinkLog::open(Path::new(&config.output.links_log_path))?;
        if fresh {
            link_log.clear()?;
        }

        let policy = UrlPolicy::from(&config.filter);
        let frontier = Frontier::restore(
            ExclusionFilter::new(&config.filter),
            policy,
            config.filter.identity_keys.clone(),
            config.crawler.max_depth,
            link_log,
            checkpoint.fetch_queue.clone(),
            checkpoint.visited.clone(),
            checkpoint.parsed.clone(),
            checkpoint.visited_identifiers.clone(),
        );
        let pipeline = ParsePipeline::restore(
            checkpoint.pending_fetches(),
            checkpoint.seen_texts.clone(),
        );

        let fetcher = Fetcher::new(config.fetch.clone())?;
        let extractor = HtmlExtractor::new(&base_domain, &config.extract);
        let writer = RecordWriter::open(
            Path::new(&config.output.records_path),
            config.output.rotate_bytes,
        )?;
        let checkpoints = CheckpointManager::new(checkpoint_path);

        Ok(Self {
            config: Arc::new(config),
            frontier: Arc::new(frontier),
            pipeline: Arc::new(pipeline),
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            writer: Arc::new(writer),
            checkpoints: Arc::new(checkpoints),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Runs the crawl to completion
    pub async fn run(&self) -> crate::Result<()> {
        tracing::info!(
            "Starting crawl from {} ({} fetch workers, {} parse workers)",
            self.config.crawler.seed_url,
            self.config.crawler.fetch_workers,
            self.config.crawler.parse_workers
        );

        self.frontier.enqueue(&self.config.crawler.seed_url, 0);
        self.frontier.replay_link_log()?;

        let mut handles = Vec::new();
        for id in 0..self.config.crawler.fetch_workers {
            handles.push(tokio::spawn(fetch_worker(
                id,
                Arc::clone(&self.frontier),
                Arc::clone(&self.pipeline),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.stop),
            )));
        }
        for id in 0..self.config.crawler.parse_workers {
            handles.push(tokio::spawn(parse_worker(
                id,
                Arc::clone(&self.frontier),
                Arc::clone(&self.pipeline),
                Arc::clone(&self.extractor),
                Arc::clone(&self.writer),
                Arc::clone(&self.stop),
            )));
        }

        let checkpoint_handle = tokio::spawn(checkpoint_loop(
            Arc::clone(&self.checkpoints),
            Arc::clone(&self.frontier),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.stop),
            Duration::from_secs(self.config.crawler.save_interval_secs),
        ));

        self.watch_for_completion().await;

        // Orderly shutdown: stop the loops, wait for every in-flight item to
        // land, then persist once more
        self.stop.store(true, Ordering::Relaxed);
        for handle in handles {
            let _ = handle.await;
        }
        let _ = checkpoint_handle.await;

        if let Err(e) = self.checkpoints.save(&self.frontier, &self.pipeline) {
            tracing::error!("Final checkpoint failed: {}", e);
        }
        if let Err(e) = self.writer.flush() {
            tracing::error!("Final output flush failed: {}", e);
        }

        tracing::info!(
            "Crawl finished: {} URLs visited, {} pages stored",
            self.frontier.visited_len(),
            self.frontier.parsed_len()
        );
        Ok(())
    }

    /// Ticks once per second until both queues have been empty for the idle
    /// threshold, or an interrupt arrives
    async fn watch_for_completion(&self) {
        let threshold = self.config.crawler.idle_threshold_secs;
        let mut idle_secs = 0u64;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupt received, shutting down");
                    return;
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    if self.queues_idle() {
                        idle_secs += 1;
                        if idle_secs >= threshold {
                            tracing::info!(
                                "Both queues empty for {}s, crawl complete",
                                idle_secs
                            );
                            return;
                        }
                    } else {
                        idle_secs = 0;
                    }
                }
            }
        }
    }

    /// Observes both queues under both locks at once, so work draining from
    /// one queue into the other cannot look like idleness
    fn queues_idle(&self) -> bool {
        let fetch_queue = self.frontier.queue_guard();
        let parse_queue = self.pipeline.queue_guard();
        fetch_queue.is_empty() && parse_queue.is_empty()
    }
}

/// Periodic checkpoint timer; polls the stop flag so shutdown is prompt
async fn checkpoint_loop(
    checkpoints: Arc<CheckpointManager>,
    frontier: Arc<Frontier>,
    pipeline: Arc<ParsePipeline>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) {
    let mut last_save = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(250)).await;
        if last_save.elapsed() >= interval {
            if let Err(e) = checkpoints.save(&frontier, &pipeline) {
                tracing::error!("Periodic checkpoint failed: {}", e);
            }
            last_save = Instant::now();
        }
    }
}

/// Runs a complete crawl with the given configuration
pub async fn crawl(config: Config, fresh: bool) -> crate::Result<()> {
    let coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
