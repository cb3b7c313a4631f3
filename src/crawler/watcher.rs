//! Single-site watch mode
//!
//! A degenerate crawl for board-style sites where each item links to the
//! next: the item graph has a single outgoing edge and unbounded depth, so
//! no frontier is needed. The watcher walks the chain forward, persists each
//! item through the normal record writer, and remembers the last item seen
//! in a small marker file. Once the chain ends it polls the last page until
//! a newer item appears, then resumes walking.

use crate::config::Config;
use crate::crawler::checkpoint::write_json_atomic;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pipeline::normalize_text;
use crate::extract::{Extractor, HtmlExtractor};
use crate::output::{Record, RecordWriter};
use crate::url::identity_value;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Where the last walk stopped; restored across restarts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchMarker {
    pub last_url: Option<String>,
    pub last_item: Option<String>,
}

impl WatchMarker {
    fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(marker) => marker,
                Err(e) => {
                    tracing::warn!("Watch marker {} is corrupt ({}), starting over", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn save(&self, path: &Path) -> crate::Result<()> {
        write_json_atomic(path, self)
    }
}

pub struct SiteWatcher {
    seed_url: String,
    fetcher: Fetcher,
    extractor: HtmlExtractor,
    writer: RecordWriter,
    identity_keys: Vec<String>,
    marker_path: PathBuf,
    poll_interval: Duration,
}

impl SiteWatcher {
    pub fn new(config: Config) -> crate::Result<Self> {
        let seed = Url::parse(&config.crawler.seed_url)?;
        let base_domain = seed
            .host_str()
            .ok_or(UrlError::MissingHost)?
            .to_string();

        Ok(Self {
            seed_url: config.crawler.seed_url.clone(),
            fetcher: Fetcher::new(config.fetch.clone())?,
            extractor: HtmlExtractor::new(&base_domain, &config.extract),
            writer: RecordWriter::open(
                Path::new(&config.output.records_path),
                config.output.rotate_bytes,
            )?,
            identity_keys: config.filter.identity_keys.clone(),
            marker_path: PathBuf::from(&config.watch.marker_path),
            poll_interval: Duration::from_secs(config.watch.poll_interval_secs),
        })
    }

    /// Runs until interrupted: walk the item chain, then poll for new items
    pub async fn run(&self) -> crate::Result<()> {
        let mut marker = WatchMarker::load(&self.marker_path);

        if let Some(last) = marker.last_url.as_deref() {
            tracing::info!("Resuming watch at {}", last);
        } else {
            tracing::info!("No previous watch state, walking from {}", self.seed_url);
            marker = self
                .walk_from(self.seed_url.clone(), WatchMarker::default())
                .await?;
        }

        self.wait_for_new(marker).await
    }

    /// Follows the next-item chain from `start`, persisting every page and
    /// advancing the marker after each one
    async fn walk_from(&self, start: String, mut marker: WatchMarker) -> crate::Result<WatchMarker> {
        let mut current = Some(start);

        while let Some(url_str) = current {
            let page_url = Url::parse(&url_str)?;

            let content = match self.fetcher.fetch(&url_str).await {
                Some(content) => content,
                None => {
                    tracing::warn!("Failed to fetch {}, stopping walk", url_str);
                    break;
                }
            };

            self.persist(&url_str, &page_url, &content)?;

            marker.last_url = Some(url_str.clone());
            marker.last_item = identity_value(&page_url, &self.identity_keys);
            if let Err(e) = marker.save(&self.marker_path) {
                tracing::error!("Failed to save watch marker: {}", e);
            }
            tracing::info!(
                "Recorded item {} ({})",
                marker.last_item.as_deref().unwrap_or("-"),
                url_str
            );

            current = self.extractor.next_link(&content, &page_url);
        }

        self.writer.flush()?;
        Ok(marker)
    }

    /// Polls the last seen page until a strictly newer item shows up
    async fn wait_for_new(&self, mut marker: WatchMarker) -> crate::Result<()> {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupt received, leaving watch mode");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    tracing::debug!("Polling for a new item...");
                    if let Some(new_marker) = self.check_once(&marker).await? {
                        marker = new_marker;
                    }
                }
            }
        }
    }

    async fn check_once(&self, marker: &WatchMarker) -> crate::Result<Option<WatchMarker>> {
        let check_url = marker.last_url.clone().unwrap_or_else(|| self.seed_url.clone());

        let content = match self.fetcher.fetch(&check_url).await {
            Some(content) => content,
            None => {
                tracing::warn!("Poll fetch failed for {}", check_url);
                return Ok(None);
            }
        };

        let page_url = Url::parse(&check_url)?;
        let next = match self.extractor.next_link(&content, &page_url) {
            Some(next) => next,
            None => return Ok(None),
        };

        let next_url = Url::parse(&next)?;
        let next_item = identity_value(&next_url, &self.identity_keys);
        if !is_newer(next_item.as_deref(), marker.last_item.as_deref()) {
            return Ok(None);
        }

        tracing::info!("New item found at {}, resuming walk", next);
        Ok(Some(self.walk_from(next, marker.clone()).await?))
    }

    fn persist(&self, url_str: &str, page_url: &Url, content: &[u8]) -> crate::Result<()> {
        let merged_text = match self.extractor.extract_text(content, page_url) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Extraction failed for {}: {}", url_str, e);
                return Ok(());
            }
        };

        if normalize_text(&merged_text).is_empty() {
            tracing::info!("Empty item at {}, not storing", url_str);
            return Ok(());
        }

        let record = Record {
            url: url_str.to_string(),
            merged_text,
            images: self.extractor.extract_images(content, page_url),
            files: self.extractor.extract_files(content, page_url),
            tables: self.extractor.extract_tables(content, page_url),
        };
        if let Err(e) = self.writer.append(&record) {
            tracing::error!("Failed to persist item {}: {}", url_str, e);
        }
        Ok(())
    }
}

/// Numeric comparison of item identifiers; a missing last item means
/// anything counts as new
fn is_newer(candidate: Option<&str>, last: Option<&str>) -> bool {
    match (candidate, last) {
        (Some(c), Some(l)) => match (c.parse::<u64>(), l.parse::<u64>()) {
            (Ok(c), Ok(l)) => c > l,
            _ => {
                tracing::warn!("Non-numeric item identifiers: {} vs {}", c, l);
                false
            }
        },
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Runs watch mode with the given configuration
pub async fn watch(config: Config) -> crate::Result<()> {
    let watcher = SiteWatcher::new(config)?;
    watcher.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CrawlerConfig, ExtractConfig, FetchConfig, FilterConfig, OutputConfig, WatchConfig,
    };
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_is_newer() {
        assert!(is_newer(Some("124"), Some("123")));
        assert!(!is_newer(Some("123"), Some("123")));
        assert!(!is_newer(Some("122"), Some("123")));
        assert!(is_newer(Some("1"), None));
        assert!(!is_newer(None, Some("123")));
        assert!(!is_newer(Some("abc"), Some("123")));
    }

    #[test]
    fn test_marker_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marker.json");

        let marker = WatchMarker {
            last_url: Some("https://example.org/notice?article_no=42".to_string()),
            last_item: Some("42".to_string()),
        };
        marker.save(&path).unwrap();

        let loaded = WatchMarker::load(&path);
        assert_eq!(loaded.last_url, marker.last_url);
        assert_eq!(loaded.last_item, marker.last_item);
    }

    #[test]
    fn test_corrupt_marker_starts_over() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marker.json");
        std::fs::write(&path, "{ nope").unwrap();

        let loaded = WatchMarker::load(&path);
        assert!(loaded.last_url.is_none());
    }

    fn watch_config(server_uri: &str, dir: &TempDir) -> Config {
        Config {
            crawler: CrawlerConfig {
                seed_url: format!("{}/notice?article_no=1", server_uri),
                max_depth: None,
                fetch_workers: 1,
                parse_workers: 1,
                save_interval_secs: 10,
                idle_threshold_secs: 10,
            },
            fetch: FetchConfig {
                user_agents: vec!["TestAgent/1.0".to_string()],
                max_retries: 2,
                backoff_base_secs: 0,
                backoff_cap_secs: 0,
                timeout_secs: 5,
                time_budget_secs: 10,
                pacing_min_ms: 0,
                pacing_max_ms: 0,
            },
            filter: FilterConfig {
                identity_keys: vec!["article_no".to_string()],
                force_https: false,
                ..FilterConfig::default()
            },
            output: OutputConfig {
                records_path: dir.path().join("records.jsonl").display().to_string(),
                rotate_bytes: 1024 * 1024,
                checkpoint_path: dir.path().join("checkpoint.json").display().to_string(),
                links_log_path: dir.path().join("links.jsonl").display().to_string(),
            },
            extract: ExtractConfig {
                next_selector: Some("a.next".to_string()),
                ..ExtractConfig::default()
            },
            watch: WatchConfig {
                poll_interval_secs: 1,
                marker_path: dir.path().join("marker.json").display().to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_walk_follows_chain_and_saves_marker() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/notice"))
            .and(query_param("article_no", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(
                        r#"<html><body><p>Item one</p><a class="next" href="/notice?article_no=2">next</a></body></html>"#,
                    )
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/notice"))
            .and(query_param("article_no", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<html><body><p>Item two</p></body></html>"#)
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = watch_config(&server.uri(), &dir);
        let seed = config.crawler.seed_url.clone();
        let watcher = SiteWatcher::new(config).unwrap();

        let marker = watcher
            .walk_from(seed, WatchMarker::default())
            .await
            .unwrap();

        assert_eq!(marker.last_item.as_deref(), Some("2"));
        assert!(marker.last_url.unwrap().contains("article_no=2"));

        let records = std::fs::read_to_string(dir.path().join("records.jsonl")).unwrap();
        assert_eq!(records.lines().count(), 2);

        // Marker survived on disk
        let loaded = WatchMarker::load(&dir.path().join("marker.json"));
        assert_eq!(loaded.last_item.as_deref(), Some("2"));
    }
}
