//! Integration tests for the crawler
//!
//! These tests run the full coordinator against wiremock servers: seed a
//! small mock site, let the crawl drain and hit its idle threshold, then
//! inspect the records file and the checkpoint left on disk.

use driftnet::config::{
    Config, CrawlerConfig, ExtractConfig, FetchConfig, FilterConfig, OutputConfig, QueryRule,
    WatchConfig,
};
use driftnet::crawler::{CheckpointManager, Coordinator};
use driftnet::output::Record;
use std::collections::HashSet;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a test configuration rooted in a temp directory, tuned for fast
/// termination: tiny idle threshold, no pacing, no backoff delay
fn test_config(seed_url: &str, dir: &TempDir, filter: FilterConfig) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_url: seed_url.to_string(),
            max_depth: None,
            fetch_workers: 1,
            parse_workers: 1,
            save_interval_secs: 1,
            idle_threshold_secs: 3,
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
        filter,
        output: OutputConfig {
            records_path: dir.path().join("records.jsonl").display().to_string(),
            rotate_bytes: 1024 * 1024,
            checkpoint_path: dir.path().join("checkpoint.json").display().to_string(),
            links_log_path: dir.path().join("links.jsonl").display().to_string(),
        },
        extract: ExtractConfig::default(),
        watch: WatchConfig {
            poll_interval_secs: 1,
            marker_path: dir.path().join("marker.json").display().to_string(),
        },
    }
}

/// The mock servers speak plain http, so the https upgrade stays off
fn lax_filter() -> FilterConfig {
    FilterConfig {
        force_https: false,
        ..FilterConfig::default()
    }
}

fn html_page(text: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body><p>{}</p>{}</body></html>", text, anchors)
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn read_records(dir: &TempDir) -> Vec<Record> {
    std::fs::read_to_string(dir.path().join("records.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_crawl_follows_links_and_skips_excluded_paths() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/a",
        html_page("Page A content", &["/b", "/wj/c"]),
    )
    .await;
    mount_page(&server, "/b", html_page("Page B content", &[])).await;

    // The excluded path must never be requested, however often discovered
    Mock::given(method("GET"))
        .and(path("/wj/c"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let filter = FilterConfig {
        excluded_paths: vec!["/wj/".to_string()],
        ..lax_filter()
    };
    let config = test_config(&format!("{}/a", base), &dir, filter);

    let coordinator = Coordinator::new(config, true).expect("failed to build coordinator");
    coordinator.run().await.expect("crawl failed");

    let records = read_records(&dir);
    let urls: HashSet<String> = records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(records.len(), 2, "expected records for /a and /b only");
    assert!(urls.contains(&format!("{}/a", base)));
    assert!(urls.contains(&format!("{}/b", base)));

    // The checkpoint reflects the same picture: a and b visited, c absent
    let checkpoint = CheckpointManager::load(&dir.path().join("checkpoint.json"));
    let visited: HashSet<String> = checkpoint.visited.iter().cloned().collect();
    assert!(visited.contains(&format!("{}/a", base)));
    assert!(visited.contains(&format!("{}/b", base)));
    assert!(!visited.iter().any(|u| u.contains("/wj/")));
    assert!(checkpoint.fetch_queue.is_empty());
    assert!(checkpoint.parse_queue.is_empty());
}

#[tokio::test]
async fn test_duplicate_content_is_persisted_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Index page", &["/copy1", "/copy2"])).await;
    // Same body reachable under two URLs
    mount_page(&server, "/copy1", html_page("The identical article", &[])).await;
    mount_page(&server, "/copy2", html_page("The identical article", &[])).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&format!("{}/", base), &dir, lax_filter());

    let coordinator = Coordinator::new(config, true).expect("failed to build coordinator");
    coordinator.run().await.expect("crawl failed");

    let records = read_records(&dir);
    assert_eq!(records.len(), 2, "index plus exactly one of the copies");

    let duplicates = records
        .iter()
        .filter(|r| r.merged_text.contains("identical article"))
        .count();
    assert_eq!(duplicates, 1);
}

#[tokio::test]
async fn test_excluded_query_pattern_is_never_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Board index", &["/board?mid=n05", "/board?mid=m01"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/board"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Board page", &[]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let filter = FilterConfig {
        excluded_query: vec![QueryRule {
            key: "mid".to_string(),
            value_prefix: "n".to_string(),
        }],
        ..lax_filter()
    };
    let config = test_config(&format!("{}/", base), &dir, filter);

    let coordinator = Coordinator::new(config, true).expect("failed to build coordinator");
    coordinator.run().await.expect("crawl failed");

    let checkpoint = CheckpointManager::load(&dir.path().join("checkpoint.json"));
    assert!(checkpoint
        .visited
        .iter()
        .any(|u| u.contains("mid=m01")));
    assert!(!checkpoint.visited.iter().any(|u| u.contains("mid=n05")));
}

#[tokio::test]
async fn test_identity_collapsing_fetches_one_variant() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Notice board",
            &[
                "/notice?article_no=7&offset=0",
                "/notice?offset=20&article_no=7",
            ],
        ),
    )
    .await;
    // Both links denote article 7; only one fetch may happen
    Mock::given(method("GET"))
        .and(path("/notice"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Article seven", &[]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let filter = FilterConfig {
        identity_keys: vec!["article_no".to_string()],
        ..lax_filter()
    };
    let config = test_config(&format!("{}/", base), &dir, filter);

    let coordinator = Coordinator::new(config, true).expect("failed to build coordinator");
    coordinator.run().await.expect("crawl failed");

    let records = read_records(&dir);
    assert_eq!(records.len(), 2, "index plus one article variant");
}

#[tokio::test]
async fn test_resumed_crawl_refetches_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Expectations span both runs: every page is fetched exactly once
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Page A content", &["/b"]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Page B content", &[]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seed = format!("{}/a", base);

    let first = Coordinator::new(test_config(&seed, &dir, lax_filter()), true)
        .expect("failed to build coordinator");
    first.run().await.expect("first crawl failed");
    assert_eq!(read_records(&dir).len(), 2);

    // Second run resumes from the checkpoint: nothing to fetch, no new
    // records, and it still terminates via the idle threshold
    let second = Coordinator::new(test_config(&seed, &dir, lax_filter()), false)
        .expect("failed to build coordinator");
    second.run().await.expect("second crawl failed");
    assert_eq!(read_records(&dir).len(), 2);
}

#[tokio::test]
async fn test_failed_fetches_do_not_stall_the_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Front page", &["/gone", "/alive"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/alive", html_page("Still here", &[])).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&format!("{}/", base), &dir, lax_filter());

    let coordinator = Coordinator::new(config, true).expect("failed to build coordinator");
    coordinator.run().await.expect("crawl failed");

    let records = read_records(&dir);
    let urls: HashSet<String> = records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(records.len(), 2);
    assert!(urls.contains(&format!("{}/", base)));
    assert!(urls.contains(&format!("{}/alive", base)));

    // The dead URL stays visited so it is not retried on resume
    let checkpoint = CheckpointManager::load(&dir.path().join("checkpoint.json"));
    assert!(checkpoint.visited.iter().any(|u| u.contains("/gone")));
    assert!(!checkpoint.parsed.iter().any(|u| u.contains("/gone")));
}
