//! HTTP fetcher with bounded retry
//!
//! One call retrieves one URL, or gives up. Transient failures (timeouts,
//! connection errors, 5xx) are retried with exponential backoff until either
//! the attempt count or the cumulative wall-clock budget runs out; client
//! errors and non-textual responses are never retried.

use crate::config::FetchConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

enum Attempt {
    /// Body retrieved; caller gets it after the pacing delay
    Success(Vec<u8>),
    /// Not worth retrying: client error or non-textual content
    Permanent,
    /// Worth retrying after backoff
    Transient,
}

/// Builds the shared HTTP client
///
/// Redirect following stays on the client's default policy; the user agent
/// is set per request so the configured pool can rotate.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Fetches one URL; `None` means "skip this URL for the rest of the run"
    pub async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let budget = Duration::from_secs(self.config.time_budget_secs);
        let cap = Duration::from_secs(self.config.backoff_cap_secs);
        let mut backoff = Duration::from_secs(self.config.backoff_base_secs);
        let started = Instant::now();
        let mut attempt = 0;

        while attempt < self.config.max_retries && started.elapsed() < budget {
            attempt += 1;

            match self.attempt(url, attempt).await {
                Attempt::Success(body) => {
                    self.pace().await;
                    return Some(body);
                }
                Attempt::Permanent => return None,
                Attempt::Transient => {}
            }

            if attempt >= self.config.max_retries || started.elapsed() >= budget {
                break;
            }
            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff, cap);
        }

        tracing::error!(
            "Giving up on {} after {} attempts ({:?} elapsed)",
            url,
            attempt,
            started.elapsed()
        );
        None
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Attempt {
        let agent = {
            let mut rng = rand::thread_rng();
            self.config
                .user_agents
                .choose(&mut rng)
                .cloned()
                .unwrap_or_default()
        };

        let response = match self.client.get(url).header(USER_AGENT, agent).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::warn!("Timeout fetching {} (attempt {})", url, attempt);
                return Attempt::Transient;
            }
            Err(e) if e.is_connect() => {
                tracing::warn!("Connection failure for {} (attempt {}): {}", url, attempt, e);
                return Attempt::Transient;
            }
            Err(e) => {
                tracing::warn!("Request failed for {} (attempt {}): {}", url, attempt, e);
                return Attempt::Transient;
            }
        };

        let status = response.status();

        if status == StatusCode::OK {
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_lowercase();

            if !is_textual(&content_type) {
                tracing::debug!("Skipping non-textual content ({}) at {}", content_type, url);
                return Attempt::Permanent;
            }

            return match response.bytes().await {
                Ok(body) => Attempt::Success(body.to_vec()),
                Err(e) => {
                    tracing::warn!("Failed reading body of {} (attempt {}): {}", url, attempt, e);
                    Attempt::Transient
                }
            };
        }

        if status.is_server_error() {
            tracing::warn!("Server error {} for {} (attempt {})", status, url, attempt);
            return Attempt::Transient;
        }

        tracing::error!("Client error {} for {}, not retrying", status, url);
        Attempt::Permanent
    }

    /// Sleeps for a random interval inside the configured pacing window
    async fn pace(&self) {
        if self.config.pacing_max_ms == 0 {
            return;
        }
        let delay_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.config.pacing_min_ms..=self.config.pacing_max_ms)
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/") || content_type.contains("html")
}

/// Doubles the backoff delay, saturating at the cap
fn next_backoff(current: Duration, cap: Duration) -> Duration {
    std::cmp::min(current * 2, cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(max_retries: u32) -> FetchConfig {
        FetchConfig {
            user_agents: vec!["TestAgent/1.0".to_string()],
            max_retries,
            backoff_base_secs: 0,
            backoff_cap_secs: 0,
            timeout_secs: 5,
            time_budget_secs: 30,
            pacing_min_ms: 0,
            pacing_max_ms: 0,
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let cap = Duration::from_secs(100);
        let mut delay = Duration::from_secs(2);
        let mut previous = delay;

        for _ in 0..10 {
            delay = next_backoff(delay, cap);
            assert!(delay >= previous, "backoff must be non-decreasing");
            assert!(delay <= cap, "backoff must respect the cap");
            previous = delay;
        }
        assert_eq!(delay, cap);
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("text/plain"));
        assert!(is_textual("application/xhtml+xml; charset=utf-8"));
        assert!(!is_textual("application/pdf"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual(""));
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>hello</html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_config(3)).unwrap();
        let body = fetcher.fetch(&format!("{}/page", server.uri())).await;
        assert_eq!(body, Some(b"<html>hello</html>".to_vec()));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_config(5)).unwrap();
        let body = fetcher.fetch(&format!("{}/missing", server.uri())).await;
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn test_non_textual_content_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0x25, 0x50, 0x44, 0x46])
                    .insert_header("content-type", "application/pdf"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_config(5)).unwrap();
        let body = fetcher.fetch(&format!("{}/doc.pdf", server.uri())).await;
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn test_server_error_retried_up_to_bound() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_config(3)).unwrap();
        let body = fetcher.fetch(&format!("{}/flaky", server.uri())).await;
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn test_server_error_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recovering"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/recovering"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("ok now")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_config(5)).unwrap();
        let body = fetcher.fetch(&format!("{}/recovering", server.uri())).await;
        assert_eq!(body, Some(b"ok now".to_vec()));
    }
}
