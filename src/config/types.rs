use serde::Deserialize;

/// Main configuration structure for driftnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Crawl lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from; its host becomes the target domain
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Maximum link depth from the seed; absent means unbounded
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,

    /// Number of concurrent fetch workers
    #[serde(rename = "fetch-workers", default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Number of concurrent parse workers
    #[serde(rename = "parse-workers", default = "default_parse_workers")]
    pub parse_workers: usize,

    /// Seconds between periodic checkpoint saves
    #[serde(rename = "save-interval-secs", default = "default_save_interval")]
    pub save_interval_secs: u64,

    /// Seconds both queues must stay empty before the crawl is declared done
    #[serde(rename = "idle-threshold-secs", default = "default_idle_threshold")]
    pub idle_threshold_secs: u64,
}

/// HTTP fetch behavior: retries, backoff, timeouts, pacing
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User-agent pool; one is picked at random per fetch
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Maximum attempts per URL
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in seconds; doubles each retry
    #[serde(rename = "backoff-base-secs", default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Upper bound on the backoff delay in seconds
    #[serde(rename = "backoff-cap-secs", default = "default_backoff_cap")]
    pub backoff_cap_secs: u64,

    /// Per-attempt request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Cumulative wall-clock budget per URL in seconds
    #[serde(rename = "time-budget-secs", default = "default_time_budget")]
    pub time_budget_secs: u64,

    /// Minimum randomized delay after a successful fetch, milliseconds
    #[serde(rename = "pacing-min-ms", default = "default_pacing_min")]
    pub pacing_min_ms: u64,

    /// Maximum randomized delay after a successful fetch, milliseconds
    #[serde(rename = "pacing-max-ms", default = "default_pacing_max")]
    pub pacing_max_ms: u64,
}

/// A blocked query parameter rule: reject when `key`'s value starts with `value-prefix`
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRule {
    pub key: String,
    #[serde(rename = "value-prefix")]
    pub value_prefix: String,
}

/// URL admission policy: exclusion lists and normalization knobs
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Path prefixes that are never crawled
    #[serde(rename = "excluded-paths", default)]
    pub excluded_paths: Vec<String>,

    /// Full-URL prefixes that are never crawled
    #[serde(rename = "excluded-url-prefixes", default)]
    pub excluded_url_prefixes: Vec<String>,

    /// Blocked query parameter patterns
    #[serde(rename = "excluded-query", default)]
    pub excluded_query: Vec<QueryRule>,

    /// Query keys that identify a content item, in priority order
    #[serde(rename = "identity-keys", default)]
    pub identity_keys: Vec<String>,

    /// Query keys dropped during normalization
    #[serde(rename = "strip-params", default)]
    pub strip_params: Vec<String>,

    /// Upgrade http:// URLs to https:// during normalization
    #[serde(rename = "force-https", default = "default_force_https")]
    pub force_https: bool,
}

/// Output file locations and rotation policy
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSONL file the extracted records are appended to
    #[serde(rename = "records-path")]
    pub records_path: String,

    /// Rotate the records file once it exceeds this many bytes
    #[serde(rename = "rotate-bytes", default = "default_rotate_bytes")]
    pub rotate_bytes: u64,

    /// Path of the crawl state checkpoint
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Path of the append-only discovered-link log
    #[serde(rename = "links-log-path")]
    pub links_log_path: String,
}

/// Knobs consumed by the built-in HTML extractor
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Anchor targets with these extensions are collected as file links
    #[serde(rename = "file-extensions", default = "default_file_extensions")]
    pub file_extensions: Vec<String>,

    /// CSS selector for the "next item" link, used by watch mode
    #[serde(rename = "next-selector", default)]
    pub next_selector: Option<String>,
}

/// Single-site watch mode configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Seconds between polls while waiting for a new item
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Path of the last-seen-item marker file
    #[serde(rename = "marker-path", default = "default_marker_path")]
    pub marker_path: String,
}

fn default_fetch_workers() -> usize {
    1
}

fn default_parse_workers() -> usize {
    3
}

fn default_save_interval() -> u64 {
    10
}

fn default_idle_threshold() -> u64 {
    120
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:85.0) Gecko/20100101 Firefox/85.0".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15".to_string(),
    ]
}

fn default_max_retries() -> u32 {
    10
}

fn default_backoff_base() -> u64 {
    2
}

fn default_backoff_cap() -> u64 {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_time_budget() -> u64 {
    200
}

fn default_pacing_min() -> u64 {
    100
}

fn default_pacing_max() -> u64 {
    500
}

fn default_force_https() -> bool {
    true
}

fn default_rotate_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_file_extensions() -> Vec<String> {
    ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "hwp", "zip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_marker_path() -> String {
    "watch_marker.json".to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_paths: Vec::new(),
            excluded_url_prefixes: Vec::new(),
            excluded_query: Vec::new(),
            identity_keys: Vec::new(),
            strip_params: Vec::new(),
            force_https: default_force_https(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base(),
            backoff_cap_secs: default_backoff_cap(),
            timeout_secs: default_timeout(),
            time_budget_secs: default_time_budget(),
            pacing_min_ms: default_pacing_min(),
            pacing_max_ms: default_pacing_max(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            file_extensions: default_file_extensions(),
            next_selector: None,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            marker_path: default_marker_path(),
        }
    }
}
