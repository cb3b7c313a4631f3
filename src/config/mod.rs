//! Configuration loading and validation
//!
//! Configuration is a single TOML file; see `types` for the schema. Loading
//! also computes a SHA-256 hash of the file so runs can detect config drift.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, CrawlerConfig, ExtractConfig, FetchConfig, FilterConfig, OutputConfig, QueryRule,
    WatchConfig,
};
pub use validation::validate;
