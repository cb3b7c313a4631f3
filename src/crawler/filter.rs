//! URL admission policy
//!
//! Decides whether a normalized URL may ever enter the frontier. The rules
//! are pure configuration (blocked path prefixes, blocked URL prefixes,
//! blocked query patterns); results are memoized per URL since admissibility
//! never changes within a run.

use crate::config::{FilterConfig, QueryRule};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

pub struct ExclusionFilter {
    url_prefixes: Vec<String>,
    path_prefixes: Vec<String>,
    query_rules: Vec<QueryRule>,
    cache: Mutex<HashMap<String, bool>>,
}

impl ExclusionFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            url_prefixes: config.excluded_url_prefixes.clone(),
            path_prefixes: config.excluded_paths.clone(),
            query_rules: config.excluded_query.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when the URL must stay out of the frontier
    pub fn is_excluded(&self, url: &Url) -> bool {
        let key = url.as_str();

        if let Some(&cached) = self.cache.lock().unwrap().get(key) {
            return cached;
        }

        let excluded = self.evaluate(url);
        self.cache
            .lock()
            .unwrap()
            .insert(key.to_string(), excluded);
        excluded
    }

    fn evaluate(&self, url: &Url) -> bool {
        let url_str = url.as_str();
        if self
            .url_prefixes
            .iter()
            .any(|prefix| url_str.starts_with(prefix.as_str()))
        {
            return true;
        }

        let path = url.path();
        if self
            .path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return true;
        }

        url.query_pairs().any(|(key, value)| {
            self.query_rules
                .iter()
                .any(|rule| key == rule.key.as_str() && value.starts_with(rule.value_prefix.as_str()))
        })
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}
