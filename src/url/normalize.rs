use crate::config::FilterConfig;
use crate::UrlError;
use url::Url;

/// Normalization policy: which query keys to drop and whether to upgrade
/// plain http URLs to https
///
/// Kept separate from the full filter configuration so normalization stays a
/// pure function of (url, policy).
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    pub strip_params: Vec<String>,
    pub force_https: bool,
}

impl UrlPolicy {
    pub fn new(strip_params: Vec<String>, force_https: bool) -> Self {
        Self {
            strip_params,
            force_https,
        }
    }
}

impl From<&FilterConfig> for UrlPolicy {
    fn from(filter: &FilterConfig) -> Self {
        Self {
            strip_params: filter.strip_params.clone(),
            force_https: filter.force_https,
        }
    }
}

/// Normalizes a URL to its canonical comparison form
///
/// Steps, in order:
///
/// 1. Parse; reject malformed or non-HTTP(S) URLs
/// 2. Upgrade http:// to https:// (when the policy says so)
/// 3. Lowercase the host and strip a leading `www.`
/// 4. Normalize the path: drop dot segments and duplicate slashes,
///    strip the trailing slash (root `/` is kept)
/// 5. Drop the fragment
/// 6. Drop query keys on the policy's removal list, sort the rest by key
///
/// Two URLs that differ only in fragment, query order, or removed keys
/// normalize identically.
///
/// # Examples
///
/// ```
/// use driftnet::url::{normalize_url, UrlPolicy};
///
/// let policy = UrlPolicy::new(vec![], true);
/// let url = normalize_url("http://WWW.EXAMPLE.ORG/page/", &policy).unwrap();
/// assert_eq!(url.as_str(), "https://example.org/page");
/// ```
pub fn normalize_url(url_str: &str, policy: &UrlPolicy) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if policy.force_https && url.scheme() == "http" {
        url.set_scheme("https")
            .map_err(|_| UrlError::Malformed("Failed to upgrade scheme".to_string()))?;
    }

    if let Some(host) = url.host_str() {
        let mut normalized_host = host.to_lowercase();
        if let Some(stripped) = normalized_host.strip_prefix("www.") {
            normalized_host = stripped.to_string();
        }
        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    } else {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url, &policy.strip_params);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Removes dot segments and duplicate slashes, strips the trailing slash
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Drops removed keys and sorts the survivors lexicographically by key
fn filter_and_sort_query_params(url: &Url, strip_params: &[String]) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !strip_params.iter().any(|s| s.eq_ignore_ascii_case(key)))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UrlPolicy {
        UrlPolicy::new(vec!["session".to_string(), "ref".to_string()], true)
    }

    #[test]
    fn test_http_upgraded_to_https() {
        let result = normalize_url("http://example.org/page", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/page");
    }

    #[test]
    fn test_http_kept_when_not_forced() {
        let lax = UrlPolicy::new(vec![], false);
        let result = normalize_url("http://example.org/page", &lax).unwrap();
        assert_eq!(result.as_str(), "http://example.org/page");
    }

    #[test]
    fn test_remove_www_and_lowercase_host() {
        let result = normalize_url("https://WWW.Example.ORG/Page", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/Page");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.org/page/", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.org/", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.org/page#section", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.org/page?b=2&a=1", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/page?a=1&b=2");
    }

    #[test]
    fn test_strip_configured_params() {
        let result =
            normalize_url("https://example.org/page?session=abc&keep=yes", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/page?keep=yes");
    }

    #[test]
    fn test_all_params_stripped_drops_query() {
        let result = normalize_url("https://example.org/page?session=a&ref=b", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/page");
    }

    #[test]
    fn test_query_variants_normalize_identically() {
        let a = normalize_url("https://example.org/p?x=1&y=2", &policy()).unwrap();
        let b = normalize_url("https://example.org/p?y=2&x=1#frag", &policy()).unwrap();
        let c = normalize_url("http://www.example.org/p?y=2&session=z&x=1", &policy()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.org/a/../b/./c", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/b/c");
    }

    #[test]
    fn test_multiple_slashes_collapsed() {
        let result = normalize_url("https://example.org///path//to///page", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/path/to/page");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.org", &policy()).unwrap();
        assert_eq!(result.as_str(), "https://example.org/");
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let result = normalize_url("ftp://example.org/file", &policy());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url_rejected() {
        assert!(normalize_url("not a url", &policy()).is_err());
    }
}
