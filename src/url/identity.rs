use url::Url;

/// Derives the coarse content-identity key for a normalized URL
///
/// Board-style sites expose the same article under many URL variants
/// (pagination offsets, view-mode parameters). The identity key collapses
/// them: the configured keys are tried in priority order against the query
/// parameters, matching case-insensitively, and the first hit produces
/// `host + path + "?" + key + "=" + value` with the key lowercased. A URL
/// with no identity parameter is its own identity.
///
/// # Examples
///
/// ```
/// use driftnet::url::content_identity;
/// use url::Url;
///
/// let keys = vec!["article_no".to_string()];
/// let url = Url::parse("https://example.org/notice?ARTICLE_NO=123&offset=40").unwrap();
/// assert_eq!(content_identity(&url, &keys), "example.org/notice?article_no=123");
/// ```
pub fn content_identity(url: &Url, identity_keys: &[String]) -> String {
    let host = url.host_str().unwrap_or_default();

    for key in identity_keys {
        if let Some((_, value)) = url
            .query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            return format!(
                "{}{}?{}={}",
                host,
                url.path(),
                key.to_ascii_lowercase(),
                value
            );
        }
    }

    url.as_str().to_string()
}

/// Extracts the value of the first matching identity key, if any
///
/// Watch mode uses this to compare item numbers between polls.
pub fn identity_value(url: &Url, identity_keys: &[String]) -> Option<String> {
    for key in identity_keys {
        if let Some((_, value)) = url
            .query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            return Some(value.to_string());
        }
    }
    None
}
