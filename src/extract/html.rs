//! Scraper-backed extractor for ordinary HTML sites

use crate::config::ExtractConfig;
use crate::extract::{ExtractError, Extractor, Table};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Default [`Extractor`] implementation built on the scraper crate
///
/// Link extraction is restricted to the crawl's target domain (and its
/// subdomains); images, files, and tables are collected from wherever the
/// page references them.
pub struct HtmlExtractor {
    base_domain: String,
    file_extensions: Vec<String>,
    next_selector: Option<String>,
}

impl HtmlExtractor {
    /// Creates an extractor scoped to the given domain
    ///
    /// `base_domain` should be the seed URL's host; a leading `www.` is
    /// stripped so `www.example.org` and `example.org` scope identically.
    pub fn new(base_domain: &str, config: &ExtractConfig) -> Self {
        Self {
            base_domain: strip_www(base_domain).to_lowercase(),
            file_extensions: config
                .file_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            next_selector: config.next_selector.clone(),
        }
    }

    fn in_scope(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => {
                let host = strip_www(host).to_lowercase();
                host == self.base_domain || host.ends_with(&format!(".{}", self.base_domain))
            }
            None => false,
        }
    }

    fn is_file_link(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        self.file_extensions
            .iter()
            .any(|ext| path.ends_with(&format!(".{}", ext)))
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Decodes page bytes, rejecting content that is clearly not text
fn decode(content: &[u8]) -> Result<String, ExtractError> {
    if content.contains(&0) {
        return Err(ExtractError::Malformed(
            "binary content where markup was expected".to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(content).into_owned())
}

/// Resolves an href to an absolute HTTP(S) URL, dropping link types that
/// never lead to a page: scripts, mail/tel handlers, data URIs, and
/// same-page anchors
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}

/// Collects visible text below `element`, skipping script-like subtrees
fn collect_text(element: ElementRef, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            match el.value().name() {
                "script" | "style" | "noscript" | "template" => continue,
                _ => collect_text(el, out),
            }
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
    }
}

impl Extractor for HtmlExtractor {
    fn extract_text(&self, content: &[u8], _url: &Url) -> Result<String, ExtractError> {
        let html = decode(content)?;
        let document = Html::parse_document(&html);

        let body_selector = Selector::parse("body").expect("static selector");
        let mut pieces = Vec::new();
        match document.select(&body_selector).next() {
            Some(body) => collect_text(body, &mut pieces),
            None => collect_text(document.root_element(), &mut pieces),
        }

        Ok(pieces.join(" "))
    }

    fn extract_links(&self, content: &[u8], url: &Url) -> Vec<String> {
        let html = match decode(content) {
            Ok(html) => html,
            Err(_) => return Vec::new(),
        };
        let document = Html::parse_document(&html);
        let selector = Selector::parse("a[href]").expect("static selector");

        let mut links = Vec::new();
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, url) {
                    if self.in_scope(&absolute) && !self.is_file_link(&absolute) {
                        links.push(absolute.to_string());
                    }
                }
            }
        }
        links
    }

    fn extract_images(&self, content: &[u8], url: &Url) -> Vec<String> {
        let html = match decode(content) {
            Ok(html) => html,
            Err(_) => return Vec::new(),
        };
        let document = Html::parse_document(&html);
        let selector = Selector::parse("img[src]").expect("static selector");

        document
            .select(&selector)
            .filter_map(|element| element.value().attr("src"))
            .filter_map(|src| resolve_link(src, url))
            .map(|u| u.to_string())
            .collect()
    }

    fn extract_files(&self, content: &[u8], url: &Url) -> Vec<String> {
        let html = match decode(content) {
            Ok(html) => html,
            Err(_) => return Vec::new(),
        };
        let document = Html::parse_document(&html);
        let selector = Selector::parse("a[href]").expect("static selector");

        document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, url))
            .filter(|u| self.is_file_link(u))
            .map(|u| u.to_string())
            .collect()
    }

    fn extract_tables(&self, content: &[u8], _url: &Url) -> Vec<Table> {
        let html = match decode(content) {
            Ok(html) => html,
            Err(_) => return Vec::new(),
        };
        let document = Html::parse_document(&html);
        let table_selector = Selector::parse("table").expect("static selector");
        let caption_selector = Selector::parse("caption").expect("static selector");
        let row_selector = Selector::parse("tr").expect("static selector");
        let cell_selector = Selector::parse("th, td").expect("static selector");

        let mut tables = Vec::new();
        for table in document.select(&table_selector) {
            let caption = table
                .select(&caption_selector)
                .next()
                .map(|c| c.text().collect::<String>().trim().to_string())
                .filter(|c| !c.is_empty());

            let rows: Vec<Vec<String>> = table
                .select(&row_selector)
                .map(|row| {
                    row.select(&cell_selector)
                        .map(|cell| {
                            cell.text()
                                .collect::<String>()
                                .split_whitespace()
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .collect()
                })
                .filter(|cells: &Vec<String>| !cells.is_empty())
                .collect();

            if !rows.is_empty() {
                tables.push(Table { caption, rows });
            }
        }
        tables
    }

    fn next_link(&self, content: &[u8], url: &Url) -> Option<String> {
        let selector_str = self.next_selector.as_deref()?;
        let html = decode(content).ok()?;
        let document = Html::parse_document(&html);
        let selector = Selector::parse(selector_str).ok()?;

        document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("href"))
            .and_then(|href| resolve_link(href, url))
            .map(|u| u.to_string())
    }
}
