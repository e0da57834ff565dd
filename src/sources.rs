//! Source extractors: each turns one validated source config into a finite
//! batch of partial records, using the fetcher for any network access.
//! Extractors never fail a run; unreachable pages and malformed documents
//! truncate or skip silently.

use std::collections::HashSet;
use std::fs;

use log::warn;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::config::{CsvSource, DirectorySource, JsonSource, LocationDirectorySource};
use crate::dom;
use crate::error::HarvestError;
use crate::fetcher::Fetcher;
use crate::records::{normalize_url, OrgRecord};

/// Domains that can never be an organization's own website.
const EXCLUDED_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "youtube.com",
    "crunchbase.com",
    "angel.co",
    "wellfound.com",
    "medium.com",
    "substack.com",
    "forbes.com",
    "techcrunch.com",
    "cnbc.com",
    "bloomberg.com",
    "wsj.com",
    "nytimes.com",
];

fn budget_spent(budget: Option<usize>, have: usize) -> bool {
    budget.is_some_and(|limit| have >= limit)
}

// ---------------------------------------------------------------------------
// Paginated HTML directory

pub fn extract_directory(
    cfg: &DirectorySource,
    fetcher: &mut Fetcher,
    budget: Option<usize>,
) -> Vec<OrgRecord> {
    let source_name = cfg.name.as_deref().unwrap_or("directory");
    let mut records = Vec::new();
    let mut visited = HashSet::new();
    let mut page_url = cfg.url.clone();

    while !budget_spent(budget, records.len()) {
        if !visited.insert(page_url.clone()) {
            break;
        }
        let Some(html) = fetcher.fetch_text(&page_url) else {
            break;
        };
        let (mut batch, next) = parse_directory_page(&html, cfg, source_name, &page_url);
        if let Some(limit) = budget {
            batch.truncate(limit - records.len());
        }
        records.append(&mut batch);

        match next {
            Some(next_url) => page_url = next_url,
            None => break,
        }
    }
    records
}

/// Parse one directory page: the records it yields and the resolved next-page
/// URL, if any.
fn parse_directory_page(
    html: &str,
    cfg: &DirectorySource,
    source_name: &str,
    page_url: &str,
) -> (Vec<OrgRecord>, Option<String>) {
    let item_selector = match Selector::parse(&cfg.item_selector) {
        Ok(selector) => selector,
        Err(err) => {
            warn!("source `{source_name}`: bad item selector `{}`: {err}", cfg.item_selector);
            return (Vec::new(), None);
        }
    };
    let doc = Html::parse_document(html);
    let mut records = Vec::new();

    for item in doc.select(&item_selector) {
        let name = cfg
            .name_selector
            .as_deref()
            .and_then(|selector| dom::select_first_text(item, selector));
        let website = cfg
            .website_selector
            .as_deref()
            .and_then(|selector| dom::select_first_attr(item, selector, "href"));
        let info = cfg
            .info_selector
            .as_deref()
            .and_then(|selector| dom::select_first_text(item, selector));
        if name.is_none() && website.is_none() && info.is_none() {
            continue;
        }
        records.push(OrgRecord {
            name,
            website: website.as_deref().map(normalize_url),
            info,
            source: source_name.to_string(),
            source_url: page_url.to_string(),
            ..Default::default()
        });
    }

    let next = cfg
        .next_page_selector
        .as_deref()
        .and_then(|selector| dom::select_first_attr(doc.root_element(), selector, "href"))
        .and_then(|href| resolve(page_url, &href));

    (records, next)
}

fn resolve(base: &str, href: &str) -> Option<String> {
    Url::parse(base).ok()?.join(href).ok().map(Into::into)
}

// ---------------------------------------------------------------------------
// CSV feed

pub fn extract_csv(
    cfg: &CsvSource,
    fetcher: &mut Fetcher,
    budget: Option<usize>,
) -> Vec<OrgRecord> {
    let source_name = cfg.name.as_deref().unwrap_or("csv");
    let Some((text, source_url)) = read_body(cfg.url.as_deref(), cfg.path.as_deref(), fetcher, source_name)
    else {
        return Vec::new();
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => {
            warn!(
                "{}",
                HarvestError::Parse {
                    reason: format!("CSV headers in `{source_name}`: {err}")
                }
            );
            return Vec::new();
        }
    };
    let position = |column: &str| headers.iter().position(|header| header == column);
    let name_idx = position(&cfg.columns.name);
    let website_idx = position(&cfg.columns.website);
    let info_idx = position(&cfg.columns.info);

    let mut records = Vec::new();
    for row in reader.records() {
        if budget_spent(budget, records.len()) {
            break;
        }
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!("source `{source_name}`: skipping malformed CSV row: {err}");
                continue;
            }
        };
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };
        // Rows with every field empty are still emitted; filtering is the
        // orchestrator's concern via dedup.
        records.push(OrgRecord {
            name: field(name_idx),
            website: field(website_idx).as_deref().map(normalize_url),
            info: field(info_idx),
            source: source_name.to_string(),
            source_url: source_url.clone(),
            ..Default::default()
        });
    }
    records
}

// ---------------------------------------------------------------------------
// JSON feed

pub fn extract_json(
    cfg: &JsonSource,
    fetcher: &mut Fetcher,
    budget: Option<usize>,
) -> Vec<OrgRecord> {
    let source_name = cfg.name.as_deref().unwrap_or("json");
    let Some((text, source_url)) = read_body(cfg.url.as_deref(), cfg.path.as_deref(), fetcher, source_name)
    else {
        return Vec::new();
    };

    let data: Value = match serde_json::from_str(&text) {
        Ok(data) => data,
        Err(err) => {
            warn!(
                "{}",
                HarvestError::Parse {
                    reason: format!("JSON body of `{source_name}`: {err}")
                }
            );
            return Vec::new();
        }
    };

    let items = match (&data, &cfg.root) {
        (Value::Object(map), Some(root)) => map.get(root).unwrap_or(&data),
        _ => &data,
    };
    let Some(items) = items.as_array() else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for item in items {
        if budget_spent(budget, records.len()) {
            break;
        }
        let Some(entry) = item.as_object() else {
            continue;
        };
        let website = json_field(entry, &cfg.fields.website);
        records.push(OrgRecord {
            name: json_field(entry, &cfg.fields.name),
            website: website.as_deref().map(normalize_url),
            info: json_field(entry, &cfg.fields.info),
            source: source_name.to_string(),
            source_url: source_url.clone(),
            ..Default::default()
        });
    }
    records
}

fn json_field(entry: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Single-page location directory

pub fn extract_location_directory(
    cfg: &LocationDirectorySource,
    fetcher: &mut Fetcher,
    budget: Option<usize>,
) -> Vec<OrgRecord> {
    let source_name = cfg.name.as_deref().unwrap_or("location_directory");
    let Some(html) = fetcher.fetch_text(&cfg.url) else {
        return Vec::new();
    };
    let links = listing_links(&html, &cfg.url, &cfg.link_prefix, cfg.max_links);

    let mut records = Vec::new();
    for (name, detail_url) in links {
        if budget_spent(budget, records.len()) {
            break;
        }
        let mut record = OrgRecord {
            name,
            source: source_name.to_string(),
            source_url: cfg.url.clone(),
            ..Default::default()
        };
        record
            .extra
            .insert("detail_url".to_string(), Value::String(detail_url.clone()));
        if cfg.fetch_detail_pages {
            if let Some(detail_html) = fetcher.fetch_text(&detail_url) {
                apply_detail_page(&mut record, &detail_html);
            }
        }
        records.push(record);
    }
    records
}

/// Internal detail-page links on a listing page: same host, path under
/// `link_prefix`, deduplicated in document order. Anchor text becomes the
/// organization name.
fn listing_links(
    html: &str,
    base: &str,
    link_prefix: &str,
    max_links: Option<usize>,
) -> Vec<(Option<String>, String)> {
    let Ok(base_url) = Url::parse(base) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]").unwrap();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in doc.select(&anchor_selector) {
        if max_links.is_some_and(|max| links.len() >= max) {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        if resolved.host_str() != base_url.host_str() {
            continue;
        }
        if !resolved.path().starts_with(link_prefix) || resolved.path().len() <= link_prefix.len()
        {
            continue;
        }
        let detail_url = resolved.to_string();
        if !seen.insert(detail_url.clone()) {
            continue;
        }
        let name = Some(dom::element_text(anchor)).filter(|text| !text.is_empty());
        links.push((name, detail_url));
    }
    links
}

fn apply_detail_page(record: &mut OrgRecord, html: &str) {
    let doc = Html::parse_document(html);

    if record.website.is_none() {
        record.website = find_website_link(&doc).as_deref().map(normalize_url);
    }
    if record.info.is_none() {
        record.info = dom::select_first_attr(doc.root_element(), "meta[name=description]", "content")
            .or_else(|| dom::select_first_text(doc.root_element(), "p"));
    }

    // "Label: value" segments among the page's text nodes.
    for text in doc.root_element().text() {
        let Some((label, value)) = text.trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() || value.len() > 200 {
            continue;
        }
        let key = match label.trim().to_lowercase().as_str() {
            "batch" => "batch",
            "status" => "status",
            "team size" | "employees" => "employees",
            "location" => "location",
            "tags" | "industries" => "tags",
            _ => continue,
        };
        let value = if key == "batch" {
            value.to_uppercase()
        } else {
            value.to_string()
        };
        record
            .extra
            .entry(key.to_string())
            .or_insert(Value::String(value));
    }
}

/// Best-guess external website on a detail page: an anchor labeled "website",
/// else the first http(s) link to a non-excluded domain, preferring links
/// whose visible text names their own domain.
fn find_website_link(doc: &Html) -> Option<String> {
    let anchor_selector = Selector::parse("a[href]").unwrap();

    for anchor in doc.select(&anchor_selector) {
        let labeled = anchor
            .value()
            .attr("aria-label")
            .map(|label| label.trim().eq_ignore_ascii_case("website"))
            .unwrap_or(false)
            || dom::element_text(anchor).eq_ignore_ascii_case("website");
        if labeled {
            if let Some(href) = anchor.value().attr("href") {
                return Some(href.to_string());
            }
        }
    }

    let mut candidate = None;
    for anchor in doc.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(parsed) = Url::parse(href) else {
            continue;
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            continue;
        }
        let Some(host) = parsed.host_str() else {
            continue;
        };
        let domain = host.strip_prefix("www.").unwrap_or(host).to_lowercase();
        if EXCLUDED_DOMAINS.contains(&domain.as_str()) {
            continue;
        }
        let text = dom::element_text(anchor);
        if text.to_lowercase().contains(&domain) || text == href {
            return Some(href.to_string());
        }
        if candidate.is_none() {
            candidate = Some(href.to_string());
        }
    }
    candidate
}

fn read_body(
    url: Option<&str>,
    path: Option<&std::path::Path>,
    fetcher: &mut Fetcher,
    source_name: &str,
) -> Option<(String, String)> {
    if let Some(url) = url {
        let text = fetcher.fetch_text(url)?;
        return Some((text, url.to_string()));
    }
    let path = path?;
    match fs::read_to_string(path) {
        Ok(text) => Some((text, path.display().to_string())),
        Err(err) => {
            warn!("source `{source_name}`: reading {} failed: {err}", path.display());
            None
        }
    }
}
