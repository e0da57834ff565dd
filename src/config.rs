//! JSON configuration: global fetch options plus a list of sources. Each
//! source entry is validated independently at load time, so one bad entry is
//! skipped with a diagnostic instead of poisoning the run.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::error::HarvestError;
use crate::fetcher::FetcherConfig;

pub const DEFAULT_USER_AGENT: &str = "OrgHarvestBot/1.0 (+contact@example.com)";

/// Column/key names mapping source data onto the three record fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub name: String,
    pub website: String,
    pub info: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            website: "website".to_string(),
            info: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySource {
    pub name: Option<String>,
    pub url: String,
    pub item_selector: String,
    pub name_selector: Option<String>,
    pub website_selector: Option<String>,
    pub info_selector: Option<String>,
    pub next_page_selector: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvSource {
    pub name: Option<String>,
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub columns: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonSource {
    pub name: Option<String>,
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    /// Key to descend into when the top-level value is an object.
    pub root: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationDirectorySource {
    pub name: Option<String>,
    pub url: String,
    /// Path convention for detail-page links, e.g. "/companies/".
    pub link_prefix: String,
    #[serde(default)]
    pub fetch_detail_pages: bool,
    pub max_links: Option<usize>,
}

/// Closed union of source strategies, resolved once at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    Directory(DirectorySource),
    Csv(CsvSource),
    Json(JsonSource),
    LocationDirectory(LocationDirectorySource),
}

impl SourceKind {
    /// Configured source identifier, defaulting to the type tag.
    pub fn name(&self) -> &str {
        match self {
            SourceKind::Directory(cfg) => cfg.name.as_deref().unwrap_or("directory"),
            SourceKind::Csv(cfg) => cfg.name.as_deref().unwrap_or("csv"),
            SourceKind::Json(cfg) => cfg.name.as_deref().unwrap_or("json"),
            SourceKind::LocationDirectory(cfg) => {
                cfg.name.as_deref().unwrap_or("location_directory")
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            SourceKind::Csv(cfg) if cfg.url.is_none() && cfg.path.is_none() => {
                Err("needs a `url` or a `path`".to_string())
            }
            SourceKind::Json(cfg) if cfg.url.is_none() && cfg.path.is_none() => {
                Err("needs a `url` or a `path`".to_string())
            }
            SourceKind::LocationDirectory(cfg) if cfg.link_prefix.is_empty() => {
                Err("`link_prefix` must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    user_agent: Option<String>,
    rate_limit_seconds: Option<f64>,
    timeout_seconds: Option<f64>,
    strict_robots: Option<bool>,
    enrich_careers: Option<bool>,
    #[serde(default)]
    sources: Vec<serde_json::Value>,
}

#[derive(Debug)]
pub struct HarvestConfig {
    pub user_agent: String,
    pub rate_limit_seconds: f64,
    pub timeout_seconds: f64,
    pub strict_robots: bool,
    pub enrich_careers: bool,
    pub sources: Vec<SourceKind>,
}

impl HarvestConfig {
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            user_agent: self.user_agent.clone(),
            rate_limit_seconds: self.rate_limit_seconds,
            timeout_seconds: self.timeout_seconds,
            strict_robots: self.strict_robots,
        }
    }
}

pub fn load_config(path: &Path) -> Result<HarvestConfig, HarvestError> {
    let text = fs::read_to_string(path).map_err(|err| HarvestError::Config {
        name: path.display().to_string(),
        reason: err.to_string(),
    })?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<HarvestConfig, HarvestError> {
    let raw: RawConfig = serde_json::from_str(text).map_err(|err| HarvestError::Config {
        name: "config".to_string(),
        reason: err.to_string(),
    })?;

    let mut sources = Vec::with_capacity(raw.sources.len());
    for entry in raw.sources {
        let label = entry
            .get("name")
            .or_else(|| entry.get("type"))
            .and_then(|value| value.as_str())
            .unwrap_or("unnamed")
            .to_string();
        match serde_json::from_value::<SourceKind>(entry) {
            Ok(source) => match source.validate() {
                Ok(()) => sources.push(source),
                Err(reason) => warn!(
                    "{}",
                    HarvestError::Config {
                        name: label,
                        reason
                    }
                ),
            },
            Err(err) => warn!(
                "{}",
                HarvestError::Config {
                    name: label,
                    reason: err.to_string(),
                }
            ),
        }
    }

    Ok(HarvestConfig {
        user_agent: raw.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        rate_limit_seconds: raw.rate_limit_seconds.unwrap_or(1.0),
        timeout_seconds: raw.timeout_seconds.unwrap_or(15.0),
        strict_robots: raw.strict_robots.unwrap_or(true),
        enrich_careers: raw.enrich_careers.unwrap_or(true),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.rate_limit_seconds, 1.0);
        assert_eq!(config.timeout_seconds, 15.0);
        assert!(config.strict_robots);
        assert!(config.enrich_careers);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn parses_all_source_kinds() {
        let config = parse_config(
            r#"{
                "sources": [
                    {"type": "directory", "url": "https://d.example/orgs",
                     "item_selector": ".org", "name_selector": "h3"},
                    {"type": "csv", "path": "orgs.csv",
                     "columns": {"name": "Company"}},
                    {"type": "json", "url": "https://a.example/orgs.json", "root": "items"},
                    {"type": "location_directory", "url": "https://c.example/companies",
                     "link_prefix": "/companies/", "fetch_detail_pages": true}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.sources.len(), 4);
        assert!(matches!(config.sources[0], SourceKind::Directory(_)));
        match &config.sources[1] {
            SourceKind::Csv(cfg) => {
                assert_eq!(cfg.columns.name, "Company");
                assert_eq!(cfg.columns.website, "website");
            }
            other => panic!("expected csv source, got {other:?}"),
        }
    }

    #[test]
    fn unknown_source_type_is_skipped() {
        let config = parse_config(
            r#"{"sources": [
                {"type": "rss", "url": "https://x.example/feed"},
                {"type": "csv", "path": "orgs.csv"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name(), "csv");
    }

    #[test]
    fn source_missing_required_field_is_skipped() {
        let config = parse_config(
            r#"{"sources": [
                {"type": "directory", "url": "https://d.example"},
                {"type": "csv"},
                {"type": "location_directory", "url": "https://c.example", "link_prefix": ""}
            ]}"#,
        )
        .unwrap();
        assert!(config.sources.is_empty());
    }

    #[test]
    fn source_names_default_to_type_tag() {
        let config = parse_config(
            r#"{"sources": [
                {"type": "json", "path": "a.json"},
                {"type": "json", "path": "b.json", "name": "partners"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(config.sources[0].name(), "json");
        assert_eq!(config.sources[1].name(), "partners");
    }
}
