use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// One harvested organization. Extractors fill the identity fields, the
/// careers classifier fills `careers_url`, the orchestrator stamps
/// `collected_at` once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgRecord {
    pub name: Option<String>,
    pub website: Option<String>,
    pub info: Option<String>,
    pub careers_url: Option<String>,
    pub source: String,
    pub source_url: String,
    pub collected_at: Option<String>,
    /// Source-specific metadata (detail_url, batch, status, ...). Flattened
    /// into the JSON object so downstream consumers see plain fields.
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OrgRecord {
    /// Uniqueness key: later records with the same (name, website) are dropped.
    pub fn dedupe_key(&self) -> (Option<String>, Option<String>) {
        (self.name.clone(), self.website.clone())
    }
}

/// Add an `https://` scheme to bare hostnames. URLs that already carry a
/// scheme pass through untouched, so the function is idempotent.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match Url::parse(trimmed) {
        Ok(_) => trimmed.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => format!("https://{trimmed}"),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_to_bare_host() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("acme.io/about"), "https://acme.io/about");
    }

    #[test]
    fn normalize_keeps_schemed_urls() {
        assert_eq!(normalize_url("https://x.com"), "https://x.com");
        assert_eq!(normalize_url("http://x.com/a?b=1"), "http://x.com/a?b=1");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_url("example.com");
        assert_eq!(normalize_url(&once), once);
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_url("  example.com  "), "https://example.com");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut record = OrgRecord {
            name: Some("Acme".to_string()),
            website: Some("https://acme.io".to_string()),
            source: "csv".to_string(),
            source_url: "data/orgs.csv".to_string(),
            ..Default::default()
        };
        record
            .extra
            .insert("batch".to_string(), serde_json::json!("W24"));

        let line = serde_json::to_string(&record).unwrap();
        let parsed: OrgRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Acme"));
        assert_eq!(parsed.extra.get("batch"), Some(&serde_json::json!("W24")));
    }
}
