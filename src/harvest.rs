//! Harvest orchestration: run every configured source in order, deduplicate,
//! enrich with careers pages, stamp the run.

use std::collections::HashSet;

use chrono::Utc;
use log::info;

use crate::careers::CareersClassifier;
use crate::config::{HarvestConfig, SourceKind};
use crate::fetcher::Fetcher;
use crate::records::OrgRecord;
use crate::sources;

/// Concatenate extractor output across sources, stopping as soon as `limit`
/// records have been collected (mid-source truncation allowed).
pub fn collect_records(
    sources_list: &[SourceKind],
    fetcher: &mut Fetcher,
    limit: Option<usize>,
) -> Vec<OrgRecord> {
    let mut records = Vec::new();
    for source in sources_list {
        if limit.is_some_and(|cap| records.len() >= cap) {
            break;
        }
        let budget = limit.map(|cap| cap - records.len());
        info!("harvesting source `{}`", source.name());
        let mut batch = match source {
            SourceKind::Directory(cfg) => sources::extract_directory(cfg, fetcher, budget),
            SourceKind::Csv(cfg) => sources::extract_csv(cfg, fetcher, budget),
            SourceKind::Json(cfg) => sources::extract_json(cfg, fetcher, budget),
            SourceKind::LocationDirectory(cfg) => {
                sources::extract_location_directory(cfg, fetcher, budget)
            }
        };
        info!("source `{}` produced {} records", source.name(), batch.len());
        records.append(&mut batch);
    }
    if let Some(cap) = limit {
        records.truncate(cap);
    }
    records
}

/// Drop later records sharing a (name, website) key, preserving first-seen order.
pub fn dedupe_records(records: Vec<OrgRecord>) -> Vec<OrgRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.dedupe_key()) {
            unique.push(record);
        }
    }
    unique
}

/// Full pipeline: collect, dedupe, optionally classify careers pages, and
/// stamp every surviving record with one run timestamp.
pub fn run(
    config: &HarvestConfig,
    fetcher: &mut Fetcher,
    limit: Option<usize>,
    enrich: bool,
) -> Vec<OrgRecord> {
    let collected = collect_records(&config.sources, fetcher, limit);
    let mut records = dedupe_records(collected);
    info!("{} unique records after dedup", records.len());

    if enrich {
        let classifier = CareersClassifier::new();
        for record in &mut records {
            let Some(website) = record.website.clone() else {
                continue;
            };
            record.careers_url = classifier.find_careers_url(fetcher, &website);
        }
    }

    let stamp = run_stamp();
    for record in &mut records {
        record.collected_at = Some(stamp.clone());
    }
    records
}

/// One timestamp shared by all records of a run. RFC 3339, UTC, whole seconds.
pub fn run_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
