//! Careers-page discovery. Link text/href signals are preferred over path
//! probing because they reflect the site's own navigation; strong keywords
//! alone confirm intent, weak keywords need a careers-looking path to avoid
//! false positives such as "employment law" articles.

use log::debug;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::dom;
use crate::fetcher::Fetcher;
use crate::records::normalize_url;

const STRONG_KEYWORDS: &[&str] = &[
    "careers",
    "career",
    "jobs",
    "job",
    "open roles",
    "openings",
    "vacancies",
    "join us",
    "work with",
    "work at",
];

const WEAK_KEYWORDS: &[&str] = &["employment", "hiring"];

/// Conventional paths probed when the homepage links give no signal.
const PROBE_PATHS: &[&str] = &[
    "/careers",
    "/careers/",
    "/jobs",
    "/jobs/",
    "/join",
    "/join-us",
    "/company/careers",
];

pub struct CareersClassifier {
    path_pattern: Regex,
    exclude_pattern: Regex,
}

impl Default for CareersClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CareersClassifier {
    pub fn new() -> Self {
        CareersClassifier {
            path_pattern: Regex::new(
                r"(?i)/(careers?|jobs?|open-roles|openings|vacancies|join-us|join|work-with|work-at|employment)",
            )
            .unwrap(),
            exclude_pattern: Regex::new(
                r"(?i)/(blog|news|press|media|events|guide|learn|resources|legal|privacy|terms|policy)",
            )
            .unwrap(),
        }
    }

    /// Classify one anchor by visible text and href.
    pub fn is_career_link(&self, text: &str, href: &str) -> bool {
        if text.is_empty() && href.is_empty() {
            return false;
        }
        if self.exclude_pattern.is_match(href) {
            return false;
        }
        if self.path_pattern.is_match(href) {
            return true;
        }
        let text_lower = text.to_lowercase();
        if STRONG_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            return true;
        }
        if WEAK_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            return self.path_pattern.is_match(href);
        }
        false
    }

    /// First career-looking link on an already-fetched homepage, resolved
    /// against it. Pure HTML scan, no network.
    pub fn career_link_in(&self, html: &str, base: &str) -> Option<String> {
        let base_url = Url::parse(base).ok()?;
        let doc = Html::parse_document(html);
        let anchor_selector = Selector::parse("a[href]").unwrap();

        for anchor in doc.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let text = dom::element_text(anchor);
            if self.is_career_link(&text, href) {
                if let Ok(resolved) = base_url.join(href) {
                    return Some(resolved.to_string());
                }
            }
        }
        None
    }

    /// Whether a fetched page's title or first heading confirms a careers page.
    pub fn page_looks_like_careers(&self, html: &str) -> bool {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let title = dom::select_first_text(root, "title").unwrap_or_default();
        let heading = dom::select_first_text(root, "h1").unwrap_or_default();
        let blob = format!("{title} {heading}").to_lowercase();
        STRONG_KEYWORDS.iter().any(|kw| blob.contains(kw))
    }

    /// Best-guess careers URL for an organization's website: link scan first,
    /// then the fixed probe list. Absence means nothing confirmed.
    pub fn find_careers_url(&self, fetcher: &mut Fetcher, website: &str) -> Option<String> {
        if website.is_empty() {
            return None;
        }
        let homepage = normalize_url(website);
        let html = fetcher.fetch_text(&homepage)?;
        if let Some(link) = self.career_link_in(&html, &homepage) {
            return Some(link);
        }

        let base_url = Url::parse(&homepage).ok()?;
        for path in PROBE_PATHS {
            let Ok(probe) = base_url.join(path) else {
                continue;
            };
            let probe = probe.to_string();
            let Some(page) = fetcher.fetch_text(&probe) else {
                continue;
            };
            if self.page_looks_like_careers(&page) {
                debug!("confirmed careers page at {probe}");
                return Some(probe);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn href_path_alone_confirms() {
        let classifier = CareersClassifier::new();
        assert!(classifier.is_career_link("", "/careers"));
        assert!(classifier.is_career_link("Team", "/jobs/engineering"));
        assert!(classifier.is_career_link("", "/open-roles"));
    }

    #[test]
    fn strong_text_alone_confirms() {
        let classifier = CareersClassifier::new();
        assert!(classifier.is_career_link("Join us", "/team"));
        assert!(classifier.is_career_link("Open roles", "/positions"));
    }

    #[test]
    fn weak_text_needs_path_corroboration() {
        let classifier = CareersClassifier::new();
        assert!(!classifier.is_career_link("Employment", "/about"));
        assert!(classifier.is_career_link("Employment", "/careers/list"));
        assert!(!classifier.is_career_link("We're hiring", "/team"));
    }

    #[test]
    fn excluded_paths_never_match() {
        let classifier = CareersClassifier::new();
        assert!(!classifier.is_career_link("Careers", "/blog/careers-at-acme"));
        assert!(!classifier.is_career_link("Jobs", "/news/jobs-report"));
        assert!(!classifier.is_career_link("Employment law", "/legal/employment"));
    }

    #[test]
    fn empty_link_never_matches() {
        let classifier = CareersClassifier::new();
        assert!(!classifier.is_career_link("", ""));
    }

    #[test]
    fn first_matching_link_wins_in_document_order() {
        let classifier = CareersClassifier::new();
        let html = r#"
            <a href="/about">About</a>
            <a href="/blog/jobs">From the blog</a>
            <a href="/careers">Careers</a>
            <a href="/jobs">Jobs</a>
        "#;
        let found = classifier.career_link_in(html, "https://acme.io");
        assert_eq!(found.as_deref(), Some("https://acme.io/careers"));
    }

    #[test]
    fn relative_links_resolve_against_homepage() {
        let classifier = CareersClassifier::new();
        let html = r#"<a href="careers">Careers</a>"#;
        let found = classifier.career_link_in(html, "https://acme.io/en/");
        assert_eq!(found.as_deref(), Some("https://acme.io/en/careers"));
    }

    #[test]
    fn no_matching_links_yields_none() {
        let classifier = CareersClassifier::new();
        let html = r#"<a href="/about">About</a><a href="/contact">Contact</a>"#;
        assert_eq!(classifier.career_link_in(html, "https://acme.io"), None);
    }

    #[test]
    fn page_classification_reads_title_and_heading() {
        let classifier = CareersClassifier::new();
        assert!(classifier.page_looks_like_careers("<title>Jobs at Acme</title>"));
        assert!(classifier.page_looks_like_careers("<h1>Careers</h1>"));
        assert!(classifier.page_looks_like_careers("<title>Acme</title><h1>Open roles</h1>"));
        assert!(!classifier.page_looks_like_careers("<title>Acme</title><h1>Products</h1>"));
        assert!(!classifier.page_looks_like_careers(""));
    }
}
