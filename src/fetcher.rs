//! Polite HTTP fetching: one shared request clock across every host, and a
//! robots-exclusion check before every GET/HEAD.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::error::HarvestError;
use crate::robots::RobotsPolicy;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub rate_limit_seconds: f64,
    pub timeout_seconds: f64,
    pub strict_robots: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "OrgHarvestBot/1.0 (+contact@example.com)".to_string(),
            rate_limit_seconds: 1.0,
            timeout_seconds: 15.0,
            strict_robots: true,
        }
    }
}

/// Shared request pacing. One clock for all destinations: the limit bounds
/// the aggregate load of a run, not the per-host load.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Block until the interval since the last marked request has elapsed.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
    }

    /// Record that a request was just issued. Failures count too: they still
    /// consume the rate budget.
    pub fn mark(&mut self) {
        self.last_request = Some(Instant::now());
    }
}

/// Cached per-origin robots state, never invalidated within a run.
#[derive(Debug)]
enum RobotsState {
    Policy(RobotsPolicy),
    /// robots.txt could not be fetched; strict mode denies, otherwise allowed.
    Unavailable,
}

pub struct Fetcher {
    client: Client,
    gate: RateGate,
    robots: HashMap<String, RobotsState>,
    user_agent: String,
    strict_robots: bool,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_seconds.max(0.0)))
            .default_headers(headers)
            .build()
            .expect("failed to build HTTP client");

        Fetcher {
            client,
            gate: RateGate::new(Duration::from_secs_f64(config.rate_limit_seconds.max(0.0))),
            robots: HashMap::new(),
            user_agent: config.user_agent.clone(),
            strict_robots: config.strict_robots,
        }
    }

    /// GET a page as text. Any denial or failure yields `None`; callers treat
    /// absence as a soft failure.
    pub fn fetch_text(&mut self, url: &str) -> Option<String> {
        match self.try_get(url) {
            Ok(body) => Some(body),
            Err(err) => {
                debug!("{err}");
                None
            }
        }
    }

    /// HEAD a URL, following redirects. False on denial or any failure.
    pub fn head_ok(&mut self, url: &str) -> bool {
        if !self.allowed(url) {
            return false;
        }
        self.gate.wait();
        let result = self.client.head(url).send();
        self.gate.mark();
        match result {
            Ok(resp) => resp.status().as_u16() < 400,
            Err(err) => {
                debug!("HEAD {url} failed: {err}");
                false
            }
        }
    }

    /// Whether robots rules permit fetching `url`. The origin's robots.txt is
    /// fetched and cached on first touch.
    pub fn allowed(&mut self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return !self.strict_robots;
        }
        let origin = parsed.origin().ascii_serialization();
        if !self.robots.contains_key(&origin) {
            let state = self.fetch_robots(&origin);
            self.robots.insert(origin.clone(), state);
        }
        match &self.robots[&origin] {
            RobotsState::Unavailable => !self.strict_robots,
            RobotsState::Policy(policy) => policy.is_allowed(&self.user_agent, parsed.path()),
        }
    }

    fn try_get(&mut self, url: &str) -> Result<String, HarvestError> {
        if !self.allowed(url) {
            return Err(HarvestError::PolicyDenied {
                url: url.to_string(),
            });
        }
        self.gate.wait();
        let result = self.client.get(url).send();
        self.gate.mark();
        let resp = result.map_err(|err| HarvestError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        if resp.status().as_u16() >= 400 {
            return Err(HarvestError::Transport {
                url: url.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }
        resp.text().map_err(|err| HarvestError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }

    fn fetch_robots(&mut self, origin: &str) -> RobotsState {
        let robots_url = format!("{origin}/robots.txt");
        self.gate.wait();
        let result = self.client.get(&robots_url).send();
        self.gate.mark();
        match result {
            Ok(resp) if resp.status().is_success() => match resp.text() {
                Ok(body) => RobotsState::Policy(RobotsPolicy::parse(&body)),
                Err(err) => {
                    debug!("reading {robots_url} failed: {err}");
                    RobotsState::Unavailable
                }
            },
            // An error status means no policy is published.
            Ok(resp) => {
                debug!("{robots_url} answered HTTP {}", resp.status());
                RobotsState::Policy(RobotsPolicy::default())
            }
            Err(err) => {
                debug!("fetching {robots_url} failed: {err}");
                RobotsState::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_fetcher(strict: bool) -> Fetcher {
        Fetcher::new(&FetcherConfig {
            strict_robots: strict,
            rate_limit_seconds: 0.0,
            ..FetcherConfig::default()
        })
    }

    fn seed(fetcher: &mut Fetcher, origin: &str, state: RobotsState) {
        fetcher.robots.insert(origin.to_string(), state);
    }

    #[test]
    fn rate_gate_spaces_consecutive_requests() {
        let interval = Duration::from_millis(60);
        let mut gate = RateGate::new(interval);

        gate.wait();
        gate.mark();
        let start = Instant::now();
        gate.wait();
        gate.mark();
        assert!(
            start.elapsed() >= interval,
            "second wait returned after {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn rate_gate_first_wait_is_immediate() {
        let mut gate = RateGate::new(Duration::from_secs(5));
        let start = Instant::now();
        gate.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn cached_disallow_denies_without_network() {
        let mut fetcher = offline_fetcher(true);
        seed(
            &mut fetcher,
            "https://h",
            RobotsState::Policy(RobotsPolicy::parse("User-agent: *\nDisallow: /private/\n")),
        );

        assert!(!fetcher.allowed("https://h/private/x"));
        assert_eq!(fetcher.fetch_text("https://h/private/x"), None);
        assert!(!fetcher.head_ok("https://h/private/x"));
        assert!(fetcher.allowed("https://h/public"));
    }

    #[test]
    fn unavailable_robots_follows_strict_mode() {
        let mut strict = offline_fetcher(true);
        seed(&mut strict, "https://h", RobotsState::Unavailable);
        assert!(!strict.allowed("https://h/page"));

        let mut lax = offline_fetcher(false);
        seed(&mut lax, "https://h", RobotsState::Unavailable);
        assert!(lax.allowed("https://h/page"));
    }

    #[test]
    fn invalid_and_non_http_urls() {
        let mut fetcher = offline_fetcher(true);
        assert!(!fetcher.allowed("not a url"));
        assert!(!fetcher.allowed("ftp://h/file"));

        let mut lax = offline_fetcher(false);
        assert!(lax.allowed("ftp://h/file"));
    }
}
