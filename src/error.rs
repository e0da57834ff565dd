//! Typed errors for harvesting operations.
//!
//! None of these abort a run: policy, transport, and parse failures yield
//! absence at the call site, and a misconfigured source is skipped with a
//! diagnostic while the remaining sources proceed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Robots rules disallow the URL, or strict mode could not confirm a policy.
    #[error("robots policy denied {url}")]
    PolicyDenied { url: String },

    /// Timeout, connection failure, or HTTP status >= 400.
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Malformed JSON/HTML/CSV; the affected item or page is skipped.
    #[error("parse failure: {reason}")]
    Parse { reason: String },

    /// Missing required fields or an unknown source type; the source is skipped.
    #[error("source `{name}` misconfigured: {reason}")]
    Config { name: String, reason: String },
}
