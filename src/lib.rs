pub mod careers;
pub mod config;
pub mod dom;
pub mod error;
pub mod fetcher;
pub mod harvest;
pub mod logger;
pub mod output;
pub mod progress;
pub mod records;
pub mod robots;
pub mod sources;

// Exporting types for convenience
pub use careers::CareersClassifier;
pub use config::{HarvestConfig, SourceKind};
pub use error::HarvestError;
pub use fetcher::{Fetcher, FetcherConfig, RateGate};
pub use progress::Progress;
pub use records::{normalize_url, OrgRecord};
pub use robots::RobotsPolicy;
