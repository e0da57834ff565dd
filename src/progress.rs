//! Resume marker for enrichment runs: how many input records have been
//! processed, so a restarted run appends instead of re-fetching.

use std::fs;
use std::path::Path;

use log::{error, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Progress {
    pub next_index: usize,
}

impl Progress {
    /// Load the marker, falling back to index 0 on any problem.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("no progress file at {}; starting from the beginning", path.display());
            return Progress::default();
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                error!("failed to read progress file {}: {err}", path.display());
                return Progress::default();
            }
        };
        match serde_json::from_str::<Progress>(&content) {
            Ok(progress) => {
                info!("resuming at index {}", progress.next_index);
                progress
            }
            Err(err) => {
                error!("failed to parse progress file {}: {err}; starting fresh", path.display());
                Progress::default()
            }
        }
    }

    pub fn save(&self, path: &Path) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(err) => {
                error!("failed to serialize progress state: {err}");
                return;
            }
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    error!("failed to create {}: {err}", parent.display());
                    return;
                }
            }
        }
        if let Err(err) = fs::write(path, json + "\n") {
            error!("failed to write progress file {}: {err}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/progress.json");

        Progress { next_index: 42 }.save(&path);
        assert_eq!(Progress::load(&path).next_index, 42);
    }

    #[test]
    fn missing_file_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Progress::load(&dir.path().join("nope.json")).next_index, 0);
    }

    #[test]
    fn garbage_file_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{broken").unwrap();
        assert_eq!(Progress::load(&path).next_index, 0);
    }
}
