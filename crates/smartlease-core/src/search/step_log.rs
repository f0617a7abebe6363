//! Per-request stage snapshots
//!
//! When a directory is configured, each search overwrites `metadata.json`,
//! `search_results.json` and `final_results.json` there. Failures to write
//! are logged and never affect the request.

use super::hybrid::CandidateResult;
use crate::error::Result;
use crate::llm::{ExtractedMetadata, RerankOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";
pub const SEARCH_RESULTS_FILE: &str = "search_results.json";
pub const FINAL_RESULTS_FILE: &str = "final_results.json";

#[derive(Debug, Clone, Default)]
pub struct StepLog {
    dir: Option<PathBuf>,
}

impl StepLog {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn record_metadata(&self, user_query: &str, metadata: &ExtractedMetadata) {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            user_query: &'a str,
            metadata: &'a ExtractedMetadata,
        }
        self.save(
            METADATA_FILE,
            &Snapshot {
                user_query,
                metadata,
            },
        );
    }

    pub fn record_search_results(&self, results: &[CandidateResult]) {
        self.save(SEARCH_RESULTS_FILE, results);
    }

    pub fn record_final_results(&self, outcome: &RerankOutcome) {
        self.save(FINAL_RESULTS_FILE, outcome);
    }

    fn save<T: Serialize + ?Sized>(&self, filename: &str, data: &T) {
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(e) = write_json(dir, filename, data) {
            tracing::warn!("Failed to write step log {}: {}", filename, e);
        }
    }

    /// Delete every `*.json` file in the log directory
    pub fn clear(&self) -> Result<usize> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, filename: &str, data: &T) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let content = serde_json::to_string_pretty(data)?;
    std::fs::write(dir.join(filename), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::QueryMetadata;
    use tempfile::TempDir;

    #[test]
    fn test_writes_and_clears_snapshots() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("steps");
        let log = StepLog::new(Some(log_dir.clone()));

        log.record_metadata("2 bed in Boston", &ExtractedMetadata::Parsed(QueryMetadata::new()));
        log.record_search_results(&[]);
        log.record_final_results(&RerankOutcome::Ranked {
            ranked_properties: vec![],
        });
        std::fs::write(log_dir.join("notes.txt"), "keep").unwrap();

        let metadata: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(log_dir.join(METADATA_FILE)).unwrap())
                .unwrap();
        assert_eq!(metadata["user_query"], "2 bed in Boston");
        assert!(log_dir.join(SEARCH_RESULTS_FILE).exists());
        assert!(log_dir.join(FINAL_RESULTS_FILE).exists());

        assert_eq!(log.clear().unwrap(), 3);
        assert!(!log_dir.join(METADATA_FILE).exists());
        assert!(log_dir.join("notes.txt").exists());
    }

    #[test]
    fn test_disabled_log_is_noop() {
        let log = StepLog::new(None);
        log.record_search_results(&[]);
        assert_eq!(log.clear().unwrap(), 0);
    }
}
