//! Detection history journal
//!
//! Newest-first ring of detection batches, capped and persisted to JSON
//! after every change. A missing or corrupt file degrades to an empty
//! journal so a bad disk never blocks the till.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::detect::Detection;

/// Errors raised by history file operations
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to access history file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse history file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One detection seen in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub name: String,
    pub confidence: f32,
}

/// One processed image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Wall-clock time, "YYYY-MM-DD HH:MM:SS"
    pub timestamp: String,
    /// Where the image came from ("camera" or "upload (<file>)")
    pub source: String,
    pub total_detected: usize,
    pub items: Vec<HistoryItem>,
}

impl HistoryRecord {
    /// Build a record for one image's detections.
    pub fn new(source: impl Into<String>, detections: &[Detection]) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.into(),
            total_detected: detections.len(),
            items: detections
                .iter()
                .map(|detection| HistoryItem {
                    name: detection.label.clone(),
                    confidence: detection.confidence,
                })
                .collect(),
        }
    }
}

/// The journal: newest first, capped, saved after every change.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    max_records: usize,
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    /// Open the journal at `path`, tolerating a missing or corrupt file.
    pub fn open(path: PathBuf, max_records: usize) -> Self {
        let records = match Self::read_records(&path) {
            Ok(records) => {
                debug!("Loaded {} history record(s) from {:?}", records.len(), path);
                records
            }
            Err(HistoryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Could not load history from {:?}: {}", path, e);
                Vec::new()
            }
        };
        Self {
            path,
            max_records,
            records,
        }
    }

    fn read_records(path: &Path) -> Result<Vec<HistoryRecord>, HistoryError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Prepend a record, drop overflow, persist. Save failures are logged
    /// and swallowed so detection flow is never interrupted.
    pub fn add(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(self.max_records);
        if let Err(e) = self.save() {
            warn!("Could not save history to {:?}: {}", self.path, e);
        }
    }

    /// Drop all records and persist the empty journal.
    pub fn clear(&mut self) {
        self.records.clear();
        if let Err(e) = self.save() {
            warn!("Could not save history to {:?}: {}", self.path, e);
        }
    }

    /// Write the full journal to an arbitrary path (user-driven export).
    pub fn export(&self, path: &Path) -> Result<(), HistoryError> {
        let content = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_record_shape() {
        let record = HistoryRecord::new(
            "upload (tray_01.jpg)",
            &[detection("Pho_bo", 0.92), detection("Banh_mi", 0.81)],
        );
        assert_eq!(record.source, "upload (tray_01.jpg)");
        assert_eq!(record.total_detected, 2);
        assert_eq!(record.items[0].name, "Pho_bo");
        assert!((record.items[0].confidence - 0.92).abs() < 0.001);
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(record.timestamp.len(), 19);
    }

    #[test]
    fn test_newest_first_and_capped() {
        let dir = tempdir().unwrap();
        let mut log = HistoryLog::open(dir.path().join("history.json"), 3);

        for index in 0..5 {
            log.add(HistoryRecord::new(format!("camera {}", index), &[]));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.records()[0].source, "camera 4");
        assert_eq!(log.records()[2].source, "camera 2");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");

        {
            let mut log = HistoryLog::open(path.clone(), 100);
            log.add(HistoryRecord::new("camera", &[detection("Pho_bo", 0.9)]));
            log.add(HistoryRecord::new("upload (a.jpg)", &[]));
        }

        let reopened = HistoryLog::open(path, 100);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.records()[0].source, "upload (a.jpg)");
        assert_eq!(reopened.records()[1].items.len(), 1);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{{ broken json").unwrap();

        let log = HistoryLog::open(path, 100);
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_persists_empty_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut log = HistoryLog::open(path.clone(), 100);
        log.add(HistoryRecord::new("camera", &[]));
        log.clear();
        assert!(log.is_empty());

        let reopened = HistoryLog::open(path, 100);
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_export_writes_parseable_json() {
        let dir = tempdir().unwrap();
        let mut log = HistoryLog::open(dir.path().join("history.json"), 100);
        log.add(HistoryRecord::new("camera", &[detection("Xoi", 0.7)]));

        let export_path = dir.path().join("export.json");
        log.export(&export_path).unwrap();

        let content = std::fs::read_to_string(&export_path).unwrap();
        let parsed: Vec<HistoryRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].items[0].name, "Xoi");
    }
}
