//! Detection input
//!
//! Types crossing the model boundary. The detector itself is pluggable:
//! anything that maps an image input to a list of labeled, scored
//! detections. The shipped implementation replays stored model output so
//! the pipeline runs without a model runtime.

pub mod worker;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One detected object instance
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    /// Raw model class label
    pub label: String,
    /// Model confidence in [0, 1]
    pub confidence: f32,
}

/// A raw camera frame, kept opaque for the detector
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Raw RGB pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when the frame was grabbed
    pub captured_at: Instant,
}

impl CameraFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            captured_at: Instant::now(),
        }
    }

    /// Frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// One image handed to the detector
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// A live camera frame
    Frame(CameraFrame),
    /// An uploaded image file
    Upload(PathBuf),
}

impl ImageInput {
    /// Source label recorded in the history journal for this input
    pub fn source_label(&self) -> String {
        match self {
            ImageInput::Frame(_) => "camera".to_string(),
            ImageInput::Upload(path) => {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("upload ({})", name)
            }
        }
    }
}

/// Detector tuning
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Minimum confidence for a detection to be reported
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
        }
    }
}

/// The model boundary: one image in, scored detections out.
pub trait FoodDetector: Send {
    fn detect(&mut self, input: &ImageInput, config: &DetectorConfig) -> Result<Vec<Detection>>;
}

/// Replays stored model output: each "image" is a JSON file holding an
/// array of `{label, confidence}` objects. Stands in for the model
/// runtime on headless runs and in tests.
pub struct StoredDetector;

impl FoodDetector for StoredDetector {
    fn detect(&mut self, input: &ImageInput, config: &DetectorConfig) -> Result<Vec<Detection>> {
        match input {
            ImageInput::Upload(path) => {
                let detections = read_stored(path)
                    .with_context(|| format!("failed to read detections from {:?}", path))?;
                Ok(detections
                    .into_iter()
                    .filter(|detection| detection.confidence >= config.confidence_threshold)
                    .collect())
            }
            ImageInput::Frame(_) => {
                anyhow::bail!("stored detector cannot process camera frames")
            }
        }
    }
}

fn read_stored(path: &Path) -> Result<Vec<Detection>> {
    let content = std::fs::read_to_string(path)?;
    let detections = serde_json::from_str(&content)?;
    Ok(detections)
}
