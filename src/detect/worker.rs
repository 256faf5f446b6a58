//! Detection worker
//!
//! Runs a batch on its own thread and posts one completion event back to
//! the app context. Detection is the slow path; nothing blocks on it and
//! a batch cannot be cancelled once started.

use anyhow::Result;
use crossbeam_channel::Sender;
use std::thread::JoinHandle;
use tracing::{error, info};

use super::{Detection, DetectorConfig, FoodDetector, ImageInput};
use crate::shared::AppEvent;

/// Detections of one image, labeled for the history journal
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub source_label: String,
    pub detections: Vec<Detection>,
}

/// Outcome of a whole batch: per-image results plus the flattened list
/// the cart is built from.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub images: Vec<ImageResult>,
    pub detections: Vec<Detection>,
}

/// Run `batch` through `detector` on a background thread. The result
/// arrives as an [`AppEvent`] on `events`; a detector error aborts the
/// whole batch.
pub fn spawn_batch(
    mut detector: Box<dyn FoodDetector>,
    batch: Vec<ImageInput>,
    config: DetectorConfig,
    events: Sender<AppEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        info!("Detection worker starting ({} image(s))", batch.len());
        match run_batch(detector.as_mut(), &batch, &config) {
            Ok(outcome) => {
                info!(
                    "Detection worker finished: {} detection(s) across {} image(s)",
                    outcome.detections.len(),
                    outcome.images.len()
                );
                let _ = events.send(AppEvent::DetectionFinished(outcome));
            }
            Err(e) => {
                error!("Detection worker failed: {:#}", e);
                let _ = events.send(AppEvent::DetectionFailed(format!("{:#}", e)));
            }
        }
    })
}

fn run_batch(
    detector: &mut dyn FoodDetector,
    batch: &[ImageInput],
    config: &DetectorConfig,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for input in batch {
        let detections = detector.detect(input, config)?;
        outcome.detections.extend(detections.iter().cloned());
        outcome.images.push(ImageResult {
            source_label: input.source_label(),
            detections,
        });
    }
    Ok(outcome)
}
