//! Events flowing into the serialized app context
//!
//! Cart and session state is only ever touched while handling these, so
//! off-thread producers never race the operator's edits.

use crate::detect::worker::BatchOutcome;

/// Messages posted to the app event channel
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A detection batch completed
    DetectionFinished(BatchOutcome),
    /// A detection batch aborted with an error
    DetectionFailed(String),
    /// The phone-side confirmation page was hit with a method code
    PaymentConfirmed(String),
}
