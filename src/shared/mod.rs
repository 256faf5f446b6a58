//! Shared state and messaging between the app context and its workers
//!
//! The detection worker and the payment listener run off-thread; this
//! module holds the event type they post back and the runtime state the
//! presentation layer reads.

pub mod messages;
pub mod state;

pub use messages::AppEvent;
pub use state::RuntimeState;
