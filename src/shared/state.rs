//! Runtime state readable by the presentation layer

/// Live, non-persisted status of the till
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Whether a detection batch is in flight
    pub is_detecting: bool,
    /// Confirmation page URL advertised for QR encoding, when the
    /// listener is up
    pub payment_page_url: Option<String>,
    /// Last error message (if any)
    pub last_error: Option<String>,
}

impl RuntimeState {
    /// Clear any error state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Set an error message
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}
