//! Checkout Session
//!
//! A short-lived state machine scoping one detect-to-invoice cycle. While
//! `unpaid` the cart may be edited; once `paid` it is frozen until the
//! order is torn down after the invoice is exported or skipped.

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::cart::{Cart, CartTotals};
use crate::checkout::{self, ConfirmationPrompt};
use crate::detect::Detection;
use crate::payment::PaymentMethod;

/// Lifecycle of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unpaid,
    Paid,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Unpaid => "unpaid",
            SessionStatus::Paid => "paid",
        }
    }
}

/// One checkout session
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque timestamp-derived token
    pub id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Local>,
}

impl Session {
    /// Open a new unpaid session.
    pub fn start() -> Self {
        Self::started_at(Local::now())
    }

    /// Open a session with an explicit clock, for deterministic ids.
    pub fn started_at(now: DateTime<Local>) -> Self {
        let id = format!("SES_{}", now.format("%Y%m%d_%H%M%S"));
        info!("Session {} opened", id);
        Self {
            id,
            status: SessionStatus::Unpaid,
            created_at: now,
        }
    }

    pub fn is_unpaid(&self) -> bool {
        self.status == SessionStatus::Unpaid
    }

    pub fn is_paid(&self) -> bool {
        self.status == SessionStatus::Paid
    }

    /// Transition unpaid -> paid. Returns false (and changes nothing)
    /// when already paid; the transition happens at most once.
    pub fn mark_paid(&mut self) -> bool {
        if self.is_paid() {
            debug!("Session {} is already paid", self.id);
            return false;
        }
        self.status = SessionStatus::Paid;
        info!("Session {} paid", self.id);
        true
    }
}

/// The live order: a session plus the cart and raw detections it scopes.
/// Gated operations flow through here so the session check cannot be
/// bypassed by a presentation layer holding the cart directly.
#[derive(Debug, Clone)]
pub struct ActiveOrder {
    session: Session,
    cart: Cart,
    detections: Vec<Detection>,
    /// Method recorded at payment time, for the invoice
    payment_method: Option<PaymentMethod>,
}

impl ActiveOrder {
    /// Open an order for an aggregated detection batch.
    pub fn open(cart: Cart, detections: Vec<Detection>) -> Self {
        Self {
            session: Session::start(),
            cart,
            detections,
            payment_method: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    pub fn payment_method(&self) -> Option<&PaymentMethod> {
        self.payment_method.as_ref()
    }

    pub fn can_edit(&self) -> bool {
        self.session.is_unpaid()
    }

    /// Gated quantity adjustment; see [`Cart::change_quantity`].
    pub fn change_quantity(&mut self, key: &str, delta: i32) -> bool {
        self.cart.change_quantity(Some(&self.session), key, delta)
    }

    /// Gated exclusion toggle.
    pub fn toggle_excluded(&mut self, key: &str) -> bool {
        self.cart.toggle_excluded(Some(&self.session), key)
    }

    /// Gated one-way exclusion.
    pub fn exclude(&mut self, key: &str) -> bool {
        self.cart.exclude(Some(&self.session), key)
    }

    /// Run the pre-payment validation against `prompt`.
    pub fn validate_checkout(&self, prompt: &mut dyn ConfirmationPrompt) -> bool {
        checkout::validate_before_checkout(&self.cart, prompt)
    }

    /// Record payment. True on the unpaid -> paid transition, false when
    /// the order was already settled.
    pub fn confirm_payment(&mut self, method: PaymentMethod) -> bool {
        if !self.session.mark_paid() {
            return false;
        }
        info!(
            "Order {} paid via {}",
            self.session.id,
            method.display_name()
        );
        self.payment_method = Some(method);
        true
    }
}
