//! Checkout validation
//!
//! Before the payment screen the cart is compared against what the
//! detector saw. A clean cart passes silently; raised quantities or
//! excluded items must be acknowledged by the operator; an empty cart
//! never passes.

use tracing::{debug, warn};

use crate::cart::Cart;

/// One line billed above its detected count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityOverride {
    pub display_name: String,
    pub detected_qty: u32,
    pub quantity: u32,
}

/// Everything the operator must acknowledge before payment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutReview {
    /// Lines billed above their detected count
    pub overrides: Vec<QuantityOverride>,
    /// Display names of excluded lines
    pub excluded: Vec<String>,
}

impl CheckoutReview {
    /// Collect everything that deviates from the detector's view.
    pub fn of(cart: &Cart) -> Self {
        let mut review = CheckoutReview::default();
        for item in cart.items() {
            if item.quantity > item.detected_qty {
                review.overrides.push(QuantityOverride {
                    display_name: item.display_name.clone(),
                    detected_qty: item.detected_qty,
                    quantity: item.quantity,
                });
            }
            if item.excluded {
                review.excluded.push(item.display_name.clone());
            }
        }
        review
    }

    pub fn is_clean(&self) -> bool {
        self.overrides.is_empty() && self.excluded.is_empty()
    }

    /// The combined confirmation message shown to the operator.
    pub fn summary(&self) -> String {
        let mut message = String::from("Lưu ý:\n\n");
        if !self.overrides.is_empty() {
            message.push_str("Số lượng khác với phát hiện:\n");
            for item in &self.overrides {
                message.push_str(&format!(
                    "- {}: phát hiện {}, thanh toán {}\n",
                    item.display_name, item.detected_qty, item.quantity
                ));
            }
            message.push('\n');
        }
        if !self.excluded.is_empty() {
            message.push_str("Món bị loại (không tính tiền):\n");
            for name in &self.excluded {
                message.push_str(&format!("- {}\n", name));
            }
            message.push('\n');
        }
        message.push_str("Tiếp tục thanh toán?");
        message
    }
}

/// Operator interaction needed by checkout validation. The presentation
/// layer implements this; tests script it.
pub trait ConfirmationPrompt {
    /// An empty cart cannot be checked out; tell the operator.
    fn warn_empty_cart(&mut self);

    /// Ask whether to proceed despite the listed deviations.
    fn confirm_review(&mut self, review: &CheckoutReview) -> bool;
}

/// Decide whether checkout may proceed. Empty carts are blocked, clean
/// carts pass silently, anything else is up to the operator.
pub fn validate_before_checkout(cart: &Cart, prompt: &mut dyn ConfirmationPrompt) -> bool {
    if cart.is_empty() {
        warn!("Checkout blocked: cart is empty");
        prompt.warn_empty_cart();
        return false;
    }

    let review = CheckoutReview::of(cart);
    if review.is_clean() {
        debug!("Checkout review is clean, proceeding silently");
        return true;
    }

    let accepted = prompt.confirm_review(&review);
    if !accepted {
        debug!("Operator declined the checkout review");
    }
    accepted
}
