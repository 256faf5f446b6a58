//! Cart
//!
//! The per-session collection of purchasable line items built from a
//! detection batch. Quantities may be raised freely but never pushed
//! below the machine-detected count; exclusion is the only way to take a
//! detected item off the bill. Every mutation is gated on the session
//! still being editable.

pub mod totals;

pub use totals::CartTotals;

use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry};
use crate::detect::Detection;
use crate::session::Session;

/// One cart line: a distinct food type with its detection tally, purchase
/// quantity and pricing snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    /// Canonical catalog key, unique within the cart
    pub key: String,
    /// Customer-facing name
    pub display_name: String,
    /// How many instances the detector found. Fixed at construction; the
    /// floor for `quantity`.
    pub detected_qty: u32,
    /// Purchasable quantity, always >= `detected_qty`
    pub quantity: u32,
    /// Sum of detection confidences, kept for the average
    pub sum_confidence: f32,
    /// Mean confidence across this item's detections
    pub avg_confidence: f32,
    /// Unit price in whole currency units, copied from the catalog
    pub price: u32,
    /// Calories per serving, copied from the catalog
    pub calories: u32,
    /// Excluded items stay visible but are left out of totals and invoice
    pub excluded: bool,
}

impl CartItem {
    /// Does this line count towards totals and the invoice?
    pub fn billable(&self) -> bool {
        !self.excluded && self.quantity > 0
    }

    /// Quantity times unit price
    pub fn line_total(&self) -> u64 {
        self.price as u64 * self.quantity as u64
    }
}

/// Cart of detected items, iterated in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Aggregate a raw detection batch into cart lines. Each detection
    /// increments the detected count and purchase quantity of its
    /// normalized food key; confidences are averaged per key.
    pub fn from_detections(detections: &[Detection], catalog: &Catalog) -> Self {
        let mut cart = Cart::default();
        for detection in detections {
            let (key, entry) = catalog.resolve(&detection.label);
            let index = cart.position_or_insert(&key, &entry);
            let item = &mut cart.items[index];
            item.detected_qty += 1;
            item.quantity += 1;
            item.sum_confidence += detection.confidence;
        }
        for item in &mut cart.items {
            if item.detected_qty > 0 {
                item.avg_confidence = item.sum_confidence / item.detected_qty as f32;
            }
        }
        cart
    }

    fn position_or_insert(&mut self, key: &str, entry: &CatalogEntry) -> usize {
        match self.items.iter().position(|item| item.key == key) {
            Some(index) => index,
            None => {
                let display_name = if entry.name_vi.is_empty() {
                    key.to_string()
                } else {
                    entry.name_vi.clone()
                };
                self.items.push(CartItem {
                    key: key.to_string(),
                    display_name,
                    detected_qty: 0,
                    quantity: 0,
                    sum_confidence: 0.0,
                    avg_confidence: 0.0,
                    price: entry.price,
                    calories: entry.calories,
                    excluded: false,
                });
                self.items.len() - 1
            }
        }
    }

    /// May the cart be edited under `session`? No session means a cart
    /// outside any checkout cycle; editable.
    fn editable(session: Option<&Session>) -> bool {
        session.map(|session| session.is_unpaid()).unwrap_or(true)
    }

    /// Adjust the purchase quantity of `key` by `delta`, clamped to the
    /// detected floor (and zero). Returns true only when the stored
    /// quantity actually changed.
    pub fn change_quantity(&mut self, session: Option<&Session>, key: &str, delta: i32) -> bool {
        if !Self::editable(session) {
            debug!("Rejected quantity change for '{}': session is paid", key);
            return false;
        }
        let item = match self.find_mut(key) {
            Some(item) => item,
            None => return false,
        };
        let proposed = item.quantity as i64 + delta as i64;
        let floor = item.detected_qty as i64;
        let clamped = proposed.clamp(floor, u32::MAX as i64) as u32;
        if clamped == item.quantity {
            return false;
        }
        item.quantity = clamped;
        true
    }

    /// Flip the excluded flag of `key`.
    pub fn toggle_excluded(&mut self, session: Option<&Session>, key: &str) -> bool {
        if !Self::editable(session) {
            debug!("Rejected exclusion toggle for '{}': session is paid", key);
            return false;
        }
        match self.find_mut(key) {
            Some(item) => {
                item.excluded = !item.excluded;
                true
            }
            None => false,
        }
    }

    /// Force-exclude `key` (the "take off the bill" action); idempotent.
    pub fn exclude(&mut self, session: Option<&Session>, key: &str) -> bool {
        if !Self::editable(session) {
            debug!("Rejected exclusion of '{}': session is paid", key);
            return false;
        }
        match self.find_mut(key) {
            Some(item) => {
                item.excluded = true;
                true
            }
            None => false,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn find(&self, key: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.key == key)
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Current totals over the billable lines
    pub fn totals(&self) -> CartTotals {
        totals::compute(self)
    }
}
