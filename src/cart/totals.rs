//! Cart totals
//!
//! A pure fold over billable lines. Excluded items and zero quantities do
//! not count; the result is recomputed on demand after every mutation,
//! never cached.

use super::Cart;

/// Aggregate figures for the billable part of a cart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartTotals {
    /// Total servings
    pub items: u32,
    /// Total price in whole currency units
    pub price: u64,
    /// Total calories (kcal)
    pub calories: u64,
}

/// Compute the totals over the billable lines of `cart`.
pub fn compute(cart: &Cart) -> CartTotals {
    let mut totals = CartTotals::default();
    for item in cart.items().iter().filter(|item| item.billable()) {
        totals.items += item.quantity;
        totals.price += item.line_total();
        totals.calories += item.calories as u64 * item.quantity as u64;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;

    fn item(key: &str, quantity: u32, price: u32, calories: u32) -> CartItem {
        CartItem {
            key: key.to_string(),
            display_name: key.to_string(),
            detected_qty: quantity,
            quantity,
            sum_confidence: 0.0,
            avg_confidence: 0.0,
            price,
            calories,
            excluded: false,
        }
    }

    #[test]
    fn test_empty_cart_totals() {
        let cart = Cart::default();
        assert_eq!(compute(&cart), CartTotals::default());
    }

    #[test]
    fn test_totals_accumulate() {
        let mut cart = Cart::default();
        cart.items.push(item("Pho_bo", 2, 45000, 350));
        cart.items.push(item("Banh_mi", 1, 20000, 250));

        let totals = compute(&cart);
        assert_eq!(totals.items, 3);
        assert_eq!(totals.price, 2 * 45000 + 20000);
        assert_eq!(totals.calories, 2 * 350 + 250);
    }

    #[test]
    fn test_excluded_items_skipped() {
        let mut cart = Cart::default();
        cart.items.push(item("Pho_bo", 2, 45000, 350));
        let mut excluded = item("Banh_mi", 1, 20000, 250);
        excluded.excluded = true;
        cart.items.push(excluded);

        let totals = compute(&cart);
        assert_eq!(totals.items, 2);
        assert_eq!(totals.price, 90000);
        assert_eq!(totals.calories, 700);
    }

    #[test]
    fn test_zero_quantity_skipped() {
        let mut cart = Cart::default();
        let mut zero = item("Goi_cuon", 0, 15000, 120);
        zero.detected_qty = 0;
        cart.items.push(zero);

        assert_eq!(compute(&cart), CartTotals::default());
    }

    #[test]
    fn test_exclusion_shifts_total_by_line_total() {
        let mut cart = Cart::default();
        cart.items.push(item("Pho_bo", 3, 45000, 350));
        cart.items.push(item("Banh_mi", 1, 20000, 250));

        let before = compute(&cart).price;
        cart.toggle_excluded(None, "Pho_bo");
        let after = compute(&cart).price;

        assert_eq!(before - after, 3 * 45000);

        cart.toggle_excluded(None, "Pho_bo");
        assert_eq!(compute(&cart).price, before);
    }
}
