//! Sizing Calculator: derives a single safe notional from four top-of-book
//! depths. Pure and stateless so it is trivially unit-testable.

use crate::venues::OrderBook;

/// Multiplier applied by the executor after sizing, to absorb top-of-book
/// slippage on a market order that might cross more than one level.
pub const SAFETY_FACTOR: f64 = 0.95;

/// Returns `None` ("unsized") when the computed notional is zero or
/// negative, or when either book is missing a side.
pub fn tradable_notional(ob_a: &OrderBook, ob_b: &OrderBook) -> Option<f64> {
    let ask_a = ob_a.best_ask()?.notional();
    let bid_a = ob_a.best_bid()?.notional();
    let ask_b = ob_b.best_ask()?.notional();
    let bid_b = ob_b.best_bid()?.notional();

    let min_notional = [ask_a, bid_a, ask_b, bid_b].into_iter().fold(f64::INFINITY, f64::min);

    if min_notional > 0.0 {
        Some(min_notional)
    } else {
        None
    }
}

/// The notional actually submitted by the executor: `tradable_notional * SAFETY_FACTOR`.
pub fn sized_notional(ob_a: &OrderBook, ob_b: &OrderBook) -> Option<f64> {
    tradable_notional(ob_a, ob_b).map(|n| n * SAFETY_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::Level;

    fn book(ask_price: f64, ask_qty: f64, bid_price: f64, bid_qty: f64) -> OrderBook {
        OrderBook {
            asks: vec![Level { price: ask_price, qty: ask_qty }],
            bids: vec![Level { price: bid_price, qty: bid_qty }],
        }
    }

    #[test]
    fn takes_the_minimum_of_four_notionals() {
        let ob_a = book(1.0, 1000.0, 0.99, 1000.0); // 1000, 990
        let ob_b = book(1.01, 500.0, 1.0, 2000.0); // 505, 2000
        assert_eq!(tradable_notional(&ob_a, &ob_b), Some(505.0));
    }

    #[test]
    fn seed_scenario_long_entry_notional_is_950() {
        // each top level carries 1000 USDT notional
        let ob_a = book(0.5200, 1000.0 / 0.5200, 0.5200, 1000.0 / 0.5200);
        let ob_b = book(0.5197, 1000.0 / 0.5197, 0.5197, 1000.0 / 0.5197);
        let notional = sized_notional(&ob_a, &ob_b).unwrap();
        assert!((notional - 950.0).abs() < 1e-6);
    }

    #[test]
    fn zero_or_negative_notional_is_unsized() {
        let ob_a = book(0.0, 0.0, 1.0, 1.0);
        let ob_b = book(1.0, 1.0, 1.0, 1.0);
        assert_eq!(tradable_notional(&ob_a, &ob_b), None);
    }

    #[test]
    fn missing_side_is_unsized() {
        let ob_a = OrderBook { asks: vec![], bids: vec![Level { price: 1.0, qty: 1.0 }] };
        let ob_b = book(1.0, 1.0, 1.0, 1.0);
        assert_eq!(tradable_notional(&ob_a, &ob_b), None);
    }
}
