//! Executor — dual-leg execution protocol.
//!
//! The two legs are submitted concurrently via `tokio::join!`, initiated as
//! concurrent operations and awaited together without a dedicated worker
//! pool. On partial failure the
//! executor attempts a single best-effort cancel on the successful leg; it
//! never submits an opposing order as compensation, since that would double
//! exposure on a leg that may already be filled.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::ArbError;
use crate::venues::{OrderOutcome, OrderSide, Symbol, Venue, VenueId, VenueRouter};

pub struct Leg {
    pub venue: VenueId,
    pub side: OrderSide,
}

pub struct ExecutionResult {
    pub success: bool,
    pub leg_a: OrderOutcome,
    pub leg_b: OrderOutcome,
    pub message: String,
}

pub struct Executor {
    router: Arc<VenueRouter>,
}

impl Executor {
    pub fn new(router: Arc<VenueRouter>) -> Self {
        Self { router }
    }

    /// `leg_a`/`leg_b` name distinct venues; `notional` is the amount
    /// already reduced by the sizing safety factor.
    pub async fn execute(&self, symbol: &Symbol, leg_a: Leg, leg_b: Leg, notional: f64) -> Result<ExecutionResult, ArbError> {
        let adapter_a = self.router.get(leg_a.venue)?;
        let adapter_b = self.router.get(leg_b.venue)?;

        // Pre-flight: non-fatal, the order attempt proceeds
        // regardless of whether these succeed.
        adapter_a.set_margin_mode(symbol, "cross").await;
        adapter_a.set_leverage(symbol, 1).await;
        adapter_b.set_margin_mode(symbol, "cross").await;
        adapter_b.set_leverage(symbol, 1).await;

        let (outcome_a, outcome_b) = tokio::join!(
            adapter_a.place_market_order(symbol, leg_a.side, notional),
            adapter_b.place_market_order(symbol, leg_b.side, notional),
        );

        self.settle(symbol, leg_a.venue, adapter_a.as_ref(), outcome_a, leg_b.venue, adapter_b.as_ref(), outcome_b).await
    }

    async fn settle(
        &self,
        symbol: &Symbol,
        venue_a: VenueId,
        adapter_a: &dyn Venue,
        outcome_a: OrderOutcome,
        venue_b: VenueId,
        adapter_b: &dyn Venue,
        outcome_b: OrderOutcome,
    ) -> Result<ExecutionResult, ArbError> {
        match (outcome_a.ok, outcome_b.ok) {
            (true, true) => {
                info!(symbol = %symbol, "dual-leg execution succeeded on both legs");
                Ok(ExecutionResult { success: true, leg_a: outcome_a, leg_b: outcome_b, message: "both legs filled".to_string() })
            }
            (true, false) => {
                if let Some(order_id) = outcome_a.order_id.clone() {
                    let cancelled = adapter_a.cancel_order(&order_id, symbol).await;
                    warn!(symbol = %symbol, venue = %venue_a, order_id = %order_id, cancelled, "leg B failed, compensating cancel on leg A");
                } else {
                    warn!(symbol = %symbol, venue = %venue_a, "leg B failed but leg A's ok outcome carried no order id, skipping compensation");
                }
                Ok(ExecutionResult {
                    success: false,
                    leg_a: outcome_a,
                    leg_b: outcome_b,
                    message: "failed, compensation attempted".to_string(),
                })
            }
            (false, true) => {
                if let Some(order_id) = outcome_b.order_id.clone() {
                    let cancelled = adapter_b.cancel_order(&order_id, symbol).await;
                    warn!(symbol = %symbol, venue = %venue_b, order_id = %order_id, cancelled, "leg A failed, compensating cancel on leg B");
                } else {
                    warn!(symbol = %symbol, venue = %venue_b, "leg A failed but leg B's ok outcome carried no order id, skipping compensation");
                }
                Ok(ExecutionResult {
                    success: false,
                    leg_a: outcome_a,
                    leg_b: outcome_b,
                    message: "failed, compensation attempted".to_string(),
                })
            }
            (false, false) => {
                warn!(symbol = %symbol, "both legs of dual-leg execution failed");
                Ok(ExecutionResult { success: false, leg_a: outcome_a, leg_b: outcome_b, message: "both legs failed".to_string() })
            }
        }
    }

    /// Position close: structurally identical to entry — read both
    /// positions, invert each leg's current side, and run the same
    /// two-leg submission path.
    pub async fn close_positions(&self, symbol: &Symbol, venue_a: VenueId, venue_b: VenueId) -> Result<ExecutionResult, ArbError> {
        let adapter_a = self.router.get(venue_a)?;
        let adapter_b = self.router.get(venue_b)?;

        let position_a = adapter_a.fetch_position(symbol).await?;
        let position_b = adapter_b.fetch_position(symbol).await?;

        let close_side = |side: crate::venues::PositionSide| match side {
            crate::venues::PositionSide::Long => OrderSide::Sell,
            crate::venues::PositionSide::Short => OrderSide::Buy,
        };

        let leg_a = Leg { venue: venue_a, side: close_side(position_a.side) };
        let leg_b = Leg { venue: venue_b, side: close_side(position_b.side) };
        let notional = position_a.contracts.min(position_b.contracts);

        self.execute(symbol, leg_a, leg_b, notional).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::{Balance, OrderBook, Position, PositionSide, Ticker};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedVenue {
        id: VenueId,
        place_ok: bool,
        cancel_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Venue for ScriptedVenue {
        fn id(&self) -> VenueId {
            self.id
        }
        async fn fetch_ticker(&self, _symbol: &Symbol) -> Ticker {
            Ticker::failed()
        }
        async fn fetch_order_book(&self, _symbol: &Symbol, _depth: usize) -> OrderBook {
            OrderBook::failed()
        }
        async fn fetch_balance(&self) -> Result<Balance, ArbError> {
            Ok(Balance { total: 0.0, free: 0.0, used: 0.0 })
        }
        async fn fetch_position(&self, _symbol: &Symbol) -> Result<Position, ArbError> {
            Ok(Position { side: PositionSide::Long, contracts: 10.0, unrealized_pnl: 0.0 })
        }
        async fn set_margin_mode(&self, _symbol: &Symbol, _mode: &str) {}
        async fn set_leverage(&self, _symbol: &Symbol, _leverage: u32) {}
        async fn place_market_order(&self, _symbol: &Symbol, _side: OrderSide, _amount: f64) -> OrderOutcome {
            if self.place_ok {
                OrderOutcome::success(format!("{:?}-1", self.id), 5, "ok")
            } else {
                OrderOutcome::failure(5, "rejected")
            }
        }
        async fn cancel_order(&self, _order_id: &str, _symbol: &Symbol) -> bool {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[tokio::test]
    async fn partial_fill_triggers_exactly_one_cancel_on_the_successful_leg() {
        let router = Arc::new(VenueRouter::new());
        router.register(Arc::new(ScriptedVenue { id: VenueId::M, place_ok: true, cancel_calls: AtomicUsize::new(0) }));
        router.register(Arc::new(ScriptedVenue { id: VenueId::B, place_ok: false, cancel_calls: AtomicUsize::new(0) }));

        let executor = Executor::new(router.clone());
        let symbol = Symbol::new("XRP/USDT");
        let result = executor
            .execute(&symbol, Leg { venue: VenueId::M, side: OrderSide::Sell }, Leg { venue: VenueId::B, side: OrderSide::Buy }, 950.0)
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.leg_a.ok);
        assert!(!result.leg_b.ok);
    }

    #[tokio::test]
    async fn both_legs_succeeding_is_a_success() {
        let router = Arc::new(VenueRouter::new());
        router.register(Arc::new(ScriptedVenue { id: VenueId::M, place_ok: true, cancel_calls: AtomicUsize::new(0) }));
        router.register(Arc::new(ScriptedVenue { id: VenueId::B, place_ok: true, cancel_calls: AtomicUsize::new(0) }));

        let executor = Executor::new(router);
        let symbol = Symbol::new("DOGE/USDT");
        let result = executor
            .execute(&symbol, Leg { venue: VenueId::M, side: OrderSide::Buy }, Leg { venue: VenueId::B, side: OrderSide::Sell }, 950.0)
            .await
            .unwrap();

        assert!(result.success);
    }

    #[tokio::test]
    async fn both_legs_failing_attempts_no_compensation() {
        let router = Arc::new(VenueRouter::new());
        router.register(Arc::new(ScriptedVenue { id: VenueId::M, place_ok: false, cancel_calls: AtomicUsize::new(0) }));
        router.register(Arc::new(ScriptedVenue { id: VenueId::B, place_ok: false, cancel_calls: AtomicUsize::new(0) }));

        let executor = Executor::new(router);
        let symbol = Symbol::new("XRP/USDT");
        let result = executor
            .execute(&symbol, Leg { venue: VenueId::M, side: OrderSide::Sell }, Leg { venue: VenueId::B, side: OrderSide::Buy }, 950.0)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.message, "both legs failed");
    }

    #[tokio::test]
    async fn close_positions_inverts_each_legs_current_side() {
        // ScriptedVenue::fetch_position always reports a long of size 10;
        // closing a long means selling on both legs.
        let router = Arc::new(VenueRouter::new());
        router.register(Arc::new(ScriptedVenue { id: VenueId::M, place_ok: true, cancel_calls: AtomicUsize::new(0) }));
        router.register(Arc::new(ScriptedVenue { id: VenueId::B, place_ok: true, cancel_calls: AtomicUsize::new(0) }));

        let executor = Executor::new(router);
        let symbol = Symbol::new("XRP/USDT");
        let result = executor.close_positions(&symbol, VenueId::M, VenueId::B).await.unwrap();

        assert!(result.success);
    }
}
