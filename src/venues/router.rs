//! Venue Router: a single registry keyed by venue identity.
//!
//! Backed by `dashmap::DashMap`, the lock-free map this codebase already
//! reaches for when a hot path needs concurrent reads over a structure that
//! is only ever written at construction time. The router is populated once
//! at startup and never mutated afterward; an unknown venue returns a typed
//! error rather than silently falling back to a default adapter.

use std::sync::Arc;

use dashmap::DashMap;

use crate::errors::ArbError;
use crate::venues::{Venue, VenueId};

#[derive(Default)]
pub struct VenueRouter {
    adapters: DashMap<VenueId, Arc<dyn Venue>>,
}

impl VenueRouter {
    pub fn new() -> Self {
        Self { adapters: DashMap::new() }
    }

    pub fn register(&self, adapter: Arc<dyn Venue>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, venue: VenueId) -> Result<Arc<dyn Venue>, ArbError> {
        self.adapters
            .get(&venue)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ArbError::UnknownVenue(venue))
    }

    pub fn is_registered(&self, venue: VenueId) -> bool {
        self.adapters.contains_key(&venue)
    }

    pub fn registered_venues(&self) -> Vec<VenueId> {
        self.adapters.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::{Balance, OrderBook, OrderOutcome, OrderSide, Position, PositionSide, Symbol, Ticker};

    struct StubVenue(VenueId);

    #[async_trait::async_trait]
    impl Venue for StubVenue {
        fn id(&self) -> VenueId {
            self.0
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
            Ok(Position { side: PositionSide::Long, contracts: 0.0, unrealized_pnl: 0.0 })
        }
        async fn set_margin_mode(&self, _symbol: &Symbol, _mode: &str) {}
        async fn set_leverage(&self, _symbol: &Symbol, _leverage: u32) {}
        async fn place_market_order(&self, _symbol: &Symbol, _side: OrderSide, _amount: f64) -> OrderOutcome {
            OrderOutcome::failure(0, "stub")
        }
        async fn cancel_order(&self, _order_id: &str, _symbol: &Symbol) -> bool {
            true
        }
    }

    #[test]
    fn unknown_venue_is_a_typed_error_not_a_default() {
        let router = VenueRouter::new();
        router.register(Arc::new(StubVenue(VenueId::M)));
        assert!(router.get(VenueId::M).is_ok());
        assert!(matches!(router.get(VenueId::B), Err(ArbError::UnknownVenue(VenueId::B))));
    }

    #[test]
    fn registered_venues_reflects_construction_time_population() {
        let router = VenueRouter::new();
        assert!(router.registered_venues().is_empty());
        router.register(Arc::new(StubVenue(VenueId::G)));
        assert_eq!(router.registered_venues(), vec![VenueId::G]);
    }
}
