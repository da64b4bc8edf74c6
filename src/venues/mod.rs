pub mod router;
pub mod signing;
pub mod types;
pub mod venue_b;
pub mod venue_g;
pub mod venue_m;

pub use router::VenueRouter;
pub use types::{Balance, Level, OrderBook, OrderOutcome, OrderSide, Position, PositionSide, Symbol, Ticker, VenueId};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::errors::ArbError;

/// Per-(venue, symbol) serialization for setter RPCs (`set_leverage`,
/// `set_margin_mode`), to avoid venue-side rejection storms when two ticks
/// race on the same symbol. One adapter instance is already scoped to a
/// single venue, so this only needs to key on symbol.
#[derive(Default)]
pub struct SymbolLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    pub async fn serialize<F, Fut, T>(&self, symbol: &Symbol, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let lock = self
            .locks
            .entry(symbol.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;
        f().await
    }
}

/// Common contract every venue adapter normalizes its native REST surface
/// to. Adapters never unwind across this boundary: RPC and
/// auth failures are returned as `Err(ArbError::VenueRpc { .. })`, while
/// ticker/order-book fetch failures additionally fold to the sentinel
/// values documented on `Ticker`/`OrderBook` so callers can treat "skip
/// this cycle" uniformly without matching on the error.
#[async_trait::async_trait]
pub trait Venue: Send + Sync {
    fn id(&self) -> VenueId;

    async fn fetch_ticker(&self, symbol: &Symbol) -> Ticker;

    async fn fetch_order_book(&self, symbol: &Symbol, depth: usize) -> OrderBook;

    async fn fetch_balance(&self) -> Result<Balance, ArbError>;

    async fn fetch_position(&self, symbol: &Symbol) -> Result<Position, ArbError>;

    /// Idempotent; venues routinely reject a no-op mode change, so failures
    /// are logged by the adapter and never propagated.
    async fn set_margin_mode(&self, symbol: &Symbol, mode: &str);

    /// Idempotent, same non-fatal contract as `set_margin_mode`.
    async fn set_leverage(&self, symbol: &Symbol, leverage: u32);

    async fn place_market_order(&self, symbol: &Symbol, side: OrderSide, amount: f64) -> OrderOutcome;

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> bool;
}
