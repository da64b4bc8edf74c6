//! Gap Monitor: a single long-running loop producing
//! per-(symbol, venue-pair) gap samples, deduplicating alerts, and handing
//! off trade signals to the executor.
//!
//! `lastAlertAt` is a plain `HashMap` owned exclusively by the monitor task
//! (single writer, single reader) — no lock is needed because
//! nothing outside this task ever touches it. `running` is the one piece of
//! state shared with the control surface, and is therefore an
//! `AtomicBool`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::audit::{AuditRow, AuditSink};
use crate::errors::MonitorCommand;
use crate::executor::{Executor, Leg};
use crate::notifier::Notifier;
use crate::sizing;
use crate::venues::{OrderSide, Symbol, Venue, VenueId, VenueRouter};

/// Percentage-point entry thresholds. A gap `>= ENTRY_LONG`
/// triggers {short A, long B}; a gap `<= ENTRY_SHORT` triggers
/// {long A, short B}.
pub const ENTRY_LONG: f64 = 0.05;
pub const ENTRY_SHORT: f64 = -0.06;

/// Dedup window for the notify path.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(300);

pub fn whitelisted_symbols() -> Vec<Symbol> {
    vec![Symbol::new("XRP/USDT"), Symbol::new("DOGE/USDT")]
}

/// B is always the second (reference) leg.
pub fn venue_pairs() -> Vec<(VenueId, VenueId)> {
    vec![(VenueId::M, VenueId::B), (VenueId::G, VenueId::B)]
}

#[derive(Debug, Clone, Copy)]
pub struct GapSample {
    pub venue_a: VenueId,
    pub venue_b: VenueId,
    pub price_a: f64,
    pub price_b: f64,
    pub gap_pct: f64,
}

pub fn gap_pct(price_a: f64, price_b: f64) -> f64 {
    (price_a - price_b) / price_b * 100.0
}

fn dedup_key(symbol: &Symbol, gap: f64) -> String {
    format!("{symbol}-{gap:.2}")
}

pub struct Monitor {
    router: Arc<VenueRouter>,
    executor: Arc<Executor>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<AuditSink>,
    running: Arc<AtomicBool>,
    tick: Duration,
    last_alert_at: HashMap<String, Instant>,
}

impl Monitor {
    pub fn new(router: Arc<VenueRouter>, executor: Arc<Executor>, notifier: Arc<dyn Notifier>, audit: Arc<AuditSink>, tick_ms: u64) -> Self {
        Self {
            router,
            executor,
            notifier,
            audit,
            running: Arc::new(AtomicBool::new(false)),
            tick: Duration::from_millis(tick_ms),
            last_alert_at: HashMap::new(),
        }
    }

    pub fn running_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs the self-test and, if it passes, the tick loop until a `Stop`
    /// command arrives on `stop_rx`. A failed self-test forces an immediate
    /// return to stopped without starting the loop.
    pub async fn run(&mut self, mut stop_rx: tokio::sync::watch::Receiver<Option<MonitorCommand>>) {
        if !self.self_test().await {
            self.running.store(false, Ordering::SeqCst);
            return;
        }

        self.notifier.send("arb-engine monitor started").await;
        self.running.store(true, Ordering::SeqCst);

        let mut interval = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_tick().await;
                }
                _ = stop_rx.changed() => {
                    if matches!(*stop_rx.borrow(), Some(MonitorCommand::Stop)) {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.notifier.send("arb-engine monitor stopped").await;
    }

    /// A disabled notifier is treated as a *successful* self-test (the
    /// system stays usable without notification credentials); an enabled
    /// notifier whose send fails aborts startup.
    async fn self_test(&self) -> bool {
        if !self.notifier.is_enabled() {
            return true;
        }
        self.notifier.send("arb-engine self-test").await
    }

    async fn run_tick(&mut self) {
        for symbol in whitelisted_symbols() {
            for (venue_a, venue_b) in venue_pairs() {
                self.evaluate_pair(&symbol, venue_a, venue_b).await;
            }
        }
    }

    async fn evaluate_pair(&mut self, symbol: &Symbol, venue_a: VenueId, venue_b: VenueId) {
        let (adapter_a, adapter_b) = match (self.router.get(venue_a), self.router.get(venue_b)) {
            (Ok(a), Ok(b)) => (a, b),
            _ => return, // unregistered venue: skip this (symbol, pair) for this tick
        };

        let ticker_a = adapter_a.fetch_ticker(symbol).await;
        let ticker_b = adapter_b.fetch_ticker(symbol).await;
        if !ticker_a.is_usable() || !ticker_b.is_usable() {
            return; // fetch failure aborts only this (symbol, pair) evaluation
        }

        let gap = gap_pct(ticker_a.last, ticker_b.last);
        let min_notify_threshold = ENTRY_LONG.min(ENTRY_SHORT.abs());
        if gap.abs() < min_notify_threshold {
            return;
        }

        let order_book_a = adapter_a.fetch_order_book(symbol, 3).await;
        let order_book_b = adapter_b.fetch_order_book(symbol, 3).await;
        let notional = sizing::tradable_notional(&order_book_a, &order_book_b);

        if let Some(notional) = notional {
            self.audit.record(
                venue_a,
                venue_b,
                AuditRow {
                    gap_pct: gap,
                    price_diff_usdt: (ticker_a.last - ticker_b.last).abs(),
                    price_a: ticker_a.last,
                    price_b: ticker_b.last,
                    volume_a: order_book_a.best_ask().map(|l| l.qty).unwrap_or(0.0),
                    volume_b: order_book_b.best_ask().map(|l| l.qty).unwrap_or(0.0),
                    min_volume: notional,
                },
            );
        }

        self.maybe_notify(symbol, venue_a, venue_b, &ticker_a, &ticker_b, gap, notional.unwrap_or(0.0)).await;

        if gap >= ENTRY_LONG || gap <= ENTRY_SHORT {
            self.try_trade(symbol, venue_a, venue_b, &order_book_a, &order_book_b, gap, ticker_a.last, ticker_b.last).await;
        }
    }

    async fn maybe_notify(
        &mut self,
        symbol: &Symbol,
        venue_a: VenueId,
        venue_b: VenueId,
        ticker_a: &crate::venues::Ticker,
        ticker_b: &crate::venues::Ticker,
        gap: f64,
        notional: f64,
    ) {
        let key = dedup_key(symbol, gap);
        let now = Instant::now();
        if let Some(last) = self.last_alert_at.get(&key) {
            if now.duration_since(*last) < DEDUP_WINDOW {
                return;
            }
        }
        self.last_alert_at.insert(key, now);

        // Guard the notify path: failures here are swallowed with a log
        // entry and never propagate.
        if !self.notifier.send_gap_alert(venue_a, venue_b, symbol.as_str(), ticker_a, ticker_b, gap, notional).await {
            warn!(symbol = %symbol, "gap alert notification failed (swallowed)");
        }
    }

    async fn try_trade(
        &self,
        symbol: &Symbol,
        venue_a: VenueId,
        venue_b: VenueId,
        order_book_a: &crate::venues::OrderBook,
        order_book_b: &crate::venues::OrderBook,
        gap: f64,
        price_a: f64,
        price_b: f64,
    ) {
        let Some(sized) = sizing::sized_notional(order_book_a, order_book_b) else {
            info!(symbol = %symbol, "sizing produced a non-positive notional, aborting trade path for this tick");
            return;
        };

        let (side_a, side_b) = if gap >= ENTRY_LONG {
            (OrderSide::Sell, OrderSide::Buy)
        } else {
            (OrderSide::Buy, OrderSide::Sell)
        };

        match self
            .executor
            .execute(symbol, Leg { venue: venue_a, side: side_a }, Leg { venue: venue_b, side: side_b }, sized)
            .await
        {
            Ok(result) => {
                self.notifier
                    .send_trade_outcome(symbol.as_str(), venue_a, side_a, venue_b, side_b, gap, price_a, price_b, sized, result.success)
                    .await;
            }
            Err(e) => error!(symbol = %symbol, error = %e, "executor failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Mutex as TokioMutex;

    struct CountingNotifier {
        sends: AtomicUsize,
        messages: TokioMutex<Vec<String>>,
    }

    impl CountingNotifier {
        fn new() -> Self {
            Self { sends: AtomicUsize::new(0), messages: TokioMutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, text: &str) -> bool {
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.messages.lock().await.push(text.to_string());
            true
        }
    }

    #[tokio::test]
    async fn start_stop_start_stop_sends_two_startup_and_two_shutdown_messages() {
        let router = Arc::new(VenueRouter::new());
        let executor = Arc::new(Executor::new(router.clone()));
        let notifier = Arc::new(CountingNotifier::new());
        let audit = Arc::new(AuditSink::disabled());

        for _ in 0..2 {
            let mut monitor = Monitor::new(router.clone(), executor.clone(), notifier.clone(), audit.clone(), 50);
            let (stop_tx, stop_rx) = tokio::sync::watch::channel(None);
            let run = tokio::spawn(async move {
                monitor.run(stop_rx).await;
                monitor
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
            stop_tx.send(Some(MonitorCommand::Stop)).unwrap();
            let monitor = run.await.unwrap();
            assert!(!monitor.is_running());
        }

        let messages = notifier.messages.lock().await;
        let startups = messages.iter().filter(|m| m.contains("started")).count();
        let shutdowns = messages.iter().filter(|m| m.contains("stopped")).count();
        assert_eq!(startups, 2);
        assert_eq!(shutdowns, 2);
    }

    #[test]
    fn gap_pct_matches_the_signed_formula() {
        let g = gap_pct(0.5200, 0.5197);
        assert!((g - 0.0577).abs() < 1e-3);
    }

    #[test]
    fn seed_scenario_long_entry_crosses_threshold() {
        let g = gap_pct(0.5200, 0.5197);
        assert!(g >= ENTRY_LONG);
    }

    #[test]
    fn seed_scenario_short_entry_crosses_threshold() {
        let g = gap_pct(0.5190, 0.5197);
        assert!((g - (-0.1347)).abs() < 1e-3);
        assert!(g <= ENTRY_SHORT);
    }

    #[test]
    fn below_threshold_gap_neither_trades_nor_notifies() {
        let g = gap_pct(0.52010, 0.52000); // ~0.02%
        assert!(g < ENTRY_LONG);
        assert!(g > ENTRY_SHORT);
    }

    #[test]
    fn dedup_key_rounds_gap_to_two_decimals() {
        let symbol = Symbol::new("XRP/USDT");
        assert_eq!(dedup_key(&symbol, 0.0701), "XRP/USDT-0.07");
        assert_eq!(dedup_key(&symbol, 0.0698), "XRP/USDT-0.07");
    }

    #[tokio::test]
    async fn dedup_suppresses_a_second_alert_inside_the_window() {
        let router = Arc::new(VenueRouter::new());
        let executor = Arc::new(Executor::new(router.clone()));
        let notifier = Arc::new(crate::notifier::NullNotifier);
        let audit = Arc::new(AuditSink::disabled());
        let mut monitor = Monitor::new(router, executor, notifier, audit, 500);

        let symbol = Symbol::new("XRP/USDT");
        let ticker_a = crate::venues::Ticker { last: 0.5200, ts: 0 };
        let ticker_b = crate::venues::Ticker { last: 0.5197, ts: 0 };
        monitor.maybe_notify(&symbol, VenueId::M, VenueId::B, &ticker_a, &ticker_b, 0.07, 950.0).await;
        assert_eq!(monitor.last_alert_at.len(), 1);
        let first_ts = *monitor.last_alert_at.values().next().unwrap();

        monitor.maybe_notify(&symbol, VenueId::M, VenueId::B, &ticker_a, &ticker_b, 0.07, 950.0).await;
        assert_eq!(monitor.last_alert_at.len(), 1);
        assert_eq!(*monitor.last_alert_at.values().next().unwrap(), first_ts);
    }
}
