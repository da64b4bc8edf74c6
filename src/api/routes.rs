//! HTTP control surface handlers. Read-only except for
//! start/stop of the monitor loop; the orderbook snapshot path is
//! independent of the monitor and never mutates monitor state.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;
use crate::venues::{Symbol, Venue, VenueId};

const USDT_TO_KRW: f64 = 1300.0;

pub async fn health() -> &'static str {
    "OK"
}

#[derive(Serialize)]
pub struct StatusResponse {
    initialized: bool,
    status: String,
    details: Vec<String>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let readiness = state.readiness.read();
    Json(StatusResponse {
        initialized: readiness.initialized,
        status: if readiness.initialized { "ready".to_string() } else { "initializing".to_string() },
        details: readiness.details.clone(),
    })
}

#[derive(Serialize)]
pub struct CurrentTimeResponse {
    timestamp_ms: i64,
    timezone: &'static str,
    formatted_time: String,
}

pub async fn current_time() -> Json<CurrentTimeResponse> {
    let now_utc = chrono::Utc::now();
    let now_kst = now_utc.with_timezone(&chrono_tz::Asia::Seoul);
    Json(CurrentTimeResponse {
        timestamp_ms: now_utc.timestamp_millis(),
        timezone: "Asia/Seoul",
        formatted_time: now_kst.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

#[derive(Serialize)]
pub struct OrderBookEntry {
    exchange: String,
    symbol: String,
    asks: Vec<(f64, f64)>,
    bids: Vec<(f64, f64)>,
    last_price: f64,
    last_price_krw: f64,
    price_gap: f64,
    price_gap_usdt: f64,
    timestamp: i64,
}

fn symbols() -> Vec<Symbol> {
    vec![Symbol::new("XRP/USDT"), Symbol::new("DOGE/USDT")]
}

fn venues() -> Vec<VenueId> {
    vec![VenueId::M, VenueId::G, VenueId::B]
}

pub async fn orderbook(State(state): State<AppState>) -> Result<Json<Vec<OrderBookEntry>>, StatusCode> {
    if !state.readiness.read().initialized {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let mut entries = Vec::new();
    for symbol in symbols() {
        // Venue B's own price is the reference point; fetch it first so
        // every other venue's entry in this symbol group can compute a
        // gap against it.
        let reference_last = match state.router.get(VenueId::B) {
            Ok(adapter) => adapter.fetch_ticker(&symbol).await.last,
            Err(_) => 0.0,
        };

        for venue in venues() {
            let Ok(adapter) = state.router.get(venue) else { continue };
            let ticker = adapter.fetch_ticker(&symbol).await;
            let order_book = adapter.fetch_order_book(&symbol, 3).await;

            let (price_gap, price_gap_usdt) = if venue == VenueId::B || reference_last <= 0.0 {
                (0.0, 0.0)
            } else {
                (crate::monitor::gap_pct(ticker.last, reference_last), ticker.last - reference_last)
            };

            entries.push(OrderBookEntry {
                exchange: venue.to_string(),
                symbol: symbol.as_str().to_string(),
                asks: order_book.asks.iter().map(|l| (l.price, l.qty)).collect(),
                bids: order_book.bids.iter().map(|l| (l.price, l.qty)).collect(),
                last_price: ticker.last,
                last_price_krw: ticker.last * USDT_TO_KRW,
                price_gap,
                price_gap_usdt,
                timestamp: ticker.ts,
            });
        }
    }

    Ok(Json(entries))
}

#[derive(Serialize)]
pub struct BalanceEntry {
    #[serde(rename = "USDT")]
    usdt: f64,
    free: f64,
    used: f64,
    #[serde(rename = "dailyPnL")]
    daily_pnl: f64,
    #[serde(rename = "monthlyPnL")]
    monthly_pnl: f64,
}

pub async fn balance(State(state): State<AppState>) -> Result<Json<std::collections::HashMap<String, BalanceEntry>>, StatusCode> {
    if !state.readiness.read().initialized {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let mut out = std::collections::HashMap::new();
    for venue in venues() {
        let Ok(adapter) = state.router.get(venue) else { continue };
        match adapter.fetch_balance().await {
            Ok(b) => {
                // dailyPnL/monthlyPnL are placeholders permitted to be zero
                // until a persistent trade journal exists.
                out.insert(venue.to_string(), BalanceEntry { usdt: b.total, free: b.free, used: b.used, daily_pnl: 0.0, monthly_pnl: 0.0 });
            }
            Err(_) => continue,
        }
    }

    Ok(Json(out))
}

#[derive(Serialize)]
pub struct TradingActionResponse {
    status: String,
    message: String,
}

pub async fn trading_start(State(state): State<AppState>) -> impl IntoResponse {
    if !state.readiness.read().initialized {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(TradingActionResponse { status: "not_initialized".to_string(), message: "venues not initialized".to_string() }));
    }

    match state.monitor_handle.start().await {
        Ok(()) => (StatusCode::OK, Json(TradingActionResponse { status: "running".to_string(), message: "monitor started".to_string() })),
        Err(e) => (StatusCode::OK, Json(TradingActionResponse { status: state.monitor_handle.status_str().to_string(), message: e.to_string() })),
    }
}

pub async fn trading_stop(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor_handle.stop().await {
        Ok(()) => (StatusCode::OK, Json(TradingActionResponse { status: "stopped".to_string(), message: "monitor stopping".to_string() })),
        Err(e) => (StatusCode::OK, Json(TradingActionResponse { status: state.monitor_handle.status_str().to_string(), message: e.to_string() })),
    }
}

#[derive(Serialize)]
pub struct TradingStatusResponse {
    status: String,
}

pub async fn trading_status(State(state): State<AppState>) -> Json<TradingStatusResponse> {
    let status = if !state.readiness.read().initialized {
        "not_initialized".to_string()
    } else {
        state.monitor_handle.status_str().to_string()
    };
    Json(TradingStatusResponse { status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditSink;
    use crate::executor::Executor;
    use crate::monitor::Monitor;
    use crate::monitor_handle::MonitorHandle;
    use crate::notifier::NullNotifier;
    use crate::venues::VenueRouter;
    use std::sync::Arc;

    fn empty_state(initialized: bool) -> AppState {
        let router = Arc::new(VenueRouter::new());
        let executor = Arc::new(Executor::new(router.clone()));
        let notifier: Arc<dyn crate::notifier::Notifier> = Arc::new(NullNotifier);
        let audit = Arc::new(AuditSink::disabled());
        let monitor = Monitor::new(router.clone(), executor, notifier.clone(), audit, 500);
        let monitor_handle = Arc::new(MonitorHandle::new(monitor));
        let mut readiness = crate::readiness::Readiness::default();
        readiness.initialized = initialized;
        AppState { router, monitor_handle, notifier, readiness: Arc::new(parking_lot::RwLock::new(readiness)) }
    }

    #[tokio::test]
    async fn orderbook_returns_503_when_uninitialized() {
        let state = empty_state(false);
        let result = orderbook(State(state)).await;
        assert_eq!(result.unwrap_err(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn balance_returns_503_when_uninitialized() {
        let state = empty_state(false);
        let result = balance(State(state)).await;
        assert_eq!(result.unwrap_err(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn orderbook_returns_empty_list_when_initialized_but_no_venues_registered() {
        let state = empty_state(true);
        let result = orderbook(State(state)).await.unwrap();
        assert!(result.0.is_empty());
    }

    #[tokio::test]
    async fn trading_status_reports_not_initialized_before_readiness() {
        let state = empty_state(false);
        let Json(resp) = trading_status(State(state)).await;
        assert_eq!(resp.status, "not_initialized");
    }
}
