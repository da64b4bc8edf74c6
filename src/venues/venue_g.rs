//! Venue G adapter.
//!
//! Signing: HMAC-SHA512 over `METHOD\nPATH\nQUERY\nBODY\nTIMESTAMP` (seconds).
//! `settle=usdt` rides in the query string on every futures call; client
//! order ids are prefixed `t-`; order submission uses `ioc` time-in-force.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::VenueConfig;
use crate::errors::ArbError;
use crate::rate_limit::RateLimiter;
use crate::venues::signing::{mask_secret, sign_g};
use crate::venues::{Balance, Level, OrderBook, OrderOutcome, OrderSide, Position, PositionSide, Symbol, SymbolLocks, Ticker, Venue, VenueId};

const SETTLE: &str = "usdt";

pub struct VenueG {
    client: Client,
    config: VenueConfig,
    limiter: RateLimiter,
    setter_locks: SymbolLocks,
}

impl VenueG {
    pub fn new(config: VenueConfig) -> Self {
        debug!(venue = %VenueId::G, key = %mask_secret(&config.api_key), "venue adapter initialized");
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with default TLS backend"),
            limiter: RateLimiter::new(Duration::from_millis(config.rate_limit_ms)),
            config,
            setter_locks: SymbolLocks::new(),
        }
    }

    fn native_symbol(symbol: &Symbol) -> String {
        format!("{}_USDT", symbol.base())
    }

    fn signed_request(&self, method: &str, path: &str, query: &str, body: &str) -> (i64, String) {
        let timestamp_s = chrono::Utc::now().timestamp();
        let signature = sign_g(&self.config.api_secret, method, path, query, body, timestamp_s);
        (timestamp_s, signature)
    }
}

#[async_trait::async_trait]
impl Venue for VenueG {
    fn id(&self) -> VenueId {
        VenueId::G
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Ticker {
        self.limiter.acquire().await;
        let url = format!("{}/api/v4/futures/usdt/tickers", self.config.base_url);
        let native = Self::native_symbol(symbol);

        let resp = self.client.get(&url).query(&[("settle", SETTLE), ("contract", native.as_str())]).send().await;
        let body: Value = match resp {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(venue = %VenueId::G, symbol = %symbol, error = %e, "ticker decode failed");
                    return Ticker::failed();
                }
            },
            Err(e) => {
                warn!(venue = %VenueId::G, symbol = %symbol, error = %e, "ticker fetch failed");
                return Ticker::failed();
            }
        };

        let last = body
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|t| t["last"].as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        if last <= 0.0 {
            return Ticker::failed();
        }
        Ticker { last, ts: chrono::Utc::now().timestamp_millis() }
    }

    async fn fetch_order_book(&self, symbol: &Symbol, depth: usize) -> OrderBook {
        self.limiter.acquire().await;
        let url = format!("{}/api/v4/futures/usdt/order_book", self.config.base_url);
        let native = Self::native_symbol(symbol);

        let resp = match self
            .client
            .get(&url)
            .query(&[("settle", SETTLE), ("contract", native.as_str()), ("limit", &depth.to_string())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(venue = %VenueId::G, symbol = %symbol, error = %e, "order book fetch failed");
                return OrderBook::failed();
            }
        };
        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(venue = %VenueId::G, symbol = %symbol, error = %e, "order book decode failed");
                return OrderBook::failed();
            }
        };

        let parse_levels = |raw: &Value| -> Vec<Level> {
            raw.as_array()
                .map(|levels| {
                    levels
                        .iter()
                        .take(depth)
                        .filter_map(|lvl| {
                            let price = lvl["p"].as_str()?.parse::<f64>().ok()?;
                            let qty = lvl["s"].as_f64()?;
                            Some(Level { price, qty })
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let asks = parse_levels(&body["asks"]);
        let bids = parse_levels(&body["bids"]);
        if asks.is_empty() || bids.is_empty() {
            return OrderBook::failed();
        }
        OrderBook { asks, bids }
    }

    async fn fetch_balance(&self) -> Result<Balance, ArbError> {
        self.limiter.acquire().await;
        let path = "/api/v4/futures/usdt/accounts";
        let query = format!("settle={SETTLE}");
        let (timestamp_s, signature) = self.signed_request("GET", path, &query, "");
        let url = format!("{}{}", self.config.base_url, path);

        let resp = self
            .client
            .get(&url)
            .query(&[("settle", SETTLE)])
            .header("KEY", &self.config.api_key)
            .header("SIGN", signature)
            .header("Timestamp", timestamp_s.to_string())
            .send()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::G, detail: e.to_string() })?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::G, detail: e.to_string() })?;

        let total = body["total"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let available = body["available"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0);

        Ok(Balance { total, free: available, used: total - available })
    }

    async fn fetch_position(&self, symbol: &Symbol) -> Result<Position, ArbError> {
        self.limiter.acquire().await;
        let native = Self::native_symbol(symbol);
        let path = format!("/api/v4/futures/usdt/positions/{native}");
        let query = format!("settle={SETTLE}");
        let (timestamp_s, signature) = self.signed_request("GET", &path, &query, "");
        let url = format!("{}{}", self.config.base_url, path);

        let resp = self
            .client
            .get(&url)
            .query(&[("settle", SETTLE)])
            .header("KEY", &self.config.api_key)
            .header("SIGN", signature)
            .header("Timestamp", timestamp_s.to_string())
            .send()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::G, detail: e.to_string() })?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::G, detail: e.to_string() })?;

        let size = body["size"].as_f64().unwrap_or(0.0);
        let side = if size >= 0.0 { PositionSide::Long } else { PositionSide::Short };

        Ok(Position {
            side,
            contracts: size.abs(),
            unrealized_pnl: body["unrealised_pnl"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
        })
    }

    async fn set_margin_mode(&self, symbol: &Symbol, mode: &str) {
        let native = Self::native_symbol(symbol);
        self.setter_locks
            .serialize(symbol, || async {
                self.limiter.acquire().await;
                let path = format!("/api/v4/futures/usdt/positions/{native}/margin_mode");
                let query = format!("settle={SETTLE}");
                let body_json = serde_json::json!({ "mode": mode }).to_string();
                let (timestamp_s, signature) = self.signed_request("POST", &path, &query, &body_json);
                let url = format!("{}{}", self.config.base_url, path);

                if let Err(e) = self
                    .client
                    .post(&url)
                    .query(&[("settle", SETTLE)])
                    .header("KEY", &self.config.api_key)
                    .header("SIGN", signature)
                    .header("Timestamp", timestamp_s.to_string())
                    .body(body_json)
                    .send()
                    .await
                {
                    warn!(venue = %VenueId::G, symbol = %symbol, error = %e, "set_margin_mode failed (non-fatal)");
                }
            })
            .await;
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) {
        let native = Self::native_symbol(symbol);
        self.setter_locks
            .serialize(symbol, || async {
                self.limiter.acquire().await;
                let path = format!("/api/v4/futures/usdt/positions/{native}/leverage");
                let query = format!("settle={SETTLE}&leverage={leverage}");
                let (timestamp_s, signature) = self.signed_request("POST", &path, &query, "");
                let url = format!("{}{}", self.config.base_url, path);

                if let Err(e) = self
                    .client
                    .post(&url)
                    .query(&[("settle", SETTLE), ("leverage", &leverage.to_string())])
                    .header("KEY", &self.config.api_key)
                    .header("SIGN", signature)
                    .header("Timestamp", timestamp_s.to_string())
                    .send()
                    .await
                {
                    warn!(venue = %VenueId::G, symbol = %symbol, error = %e, "set_leverage failed (non-fatal)");
                }
            })
            .await;
    }

    async fn place_market_order(&self, symbol: &Symbol, side: OrderSide, amount: f64) -> OrderOutcome {
        self.limiter.acquire().await;
        let start = Instant::now();
        let native = Self::native_symbol(symbol);
        let signed_size = match side {
            OrderSide::Buy => amount,
            OrderSide::Sell => -amount,
        };
        let client_order_id = format!("t-{}", Uuid::new_v4());

        let path = "/api/v4/futures/usdt/orders";
        let query = format!("settle={SETTLE}");
        let body_json = serde_json::json!({
            "contract": native,
            "size": signed_size,
            "price": "0", // market order
            "tif": "ioc",
            "text": client_order_id,
        })
        .to_string();
        let (timestamp_s, signature) = self.signed_request("POST", path, &query, &body_json);
        let url = format!("{}{}", self.config.base_url, path);

        let resp = self
            .client
            .post(&url)
            .query(&[("settle", SETTLE)])
            .header("KEY", &self.config.api_key)
            .header("SIGN", signature)
            .header("Timestamp", timestamp_s.to_string())
            .body(body_json)
            .send()
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let body: Value = match resp {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => return OrderOutcome::failure(latency_ms, format!("decode error: {e}")),
            },
            Err(e) => return OrderOutcome::failure(latency_ms, format!("rpc error: {e}")),
        };

        match body["id"].as_i64() {
            Some(id) => OrderOutcome::success(id.to_string(), latency_ms, body.to_string()),
            None => OrderOutcome::failure(latency_ms, body.to_string()),
        }
    }

    async fn cancel_order(&self, order_id: &str, _symbol: &Symbol) -> bool {
        self.limiter.acquire().await;
        let path = format!("/api/v4/futures/usdt/orders/{order_id}");
        let query = format!("settle={SETTLE}");
        let (timestamp_s, signature) = self.signed_request("DELETE", &path, &query, "");
        let url = format!("{}{}", self.config.base_url, path);

        self.client
            .delete(&url)
            .query(&[("settle", SETTLE)])
            .header("KEY", &self.config.api_key)
            .header("SIGN", signature)
            .header("Timestamp", timestamp_s.to_string())
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_symbol_uses_underscore() {
        let symbol = Symbol::new("DOGE/USDT");
        assert_eq!(VenueG::native_symbol(&symbol), "DOGE_USDT");
    }

    #[test]
    fn canonical_to_native_to_canonical_round_trips() {
        for base in ["XRP", "DOGE"] {
            let symbol = Symbol::new(format!("{base}/USDT"));
            let native = VenueG::native_symbol(&symbol);
            let recovered = Symbol::new(native.replace('_', "/"));
            assert_eq!(recovered, symbol);
        }
    }
}
