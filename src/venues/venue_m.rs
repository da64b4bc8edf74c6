//! Venue M adapter.
//!
//! Signing: HMAC-SHA256 over `timestamp_ms + sorted_query_string`. Futures
//! endpoints default to `swap / linear / USDT`. The contract
//! order endpoint wants `BASE_USDT`; the ticker path wants `BASE/USDT` — both
//! native forms are derived from the canonical symbol internally and never
//! returned to the caller.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::VenueConfig;
use crate::errors::ArbError;
use crate::rate_limit::RateLimiter;
use crate::venues::signing::{mask_secret, sign_m, sorted_query_string};
use crate::venues::{Balance, Level, OrderBook, OrderOutcome, OrderSide, Position, PositionSide, Symbol, SymbolLocks, Ticker, Venue, VenueId};

pub struct VenueM {
    client: Client,
    config: VenueConfig,
    limiter: RateLimiter,
    setter_locks: SymbolLocks,
}

impl VenueM {
    pub fn new(config: VenueConfig) -> Self {
        debug!(venue = %VenueId::M, key = %mask_secret(&config.api_key), "venue adapter initialized");
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

    fn native_contract_symbol(symbol: &Symbol) -> String {
        format!("{}_USDT", symbol.base())
    }

    fn native_ticker_symbol(symbol: &Symbol) -> String {
        symbol.as_str().to_string()
    }

    fn signed_headers(&self, sorted_query: &str) -> (i64, String) {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let signature = sign_m(&self.config.api_secret, timestamp_ms, sorted_query);
        (timestamp_ms, signature)
    }
}

#[async_trait::async_trait]
impl Venue for VenueM {
    fn id(&self) -> VenueId {
        VenueId::M
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Ticker {
        self.limiter.acquire().await;
        let url = format!("{}/api/v1/contract/ticker", self.config.base_url);
        let native = Self::native_ticker_symbol(symbol);

        let resp = self.client.get(&url).query(&[("symbol", native.as_str())]).send().await;
        let body: Value = match resp {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(venue = %VenueId::M, symbol = %symbol, error = %e, "ticker decode failed");
                    return Ticker::failed();
                }
            },
            Err(e) => {
                warn!(venue = %VenueId::M, symbol = %symbol, error = %e, "ticker fetch failed");
                return Ticker::failed();
            }
        };

        let last = body["data"]["lastPrice"].as_f64().unwrap_or(0.0);
        if last <= 0.0 {
            return Ticker::failed();
        }
        Ticker { last, ts: chrono::Utc::now().timestamp_millis() }
    }

    async fn fetch_order_book(&self, symbol: &Symbol, depth: usize) -> OrderBook {
        self.limiter.acquire().await;
        let url = format!("{}/api/v1/contract/depth/{}", self.config.base_url, Self::native_ticker_symbol(symbol));

        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(venue = %VenueId::M, symbol = %symbol, error = %e, "order book fetch failed");
                return OrderBook::failed();
            }
        };
        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(venue = %VenueId::M, symbol = %symbol, error = %e, "order book decode failed");
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
                            let price = lvl.get(0)?.as_f64()?;
                            let qty = lvl.get(1)?.as_f64()?;
                            Some(Level { price, qty })
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let asks = parse_levels(&body["data"]["asks"]);
        let bids = parse_levels(&body["data"]["bids"]);
        if asks.is_empty() || bids.is_empty() {
            return OrderBook::failed();
        }
        OrderBook { asks, bids }
    }

    async fn fetch_balance(&self) -> Result<Balance, ArbError> {
        self.limiter.acquire().await;
        let sorted_query = sorted_query_string(&[("currency", "USDT".to_string())]);
        let (timestamp_ms, signature) = self.signed_headers(&sorted_query);
        let url = format!("{}/api/v1/private/account/asset/USDT", self.config.base_url);

        let resp = self
            .client
            .get(&url)
            .header("ApiKey", &self.config.api_key)
            .header("Request-Time", timestamp_ms.to_string())
            .header("Signature", signature)
            .send()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::M, detail: e.to_string() })?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::M, detail: e.to_string() })?;

        Ok(Balance {
            total: body["data"]["equity"].as_f64().unwrap_or(0.0),
            free: body["data"]["availableBalance"].as_f64().unwrap_or(0.0),
            used: body["data"]["positionMargin"].as_f64().unwrap_or(0.0),
        })
    }

    async fn fetch_position(&self, symbol: &Symbol) -> Result<Position, ArbError> {
        self.limiter.acquire().await;
        let native = Self::native_contract_symbol(symbol);
        let sorted_query = sorted_query_string(&[("symbol", native.clone())]);
        let (timestamp_ms, signature) = self.signed_headers(&sorted_query);
        let url = format!("{}/api/v1/private/position/open_positions", self.config.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", native.as_str())])
            .header("ApiKey", &self.config.api_key)
            .header("Request-Time", timestamp_ms.to_string())
            .header("Signature", signature)
            .send()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::M, detail: e.to_string() })?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::M, detail: e.to_string() })?;

        let first = body["data"].get(0).cloned().unwrap_or(Value::Null);
        let contracts = first["holdVol"].as_f64().unwrap_or(0.0);
        let side = if first["positionType"].as_i64().unwrap_or(1) == 1 { PositionSide::Long } else { PositionSide::Short };

        Ok(Position { side, contracts, unrealized_pnl: first["unrealized"].as_f64().unwrap_or(0.0) })
    }

    async fn set_margin_mode(&self, symbol: &Symbol, mode: &str) {
        let native = Self::native_contract_symbol(symbol);
        self.setter_locks
            .serialize(symbol, || async {
                self.limiter.acquire().await;
                let sorted_query = sorted_query_string(&[("symbol", native.clone()), ("openType", mode.to_string())]);
                let (timestamp_ms, signature) = self.signed_headers(&sorted_query);
                let url = format!("{}/api/v1/private/position/change_margin_mode", self.config.base_url);
                if let Err(e) = self
                    .client
                    .post(&url)
                    .header("ApiKey", &self.config.api_key)
                    .header("Request-Time", timestamp_ms.to_string())
                    .header("Signature", signature)
                    .json(&serde_json::json!({ "symbol": native, "openType": mode }))
                    .send()
                    .await
                {
                    // Non-fatal: venues reject a no-op mode change.
                    warn!(venue = %VenueId::M, symbol = %symbol, error = %e, "set_margin_mode failed (non-fatal)");
                }
            })
            .await;
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) {
        let native = Self::native_contract_symbol(symbol);
        self.setter_locks
            .serialize(symbol, || async {
                self.limiter.acquire().await;
                let sorted_query = sorted_query_string(&[("symbol", native.clone()), ("leverage", leverage.to_string())]);
                let (timestamp_ms, signature) = self.signed_headers(&sorted_query);
                let url = format!("{}/api/v1/private/position/change_leverage", self.config.base_url);
                if let Err(e) = self
                    .client
                    .post(&url)
                    .header("ApiKey", &self.config.api_key)
                    .header("Request-Time", timestamp_ms.to_string())
                    .header("Signature", signature)
                    .json(&serde_json::json!({ "symbol": native, "leverage": leverage }))
                    .send()
                    .await
                {
                    warn!(venue = %VenueId::M, symbol = %symbol, error = %e, "set_leverage failed (non-fatal)");
                }
            })
            .await;
    }

    async fn place_market_order(&self, symbol: &Symbol, side: OrderSide, amount: f64) -> OrderOutcome {
        self.limiter.acquire().await;
        let start = Instant::now();
        let native = Self::native_contract_symbol(symbol);
        let side_code = match side {
            OrderSide::Buy => 1,
            OrderSide::Sell => 3,
        };

        let sorted_query = sorted_query_string(&[
            ("symbol", native.clone()),
            ("side", side_code.to_string()),
            ("vol", amount.to_string()),
            ("type", "5".to_string()), // market
        ]);
        let (timestamp_ms, signature) = self.signed_headers(&sorted_query);
        let url = format!("{}/api/v1/private/order/submit", self.config.base_url);

        let resp = self
            .client
            .post(&url)
            .header("ApiKey", &self.config.api_key)
            .header("Request-Time", timestamp_ms.to_string())
            .header("Signature", signature)
            .json(&serde_json::json!({
                "symbol": native,
                "side": side_code,
                "vol": amount,
                "type": 5,
                "openType": self.config.default_margin_mode,
                "leverage": self.config.default_leverage,
            }))
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

        let order_id = body["data"]["orderId"]
            .as_str()
            .map(str::to_string)
            .or_else(|| body["data"]["orderId"].as_u64().map(|n| n.to_string()));

        match order_id {
            Some(id) if !id.is_empty() => OrderOutcome::success(id, latency_ms, body.to_string()),
            _ => OrderOutcome::failure(latency_ms, body.to_string()),
        }
    }

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> bool {
        self.limiter.acquire().await;
        let native = Self::native_contract_symbol(symbol);
        let sorted_query = sorted_query_string(&[("orderId", order_id.to_string())]);
        let (timestamp_ms, signature) = self.signed_headers(&sorted_query);
        let url = format!("{}/api/v1/private/order/cancel", self.config.base_url);

        self.client
            .post(&url)
            .header("ApiKey", &self.config.api_key)
            .header("Request-Time", timestamp_ms.to_string())
            .header("Signature", signature)
            .json(&serde_json::json!({ "orderId": order_id, "symbol": native }))
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
    fn native_contract_symbol_uses_underscore() {
        let symbol = Symbol::new("XRP/USDT");
        assert_eq!(VenueM::native_contract_symbol(&symbol), "XRP_USDT");
    }

    #[test]
    fn native_ticker_symbol_keeps_slash() {
        let symbol = Symbol::new("XRP/USDT");
        assert_eq!(VenueM::native_ticker_symbol(&symbol), "XRP/USDT");
    }

    #[test]
    fn canonical_to_native_to_canonical_round_trips() {
        for base in ["XRP", "DOGE"] {
            let symbol = Symbol::new(format!("{base}/USDT"));
            let native = VenueM::native_contract_symbol(&symbol);
            let recovered = Symbol::new(native.replace('_', "/"));
            assert_eq!(recovered, symbol);
        }
    }
}
