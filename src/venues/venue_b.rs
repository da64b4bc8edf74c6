//! Venue B adapter.
//!
//! Signing: HMAC-SHA256 over `TIMESTAMP_MS + METHOD + PATH + BODY`, plus a
//! passphrase header. Futures symbol form is `BASE/USDT:USDT`; margin
//! operations carry an explicit `marginCoin=USDT`.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::VenueConfig;
use crate::errors::ArbError;
use crate::rate_limit::RateLimiter;
use crate::venues::signing::{mask_secret, sign_b};
use crate::venues::{Balance, Level, OrderBook, OrderOutcome, OrderSide, Position, PositionSide, Symbol, SymbolLocks, Ticker, Venue, VenueId};

pub struct VenueB {
    client: Client,
    config: VenueConfig,
    limiter: RateLimiter,
    setter_locks: SymbolLocks,
}

impl VenueB {
    pub fn new(config: VenueConfig) -> Self {
        debug!(
            venue = %VenueId::B,
            key = %mask_secret(&config.api_key),
            display_symbol = %Self::display_symbol(&Symbol::new("XRP/USDT")),
            "venue adapter initialized"
        );
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
        format!("{}USDT_UMCBL", symbol.base())
    }

    /// The `BASE/USDT:USDT` display form of this venue's futures symbol —
    /// kept distinct from `native_symbol`, which is the concrete REST
    /// path/query form this venue's v1 mix API expects.
    fn display_symbol(symbol: &Symbol) -> String {
        format!("{}/USDT:USDT", symbol.base())
    }

    fn signed_headers(&self, method: &str, path: &str, body: &str) -> (i64, String) {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let signature = sign_b(&self.config.api_secret, timestamp_ms, method, path, body);
        (timestamp_ms, signature)
    }

    fn auth_headers(&self, req: reqwest::RequestBuilder, timestamp_ms: i64, signature: String) -> reqwest::RequestBuilder {
        let mut req = req
            .header("ACCESS-KEY", &self.config.api_key)
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", timestamp_ms.to_string());
        if let Some(passphrase) = &self.config.passphrase {
            req = req.header("ACCESS-PASSPHRASE", passphrase);
        }
        req
    }
}

#[async_trait::async_trait]
impl Venue for VenueB {
    fn id(&self) -> VenueId {
        VenueId::B
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Ticker {
        self.limiter.acquire().await;
        let url = format!("{}/api/mix/v1/market/ticker", self.config.base_url);
        let native = Self::native_symbol(symbol);

        let resp = self.client.get(&url).query(&[("symbol", native.as_str())]).send().await;
        let body: Value = match resp {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(venue = %VenueId::B, symbol = %symbol, error = %e, "ticker decode failed");
                    return Ticker::failed();
                }
            },
            Err(e) => {
                warn!(venue = %VenueId::B, symbol = %symbol, error = %e, "ticker fetch failed");
                return Ticker::failed();
            }
        };

        let last = body["data"]["last"].as_str().and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
        if last <= 0.0 {
            return Ticker::failed();
        }
        Ticker { last, ts: chrono::Utc::now().timestamp_millis() }
    }

    async fn fetch_order_book(&self, symbol: &Symbol, depth: usize) -> OrderBook {
        self.limiter.acquire().await;
        let url = format!("{}/api/mix/v1/market/depth", self.config.base_url);
        let native = Self::native_symbol(symbol);

        let resp = match self
            .client
            .get(&url)
            .query(&[("symbol", native.as_str()), ("limit", &depth.to_string())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(venue = %VenueId::B, symbol = %symbol, error = %e, "order book fetch failed");
                return OrderBook::failed();
            }
        };
        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(venue = %VenueId::B, symbol = %symbol, error = %e, "order book decode failed");
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
                            let price = lvl.get(0)?.as_str()?.parse::<f64>().ok()?;
                            let qty = lvl.get(1)?.as_str()?.parse::<f64>().ok()?;
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
        let path = "/api/mix/v1/account/accounts";
        let query = "productType=umcbl";
        let url = format!("{}{}?{}", self.config.base_url, path, query);
        let (timestamp_ms, signature) = self.signed_headers("GET", &format!("{path}?{query}"), "");

        let resp = self
            .auth_headers(self.client.get(&url), timestamp_ms, signature)
            .send()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::B, detail: e.to_string() })?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::B, detail: e.to_string() })?;

        // The account-level endpoint (not a per-symbol position endpoint, since
        // balance is not scoped to a single contract) returns one entry per
        // margin coin; USDT-margined futures hold exactly one.
        let usdt_account = body["data"]
            .as_array()
            .and_then(|accounts| accounts.iter().find(|a| a["marginCoin"].as_str() == Some("USDT")))
            .cloned()
            .unwrap_or(Value::Null);

        let total = usdt_account["equity"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let available = usdt_account["available"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0);

        Ok(Balance { total, free: available, used: total - available })
    }

    async fn fetch_position(&self, symbol: &Symbol) -> Result<Position, ArbError> {
        self.limiter.acquire().await;
        let native = Self::native_symbol(symbol);
        let path = "/api/mix/v1/position/singlePosition";
        let query = format!("symbol={native}&marginCoin=USDT");
        let url = format!("{}{}?{}", self.config.base_url, path, query);
        let (timestamp_ms, signature) = self.signed_headers("GET", &format!("{path}?{query}"), "");

        let resp = self
            .auth_headers(self.client.get(&url), timestamp_ms, signature)
            .send()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::B, detail: e.to_string() })?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ArbError::VenueRpc { venue: VenueId::B, detail: e.to_string() })?;

        let first = body["data"].get(0).cloned().unwrap_or(Value::Null);
        let contracts = first["total"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let side = if first["holdSide"].as_str() == Some("short") { PositionSide::Short } else { PositionSide::Long };

        Ok(Position {
            side,
            contracts,
            unrealized_pnl: first["unrealizedPL"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
        })
    }

    async fn set_margin_mode(&self, symbol: &Symbol, mode: &str) {
        let native = Self::native_symbol(symbol);
        self.setter_locks
            .serialize(symbol, || async {
                self.limiter.acquire().await;
                let path = "/api/mix/v1/account/setMarginMode";
                let body_json = serde_json::json!({
                    "symbol": native,
                    "marginCoin": "USDT",
                    "marginMode": mode,
                })
                .to_string();
                let (timestamp_ms, signature) = self.signed_headers("POST", path, &body_json);
                let url = format!("{}{}", self.config.base_url, path);

                if let Err(e) = self
                    .auth_headers(self.client.post(&url), timestamp_ms, signature)
                    .body(body_json)
                    .send()
                    .await
                {
                    warn!(venue = %VenueId::B, symbol = %symbol, error = %e, "set_margin_mode failed (non-fatal)");
                }
            })
            .await;
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) {
        let native = Self::native_symbol(symbol);
        self.setter_locks
            .serialize(symbol, || async {
                self.limiter.acquire().await;
                let path = "/api/mix/v1/account/setLeverage";
                let body_json = serde_json::json!({
                    "symbol": native,
                    "marginCoin": "USDT",
                    "leverage": leverage.to_string(),
                })
                .to_string();
                let (timestamp_ms, signature) = self.signed_headers("POST", path, &body_json);
                let url = format!("{}{}", self.config.base_url, path);

                if let Err(e) = self
                    .auth_headers(self.client.post(&url), timestamp_ms, signature)
                    .body(body_json)
                    .send()
                    .await
                {
                    warn!(venue = %VenueId::B, symbol = %symbol, error = %e, "set_leverage failed (non-fatal)");
                }
            })
            .await;
    }

    async fn place_market_order(&self, symbol: &Symbol, side: OrderSide, amount: f64) -> OrderOutcome {
        self.limiter.acquire().await;
        let start = Instant::now();
        let native = Self::native_symbol(symbol);
        let side_str = match side {
            OrderSide::Buy => "open_long",
            OrderSide::Sell => "open_short",
        };

        let path = "/api/mix/v1/order/placeOrder";
        let body_json = serde_json::json!({
            "symbol": native,
            "marginCoin": "USDT",
            "size": amount.to_string(),
            "side": side_str,
            "orderType": "market",
        })
        .to_string();
        let (timestamp_ms, signature) = self.signed_headers("POST", path, &body_json);
        let url = format!("{}{}", self.config.base_url, path);

        let resp = self
            .auth_headers(self.client.post(&url), timestamp_ms, signature)
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

        match body["data"]["orderId"].as_str() {
            Some(id) if !id.is_empty() => OrderOutcome::success(id, latency_ms, body.to_string()),
            _ => OrderOutcome::failure(latency_ms, body.to_string()),
        }
    }

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> bool {
        self.limiter.acquire().await;
        let native = Self::native_symbol(symbol);
        let path = "/api/mix/v1/order/cancel-order";
        let body_json = serde_json::json!({ "symbol": native, "marginCoin": "USDT", "orderId": order_id }).to_string();
        let (timestamp_ms, signature) = self.signed_headers("POST", path, &body_json);
        let url = format!("{}{}", self.config.base_url, path);

        self.auth_headers(self.client.post(&url), timestamp_ms, signature)
            .body(body_json)
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
    fn native_symbol_matches_umcbl_contract_form() {
        let symbol = Symbol::new("XRP/USDT");
        assert_eq!(VenueB::native_symbol(&symbol), "XRPUSDT_UMCBL");
    }

    #[test]
    fn display_symbol_matches_spec_form() {
        let symbol = Symbol::new("DOGE/USDT");
        assert_eq!(VenueB::display_symbol(&symbol), "DOGE/USDT:USDT");
    }
}
