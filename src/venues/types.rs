//! Common data model shared by every venue adapter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueId {
    M,
    G,
    B,
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueId::M => write!(f, "M"),
            VenueId::G => write!(f, "G"),
            VenueId::B => write!(f, "B"),
        }
    }
}

impl FromStr for VenueId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(VenueId::M),
            "G" => Ok(VenueId::G),
            "B" => Ok(VenueId::B),
            other => Err(format!("unknown venue identifier: {other}")),
        }
    }
}

/// Canonical `BASE/QUOTE` symbol. QUOTE is always `USDT` in this system.
/// Each adapter owns a private translation to/from its own native form;
/// the canonical form is the only one that crosses the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `BASE` half of `BASE/USDT`.
    pub fn base(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// `{last: 0}` is the sentinel for a failed fetch; every consumer treats it
/// as "skip this cycle" rather than branching on an error type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ticker {
    pub last: f64,
    pub ts: i64,
}

impl Ticker {
    pub fn failed() -> Self {
        Self { last: 0.0, ts: 0 }
    }

    pub fn is_usable(&self) -> bool {
        self.last > 0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub qty: f64,
}

impl Level {
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }
}

/// Top levels of an order book. A successful fetch carries at least one
/// level per side; asks strictly increasing, bids strictly decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub asks: Vec<Level>,
    pub bids: Vec<Level>,
}

impl OrderBook {
    pub fn failed() -> Self {
        Self { asks: Vec::new(), bids: Vec::new() }
    }

    pub fn is_usable(&self) -> bool {
        !self.asks.is_empty() && !self.bids.is_empty()
    }

    pub fn best_ask(&self) -> Option<&Level> {
        self.asks.first()
    }

    pub fn best_bid(&self) -> Option<&Level> {
        self.bids.first()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Balance {
    pub total: f64,
    pub free: f64,
    pub used: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub contracts: f64,
    pub unrealized_pnl: f64,
}

/// A non-`ok` outcome never carries an `order_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub ok: bool,
    pub order_id: Option<String>,
    pub latency_ms: u64,
    pub raw_response: String,
}

impl OrderOutcome {
    pub fn failure(latency_ms: u64, raw_response: impl Into<String>) -> Self {
        Self { ok: false, order_id: None, latency_ms, raw_response: raw_response.into() }
    }

    pub fn success(order_id: impl Into<String>, latency_ms: u64, raw_response: impl Into<String>) -> Self {
        Self { ok: true, order_id: Some(order_id.into()), latency_ms, raw_response: raw_response.into() }
    }
}
