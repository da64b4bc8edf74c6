//! Notifier: write-only sink for human-readable messages.
//! Must be safe when disabled — `send` returns `false` and callers never
//! branch on it for correctness (a notification is never load-bearing).

use reqwest::Client;
use tracing::warn;

use crate::venues::{OrderSide, Ticker, VenueId};

const USDT_TO_KRW: f64 = 1300.0;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> bool;

    /// `false` for `NullNotifier` (no credentials configured). Lets the
    /// monitor's self-test tell "disabled, nothing to check" apart from
    /// "enabled but the send itself failed" without downcasting.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send_gap_alert(
        &self,
        venue_a: VenueId,
        venue_b: VenueId,
        symbol: &str,
        quote_a: &Ticker,
        quote_b: &Ticker,
        gap_pct: f64,
        notional: f64,
    ) -> bool {
        let abs_diff_usdt = (quote_a.last - quote_b.last).abs();
        let text = format!(
            "Gap alert: {symbol} {venue_a}/{venue_b}\n\
             {venue_a}={:.6} {venue_b}={:.6}\n\
             gap={gap_pct:+.4}% diff={abs_diff_usdt:.2} USDT\n\
             tradable={notional:.2} USDT ({:.0} KRW)",
            quote_a.last,
            quote_b.last,
            notional * USDT_TO_KRW,
        );
        self.send(&text).await
    }

    async fn send_trade_outcome(
        &self,
        symbol: &str,
        venue_a: VenueId,
        side_a: OrderSide,
        venue_b: VenueId,
        side_b: OrderSide,
        gap_pct: f64,
        price_a: f64,
        price_b: f64,
        notional: f64,
        success: bool,
    ) -> bool {
        let glyph = if success { "" } else { "\u{26A0} " };
        let text = format!(
            "{glyph}Trade {symbol}: {venue_a} {side_a:?} @ {price_a:.6}, {venue_b} {side_b:?} @ {price_b:.6}\n\
             gap={gap_pct:+.4}% notional={notional:.2} USDT, cross mode, 1\u{d7} leverage\n\
             result: {}",
            if success { "ok" } else { "failed" }
        );
        self.send(&text).await
    }

    async fn send_close_outcome(&self, symbol: &str, legs: &[(VenueId, OrderSide, f64, f64)]) -> bool {
        let mut text = format!("Closed {symbol}:\n");
        for (venue, side, size, unrealized_pnl) in legs {
            text.push_str(&format!("  {venue} {side:?} size={size:.4} pnl={unrealized_pnl:.2}\n"));
        }
        self.send(&text).await
    }
}

pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self { client: Client::new(), token, chat_id }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => true,
            Ok(r) => {
                warn!(status = %r.status(), "notifier send rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "notifier send failed");
                false
            }
        }
    }
}

/// Used when `NOTIFIER_TOKEN`/`NOTIFIER_CHAT_ID` are absent. `send` always
/// returns `false`, matching the disabled-mode contract exactly.
pub struct NullNotifier;

#[async_trait::async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, text: &str) -> bool {
        tracing::debug!(text, "notifier disabled, message dropped");
        false
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_notifier_never_succeeds_but_never_panics() {
        let notifier = NullNotifier;
        assert!(!notifier.send("hello").await);
        assert!(
            !notifier
                .send_gap_alert(VenueId::M, VenueId::B, "XRP/USDT", &Ticker { last: 0.52, ts: 0 }, &Ticker { last: 0.5197, ts: 0 }, 0.0577, 950.0)
                .await
        );
    }
}
