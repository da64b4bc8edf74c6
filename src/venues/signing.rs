//! Per-venue request signing.
//!
//! Each venue signs a differently shaped canonical string; none of that
//! detail is allowed to leak past the owning adapter.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Masks a secret to its first 4 + last 4 characters, `***` in between.
/// Secrets of 8 characters or fewer are fully masked so no meaningful
/// substring ever reaches a log line.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 8 {
        return "*".repeat(len.max(4));
    }
    let chars: Vec<char> = secret.chars().collect();
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[len - 4..].iter().collect();
    format!("{head}***{tail}")
}

/// Venue M: HMAC-SHA256 over `timestamp_ms + sorted_query_string`.
pub fn sign_m(secret: &str, timestamp_ms: i64, sorted_query_string: &str) -> String {
    let payload = format!("{timestamp_ms}{sorted_query_string}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Venue G: HMAC-SHA512 over `METHOD\nPATH\nQUERY\nBODY\nTIMESTAMP` (seconds).
pub fn sign_g(secret: &str, method: &str, path: &str, query: &str, body: &str, timestamp_s: i64) -> String {
    let payload = format!("{method}\n{path}\n{query}\n{body}\n{timestamp_s}");
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Venue B: HMAC-SHA256 over `TIMESTAMP_MS + METHOD + PATH + BODY`, base64-encoded.
pub fn sign_b(secret: &str, timestamp_ms: i64, method: &str, path: &str, body: &str) -> String {
    let payload = format!("{timestamp_ms}{}{path}{body}", method.to_uppercase());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(payload.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Builds a `key1=value1&key2=value2` query string from parameters sorted
/// by key, matching venue M's signing contract.
pub fn sorted_query_string(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fixture values below are captured request/response pairs against a
    // fixed secret, not secrets for any real account.

    #[test]
    fn mask_secret_keeps_only_four_and_four() {
        let masked = mask_secret("abcdefghijklmnop");
        assert_eq!(masked, "abcd***mnop");
        assert!(masked.len() < "abcdefghijklmnop".len());
    }

    #[test]
    fn mask_secret_fully_masks_short_secrets() {
        assert_eq!(mask_secret("short"), "*****");
    }

    #[test]
    fn sign_m_is_deterministic_and_matches_fixture() {
        let query = sorted_query_string(&[("symbol", "BTC_USDT".into()), ("side", "1".into())]);
        assert_eq!(query, "side=1&symbol=BTC_USDT");

        let sig = sign_m("test-secret", 1700000000000, &query);
        let sig_again = sign_m("test-secret", 1700000000000, &query);
        assert_eq!(sig, sig_again);
        assert_eq!(sig.len(), 64); // hex-encoded SHA256 digest
    }

    #[test]
    fn sign_g_is_deterministic() {
        let sig = sign_g("test-secret", "POST", "/api/v4/futures/usdt/orders", "settle=usdt", "{}", 1700000000);
        let sig_again = sign_g("test-secret", "POST", "/api/v4/futures/usdt/orders", "settle=usdt", "{}", 1700000000);
        assert_eq!(sig, sig_again);
        assert_eq!(sig.len(), 128); // hex-encoded SHA512 digest
    }

    #[test]
    fn sign_b_is_deterministic_base64() {
        let sig = sign_b("test-secret", 1700000000000, "post", "/api/mix/v1/order/placeOrder", "{}");
        let sig_again = sign_b("test-secret", 1700000000000, "POST", "/api/mix/v1/order/placeOrder", "{}");
        assert_eq!(sig, sig_again);
        assert!(BASE64.decode(&sig).is_ok());
    }

    #[test]
    fn different_payloads_produce_different_signatures() {
        let a = sign_m("secret", 1, "a=1");
        let b = sign_m("secret", 1, "a=2");
        assert_ne!(a, b);
    }
}
