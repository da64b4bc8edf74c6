//! Process configuration, read once at startup.
//!
//! Follows the `Config::from_env` idiom used throughout this codebase:
//! `dotenv` loads a local `.env` if present, then every field falls back to
//! a documented default via `unwrap_or_else` / `unwrap_or` chains rather than
//! failing hard. Missing venue credentials are not a configuration error —
//! they simply leave that venue unregistered.

use crate::venues::VenueId;

#[derive(Debug, Clone)]
pub struct VenueConfig {
    pub venue: VenueId,
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
    pub base_url: String,
    pub rate_limit_ms: u64,
    pub default_margin_mode: String,
    pub default_leverage: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub monitor_tick_ms: u64,
    pub m: Option<VenueConfig>,
    pub g: Option<VenueConfig>,
    pub b: Option<VenueConfig>,
    pub notifier_token: Option<String>,
    pub notifier_chat_id: Option<String>,
    pub session_secret: Option<String>,
    pub audit_dir: Option<String>,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl VenueConfig {
    /// Reads `{PREFIX}_API_KEY` / `{PREFIX}_API_SECRET` (and, for venue B,
    /// `{PREFIX}_PASSPHRASE`). Returns `None` when key or secret is absent —
    /// the venue is then simply never registered with the router.
    fn from_env(venue: VenueId, prefix: &str, base_url: &str, needs_passphrase: bool) -> Option<Self> {
        let api_key = std::env::var(format!("{prefix}_API_KEY")).ok()?;
        let api_secret = std::env::var(format!("{prefix}_API_SECRET")).ok()?;
        let passphrase = if needs_passphrase {
            let p = std::env::var(format!("{prefix}_PASSPHRASE")).ok()?;
            Some(p)
        } else {
            None
        };

        Some(Self {
            venue,
            api_key,
            api_secret,
            passphrase,
            base_url: base_url.to_string(),
            rate_limit_ms: env_u64(&format!("{prefix}_RATE_LIMIT_MS"), 20),
            default_margin_mode: std::env::var(format!("{prefix}_MARGIN_MODE"))
                .unwrap_or_else(|_| "cross".to_string()),
            default_leverage: env_u32(&format!("{prefix}_LEVERAGE"), 1),
        })
    }

    /// First 4 + last 4 characters of the API key, `***` between. Used
    /// anywhere a `VenueConfig` needs to appear in logs or diagnostics —
    /// the secret and passphrase are never emitted at all.
    pub fn masked_key(&self) -> String {
        crate::venues::signing::mask_secret(&self.api_key)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let monitor_tick_ms = env_u64("MONITOR_TICK_MS", 500);

        let m = VenueConfig::from_env(
            VenueId::M,
            "M",
            &std::env::var("M_BASE_URL").unwrap_or_else(|_| "https://contract.mexc.com".to_string()),
            false,
        );
        let g = VenueConfig::from_env(
            VenueId::G,
            "G",
            &std::env::var("G_BASE_URL").unwrap_or_else(|_| "https://api.gateio.ws".to_string()),
            false,
        );
        let b = VenueConfig::from_env(
            VenueId::B,
            "B",
            &std::env::var("B_BASE_URL").unwrap_or_else(|_| "https://api.bitget.com".to_string()),
            true,
        );

        let notifier_token = std::env::var("NOTIFIER_TOKEN").ok();
        let notifier_chat_id = std::env::var("NOTIFIER_CHAT_ID").ok();
        let session_secret = std::env::var("SESSION_SECRET").ok();
        let audit_dir = std::env::var("AUDIT_DIR").ok();

        Ok(Self {
            port,
            monitor_tick_ms,
            m,
            g,
            b,
            notifier_token,
            notifier_chat_id,
            session_secret,
            audit_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_yield_none_not_error() {
        std::env::remove_var("Z_API_KEY");
        std::env::remove_var("Z_API_SECRET");
        assert!(VenueConfig::from_env(VenueId::M, "Z", "https://example.test", false).is_none());
    }

    #[test]
    fn venue_b_requires_passphrase() {
        std::env::set_var("ZB_API_KEY", "key");
        std::env::set_var("ZB_API_SECRET", "secret");
        std::env::remove_var("ZB_PASSPHRASE");
        assert!(VenueConfig::from_env(VenueId::B, "ZB", "https://example.test", true).is_none());

        std::env::set_var("ZB_PASSPHRASE", "phrase");
        assert!(VenueConfig::from_env(VenueId::B, "ZB", "https://example.test", true).is_some());

        std::env::remove_var("ZB_API_KEY");
        std::env::remove_var("ZB_API_SECRET");
        std::env::remove_var("ZB_PASSPHRASE");
    }
}
