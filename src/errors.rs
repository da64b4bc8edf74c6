//! Typed error taxonomy.
//!
//! Adapters and the router never unwind across their boundary — they return
//! sentinels or `Result<_, ArbError>`. `anyhow::Result` is reserved for
//! `main` and axum handlers that need to collapse an error into an HTTP
//! status.

use thiserror::Error;

use crate::venues::VenueId;

#[derive(Debug, Error)]
pub enum ArbError {
    /// Reserved for config-shaped failures. In practice a missing
    /// credential never reaches this variant — `Config::from_env` simply
    /// leaves that venue unregistered (see `main`), so config problems
    /// surface as `UnknownVenue` at the router instead of unwinding here.
    #[error("config error: {0}")]
    Config(String),

    #[error("venue {venue} rpc failed: {detail}")]
    VenueRpc { venue: VenueId, detail: String },

    #[error("venue {venue} auth failed: {detail}")]
    VenueAuth { venue: VenueId, detail: String },

    #[error("router has no adapter registered for venue {0}")]
    UnknownVenue(VenueId),

    #[error("sizing produced a non-positive notional")]
    Sizing,

    #[error("one leg of the dual-leg order failed: {detail}")]
    ExecutionPartial { detail: String },

    #[error("both legs of the dual-leg order failed: {detail}")]
    ExecutionTotalFailure { detail: String },
}

/// Control-plane signal for the monitor loop. Deliberately kept out of
/// `ArbError` — stopping the loop is not a failure, and folding it into the
/// error channel would make shutdown indistinguishable from an RPC fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    Stop,
}
