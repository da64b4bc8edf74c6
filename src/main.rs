use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arb_engine::api::{self, AppState};
use arb_engine::audit::AuditSink;
use arb_engine::config::Config;
use arb_engine::executor::Executor;
use arb_engine::monitor::Monitor;
use arb_engine::monitor_handle::MonitorHandle;
use arb_engine::notifier::{NullNotifier, TelegramNotifier};
use arb_engine::readiness::Readiness;
use arb_engine::venues::venue_b::VenueB;
use arb_engine::venues::venue_g::VenueG;
use arb_engine::venues::venue_m::VenueM;
use arb_engine::venues::VenueRouter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    info!("arb-engine starting up");

    let mut readiness = Readiness::default();
    let router = Arc::new(VenueRouter::new());

    if let Some(venue_config) = config.m.clone() {
        router.register(Arc::new(VenueM::new(venue_config)));
        readiness.step("venue M registered");
    } else {
        readiness.step("venue M not registered: missing credentials");
    }

    if let Some(venue_config) = config.g.clone() {
        router.register(Arc::new(VenueG::new(venue_config)));
        readiness.step("venue G registered");
    } else {
        readiness.step("venue G not registered: missing credentials");
    }

    if let Some(venue_config) = config.b.clone() {
        router.register(Arc::new(VenueB::new(venue_config)));
        readiness.step("venue B registered");
    } else {
        readiness.step("venue B not registered: missing credentials");
    }

    let notifier: Arc<dyn arb_engine::notifier::Notifier> = match (&config.notifier_token, &config.notifier_chat_id) {
        (Some(token), Some(chat_id)) => {
            readiness.step("notifier enabled");
            Arc::new(TelegramNotifier::new(token.clone(), chat_id.clone()))
        }
        _ => {
            readiness.step("notifier disabled: missing credentials");
            Arc::new(NullNotifier)
        }
    };

    let audit = Arc::new(AuditSink::new(config.audit_dir.clone()));
    let executor = Arc::new(Executor::new(router.clone()));
    let monitor = Monitor::new(router.clone(), executor.clone(), notifier.clone(), audit, config.monitor_tick_ms);
    let monitor_handle = Arc::new(MonitorHandle::new(monitor));

    readiness.mark_initialized();
    let readiness = Arc::new(parking_lot::RwLock::new(readiness));

    let state = AppState { router, monitor_handle, notifier, readiness };
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "control surface listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "arb_engine=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
