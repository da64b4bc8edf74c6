//! Bridges the HTTP control surface to the Gap Monitor without cyclic
//! coupling between monitor, executor, and notifier: the handler only ever
//! talks to `MonitorHandle`,
//! which owns the single `Monitor` instance and its lifecycle.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::errors::MonitorCommand;
use crate::monitor::Monitor;

pub struct MonitorHandle {
    monitor: Arc<Mutex<Monitor>>,
    running: Arc<std::sync::atomic::AtomicBool>,
    stop_tx: Mutex<Option<watch::Sender<Option<MonitorCommand>>>>,
}

impl MonitorHandle {
    pub fn new(monitor: Monitor) -> Self {
        let running = monitor.running_handle();
        Self { monitor: Arc::new(Mutex::new(monitor)), running, stop_tx: Mutex::new(None) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn start(&self) -> Result<(), &'static str> {
        if self.is_running() {
            return Err("already running");
        }

        let (tx, rx) = watch::channel(None);
        *self.stop_tx.lock().await = Some(tx);

        let monitor = Arc::clone(&self.monitor);
        tokio::spawn(async move {
            let mut guard = monitor.lock().await;
            guard.run(rx).await;
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<(), &'static str> {
        if !self.is_running() {
            return Err("not running");
        }
        let guard = self.stop_tx.lock().await;
        match guard.as_ref() {
            Some(tx) => {
                let _ = tx.send(Some(MonitorCommand::Stop));
                Ok(())
            }
            None => Err("not running"),
        }
    }

    pub fn status_str(&self) -> &'static str {
        if self.is_running() {
            "running"
        } else {
            "stopped"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditSink;
    use crate::executor::Executor;
    use crate::notifier::NullNotifier;
    use crate::venues::VenueRouter;

    #[tokio::test]
    async fn start_then_stop_transitions_running_state() {
        let router = Arc::new(VenueRouter::new());
        let executor = Arc::new(Executor::new(router.clone()));
        let notifier = Arc::new(NullNotifier);
        let audit = Arc::new(AuditSink::disabled());
        let monitor = Monitor::new(router, executor, notifier, audit, 20);
        let handle = MonitorHandle::new(monitor);

        assert!(!handle.is_running());
        handle.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(handle.is_running());

        handle.stop().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let router = Arc::new(VenueRouter::new());
        let executor = Arc::new(Executor::new(router.clone()));
        let notifier = Arc::new(NullNotifier);
        let audit = Arc::new(AuditSink::disabled());
        let monitor = Monitor::new(router, executor, notifier, audit, 20);
        let handle = MonitorHandle::new(monitor);

        handle.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert_eq!(handle.start().await, Err("already running"));
        handle.stop().await.unwrap();
    }
}
