//! Audit sink: optional, fire-and-forget.
//!
//! Appends one row per evaluated gap sample, partitioned into one file per
//! venue pair. A missing/unwritable directory disables the sink for the
//! process lifetime rather than failing startup — it never gates trade or
//! notify signal delivery.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

use crate::venues::VenueId;

#[derive(Debug, Serialize)]
pub struct AuditRow {
    pub gap_pct: f64,
    pub price_diff_usdt: f64,
    pub price_a: f64,
    pub price_b: f64,
    pub volume_a: f64,
    pub volume_b: f64,
    pub min_volume: f64,
}

struct WriterSlot {
    pair: (VenueId, VenueId),
    writer: Mutex<csv::Writer<std::fs::File>>,
}

pub struct AuditSink {
    dir: Option<PathBuf>,
    writers: Mutex<Vec<WriterSlot>>,
}

impl AuditSink {
    pub fn new(dir: Option<String>) -> Self {
        Self { dir: dir.map(PathBuf::from), writers: Mutex::new(Vec::new()) }
    }

    pub fn disabled() -> Self {
        Self { dir: None, writers: Mutex::new(Vec::new()) }
    }

    fn file_name(venue_a: VenueId, venue_b: VenueId) -> String {
        format!("audit_{}_{}.csv", venue_a.to_string().to_lowercase(), venue_b.to_string().to_lowercase())
    }

    /// Fire-and-forget: any failure is logged and silently swallowed.
    pub fn record(&self, venue_a: VenueId, venue_b: VenueId, row: AuditRow) {
        let Some(dir) = &self.dir else { return };
        let mut writers = self.writers.lock().expect("audit sink mutex poisoned");

        let slot = writers.iter().position(|w| w.pair == (venue_a, venue_b));
        let idx = match slot {
            Some(i) => i,
            None => {
                let path = dir.join(Self::file_name(venue_a, venue_b));
                let needs_header = !path.exists();
                let file = match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, path = %path.display(), "audit sink unwritable, disabling for this pair");
                        return;
                    }
                };
                let writer = csv::WriterBuilder::new().has_headers(needs_header).from_writer(file);
                writers.push(WriterSlot { pair: (venue_a, venue_b), writer: Mutex::new(writer) });
                writers.len() - 1
            }
        };

        let mut writer = writers[idx].writer.lock().expect("audit sink mutex poisoned");
        if let Err(e) = writer.serialize(&row) {
            warn!(error = %e, "audit row serialize failed");
            return;
        }
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sink_never_panics_on_record() {
        let sink = AuditSink::disabled();
        sink.record(
            VenueId::M,
            VenueId::B,
            AuditRow { gap_pct: 0.05, price_diff_usdt: 1.0, price_a: 1.0, price_b: 0.99, volume_a: 100.0, volume_b: 100.0, min_volume: 100.0 },
        );
    }

    #[test]
    fn writes_a_row_to_a_real_directory() {
        let dir = std::env::temp_dir().join(format!("arb-engine-audit-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sink = AuditSink::new(Some(dir.to_string_lossy().to_string()));
        sink.record(
            VenueId::G,
            VenueId::B,
            AuditRow { gap_pct: -0.07, price_diff_usdt: 2.0, price_a: 1.0, price_b: 1.02, volume_a: 50.0, volume_b: 60.0, min_volume: 50.0 },
        );
        let path = dir.join("audit_g_b.csv");
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
