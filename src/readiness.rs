//! Startup readiness, surfaced by `GET /api/status`. Written once during
//! startup, read thereafter — the one piece of cross-component state the
//! control surface needs synchronized access to.

#[derive(Debug, Clone, Default)]
pub struct Readiness {
    pub initialized: bool,
    pub details: Vec<String>,
}

impl Readiness {
    pub fn step(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        self.step("initialization complete");
    }
}
