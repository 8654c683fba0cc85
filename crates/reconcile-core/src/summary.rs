use serde::{Deserialize, Serialize};

/// Outcome of one reconciliation sweep. Never persisted as a record of its
/// own; the CLI prints it and the run stamp keeps the latest copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ReconciliationResult {
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Total number of candidates that were looked at.
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped + self.errors.len()
    }

    pub fn merge(&mut self, other: ReconciliationResult) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }

    pub fn to_cli_summary(&self) -> String {
        let parts = [
            format!("created={}", self.created),
            format!("updated={}", self.updated),
            format!("skipped={}", self.skipped),
            format!("errors={}", self.errors.len()),
        ];
        parts.join(", ")
    }
}
