//! Diagnostic counters kept alongside the relay.
//!
//! Purely informational: nothing here feeds back into verification.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    /// Chains registered through this instance.
    pub chains_registered: u64,
    /// Headers accepted (a batch counts each header).
    pub headers_accepted: u64,
    /// Submissions rejected (a rejected batch counts once).
    pub submissions_rejected: u64,
    /// Proofs that verified.
    pub proofs_verified: u64,
    /// Proofs that did not verify.
    pub proofs_rejected: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission<T, E>(&mut self, result: &Result<Vec<T>, E>) {
        match result {
            Ok(accepted) => self.headers_accepted += accepted.len() as u64,
            Err(_) => self.submissions_rejected += 1,
        }
    }

    pub fn record_proof(&mut self, valid: bool) {
        if valid {
            self.proofs_verified += 1;
        } else {
            self.proofs_rejected += 1;
        }
    }

    /// Share of submissions that were accepted (0.0 - 1.0).
    /// Batches count per header when accepted and once when rejected.
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.headers_accepted + self.submissions_rejected;
        if total == 0 {
            return 0.0;
        }
        self.headers_accepted as f64 / total as f64
    }
}
