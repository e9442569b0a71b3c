use serde::{Deserialize, Serialize};

/// ledger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// whole days without any return before a loan reads as overdue
    pub overdue_threshold_days: u32,
}

impl LedgerConfig {
    pub fn new(overdue_threshold_days: u32) -> Self {
        Self {
            overdue_threshold_days,
        }
    }

    /// standard commercial policy: sixty days to first return
    pub fn commercial() -> Self {
        Self {
            overdue_threshold_days: 60,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::commercial()
    }
}
