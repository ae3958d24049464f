use serde::{Deserialize, Serialize};

/// Shared-bus totals, accumulated across all cores.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bus {
    /// Bytes moved over the bus, logged once at the point the transfer's
    /// cycles are charged.
    pub data_traffic_bytes: u64,
    /// Invalidations (MESI, MOESI) or update broadcasts (Dragon), one per
    /// bus transaction.
    pub invalidations_or_updates: u64,
}
