use serde::{Deserialize, Serialize};

/// Execution and memory counters for one simulated core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Core {
    pub compute_instructions: u64,
    pub compute_cycles: u64,
    pub load_store_instructions: u64,
    /// Cycles spent stalled on the memory system.
    pub idle_cycles: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl Core {
    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }

    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64
    }
}
