pub mod accesses;
pub mod bus;
pub mod core;
pub mod sim;

pub use accesses::Accesses;
pub use bus::Bus;
pub use self::core::Core;
pub use sim::Sim;

use serde::{Deserialize, Serialize};

/// All counters collected during one simulation run.
///
/// Owned by the driver and passed mutably into the memory system; the
/// `Display` impl produces the end-of-run plain-text report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub sim: Sim,
    pub cores: Vec<Core>,
    pub bus: Bus,
    pub accesses: Accesses,
}

impl Report {
    #[must_use]
    pub fn new(num_cores: usize) -> Self {
        Self {
            sim: Sim::default(),
            cores: vec![Core::default(); num_cores],
            bus: Bus::default(),
            accesses: Accesses::default(),
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Overall Execution Cycles: {}", self.sim.cycles)?;
        for (core_id, core) in self.cores.iter().enumerate() {
            writeln!(f, "Core {core_id}")?;
            writeln!(f, "\tNum Compute Inst: {}", core.compute_instructions)?;
            writeln!(f, "\tCompute Cycles: {}", core.compute_cycles)?;
            writeln!(f, "\tNum Load Store Inst: {}", core.load_store_instructions)?;
            writeln!(f, "\tIdle Cycles: {}", core.idle_cycles)?;
            writeln!(f, "\tNum Cache Hits: {}", core.cache_hits)?;
            writeln!(f, "\tNum Cache Misses: {}", core.cache_misses)?;
            writeln!(f, "\tCache Hit Rate: {:.5}", core.hit_rate())?;
        }
        writeln!(
            f,
            "Total Bus Data Traffic (Bytes): {}",
            self.bus.data_traffic_bytes
        )?;
        writeln!(
            f,
            "Total Bus Invalidations/Updates: {}",
            self.bus.invalidations_or_updates
        )?;
        writeln!(f, "Total Private Data Access: {}", self.accesses.private)?;
        writeln!(f, "Total Shared Data Access: {}", self.accesses.shared)?;
        writeln!(
            f,
            "Private Data Access Rate: {:.5}",
            self.accesses.private_rate()
        )?;
        write!(
            f,
            "Shared Data Access Rate: {:.5}",
            self.accesses.shared_rate()
        )
    }
}
