use crate::config::{Geometry, Protocol};
use crate::core::Core;
use crate::instruction::Instruction;
use crate::protocol::MemorySystem;
use crate::request::MemoryRequest;
use crate::NUM_CORES;

/// Drives the cores and the memory system on one global clock.
///
/// Each tick advances every core in index order, hands the batch of newly
/// emitted requests to the memory system, unblocks cores whose requests
/// completed, and increments the cycle counter. The counter is the only
/// time source in the simulation.
#[derive(Debug)]
pub struct Simulator {
    cores: Vec<Core>,
    memory: MemorySystem,
    cycle: u64,
    report: stats::Report,
    pending: Vec<MemoryRequest>,
    completed: Vec<MemoryRequest>,
}

impl Simulator {
    /// Builds a simulator over one instruction trace per core.
    ///
    /// # Panics
    /// When the number of traces differs from [`NUM_CORES`].
    #[must_use]
    pub fn new(protocol: Protocol, geometry: Geometry, traces: Vec<Vec<Instruction>>) -> Self {
        assert_eq!(traces.len(), NUM_CORES, "expected one trace per core");
        Self {
            cores: traces
                .into_iter()
                .enumerate()
                .map(|(id, instructions)| Core::new(id, instructions))
                .collect(),
            memory: MemorySystem::new(protocol, geometry),
            cycle: 0,
            report: stats::Report::new(NUM_CORES),
            pending: Vec::with_capacity(NUM_CORES),
            completed: Vec::with_capacity(NUM_CORES),
        }
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.cores.iter().all(Core::is_completed)
    }

    /// Advances the whole machine by one cycle. A tick is atomic: cores in
    /// index order, then the memory system, then completions.
    fn tick(&mut self) {
        self.pending.clear();
        self.completed.clear();

        for core_id in 0..self.cores.len() {
            if let Some(request) = self.cores[core_id].advance(&mut self.report.cores[core_id]) {
                self.pending.push(request);
            }
        }

        self.memory
            .tick(&self.pending, &mut self.completed, self.cycle, &mut self.report);

        for request in self.completed.drain(..) {
            self.cores[request.core].memory_request_completed(&mut self.report.cores[request.core]);
        }

        self.cycle += 1;
    }

    /// Runs to completion and returns the final report.
    ///
    /// The driver halts the first tick at which all cores are completed;
    /// the cycle counter at that point is the overall execution cycle
    /// count.
    pub fn run(mut self) -> stats::Report {
        while !self.all_completed() {
            self.tick();
        }
        self.report.sim.cycles = self.cycle;
        log::info!("simulation completed after {} cycles", self.cycle);
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::Simulator;
    use crate::config::{Geometry, Protocol};
    use crate::instruction::Instruction;
    use crate::NUM_CORES;
    use color_eyre::eyre;
    use pretty_assertions::assert_eq;

    fn geometry() -> eyre::Result<Geometry> {
        Ok(Geometry::new(1024, 2, 32)?)
    }

    fn traces(per_core: [Vec<Instruction>; NUM_CORES]) -> Vec<Vec<Instruction>> {
        Vec::from(per_core)
    }

    #[test]
    fn single_core_hit_storm() -> eyre::Result<()> {
        // 100 loads of the same address: one cold miss at 101 cycles, then
        // 99 hits at one cycle each.
        let report = Simulator::new(
            Protocol::Mesi,
            geometry()?,
            traces([
                vec![Instruction::Load(0x0); 100],
                vec![],
                vec![],
                vec![],
            ]),
        )
        .run();

        assert_eq!(report.sim.cycles, 200);
        assert_eq!(report.cores[0].cache_misses, 1);
        assert_eq!(report.cores[0].cache_hits, 99);
        assert_eq!(report.cores[0].idle_cycles, 200);
        assert_eq!(report.bus.data_traffic_bytes, 32);
        assert_eq!(report.accesses.private, 100);
        assert_eq!(report.accesses.shared, 0);
        Ok(())
    }

    #[test]
    fn two_core_read_share() -> eyre::Result<()> {
        // Core 1's miss queues behind core 0's; once core 0 owns the block
        // it supplies it cache-to-cache in 2 * words_per_block cycles.
        let report = Simulator::new(
            Protocol::Mesi,
            geometry()?,
            traces([
                vec![Instruction::Load(0x0)],
                vec![Instruction::Load(0x0)],
                vec![],
                vec![],
            ]),
        )
        .run();

        // 101 for the memory fetch, then 16 + 1 for the shared fill.
        assert_eq!(report.sim.cycles, 118);
        assert_eq!(report.cores[0].idle_cycles, 101);
        assert_eq!(report.cores[1].idle_cycles, 118);
        assert_eq!(report.bus.data_traffic_bytes, 64);
        assert_eq!(report.accesses.private, 1);
        assert_eq!(report.accesses.shared, 1);
        Ok(())
    }

    #[test]
    fn all_cores_converge() -> eyre::Result<()> {
        let trace = vec![
            Instruction::Load(0x0),
            Instruction::Store(0x0),
            Instruction::Compute(10),
        ];
        let report = Simulator::new(
            Protocol::Mesi,
            geometry()?,
            traces([trace.clone(), trace.clone(), trace.clone(), trace]),
        )
        .run();

        let mut longest_path = 0;
        for core in &report.cores {
            assert_eq!(core.compute_instructions, 1);
            assert_eq!(core.compute_cycles, 10);
            assert_eq!(core.load_store_instructions, 2);
            assert_eq!(core.cache_hits + core.cache_misses, 2);
            longest_path = longest_path.max(core.compute_cycles + core.idle_cycles);
        }
        assert_eq!(report.sim.cycles, longest_path);
        assert!(report.accesses.total() >= 8);
        Ok(())
    }

    #[test]
    fn runs_are_deterministic() -> eyre::Result<()> {
        let trace = vec![
            Instruction::Store(0x40),
            Instruction::Compute(3),
            Instruction::Load(0x0),
            Instruction::Load(0x40),
        ];
        for protocol in [Protocol::Mesi, Protocol::Dragon, Protocol::Moesi] {
            let build = || {
                Simulator::new(
                    protocol,
                    Geometry::new(1024, 2, 32).unwrap(),
                    traces([
                        trace.clone(),
                        trace.clone(),
                        trace.clone(),
                        trace.clone(),
                    ]),
                )
            };
            assert_eq!(build().run(), build().run());
        }
        Ok(())
    }

    #[test]
    fn empty_traces_complete_in_one_cycle() -> eyre::Result<()> {
        let report = Simulator::new(
            Protocol::Dragon,
            geometry()?,
            traces([vec![], vec![], vec![], vec![]]),
        )
        .run();
        assert_eq!(report.sim.cycles, 1);
        assert_eq!(report.accesses.total(), 0);
        Ok(())
    }

    #[test]
    fn compute_only_cores_never_touch_the_bus() -> eyre::Result<()> {
        let report = Simulator::new(
            Protocol::Moesi,
            geometry()?,
            traces([
                vec![Instruction::Compute(5), Instruction::Compute(2)],
                vec![Instruction::Compute(7)],
                vec![],
                vec![],
            ]),
        )
        .run();
        assert_eq!(report.sim.cycles, 7);
        assert_eq!(report.cores[0].compute_cycles, 7);
        assert_eq!(report.cores[1].compute_cycles, 7);
        assert_eq!(report.bus.data_traffic_bytes, 0);
        Ok(())
    }
}
