pub mod dragon;
pub mod mesi;
pub mod moesi;

use crate::addrdec::AddressDecoder;
use crate::cache::{CacheArray, LineState};
use crate::config::{Geometry, Protocol};
use crate::fifo::Fifo;
use crate::request::{BusTransaction, MemoryRequest};
use crate::{NUM_CORES, WORD_SIZE_BYTES};

/// Cycles for an L1 hit.
pub const HIT_CYCLES: u64 = 1;
/// Cycles to fetch a block from main memory.
pub const MEM_FETCH_CYCLES: u64 = 100;
/// Cycles to write a dirty block back to main memory.
pub const WRITE_BACK_CYCLES: u64 = 100;
/// Cycles to move one word between caches over the bus.
pub const BUS_TRANSFER_PER_WORD_CYCLES: u64 = 2;

/// The shared-bus memory subsystem: one L1 cache per core, a FIFO queue of
/// coherence transactions for the single-occupancy bus, and a pool of
/// bus-free hits draining in parallel.
#[derive(Debug)]
pub struct MemorySystem {
    protocol: Protocol,
    geometry: Geometry,
    decoder: AddressDecoder,
    caches: Vec<CacheArray>,
    bus_queue: Fifo<BusTransaction>,
    /// The processed head of the bus queue; at most one transaction holds
    /// the bus at any cycle.
    active: Option<BusTransaction>,
    /// Hits that never needed the bus.
    non_bus: Vec<(MemoryRequest, u64)>,
}

impl MemorySystem {
    #[must_use]
    pub fn new(protocol: Protocol, geometry: Geometry) -> Self {
        Self {
            protocol,
            geometry,
            decoder: AddressDecoder::new(&geometry),
            caches: (0..NUM_CORES).map(|_| CacheArray::new(&geometry)).collect(),
            bus_queue: Fifo::new(),
            active: None,
            non_bus: Vec::new(),
        }
    }

    /// One cycle of the memory subsystem.
    ///
    /// Absorbs this tick's `incoming` requests, then drains the non-bus
    /// pool and the bus head in parallel within the same cycle. Requests
    /// whose budget reaches zero are appended to `completed`.
    pub fn tick(
        &mut self,
        incoming: &[MemoryRequest],
        completed: &mut Vec<MemoryRequest>,
        now: u64,
        report: &mut stats::Report,
    ) {
        for request in incoming {
            self.handle_incoming(*request, now, report);
        }

        let mut still_executing = Vec::with_capacity(self.non_bus.len());
        for (request, remaining) in self.non_bus.drain(..) {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                completed.push(request);
            } else {
                still_executing.push((request, remaining));
            }
        }
        self.non_bus = still_executing;

        if self.active.is_none() {
            if let Some(mut transaction) = self.bus_queue.dequeue() {
                self.process_bus_transaction(&mut transaction, now, report);
                transaction.processed = true;
                log::trace!("bus: processed {transaction}");
                self.active = Some(transaction);
            }
        }
        if let Some(mut transaction) = self.active.take() {
            transaction.remaining_cycles = transaction.remaining_cycles.saturating_sub(1);
            if transaction.remaining_cycles == 0 {
                completed.push(transaction.request);
            } else {
                self.active = Some(transaction);
            }
        }
    }

    /// True when no request is in flight anywhere in the subsystem.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.non_bus.is_empty() && self.active.is_none() && self.bus_queue.is_empty()
    }

    /// Coherence state of `core`'s copy of the block holding `addr`.
    #[must_use]
    pub fn line_state(&self, core: usize, addr: u32) -> LineState {
        let (set_idx, way) = self.find_in_cache(core, addr);
        match way {
            Some(way) => self.caches[core].line(set_idx, way).state,
            None => LineState::Invalid,
        }
    }

    fn handle_incoming(&mut self, request: MemoryRequest, now: u64, report: &mut stats::Report) {
        log::trace!("memory: {request} at cycle {now}");
        match self.protocol {
            Protocol::Mesi => self.mesi_handle_incoming(request, now, report),
            Protocol::Dragon => self.dragon_handle_incoming(request, now, report),
            Protocol::Moesi => self.moesi_handle_incoming(request, now, report),
        }
    }

    fn process_bus_transaction(
        &mut self,
        transaction: &mut BusTransaction,
        now: u64,
        report: &mut stats::Report,
    ) {
        match self.protocol {
            Protocol::Mesi => self.mesi_process_bus_transaction(transaction, now, report),
            Protocol::Dragon => self.dragon_process_bus_transaction(transaction, now, report),
            Protocol::Moesi => self.moesi_process_bus_transaction(transaction, now, report),
        }
    }

    /// (set index, way) of `addr` in `core`'s cache, if a valid copy exists.
    fn find_in_cache(&self, core: usize, addr: u32) -> (u32, Option<usize>) {
        let set_idx = self.decoder.set_idx(addr);
        let tag = self.decoder.tag(addr);
        (set_idx, self.caches[core].lookup(set_idx, tag))
    }

    /// Picks and pre-allocates the victim way for a missing `request`,
    /// returning (set index, way, starting cycles). The starting cycles
    /// cover the write-back when the victim was dirty.
    fn evict_and_allocate(
        &mut self,
        request: &MemoryRequest,
        now: u64,
        report: &mut stats::Report,
    ) -> (u32, usize, u64) {
        let set_idx = self.decoder.set_idx(request.addr);
        let tag = self.decoder.tag(request.addr);
        let way = self.caches[request.core].pick_victim(set_idx);
        let mut starting_cycles = 0;
        if self.caches[request.core].line(set_idx, way).state.is_dirty() {
            starting_cycles += self.charge_write_back(report);
        }
        self.caches[request.core].allocate(set_idx, way, tag, now);
        (set_idx, way, starting_cycles)
    }

    /// Completes a hit without bus involvement.
    fn finish_hit(&mut self, request: MemoryRequest, set_idx: u32, way: usize, now: u64) {
        self.caches[request.core].touch(set_idx, way, now);
        self.non_bus.push((request, HIT_CYCLES));
    }

    /// Installs the requester's final line state once its bus transaction
    /// is processed, stamping the LRU metadata.
    fn settle_requester(&mut self, transaction: &BusTransaction, state: LineState, now: u64) {
        let line =
            self.caches[transaction.request.core].line_mut(transaction.set_idx, transaction.way);
        line.state = state;
        line.last_used = now;
    }

    /// Other cores in index order, the order bus snooping visits them.
    fn snoop_order(core: usize) -> impl Iterator<Item = usize> {
        (0..NUM_CORES).filter(move |&other| other != core)
    }

    // Bytes are logged at the point the cycles for a transfer are charged,
    // each byte exactly once.

    fn charge_mem_fetch(&self, report: &mut stats::Report) -> u64 {
        report.bus.data_traffic_bytes += u64::from(self.geometry.block_size_bytes());
        MEM_FETCH_CYCLES
    }

    fn charge_write_back(&self, report: &mut stats::Report) -> u64 {
        report.bus.data_traffic_bytes += u64::from(self.geometry.block_size_bytes());
        WRITE_BACK_CYCLES
    }

    fn charge_block_transfer(&self, report: &mut stats::Report) -> u64 {
        report.bus.data_traffic_bytes += u64::from(self.geometry.block_size_bytes());
        BUS_TRANSFER_PER_WORD_CYCLES * u64::from(self.geometry.words_per_block())
    }

    fn charge_word_update(&self, report: &mut stats::Report) -> u64 {
        report.bus.data_traffic_bytes += u64::from(WORD_SIZE_BYTES);
        BUS_TRANSFER_PER_WORD_CYCLES
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::MemorySystem;
    use crate::config::Geometry;
    use crate::request::{AccessKind, MemoryRequest};

    pub(crate) fn geometry() -> Geometry {
        Geometry::new(1024, 2, 32).unwrap()
    }

    pub(crate) fn load(core: usize, addr: u32) -> MemoryRequest {
        MemoryRequest {
            core,
            kind: AccessKind::Load,
            addr,
        }
    }

    pub(crate) fn store(core: usize, addr: u32) -> MemoryRequest {
        MemoryRequest {
            core,
            kind: AccessKind::Store,
            addr,
        }
    }

    /// Feeds `request` at cycle `start` and ticks until it completes,
    /// returning the number of ticks taken.
    pub(crate) fn complete_request(
        system: &mut MemorySystem,
        request: MemoryRequest,
        start: u64,
        report: &mut stats::Report,
    ) -> u64 {
        let mut completed = Vec::new();
        let mut now = start;
        system.tick(&[request], &mut completed, now, report);
        now += 1;
        while completed.is_empty() {
            assert!(now - start < 10_000, "request never completed");
            system.tick(&[], &mut completed, now, report);
            now += 1;
        }
        assert_eq!(completed, vec![request]);
        now - start
    }
}
