//! MOESI: MESI extended with an Owned state. A dirty line answering a bus
//! read keeps the dirty data as `Owned` and serves it cache-to-cache, so no
//! memory write-back happens while the block stays cached somewhere.

use super::{MemorySystem, HIT_CYCLES};
use crate::cache::LineState;
use crate::request::{AccessKind, BusOp, BusTransaction, MemoryRequest};

impl MemorySystem {
    pub(super) fn moesi_handle_incoming(
        &mut self,
        request: MemoryRequest,
        now: u64,
        report: &mut stats::Report,
    ) {
        let (set_idx, way) = self.find_in_cache(request.core, request.addr);
        if let Some(way) = way {
            report.cores[request.core].cache_hits += 1;
            let state = self.caches[request.core].line(set_idx, way).state;
            match (request.kind, state) {
                (AccessKind::Load, _) => {
                    if matches!(state, LineState::Shared | LineState::Owned) {
                        report.accesses.shared += 1;
                    } else {
                        report.accesses.private += 1;
                    }
                    self.finish_hit(request, set_idx, way, now);
                }
                (AccessKind::Store, LineState::Exclusive | LineState::Modified) => {
                    report.accesses.private += 1;
                    self.caches[request.core].line_mut(set_idx, way).state = LineState::Modified;
                    self.finish_hit(request, set_idx, way, now);
                }
                // Shared and Owned copies may be stale elsewhere: the
                // other holders must be invalidated first.
                (AccessKind::Store, LineState::Shared | LineState::Owned) => {
                    self.bus_queue.enqueue(BusTransaction::new(
                        BusOp::ReadExclusive,
                        request,
                        set_idx,
                        way,
                        0,
                    ));
                }
                (AccessKind::Store, state) => {
                    log::error!("moesi: store hit on line in state {state:?}, dropping update");
                }
            }
            return;
        }

        report.cores[request.core].cache_misses += 1;
        let (set_idx, way, starting_cycles) = self.evict_and_allocate(&request, now, report);
        let op = if request.kind.is_store() {
            BusOp::ReadExclusive
        } else {
            BusOp::Read
        };
        self.bus_queue
            .enqueue(BusTransaction::new(op, request, set_idx, way, starting_cycles));
    }

    pub(super) fn moesi_process_bus_transaction(
        &mut self,
        transaction: &mut BusTransaction,
        now: u64,
        report: &mut stats::Report,
    ) {
        let requester = transaction.request.core;
        match transaction.op {
            BusOp::Read => {
                let mut supplied = false;
                for other in Self::snoop_order(requester) {
                    let (other_set, Some(other_way)) =
                        self.find_in_cache(other, transaction.request.addr)
                    else {
                        continue;
                    };
                    match self.caches[other].line(other_set, other_way).state {
                        // The dirty holder keeps the data as Owned and
                        // serves it without touching memory.
                        LineState::Modified => {
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                            self.caches[other].line_mut(other_set, other_way).state =
                                LineState::Owned;
                        }
                        LineState::Exclusive => {
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                            self.caches[other].line_mut(other_set, other_way).state =
                                LineState::Shared;
                        }
                        LineState::Owned | LineState::Shared => {
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                        }
                        state => {
                            log::error!("moesi: bus read supplier in state {state:?}, skipping");
                            continue;
                        }
                    }
                    report.accesses.shared += 1;
                    self.settle_requester(transaction, LineState::Shared, now);
                    supplied = true;
                    break;
                }
                if !supplied {
                    report.accesses.private += 1;
                    transaction.remaining_cycles += self.charge_mem_fetch(report) + HIT_CYCLES;
                    self.settle_requester(transaction, LineState::Exclusive, now);
                }
            }
            BusOp::ReadExclusive => {
                report.bus.invalidations_or_updates += 1;
                let mut other_copy_existed = false;
                for other in Self::snoop_order(requester) {
                    let (other_set, Some(other_way)) =
                        self.find_in_cache(other, transaction.request.addr)
                    else {
                        continue;
                    };
                    // Dirty ownership migrates with the transfer; the
                    // requester ends Modified, so nothing is written back.
                    self.caches[other].line_mut(other_set, other_way).state = LineState::Invalid;
                    other_copy_existed = true;
                }
                let requester_state = self.caches[requester]
                    .line(transaction.set_idx, transaction.way)
                    .state;
                if requester_state == LineState::Invalid {
                    transaction.remaining_cycles += if other_copy_existed {
                        self.charge_block_transfer(report)
                    } else {
                        self.charge_mem_fetch(report)
                    };
                }
                transaction.remaining_cycles += HIT_CYCLES;
                self.settle_requester(transaction, LineState::Modified, now);
                if other_copy_existed {
                    report.accesses.shared += 1;
                } else {
                    report.accesses.private += 1;
                }
            }
            BusOp::Update => {
                log::error!("moesi: update transaction on the bus, dropping");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::LineState;
    use crate::config::Protocol;
    use crate::protocol::testing::{complete_request, geometry, load, store};
    use crate::protocol::{MemorySystem, HIT_CYCLES, MEM_FETCH_CYCLES, WRITE_BACK_CYCLES};
    use pretty_assertions::assert_eq;

    fn system() -> (MemorySystem, stats::Report) {
        (
            MemorySystem::new(Protocol::Moesi, geometry()),
            stats::Report::new(crate::NUM_CORES),
        )
    }

    const BLOCK_TRANSFER_CYCLES: u64 = 16; // 2 cycles per word, 8 words

    #[test]
    fn read_of_a_modified_line_leaves_the_supplier_owned() {
        let (mut system, mut report) = system();
        complete_request(&mut system, store(0, 0x0), 0, &mut report);
        assert_eq!(system.line_state(0, 0x0), LineState::Modified);

        let traffic_before = report.bus.data_traffic_bytes;
        let cycles = complete_request(&mut system, load(1, 0x0), 200, &mut report);
        // Unlike MESI, no write-back: the block moves cache-to-cache only.
        assert_eq!(cycles, BLOCK_TRANSFER_CYCLES + HIT_CYCLES);
        assert_eq!(system.line_state(0, 0x0), LineState::Owned);
        assert_eq!(system.line_state(1, 0x0), LineState::Shared);
        assert_eq!(report.bus.data_traffic_bytes, traffic_before + 32);
    }

    #[test]
    fn owned_supplier_serves_further_readers() {
        let (mut system, mut report) = system();
        complete_request(&mut system, store(0, 0x0), 0, &mut report);
        complete_request(&mut system, load(1, 0x0), 200, &mut report);

        let cycles = complete_request(&mut system, load(2, 0x0), 400, &mut report);
        assert_eq!(cycles, BLOCK_TRANSFER_CYCLES + HIT_CYCLES);
        assert_eq!(system.line_state(0, 0x0), LineState::Owned);
        assert_eq!(system.line_state(2, 0x0), LineState::Shared);
    }

    #[test]
    fn store_hit_on_an_owned_line_invalidates_the_sharers() {
        let (mut system, mut report) = system();
        complete_request(&mut system, store(0, 0x0), 0, &mut report);
        complete_request(&mut system, load(1, 0x0), 200, &mut report);
        assert_eq!(system.line_state(0, 0x0), LineState::Owned);

        let cycles = complete_request(&mut system, store(0, 0x0), 400, &mut report);
        // The owner already holds current data: invalidation only.
        assert_eq!(cycles, HIT_CYCLES);
        assert_eq!(system.line_state(0, 0x0), LineState::Modified);
        assert_eq!(system.line_state(1, 0x0), LineState::Invalid);
        assert_eq!(report.bus.invalidations_or_updates, 2);
    }

    #[test]
    fn store_miss_takes_dirty_ownership_without_write_back() {
        let (mut system, mut report) = system();
        complete_request(&mut system, store(0, 0x0), 0, &mut report);

        let traffic_before = report.bus.data_traffic_bytes;
        let cycles = complete_request(&mut system, store(1, 0x0), 200, &mut report);
        assert_eq!(cycles, BLOCK_TRANSFER_CYCLES + HIT_CYCLES);
        assert_eq!(system.line_state(0, 0x0), LineState::Invalid);
        assert_eq!(system.line_state(1, 0x0), LineState::Modified);
        assert_eq!(report.bus.data_traffic_bytes, traffic_before + 32);
        assert_eq!(report.accesses.shared, 1);
    }

    #[test]
    fn evicting_an_owned_victim_writes_it_back() {
        // Single-set cache: two further blocks evict the Owned line.
        let single_set = crate::config::Geometry::new(64, 2, 32).unwrap();
        let mut system = MemorySystem::new(Protocol::Moesi, single_set);
        let mut report = stats::Report::new(crate::NUM_CORES);

        complete_request(&mut system, store(0, 0x0), 0, &mut report);
        complete_request(&mut system, load(1, 0x0), 200, &mut report);
        assert_eq!(system.line_state(0, 0x0), LineState::Owned);

        complete_request(&mut system, load(0, 0x20), 400, &mut report);
        let cycles = complete_request(&mut system, load(0, 0x40), 600, &mut report);
        assert_eq!(
            cycles,
            WRITE_BACK_CYCLES + MEM_FETCH_CYCLES + HIT_CYCLES
        );
        assert_eq!(system.line_state(0, 0x0), LineState::Invalid);
        // Core 1 keeps its Shared copy.
        assert_eq!(system.line_state(1, 0x0), LineState::Shared);
    }

    #[test]
    fn cold_load_behaves_like_mesi() {
        let (mut system, mut report) = system();
        let cycles = complete_request(&mut system, load(0, 0x0), 0, &mut report);
        assert_eq!(cycles, MEM_FETCH_CYCLES + HIT_CYCLES);
        assert_eq!(system.line_state(0, 0x0), LineState::Exclusive);
    }
}
