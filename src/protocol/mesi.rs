//! MESI: invalidation-based coherence. Stores gain exclusivity by
//! invalidating every other copy over the bus; loads are served
//! cache-to-cache when any other core holds the block.

use super::{MemorySystem, HIT_CYCLES};
use crate::cache::LineState;
use crate::request::{AccessKind, BusOp, BusTransaction, MemoryRequest};

impl MemorySystem {
    pub(super) fn mesi_handle_incoming(
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
                // Loads from any valid state stay silent.
                (AccessKind::Load, _) => {
                    if state == LineState::Shared {
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
                // A store to a shared line must invalidate the other
                // copies first; the transition happens on the bus.
                (AccessKind::Store, LineState::Shared) => {
                    self.bus_queue.enqueue(BusTransaction::new(
                        BusOp::ReadExclusive,
                        request,
                        set_idx,
                        way,
                        0,
                    ));
                }
                (AccessKind::Store, state) => {
                    log::error!("mesi: store hit on line in state {state:?}, dropping update");
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

    pub(super) fn mesi_process_bus_transaction(
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
                        LineState::Modified => {
                            transaction.remaining_cycles += self.charge_write_back(report);
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                        }
                        LineState::Exclusive | LineState::Shared => {
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                        }
                        state => {
                            log::error!("mesi: bus read supplier in state {state:?}, skipping");
                            continue;
                        }
                    }
                    report.accesses.shared += 1;
                    self.caches[other].line_mut(other_set, other_way).state = LineState::Shared;
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
                    if self.caches[other].line(other_set, other_way).state.is_dirty() {
                        transaction.remaining_cycles += self.charge_write_back(report);
                    }
                    self.caches[other].line_mut(other_set, other_way).state = LineState::Invalid;
                    other_copy_existed = true;
                }
                // Only a requester without the line needs the block itself.
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
                log::error!("mesi: update transaction on the bus, dropping");
            }
        }
    }
}
