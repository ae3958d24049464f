//! Dragon: update-based coherence. Stores to shared lines broadcast the
//! written word to the remaining sharers instead of invalidating them, so
//! copies never leave the other caches.

use super::{MemorySystem, HIT_CYCLES};
use crate::cache::LineState;
use crate::request::{AccessKind, BusOp, BusTransaction, MemoryRequest};

impl MemorySystem {
    pub(super) fn dragon_handle_incoming(
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
                    if matches!(state, LineState::SharedClean | LineState::SharedModified) {
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
                // A store to a shared line must update the other sharers.
                (AccessKind::Store, LineState::SharedClean | LineState::SharedModified) => {
                    self.bus_queue.enqueue(BusTransaction::new(
                        BusOp::Update,
                        request,
                        set_idx,
                        way,
                        0,
                    ));
                }
                (AccessKind::Store, state) => {
                    log::error!("dragon: store hit on line in state {state:?}, dropping update");
                }
            }
            return;
        }

        report.cores[request.core].cache_misses += 1;
        let (set_idx, way, starting_cycles) = self.evict_and_allocate(&request, now, report);
        let op = if request.kind.is_store() {
            BusOp::Update
        } else {
            BusOp::Read
        };
        self.bus_queue
            .enqueue(BusTransaction::new(op, request, set_idx, way, starting_cycles));
    }

    pub(super) fn dragon_process_bus_transaction(
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
                        // A dirty supplier flushes and keeps ownership of
                        // the dirty data as SharedModified.
                        LineState::Modified | LineState::SharedModified => {
                            transaction.remaining_cycles += self.charge_write_back(report);
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                            self.caches[other].line_mut(other_set, other_way).state =
                                LineState::SharedModified;
                        }
                        LineState::Exclusive => {
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                            self.caches[other].line_mut(other_set, other_way).state =
                                LineState::SharedClean;
                        }
                        LineState::SharedClean => {
                            transaction.remaining_cycles +=
                                self.charge_block_transfer(report) + HIT_CYCLES;
                        }
                        state => {
                            log::error!("dragon: bus read supplier in state {state:?}, skipping");
                            continue;
                        }
                    }
                    report.accesses.shared += 1;
                    self.settle_requester(transaction, LineState::SharedClean, now);
                    supplied = true;
                    break;
                }
                if !supplied {
                    report.accesses.private += 1;
                    transaction.remaining_cycles += self.charge_mem_fetch(report) + HIT_CYCLES;
                    self.settle_requester(transaction, LineState::Exclusive, now);
                }
            }
            BusOp::Update => {
                report.bus.invalidations_or_updates += 1;
                let requester_had_line = self.caches[requester]
                    .line(transaction.set_idx, transaction.way)
                    .state
                    .is_valid();
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
                    self.caches[other].line_mut(other_set, other_way).state =
                        LineState::SharedClean;
                    transaction.remaining_cycles += self.charge_word_update(report);
                    if !requester_had_line && !other_copy_existed {
                        transaction.remaining_cycles += self.charge_block_transfer(report);
                    }
                    other_copy_existed = true;
                }
                if !other_copy_existed && !requester_had_line {
                    transaction.remaining_cycles += self.charge_mem_fetch(report);
                }
                transaction.remaining_cycles += HIT_CYCLES;
                let final_state = if other_copy_existed {
                    LineState::SharedModified
                } else {
                    LineState::Modified
                };
                self.settle_requester(transaction, final_state, now);
                if other_copy_existed {
                    report.accesses.shared += 1;
                } else {
                    report.accesses.private += 1;
                }
            }
            BusOp::ReadExclusive => {
                log::error!("dragon: read-exclusive transaction on the bus, dropping");
            }
        }
    }
}
