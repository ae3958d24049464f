use crate::instruction::Instruction;
use crate::request::{AccessKind, MemoryRequest};

/// Execution mode of a core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecState {
    /// Between instructions, about to pick up the next one.
    #[default]
    Loading,
    /// A compute instruction is in progress.
    Executing,
    /// Awaiting the memory system.
    Blocked,
    /// All instructions retired.
    Completed,
}

/// One simulated core: an ordered instruction list and a small execution
/// FSM driven one cycle at a time.
#[derive(Debug)]
pub struct Core {
    id: usize,
    instructions: Vec<Instruction>,
    curr_inst: usize,
    state: ExecState,
    /// Cycles the current instruction has been active: compute progress
    /// while `Executing`, stall time while `Blocked`.
    active_cycles: u64,
}

impl Core {
    #[must_use]
    pub fn new(id: usize, instructions: Vec<Instruction>) -> Self {
        Self {
            id,
            instructions,
            curr_inst: 0,
            state: ExecState::Loading,
            active_cycles: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> ExecState {
        self.state
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == ExecState::Completed
    }

    /// Advances the core by one cycle.
    ///
    /// Returns the memory request to issue when this cycle moved the core
    /// into `Blocked`; a blocked core keeps exactly one request in flight
    /// and emits nothing further until it completes.
    pub fn advance(&mut self, stats: &mut stats::Core) -> Option<MemoryRequest> {
        if self.state == ExecState::Completed {
            return None;
        }

        let mut issue = None;
        if self.state == ExecState::Loading {
            let Some(&instruction) = self.instructions.get(self.curr_inst) else {
                self.state = ExecState::Completed;
                return None;
            };
            match instruction {
                Instruction::Compute(_) => {
                    stats.compute_instructions += 1;
                    self.state = ExecState::Executing;
                }
                Instruction::Load(addr) | Instruction::Store(addr) => {
                    stats.load_store_instructions += 1;
                    let kind = if matches!(instruction, Instruction::Load(_)) {
                        AccessKind::Load
                    } else {
                        AccessKind::Store
                    };
                    issue = Some(MemoryRequest {
                        core: self.id,
                        kind,
                        addr,
                    });
                    self.state = ExecState::Blocked;
                }
            }
        }

        self.active_cycles += 1;

        if self.state == ExecState::Executing {
            if let Some(&Instruction::Compute(cycles)) = self.instructions.get(self.curr_inst) {
                if self.active_cycles >= cycles {
                    stats.compute_cycles += self.active_cycles;
                    self.retire();
                }
            }
        }
        issue
    }

    /// Completion callback for this core's in-flight memory request: the
    /// stall time is booked as idle cycles and the instruction retires.
    pub fn memory_request_completed(&mut self, stats: &mut stats::Core) {
        debug_assert_eq!(self.state, ExecState::Blocked);
        stats.idle_cycles += self.active_cycles;
        self.retire();
    }

    fn retire(&mut self) {
        self.curr_inst += 1;
        self.active_cycles = 0;
        self.state = if self.curr_inst >= self.instructions.len() {
            ExecState::Completed
        } else {
            ExecState::Loading
        };
    }
}
