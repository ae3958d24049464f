use crate::config::Geometry;

/// Coherence state of one cache line.
///
/// Each protocol uses its own subset: MESI never produces `SharedClean`,
/// `SharedModified` or `Owned`; Dragon never produces `Shared` or `Owned`;
/// MOESI never produces `SharedClean` or `SharedModified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineState {
    #[default]
    Invalid,
    Exclusive,
    Shared,
    Modified,
    SharedClean,
    SharedModified,
    Owned,
}

impl LineState {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self != LineState::Invalid
    }

    /// States holding data newer than main memory; eviction pays a
    /// write-back.
    #[must_use]
    pub fn is_dirty(self) -> bool {
        matches!(
            self,
            LineState::Modified | LineState::SharedModified | LineState::Owned
        )
    }
}

/// One way of one set: tag, coherence state, LRU stamp.
///
/// `last_used` is the global cycle of the last hit or allocation and is
/// meaningful only while the state is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: u32,
    pub state: LineState,
    pub last_used: u64,
}

/// Set-associative tag+state array for one core's L1 cache.
#[derive(Debug, Clone)]
pub struct CacheArray {
    /// `num_sets * associativity` lines, set-major.
    lines: Vec<CacheLine>,
    associativity: usize,
}

impl CacheArray {
    #[must_use]
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            lines: vec![CacheLine::default(); geometry.num_blocks() as usize],
            associativity: geometry.associativity() as usize,
        }
    }

    #[must_use]
    pub fn line(&self, set_idx: u32, way: usize) -> &CacheLine {
        &self.lines[set_idx as usize * self.associativity + way]
    }

    pub fn line_mut(&mut self, set_idx: u32, way: usize) -> &mut CacheLine {
        &mut self.lines[set_idx as usize * self.associativity + way]
    }

    /// Way holding `tag` in `set_idx`, ignoring `Invalid` lines.
    ///
    /// Tags are unique within a set across valid ways, so the first match
    /// is the only one.
    #[must_use]
    pub fn lookup(&self, set_idx: u32, tag: u32) -> Option<usize> {
        (0..self.associativity)
            .find(|&way| {
                let line = self.line(set_idx, way);
                line.state.is_valid() && line.tag == tag
            })
    }

    /// Victim way for an allocation: any `Invalid` way first, else the
    /// smallest `last_used`, ties broken by the lowest way index.
    #[must_use]
    pub fn pick_victim(&self, set_idx: u32) -> usize {
        let mut victim = 0;
        let mut victim_last_used = u64::MAX;
        for way in 0..self.associativity {
            let line = self.line(set_idx, way);
            if !line.state.is_valid() {
                return way;
            }
            if line.last_used < victim_last_used {
                victim_last_used = line.last_used;
                victim = way;
            }
        }
        victim
    }

    /// Pre-allocates a victim way for an incoming fill. The new tag is
    /// installed with the line left `Invalid` until the bus transaction
    /// resolves, so a concurrent miss from another core cannot observe a
    /// copy that holds no data yet.
    pub fn allocate(&mut self, set_idx: u32, way: usize, tag: u32, now: u64) {
        let line = self.line_mut(set_idx, way);
        line.tag = tag;
        line.state = LineState::Invalid;
        line.last_used = now;
    }

    /// Stamps a line's LRU metadata on a hit.
    pub fn touch(&mut self, set_idx: u32, way: usize, now: u64) {
        self.line_mut(set_idx, way).last_used = now;
    }
}
