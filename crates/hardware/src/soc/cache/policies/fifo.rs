//! First-In, First-Out (FIFO) Replacement Policy.
//!
//! A round-robin pointer per set names the next way to fill. Hits do not move it.

use super::ReplacementPolicy;

/// FIFO Policy state.
#[derive(Debug, Clone)]
pub struct FifoPolicy {
    /// Next way to evict, per set.
    next_way: Vec<usize>,
    ways: usize,
}

impl FifoPolicy {
    /// Creates a FIFO policy for `sets` sets of `ways` ways each.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            next_way: vec![0; sets],
            ways: ways.max(1),
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn touch(&mut self, _set: usize, _way: usize) {}

    /// Advances the pointer only when the way it names is the one being filled.
    fn insert(&mut self, set: usize, way: usize) {
        if self.next_way[set] == way {
            self.next_way[set] = (way + 1) % self.ways;
        }
    }

    fn victim(&mut self, set: usize) -> usize {
        self.next_way[set]
    }
}
