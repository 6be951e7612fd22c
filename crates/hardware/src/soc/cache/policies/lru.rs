//! Least Recently Used (LRU) Replacement Policy.
//!
//! Each set keeps a recency stack of way indices. An access moves the way to the
//! front; the victim is the way at the back.

use super::ReplacementPolicy;

/// LRU Policy state.
#[derive(Debug, Clone)]
pub struct LruPolicy {
    /// One recency stack per set. Index 0 is most recent.
    stacks: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates an LRU policy for `sets` sets of `ways` ways each.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            stacks: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }
}

impl ReplacementPolicy for LruPolicy {
    fn touch(&mut self, set: usize, way: usize) {
        let stack = &mut self.stacks[set];
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    fn insert(&mut self, set: usize, way: usize) {
        self.touch(set, way);
    }

    fn victim(&mut self, set: usize) -> usize {
        self.stacks[set].last().copied().unwrap_or(0)
    }
}
