//! Cache Replacement Policies.
//!
//! Victim selection for the engine's set-associative tag stores.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used.
//! - `Fifo`: First-In, First-Out.

/// First-In, First-Out replacement policy.
pub mod fifo;

/// Least Recently Used replacement policy.
pub mod lru;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;

/// Trait for cache replacement policies.
///
/// Defines the interface for updating usage state and selecting victim lines.
pub trait ReplacementPolicy: Send + Sync + std::fmt::Debug {
    /// Records a hit on `way` of `set`.
    fn touch(&mut self, set: usize, way: usize);

    /// Records that `way` of `set` was just filled with a new line.
    fn insert(&mut self, set: usize, way: usize);

    /// Selects the way of `set` to evict next.
    fn victim(&mut self, set: usize) -> usize;
}
