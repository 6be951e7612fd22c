//! Cache components.
//!
//! This module covers both faces of a cache:
//! 1. **Graph side:** `CacheParams` (validated per cache type) and the `Cache` record that
//!    places a cache in the component tree with a `cpu_side` and a `mem_side` port.
//! 2. **Engine side:** `CacheModel`, a set-associative tag store with a configurable
//!    replacement policy, used by the timing engine to decide hits and misses.

/// Cache replacement policy implementations (FIFO, LRU).
pub mod policies;

use self::policies::{FifoPolicy, LruPolicy, ReplacementPolicy};
use crate::config::{CacheConfig, CacheGeometry, ReplacementPolicy as PolicyType};
use crate::soc::component::{CacheLevel, ComponentId};
use crate::soc::port::{PortKey, PortRole};

/// Parameters of one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheParams {
    /// Position in the hierarchy.
    pub level: CacheLevel,
    /// Validated dimensions.
    pub geometry: CacheGeometry,
    /// Tag lookup latency in cycles.
    pub tag_latency: u64,
    /// Data array latency in cycles.
    pub data_latency: u64,
    /// Response latency in cycles.
    pub response_latency: u64,
    /// Miss status holding registers.
    pub mshrs: usize,
    /// Targets per MSHR.
    pub tgts_per_mshr: usize,
    /// Replacement policy of the tag store.
    pub policy: PolicyType,
}

impl CacheParams {
    /// Combines timing parameters from `config` with an already validated geometry.
    pub const fn new(level: CacheLevel, config: &CacheConfig, geometry: CacheGeometry) -> Self {
        Self {
            level,
            geometry,
            tag_latency: config.tag_latency,
            data_latency: config.data_latency,
            response_latency: config.response_latency,
            mshrs: config.mshrs,
            tgts_per_mshr: config.tgts_per_mshr,
            policy: config.policy,
        }
    }

    /// Cycles from request arrival to data on a hit.
    pub const fn hit_latency(&self) -> u64 {
        self.tag_latency + self.data_latency
    }

    /// Cycles added by this cache to a miss: the tag check going down and the
    /// response on the way back.
    pub const fn miss_latency(&self) -> u64 {
        self.tag_latency + self.response_latency
    }
}

/// A cache placed in the component graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cache {
    /// Graph node.
    pub component: ComponentId,
    /// Parameters.
    pub params: CacheParams,
}

impl Cache {
    /// Port facing the cpu or the crossbar above.
    pub const fn cpu_side(&self) -> PortKey {
        PortKey::new(self.component, PortRole::CpuSide)
    }

    /// Port facing memory.
    pub const fn mem_side(&self) -> PortKey {
        PortKey::new(self.component, PortRole::MemSide)
    }
}

/// Tag store entry.
#[derive(Clone, Copy, Debug, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
    dirty: bool,
}

/// Result of one tag store access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheAccess {
    /// The line was present.
    pub hit: bool,
    /// A dirty line was evicted to make room and must be written back.
    pub writeback: bool,
}

/// Set-associative tag store used by the timing engine.
#[derive(Debug)]
pub struct CacheModel {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    policy: Box<dyn ReplacementPolicy>,
    /// Accesses that found their line.
    pub hits: u64,
    /// Accesses that had to fill a line.
    pub misses: u64,
}

impl CacheModel {
    /// Builds an empty tag store for `params`.
    pub fn new(params: &CacheParams) -> Self {
        let geometry = params.geometry;
        let num_sets = geometry.num_sets.max(1);
        let ways = geometry.assoc.max(1);
        let policy: Box<dyn ReplacementPolicy> = match params.policy {
            PolicyType::Lru => Box::new(LruPolicy::new(num_sets, ways)),
            PolicyType::Fifo => Box::new(FifoPolicy::new(num_sets, ways)),
        };
        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes: geometry.line_bytes.max(1),
            policy,
            hits: 0,
            misses: 0,
        }
    }

    fn locate(&self, addr: u64) -> (usize, u64) {
        let line = addr / self.line_bytes as u64;
        let set = (line % self.num_sets as u64) as usize;
        let tag = line / self.num_sets as u64;
        (set, tag)
    }

    /// Returns `true` if the line holding `addr` is present.
    pub fn contains(&self, addr: u64) -> bool {
        let (set, tag) = self.locate(addr);
        let base = set * self.ways;
        self.lines[base..base + self.ways]
            .iter()
            .any(|l| l.valid && l.tag == tag)
    }

    /// Looks up `addr`, filling the line on a miss.
    pub fn access(&mut self, addr: u64, is_write: bool) -> CacheAccess {
        let (set, tag) = self.locate(addr);
        let base = set * self.ways;

        if let Some(way) = (0..self.ways).find(|&w| {
            let line = &self.lines[base + w];
            line.valid && line.tag == tag
        }) {
            self.policy.touch(set, way);
            if is_write {
                self.lines[base + way].dirty = true;
            }
            self.hits += 1;
            return CacheAccess {
                hit: true,
                writeback: false,
            };
        }

        self.misses += 1;
        let way = (0..self.ways)
            .find(|&w| !self.lines[base + w].valid)
            .unwrap_or_else(|| self.policy.victim(set));
        let victim = self.lines[base + way];
        self.lines[base + way] = CacheLine {
            tag,
            valid: true,
            dirty: is_write,
        };
        self.policy.insert(set, way);
        CacheAccess {
            hit: false,
            writeback: victim.valid && victim.dirty,
        }
    }

    /// Number of valid lines.
    pub fn occupancy(&self) -> usize {
        self.lines.iter().filter(|l| l.valid).count()
    }
}
