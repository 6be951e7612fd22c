//! Crossbar interconnect.
//!
//! This module implements the crossbars that join the hierarchy together. It provides:
//! 1. **Graph record:** `Crossbar`, with a `cpu_side_ports` vector facing initiators and a
//!    `mem_side_ports` vector facing targets.
//! 2. **Timing:** Transit and response cycles for a packet of a given size.
//! 3. **Address map:** `AddrMap`, the ranges claimed behind each mem-side port, checked for
//!    overlap and used to route requests.

use crate::common::{AddrRange, TopologyError};
use crate::config::XBarConfig;
use crate::soc::component::ComponentId;
use crate::soc::port::{PortEndpoint, PortKey, PortRole};

/// Which of the two crossbars of the system this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrossbarKind {
    /// Joins the private L1s to the last-level cache.
    L2XBar,
    /// System-wide crossbar in front of memory.
    SystemXBar,
}

/// A crossbar placed in the component graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crossbar {
    /// Graph node.
    pub component: ComponentId,
    /// Which crossbar.
    pub kind: CrossbarKind,
    /// Width and latencies.
    pub params: XBarConfig,
}

impl Crossbar {
    /// Port set facing request initiators.
    pub const fn cpu_side_ports(&self) -> PortKey {
        PortKey::new(self.component, PortRole::CpuSidePorts)
    }

    /// Port set facing response targets.
    pub const fn mem_side_ports(&self) -> PortKey {
        PortKey::new(self.component, PortRole::MemSidePorts)
    }

    fn transfers(&self, bytes: usize) -> u64 {
        let width = self.params.width.max(1);
        (bytes as u64).div_ceil(width)
    }

    /// Cycles for a request of `bytes` to cross from a cpu-side to a mem-side port.
    pub fn transit_cycles(&self, bytes: usize) -> u64 {
        self.params.frontend_latency + self.params.forward_latency + self.transfers(bytes)
    }

    /// Cycles for a response of `bytes` to cross back.
    pub fn response_cycles(&self, bytes: usize) -> u64 {
        self.params.response_latency + self.transfers(bytes)
    }
}

/// One routing entry: a claimed range and the mem-side slot serving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Claimed range.
    pub range: AddrRange,
    /// Peer port that claimed it.
    pub target: PortEndpoint,
    /// Label of the claimant, for diagnostics.
    pub owner: String,
}

/// Address map of a crossbar.
///
/// Routes are kept sorted by start address; lookups remember the last hit,
/// since consecutive requests tend to go to the same target.
#[derive(Clone, Debug, Default)]
pub struct AddrMap {
    routes: Vec<Route>,
    last_hit: usize,
}

impl AddrMap {
    /// Creates an empty map.
    pub const fn new() -> Self {
        Self {
            routes: Vec::new(),
            last_hit: 0,
        }
    }

    /// Adds a route.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::AddressRangeOverlap`] if `range` intersects a route
    /// already in the map.
    pub fn insert(
        &mut self,
        range: AddrRange,
        target: PortEndpoint,
        owner: String,
    ) -> Result<(), TopologyError> {
        if let Some(existing) = self.routes.iter().find(|r| r.range.overlaps(&range)) {
            return Err(TopologyError::AddressRangeOverlap {
                a: format!("{} {}", existing.owner, existing.range),
                b: format!("{owner} {range}"),
            });
        }
        self.routes.push(Route {
            range,
            target,
            owner,
        });
        self.routes.sort_by_key(|r| r.range.start());
        self.last_hit = 0;
        Ok(())
    }

    /// Finds the route claiming `addr`.
    pub fn route(&mut self, addr: u64) -> Option<&Route> {
        if self
            .routes
            .get(self.last_hit)
            .is_some_and(|r| r.range.contains(addr))
        {
            return self.routes.get(self.last_hit);
        }
        let idx = self.routes.iter().position(|r| r.range.contains(addr))?;
        self.last_hit = idx;
        self.routes.get(idx)
    }

    /// All routes, sorted by start address.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is routable.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
