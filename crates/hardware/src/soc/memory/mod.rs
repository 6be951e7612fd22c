//! Main memory.
//!
//! This module places the memory controller and its DRAM model in the graph. It provides:
//! 1. **MemCtrl:** The controller record, owning the single `port` that the system
//!    crossbar routes to and the address range it serves.
//! 2. **Controller:** Latency modeling (simple or DRAM row-buffer) for timing simulation.

/// Memory controller implementations for access latency modeling.
pub mod controller;

use self::controller::{DramController, MemoryController, SimpleController};
use crate::common::{AddrRange, Tick};
use crate::config::{DramTiming, MemoryControllerKind};
use crate::soc::component::ComponentId;
use crate::soc::port::{PortKey, PortRole};

/// Timing model selected for a memory controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemTiming {
    /// Banked DRAM with row buffers.
    Dram(DramTiming),
    /// Constant latency in ticks.
    Simple(Tick),
}

impl MemTiming {
    /// Kind of controller this timing describes.
    pub const fn kind(&self) -> MemoryControllerKind {
        match self {
            Self::Dram(_) => MemoryControllerKind::Dram,
            Self::Simple(_) => MemoryControllerKind::Simple,
        }
    }
}

/// A memory controller placed in the component graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemCtrl {
    /// Graph node of the controller.
    pub component: ComponentId,
    /// Graph node of the DRAM model it owns.
    pub dram: ComponentId,
    /// Addresses served.
    pub range: AddrRange,
    /// Timing model.
    pub timing: MemTiming,
}

impl MemCtrl {
    /// Response port facing the system crossbar.
    pub const fn port(&self) -> PortKey {
        PortKey::new(self.component, PortRole::Port)
    }

    /// Builds a fresh latency model for one run.
    pub fn latency_model(&self) -> Box<dyn MemoryController> {
        match self.timing {
            MemTiming::Dram(timing) => Box::new(DramController::new(timing)),
            MemTiming::Simple(latency) => Box::new(SimpleController::new(latency)),
        }
    }
}
