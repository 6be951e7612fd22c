//! Processing elements.
//!
//! A `Cpu` is the graph-side record of one core: its instruction and data ports, the
//! private caches and interrupt controller attached to it, the hardware thread
//! contexts it exposes and the process bound to it. Instruction execution itself is
//! left to the engine.

use crate::common::TopologyError;
use crate::soc::cache::Cache;
use crate::soc::component::ComponentId;
use crate::soc::interrupts::InterruptController;
use crate::soc::port::{PortKey, PortRole};

/// Scheduling state of a hardware thread context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThreadStatus {
    /// Created but not yet running.
    #[default]
    Suspended,
    /// Running its process.
    Active,
    /// Its process has exited.
    Halted,
}

/// One hardware thread of a cpu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadContext {
    /// Owning cpu.
    pub cpu_id: usize,
    /// Index within the cpu.
    pub thread_id: usize,
    /// Scheduling state.
    pub status: ThreadStatus,
}

/// A processing element placed in the component graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cpu {
    /// Core id, dense from 0.
    pub cpu_id: usize,
    /// Graph node.
    pub component: ComponentId,
    /// Private instruction cache, attached during construction.
    pub icache: Option<Cache>,
    /// Private data cache, attached during construction.
    pub dcache: Option<Cache>,
    /// Local interrupt controller.
    pub interrupts: Option<InterruptController>,
    /// Pid of the bound process.
    pub workload: Option<u32>,
    /// Hardware thread contexts.
    pub threads: Vec<ThreadContext>,
}

impl Cpu {
    /// A bare core with nothing attached.
    pub const fn new(cpu_id: usize, component: ComponentId) -> Self {
        Self {
            cpu_id,
            component,
            icache: None,
            dcache: None,
            interrupts: None,
            workload: None,
            threads: Vec::new(),
        }
    }

    /// Instruction fetch port.
    pub const fn icache_port(&self) -> PortKey {
        PortKey::new(self.component, PortRole::IcachePort)
    }

    /// Data access port.
    pub const fn dcache_port(&self) -> PortKey {
        PortKey::new(self.component, PortRole::DcachePort)
    }

    /// Creates `count` suspended thread contexts, replacing any existing ones.
    pub fn create_threads(&mut self, count: usize) {
        self.threads = (0..count)
            .map(|thread_id| ThreadContext {
                cpu_id: self.cpu_id,
                thread_id,
                status: ThreadStatus::Suspended,
            })
            .collect();
    }

    /// Binds process `pid` to this cpu.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::DuplicateWorkload`] if a process is already bound;
    /// `path` names the cpu in the error.
    pub fn bind_workload(&mut self, pid: u32, path: &str) -> Result<(), TopologyError> {
        if self.workload.is_some() {
            return Err(TopologyError::DuplicateWorkload(path.to_string()));
        }
        self.workload = Some(pid);
        Ok(())
    }
}
