//! Per-core interrupt controllers.
//!
//! Each cpu owns one local interrupt controller. It exposes three ports onto the
//! system crossbar: `pio` (register window, a response port), `int_requestor`
//! (outgoing interrupt messages) and `int_responder` (incoming interrupt messages).
//! The windows are placed per core id so they never overlap each other or memory.

use crate::common::constants::{APIC_WINDOW_BYTES, INT_MESSAGE_BASE, LOCAL_APIC_BASE};
use crate::common::{AddrRange, TopologyError};
use crate::soc::component::ComponentId;
use crate::soc::port::{PortKey, PortRole};

/// A local interrupt controller placed in the component graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptController {
    /// Graph node.
    pub component: ComponentId,
    /// Id of the owning cpu.
    pub cpu_id: usize,
}

impl InterruptController {
    /// Register window port.
    pub const fn pio(&self) -> PortKey {
        PortKey::new(self.component, PortRole::Pio)
    }

    /// Outgoing interrupt message port.
    pub const fn int_requestor(&self) -> PortKey {
        PortKey::new(self.component, PortRole::IntRequestor)
    }

    /// Incoming interrupt message port.
    pub const fn int_responder(&self) -> PortKey {
        PortKey::new(self.component, PortRole::IntResponder)
    }

    /// Register window claimed behind `pio`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EmptyAddressRange`] if the cpu id pushes the window past
    /// the end of the address space.
    pub fn pio_range(&self) -> Result<AddrRange, TopologyError> {
        Self::window(LOCAL_APIC_BASE, self.cpu_id)
    }

    /// Message window claimed behind `int_responder`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EmptyAddressRange`] if the cpu id pushes the window past
    /// the end of the address space.
    pub fn int_range(&self) -> Result<AddrRange, TopologyError> {
        Self::window(INT_MESSAGE_BASE, self.cpu_id)
    }

    fn window(base: u64, cpu_id: usize) -> Result<AddrRange, TopologyError> {
        let start = (cpu_id as u64)
            .checked_mul(APIC_WINDOW_BYTES)
            .and_then(|offset| base.checked_add(offset))
            .ok_or(TopologyError::EmptyAddressRange {
                start: base,
                end: base,
            })?;
        AddrRange::with_size(start, APIC_WINDOW_BYTES)
    }
}
