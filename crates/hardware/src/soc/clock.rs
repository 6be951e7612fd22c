//! Clock and voltage domains.
//!
//! A single source clock domain drives every clocked component of the system. The
//! domain is attached to the system container and inherited down the ownership tree,
//! so cpus, caches, crossbars and the memory controller all tick at one frequency.

use crate::common::{Frequency, Tick};
use crate::soc::component::ComponentId;

/// Supply voltage shared by the components of a clock domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoltageDomain {
    /// Graph node of the domain.
    pub component: ComponentId,
    /// Supply voltage in millivolts.
    pub millivolts: u32,
}

/// A clock source with a fixed frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SrcClockDomain {
    /// Graph node of the domain.
    pub component: ComponentId,
    /// Clock frequency.
    pub frequency: Frequency,
    /// Voltage domain feeding this clock.
    pub voltage_domain: ComponentId,
}

impl SrcClockDomain {
    /// Length of one clock cycle in ticks.
    pub const fn period(&self) -> Tick {
        self.frequency.period_ticks()
    }

    /// Converts a cycle count into ticks.
    pub const fn cycles_to_ticks(&self, cycles: u64) -> Tick {
        cycles * self.period()
    }
}
