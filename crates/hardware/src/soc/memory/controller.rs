//! Memory controller implementations for latency modeling.
//!
//! This module provides:
//! 1. **SimpleController:** Fixed latency per access (no row-buffer modeling).
//! 2. **DramController:** Banked row-buffer model (CAS, RAS-to-CAS, precharge, burst)
//!    with DDR3-1600 style timings.
//!
//! Latencies are reported in ticks, independent of the controller's clock.

use crate::common::Tick;
use crate::config::DramTiming;

/// Number of independently open rows in the DRAM model.
const DRAM_BANKS: u64 = 8;

/// Trait for memory controller implementations that report access latency in ticks.
pub trait MemoryController: Send + Sync + std::fmt::Debug {
    /// Returns the number of ticks required for an access to the given address.
    ///
    /// # Arguments
    ///
    /// * `addr` - Physical address being accessed (may be used for row-buffer modeling).
    fn access_latency(&mut self, addr: u64) -> Tick;
}

/// Fixed-latency memory controller; every access takes the same number of ticks.
#[derive(Debug, Clone, Copy)]
pub struct SimpleController {
    latency: Tick,
}

impl SimpleController {
    /// Creates a simple controller with the given fixed latency in ticks.
    pub const fn new(latency: Tick) -> Self {
        Self { latency }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: u64) -> Tick {
        self.latency
    }
}

/// Outcome of a row buffer lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row was already open.
    Hit,
    /// The bank was idle; the row had to be activated.
    Closed,
    /// Another row was open; it had to be precharged first.
    Conflict,
}

/// DRAM controller with one open row per bank.
#[derive(Debug, Clone)]
pub struct DramController {
    open_rows: Vec<Option<u64>>,
    timing: DramTiming,
    row_shift: u32,
    /// Accesses that found their row open.
    pub row_hits: u64,
    /// Accesses that had to activate a row.
    pub row_misses: u64,
}

impl DramController {
    /// Creates a controller with every bank precharged.
    pub fn new(timing: DramTiming) -> Self {
        Self {
            open_rows: vec![None; DRAM_BANKS as usize],
            timing,
            row_shift: timing.row_buffer_bytes.max(1).trailing_zeros(),
            row_hits: 0,
            row_misses: 0,
        }
    }

    /// Opens the row holding `addr`, reporting what the bank had to do.
    pub fn open_row(&mut self, addr: u64) -> RowOutcome {
        let row = addr >> self.row_shift;
        let bank = (row % DRAM_BANKS) as usize;
        let outcome = match self.open_rows[bank] {
            Some(open) if open == row => RowOutcome::Hit,
            Some(_) => RowOutcome::Conflict,
            None => RowOutcome::Closed,
        };
        self.open_rows[bank] = Some(row);
        if outcome == RowOutcome::Hit {
            self.row_hits += 1;
        } else {
            self.row_misses += 1;
        }
        outcome
    }

    /// Latency of an access with the given row outcome.
    pub const fn latency_for(&self, outcome: RowOutcome) -> Tick {
        let t = &self.timing;
        match outcome {
            RowOutcome::Hit => t.t_cl + t.t_burst,
            RowOutcome::Closed => t.t_rcd + t.t_cl + t.t_burst,
            RowOutcome::Conflict => t.t_rp + t.t_rcd + t.t_cl + t.t_burst,
        }
    }
}

impl MemoryController for DramController {
    fn access_latency(&mut self, addr: u64) -> Tick {
        let outcome = self.open_row(addr);
        self.latency_for(outcome)
    }
}
