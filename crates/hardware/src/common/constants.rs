//! Global System Constants.
//!
//! This module defines model-wide constants used across the simulator. It includes:
//! 1. **Time:** Tick resolution of the simulated clock.
//! 2. **Memory:** Page granularity used when placing process images.
//! 3. **Workload:** Process id base and trace instruction width.
//! 4. **Interrupts:** Local interrupt controller address windows.

/// Number of ticks in one simulated second (1 tick = 1 ps).
pub const TICKS_PER_SECOND: u64 = 1_000_000_000_000;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 4096;

/// First process id handed out; core `i` runs pid `PROCESS_PID_BASE + i`.
pub const PROCESS_PID_BASE: u32 = 100;

/// Width in bytes of one trace instruction word.
pub const INSTRUCTION_BYTES: u64 = 4;

/// Size in bytes of the memory packets exchanged between caches and memory.
pub const PACKET_BYTES: usize = 64;

/// Base of the local interrupt controller register windows (one per core id).
pub const LOCAL_APIC_BASE: u64 = 0x2000_0000_0000_0000;

/// Base of the interrupt message windows (one per core id).
pub const INT_MESSAGE_BASE: u64 = 0xA000_0000_0000_0000;

/// Size of each per-core interrupt controller window.
pub const APIC_WINDOW_BYTES: u64 = 0x1000;
