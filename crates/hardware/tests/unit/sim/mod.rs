//! Simulation Layer Tests.
//!
//! Workload images and processes, the trace-driven timing engine, and the
//! instantiate/simulate lifecycle driver.

/// Unit tests for the timing engine.
pub mod engine;
