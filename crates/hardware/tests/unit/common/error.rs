//! # Error Taxonomy Tests
//!
//! This module checks the messages of the configuration, topology and engine
//! errors, and that the umbrella `SimError` passes them through unchanged.

use std::path::PathBuf;

use mcsim_core::common::{ConfigError, EngineFault, SimError, TopologyError};
use mcsim_core::sim::Phase;
use mcsim_core::soc::port::PortDirection;

#[test]
fn non_positive_core_count_message() {
    let err = ConfigError::NonPositiveCoreCount(0);
    assert_eq!(err.to_string(), "core count must be at least 1, got 0");
}

#[test]
fn missing_binary_names_the_path() {
    let err = ConfigError::MissingBinary(PathBuf::from("bin/hello"));
    assert!(err.to_string().contains("bin/hello"));
}

#[test]
fn double_connect_names_both_ports() {
    let err = TopologyError::PortAlreadyConnected {
        port: "system.llccache.mem_side".into(),
        peer: "system.membus.cpu_side_ports[0]".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("system.llccache.mem_side"));
    assert!(msg.contains("system.membus.cpu_side_ports[0]"));
}

#[test]
fn pid_overflow_names_core() {
    let err = TopologyError::PidOutOfRange(4_294_967_196);
    assert_eq!(
        err.to_string(),
        "core 4294967196 has no process id: 100 + 4294967196 does not fit in 32 bits"
    );
}

#[test]
fn incompatible_ports_names_direction() {
    let err = TopologyError::IncompatiblePorts {
        a: "a".into(),
        b: "b".into(),
        direction: PortDirection::Request,
    };
    assert_eq!(err.to_string(), "cannot connect a to b: both are request ports");
}

#[test]
fn invalid_phase_names_operation_and_phase() {
    let err = EngineFault::InvalidPhase {
        operation: "simulate",
        found: Phase::Built,
    };
    assert_eq!(err.to_string(), "cannot simulate while built");
}

#[test]
fn validation_wraps_topology_error() {
    let err = EngineFault::from(TopologyError::NoCores);
    assert_eq!(
        err.to_string(),
        "instantiation failed: a system needs at least one cpu"
    );
}

#[test]
fn sim_error_is_transparent() {
    let inner = TopologyError::UnconnectedPort("system.mem_ctrl.port".into());
    let msg = inner.to_string();
    assert_eq!(SimError::from(inner).to_string(), msg);
}
