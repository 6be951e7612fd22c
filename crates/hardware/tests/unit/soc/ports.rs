//! Port registry unit tests.
//!
//! Verifies role directions and arities, connection rules, vector port indexing
//! and the freeze-time check for unconnected required ports.

use mcsim_core::common::TopologyError;
use mcsim_core::soc::component::ComponentId;
use mcsim_core::soc::port::{PortArity, PortDirection, PortKey, PortRegistry, PortRole};

const CPU: ComponentId = ComponentId(1);
const L1: ComponentId = ComponentId(2);
const BUS: ComponentId = ComponentId(3);
const LLC: ComponentId = ComponentId(4);

fn registry() -> PortRegistry {
    let mut ports = PortRegistry::new();
    let _ = ports.declare(CPU, PortRole::DcachePort, "system.cpu0", true).unwrap();
    let _ = ports.declare(L1, PortRole::CpuSide, "system.cpu0.dcache", true).unwrap();
    let _ = ports.declare(L1, PortRole::MemSide, "system.cpu0.dcache", true).unwrap();
    let _ = ports.declare(BUS, PortRole::CpuSidePorts, "system.llcbus", true).unwrap();
    let _ = ports.declare(BUS, PortRole::MemSidePorts, "system.llcbus", true).unwrap();
    let _ = ports.declare(LLC, PortRole::CpuSide, "system.llccache", true).unwrap();
    ports
}

// ══════════════════════════════════════════════════════════
// 1. Roles
// ══════════════════════════════════════════════════════════

#[test]
fn request_roles() {
    for role in [
        PortRole::MemSide,
        PortRole::MemSidePorts,
        PortRole::IcachePort,
        PortRole::DcachePort,
        PortRole::IntRequestor,
        PortRole::SystemPort,
    ] {
        assert_eq!(role.direction(), PortDirection::Request, "{role}");
    }
}

#[test]
fn response_roles() {
    for role in [
        PortRole::CpuSide,
        PortRole::CpuSidePorts,
        PortRole::Pio,
        PortRole::IntResponder,
        PortRole::Port,
    ] {
        assert_eq!(role.direction(), PortDirection::Response, "{role}");
    }
}

#[test]
fn only_crossbar_sides_are_vectors() {
    assert_eq!(PortRole::CpuSidePorts.arity(), PortArity::Vector);
    assert_eq!(PortRole::MemSidePorts.arity(), PortArity::Vector);
    assert_eq!(PortRole::CpuSide.arity(), PortArity::Single);
    assert_eq!(PortRole::Pio.arity(), PortArity::Single);
}

#[test]
fn labels_use_owner_path() {
    let ports = registry();
    assert_eq!(
        ports.label(PortKey::new(L1, PortRole::MemSide)),
        "system.cpu0.dcache.mem_side"
    );
}

// ══════════════════════════════════════════════════════════
// 2. Connections
// ══════════════════════════════════════════════════════════

#[test]
fn connect_orders_request_first() {
    let mut ports = registry();
    let conn = ports
        .connect(
            PortKey::new(L1, PortRole::CpuSide),
            PortKey::new(CPU, PortRole::DcachePort),
        )
        .unwrap();
    assert_eq!(conn.request.key, PortKey::new(CPU, PortRole::DcachePort));
    assert_eq!(conn.response.key, PortKey::new(L1, PortRole::CpuSide));
}

#[test]
fn single_port_rejects_second_peer() {
    let mut ports = registry();
    let _ = ports.declare(ComponentId(9), PortRole::DcachePort, "system.cpu1", true).unwrap();
    let _ = ports
        .connect(
            PortKey::new(CPU, PortRole::DcachePort),
            PortKey::new(L1, PortRole::CpuSide),
        )
        .unwrap();
    let err = ports
        .connect(
            PortKey::new(ComponentId(9), PortRole::DcachePort),
            PortKey::new(L1, PortRole::CpuSide),
        )
        .unwrap_err();
    assert_eq!(
        err,
        TopologyError::PortAlreadyConnected {
            port: "system.cpu0.dcache.cpu_side".into(),
            peer: "system.cpu0.dcache_port".into(),
        }
    );
    assert_eq!(ports.connections().len(), 1);
}

#[test]
fn same_direction_rejected() {
    let mut ports = registry();
    let err = ports
        .connect(
            PortKey::new(CPU, PortRole::DcachePort),
            PortKey::new(L1, PortRole::MemSide),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TopologyError::IncompatiblePorts {
            direction: PortDirection::Request,
            ..
        }
    ));
}

#[test]
fn self_connection_rejected() {
    let mut ports = registry();
    let err = ports
        .connect(
            PortKey::new(BUS, PortRole::CpuSidePorts),
            PortKey::new(BUS, PortRole::MemSidePorts),
        )
        .unwrap_err();
    assert_eq!(err, TopologyError::SelfConnection("system.llcbus.cpu_side_ports".into()));
}

#[test]
fn undeclared_port_rejected() {
    let mut ports = registry();
    let err = ports
        .connect(
            PortKey::new(LLC, PortRole::MemSide),
            PortKey::new(BUS, PortRole::CpuSidePorts),
        )
        .unwrap_err();
    assert!(matches!(err, TopologyError::UnknownPort(_)));
}

#[test]
fn redeclared_port_rejected() {
    let mut ports = registry();
    let l1_mem = PortKey::new(L1, PortRole::MemSide);
    let bus = PortKey::new(BUS, PortRole::CpuSidePorts);
    let _ = ports.connect(l1_mem, bus).unwrap();

    let err = ports
        .declare(L1, PortRole::MemSide, "system.cpu0.dcache", true)
        .unwrap_err();
    assert_eq!(
        err,
        TopologyError::PortAlreadyDeclared("system.cpu0.dcache.mem_side".into())
    );
    assert_eq!(err.to_string(), "port system.cpu0.dcache.mem_side is already declared");

    // The existing slot keeps its peer, so a second connection still fails.
    assert_eq!(ports.connection_count(l1_mem), 1);
    assert!(matches!(
        ports.connect(l1_mem, bus),
        Err(TopologyError::PortAlreadyConnected { .. })
    ));
    assert_eq!(ports.connections().len(), 1);
}

#[test]
fn vector_port_indexes_peers() {
    let mut ports = registry();
    let _ = ports.declare(ComponentId(7), PortRole::MemSide, "system.cpu0.icache", true).unwrap();
    let bus = PortKey::new(BUS, PortRole::CpuSidePorts);
    let first = ports
        .connect(PortKey::new(ComponentId(7), PortRole::MemSide), bus)
        .unwrap();
    let second = ports
        .connect(PortKey::new(L1, PortRole::MemSide), bus)
        .unwrap();
    assert_eq!(first.response.index, 0);
    assert_eq!(second.response.index, 1);
    assert_eq!(second.request.index, 0);
    assert_eq!(ports.connection_count(bus), 2);
    assert_eq!(ports.peers(bus).len(), 2);
    assert_eq!(ports.peer(bus).unwrap().key.component, ComponentId(7));
}

// ══════════════════════════════════════════════════════════
// 3. Freeze checks
// ══════════════════════════════════════════════════════════

#[test]
fn unconnected_required_lists_missing_peers() {
    let mut ports = registry();
    let _ = ports.declare(ComponentId(8), PortRole::Pio, "system.cpu0.interrupts", false).unwrap();
    assert_eq!(ports.unconnected_required().len(), 6);

    let _ = ports
        .connect(
            PortKey::new(L1, PortRole::MemSide),
            PortKey::new(BUS, PortRole::CpuSidePorts),
        )
        .unwrap();
    let _ = ports
        .connect(
            PortKey::new(LLC, PortRole::CpuSide),
            PortKey::new(BUS, PortRole::MemSidePorts),
        )
        .unwrap();
    let missing = ports.unconnected_required();
    assert_eq!(
        missing,
        vec![
            "system.cpu0.dcache_port".to_string(),
            "system.cpu0.dcache.cpu_side".to_string(),
        ]
    );
}

#[test]
fn other_end_of_connection() {
    let mut ports = registry();
    let cpu = PortKey::new(CPU, PortRole::DcachePort);
    let l1 = PortKey::new(L1, PortRole::CpuSide);
    let conn = ports.connect(cpu, l1).unwrap();
    assert_eq!(conn.other_end(cpu).unwrap().key, l1);
    assert_eq!(conn.other_end(l1).unwrap().key, cpu);
    assert!(conn.other_end(PortKey::new(LLC, PortRole::CpuSide)).is_none());
    assert_eq!(ports.connections_of(cpu), vec![conn]);
}
