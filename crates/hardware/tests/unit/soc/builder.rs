//! System builder tests.
//!
//! Verifies the shape of the built graph for several core counts, the names and
//! processes it produces, the freeze-time validation failures, and that building
//! twice from the same configuration yields isomorphic systems.

use mcsim_core::common::constants::PROCESS_PID_BASE;
use mcsim_core::common::{SimError, TopologyError};
use mcsim_core::config::{Config, MemoryControllerKind};
use mcsim_core::soc::component::{CacheLevel, ComponentKind};
use mcsim_core::soc::cpu::ThreadStatus;
use mcsim_core::soc::memory::MemTiming;
use mcsim_core::soc::port::PortRole;
use mcsim_core::soc::{System, TopologySummary};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use crate::common::harness::{Fixture, init_tracing, run_config, trace_image, workload_file};

// ══════════════════════════════════════════════════════════
// 1. Shape
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
#[case(8)]
fn component_counts(#[case] n: usize) {
    let fx = Fixture::new(n);
    assert_eq!(
        fx.system.summary(),
        TopologySummary {
            cpus: n,
            icaches: n,
            dcaches: n,
            llcs: 1,
            crossbars: 2,
            interrupt_controllers: n,
            mem_ctrls: 1,
            processes: n,
            connections: 7 * n + 4,
        }
    );
}

#[rstest]
#[case(1)]
#[case(3)]
fn llcbus_fan_in(#[case] n: usize) {
    let fx = Fixture::new(n);
    let sys = &fx.system;
    let ports = sys.ports();
    let llcbus = sys.llcbus();

    let upstream = ports.peers(llcbus.cpu_side_ports());
    assert_eq!(upstream.len(), 2 * n);
    assert!(upstream.iter().all(|p| p.key.role == PortRole::MemSide));

    let downstream = ports.peers(llcbus.mem_side_ports());
    assert_eq!(downstream.len(), 1);
    assert_eq!(downstream[0].key, sys.llc().cpu_side());
}

#[test]
fn membus_peers() {
    let fx = Fixture::new(2);
    let sys = &fx.system;
    let ports = sys.ports();
    // llc mem_side, one int_requestor per cpu, system_port
    assert_eq!(ports.connection_count(sys.membus().cpu_side_ports()), 4);
    // pio and int_responder per cpu, mem_ctrl port
    assert_eq!(ports.connection_count(sys.membus().mem_side_ports()), 5);
    assert_eq!(
        ports.peer(sys.system_port()).unwrap().key,
        sys.membus().cpu_side_ports()
    );
}

#[test]
fn l1s_sit_between_cpu_and_llcbus() {
    let fx = Fixture::new(2);
    let sys = &fx.system;
    for cpu in sys.cpus() {
        let icache = cpu.icache.unwrap();
        let dcache = cpu.dcache.unwrap();
        let ports = sys.ports();
        assert_eq!(ports.peer(cpu.icache_port()).unwrap().key, icache.cpu_side());
        assert_eq!(ports.peer(cpu.dcache_port()).unwrap().key, dcache.cpu_side());
        assert_eq!(
            ports.peer(icache.mem_side()).unwrap().key,
            sys.llcbus().cpu_side_ports()
        );
        assert_eq!(icache.params.level, CacheLevel::L1Instruction);
        assert_eq!(dcache.params.geometry.size_bytes, 64 << 10);
    }
}

// ══════════════════════════════════════════════════════════
// 2. Names, clocks and processes
// ══════════════════════════════════════════════════════════

#[test]
fn dotted_paths() {
    let fx = Fixture::new(2);
    let tree = fx.system.tree();
    for path in [
        "system",
        "system.clk_domain",
        "system.clk_domain.voltage_domain",
        "system.cpu0",
        "system.cpu1.icache",
        "system.cpu1.dcache",
        "system.cpu0.interrupts",
        "system.cpu1.workload",
        "system.llcbus",
        "system.llccache",
        "system.membus",
        "system.mem_ctrl",
        "system.mem_ctrl.dram",
        "system.workload",
    ] {
        assert!(tree.find(path).is_some(), "missing {path}");
    }
    assert!(tree.find("system.cpu2").is_none());
}

#[test]
fn single_clock_domain() {
    let fx = Fixture::new(4);
    let sys = &fx.system;
    let clk = sys.clk_domain().component;
    assert_eq!(sys.tree().count(ComponentKind::ClockDomain), 1);
    assert!(sys
        .tree()
        .iter()
        .filter(|n| n.kind.is_clocked())
        .all(|n| sys.tree().clock_domain_of(n.id) == Some(clk)));
    assert_eq!(sys.clk_domain().period(), 1000);
    assert_eq!(sys.voltage_domain().millivolts, 1000);
}

#[test]
fn one_process_per_cpu() {
    let fx = Fixture::new(4);
    let sys = &fx.system;
    let binary = fx.binary.path().display().to_string();
    for (cpu, process) in sys.cpus().iter().zip(sys.processes()) {
        let pid = PROCESS_PID_BASE + cpu.cpu_id as u32;
        assert_eq!(process.pid, pid);
        assert_eq!(process.cpu_id, cpu.cpu_id);
        assert_eq!(process.cmd, vec![binary.clone()]);
        assert_eq!(cpu.workload, Some(pid));
        assert_eq!(cpu.threads.len(), 1);
        assert_eq!(cpu.threads[0].status, ThreadStatus::Suspended);
    }
    let pids: Vec<_> = sys.processes().iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![100, 101, 102, 103]);
}

#[test]
fn memory_matches_system_range() {
    let fx = Fixture::new(1);
    let sys = &fx.system;
    assert_eq!(sys.mem_ranges().len(), 1);
    assert_eq!(sys.mem_ranges()[0].size(), 512 << 20);
    assert_eq!(sys.mem_ctrl().range, sys.mem_ranges()[0]);
    assert!(matches!(sys.mem_ctrl().timing, MemTiming::Dram(_)));
}

#[test]
fn simple_memory_controller() {
    let mut hardware = Config::default();
    hardware.memory.controller = MemoryControllerKind::Simple;
    let fx = Fixture::with_hardware(1, hardware);
    assert_eq!(fx.system.mem_ctrl().timing, MemTiming::Simple(30_000));
}

#[test]
fn llc_takes_run_geometry() {
    init_tracing();
    let binary = workload_file(&trace_image());
    let mut opts = crate::common::harness::options(1, &binary);
    opts.llc_size = "1MB".into();
    opts.llc_assoc = "16".into();
    let run = mcsim_core::RunConfig::resolve(&opts, Config::default()).unwrap();
    let sys = System::build(&run).unwrap();
    assert_eq!(sys.llc().params.geometry.size_bytes, 1 << 20);
    assert_eq!(sys.llc().params.geometry.assoc, 16);
    assert_eq!(sys.llc().params.tag_latency, 20);
}

// ══════════════════════════════════════════════════════════
// 3. Build and validation failures
// ══════════════════════════════════════════════════════════

#[test]
fn zero_cores_fail_to_build() {
    let binary = workload_file(&trace_image());
    let mut run = run_config(1, &binary);
    run.core_count = 0;
    assert!(matches!(
        System::build(&run),
        Err(SimError::Topology(TopologyError::NoCores))
    ));
}

#[test]
fn built_system_validates() {
    let fx = Fixture::new(3);
    fx.system.validate().unwrap();
}

#[test]
fn double_connect_rejected() {
    let mut fx = Fixture::new(1);
    let llc = *fx.system.llc();
    let membus = *fx.system.membus();
    let before = fx.system.summary().connections;
    let err = fx
        .system
        .connect(llc.mem_side(), membus.cpu_side_ports())
        .unwrap_err();
    assert!(matches!(err, TopologyError::PortAlreadyConnected { .. }));
    assert_eq!(fx.system.summary().connections, before);
}

#[test]
fn redeclaring_a_connected_port_rejected() {
    let mut fx = Fixture::new(1);
    let llc = *fx.system.llc();
    let membus = *fx.system.membus();
    let before = fx.system.summary().connections;

    let err = fx
        .system
        .declare_port(llc.component, PortRole::MemSide, true)
        .unwrap_err();
    assert_eq!(
        err,
        TopologyError::PortAlreadyDeclared("system.llccache.mem_side".into())
    );
    assert!(matches!(
        fx.system.connect(llc.mem_side(), membus.cpu_side_ports()),
        Err(TopologyError::PortAlreadyConnected { .. })
    ));
    assert_eq!(fx.system.summary().connections, before);
    fx.system.validate().unwrap();
}

#[test]
fn unconnected_required_port_fails_validation() {
    let mut fx = Fixture::new(1);
    let root = fx.system.root();
    let extra = fx
        .system
        .add_component(root, "mem_ctrl2", ComponentKind::MemCtrl)
        .unwrap();
    let _ = fx.system.declare_port(extra, PortRole::Port, true).unwrap();
    assert_eq!(
        fx.system.validate(),
        Err(TopologyError::UnconnectedPort("system.mem_ctrl2.port".into()))
    );
}

#[test]
fn optional_port_may_stay_unconnected() {
    let mut fx = Fixture::new(1);
    let root = fx.system.root();
    let extra = fx
        .system
        .add_component(root, "probe", ComponentKind::Workload)
        .unwrap();
    let _ = fx.system.declare_port(extra, PortRole::Port, false).unwrap();
    fx.system.validate().unwrap();
}

#[test]
fn foreign_clock_domain_fails_validation() {
    let mut fx = Fixture::new(2);
    let cpu0 = fx.system.cpus()[0].component;
    let llc = fx.system.llc().component;
    fx.system.assign_clock_domain(cpu0, llc).unwrap();
    assert_eq!(
        fx.system.validate(),
        Err(TopologyError::UnreachableClockDomain("system.cpu0".into()))
    );
}

#[test]
fn memory_over_interrupt_windows_fails_validation() {
    let mut hardware = Config::default();
    hardware.system.mem_base = 0x2000_0000_0000_0000;
    let fx = Fixture::with_hardware(1, hardware);
    assert!(matches!(
        fx.system.validate(),
        Err(TopologyError::AddressRangeOverlap { .. })
    ));
}

#[test]
fn missing_image_fails_to_build() {
    let binary = workload_file(&trace_image());
    let run = run_config(1, &binary);
    drop(binary);
    assert!(matches!(System::build(&run), Err(SimError::Engine(_))));
}

// ══════════════════════════════════════════════════════════
// 4. Determinism
// ══════════════════════════════════════════════════════════

#[test]
fn rebuild_is_isomorphic() {
    let binary = workload_file(&trace_image());
    let run = run_config(3, &binary);
    let a = System::build(&run).unwrap();
    let b = System::build(&run).unwrap();
    assert!(a.isomorphic_to(&b));
}

#[test]
fn different_core_counts_are_not_isomorphic() {
    let binary = workload_file(&trace_image());
    let a = System::build(&run_config(2, &binary)).unwrap();
    let b = System::build(&run_config(3, &binary)).unwrap();
    assert!(!a.isomorphic_to(&b));
}

#[test]
fn different_parameters_are_not_isomorphic() {
    let binary = workload_file(&trace_image());
    let a = System::build(&run_config(2, &binary)).unwrap();
    let mut hardware = Config::default();
    hardware.system.clock = "2GHz".into();
    let run = crate::common::harness::run_config_with(2, &binary, hardware);
    let b = System::build(&run).unwrap();
    assert!(!a.isomorphic_to(&b));
}

#[rstest]
#[case::l1_i_size(|hw: &mut Config| hw.cache.l1_i.size = "32kB".into())]
#[case::l1_d_assoc(|hw: &mut Config| hw.cache.l1_d.assoc = 4)]
#[case::l1_d_latency(|hw: &mut Config| hw.cache.l1_d.tag_latency = 3)]
fn different_l1_parameters_are_not_isomorphic(#[case] tweak: fn(&mut Config)) {
    let binary = workload_file(&trace_image());
    let a = System::build(&run_config(2, &binary)).unwrap();
    let mut hardware = Config::default();
    tweak(&mut hardware);
    let run = crate::common::harness::run_config_with(2, &binary, hardware);
    let b = System::build(&run).unwrap();
    assert_eq!(a.summary(), b.summary());
    assert!(!a.isomorphic_to(&b));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn build_is_deterministic(n in 1usize..12) {
        let binary = workload_file(&trace_image());
        let run = run_config(n, &binary);
        let a = System::build(&run).unwrap();
        let b = System::build(&run).unwrap();
        prop_assert!(a.isomorphic_to(&b));
        prop_assert_eq!(a.summary().connections, 7 * n + 4);
    }
}
