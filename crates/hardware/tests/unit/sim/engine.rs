//! # Timing Engine Tests
//!
//! Runs built systems through `TimingEngine` and checks per-core progress, exit
//! causes, tick limits and the relative cost of the memory modes.

use mcsim_core::config::{Config, MemMode, MemoryControllerKind};
use mcsim_core::sim::engine::{
    CAUSE_TICK_LIMIT, CAUSE_WORKLOADS_COMPLETE, Engine, ExitKind, TimingEngine,
};
use mcsim_core::sim::{ExitEvent, Simulation};
use mcsim_core::soc::cpu::ThreadStatus;
use rstest::rstest;

use crate::common::harness::{Fixture, TRACE_WORDS, workload_file};

fn run(fx: Fixture) -> (ExitEvent, Simulation) {
    let mut sim = Simulation::new(fx.system);
    sim.instantiate().unwrap();
    let exit = sim.simulate().unwrap();
    (exit, sim)
}

fn run_with(cores: usize, hardware: Config) -> (ExitEvent, Simulation) {
    run(Fixture::with_hardware(cores, hardware))
}

// ══════════════════════════════════════════════════════════
// 1. Completion
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
fn every_core_retires_whole_trace(#[case] cores: usize) {
    let (exit, sim) = run(Fixture::new(cores));
    assert_eq!(exit.kind, ExitKind::WorkloadsComplete);
    assert_eq!(exit.cause, CAUSE_WORKLOADS_COMPLETE);
    assert!(exit.tick > 0);
    assert_eq!(sim.cur_tick(), exit.tick);

    let reports = sim.engine().cores();
    assert_eq!(reports.len(), cores);
    for (i, core) in reports.iter().enumerate() {
        assert_eq!(core.cpu_id, i);
        assert_eq!(core.pid, 100 + i as u32);
        assert_eq!(core.status, ThreadStatus::Halted);
        assert_eq!(core.retired, TRACE_WORDS);
        assert_eq!(core.icache.0 + core.icache.1, TRACE_WORDS);
    }
}

#[test]
fn data_accesses_follow_odd_words() {
    let (_, sim) = run(Fixture::new(1));
    let core = sim.engine().cores()[0];
    // Every third word of the trace carries an odd low byte.
    let expected = TRACE_WORDS.div_ceil(3);
    assert_eq!(core.dcache.0 + core.dcache.1, expected);
}

#[test]
fn sequential_fetch_mostly_hits() {
    let (_, sim) = run(Fixture::new(1));
    let (hits, misses) = sim.engine().cores()[0].icache;
    // 1kB of code over 64-byte lines.
    assert_eq!(misses, 16);
    assert_eq!(hits, TRACE_WORDS - 16);
}

#[test]
fn runs_are_deterministic() {
    let (a, _) = run(Fixture::new(2));
    let (b, _) = run(Fixture::new(2));
    assert_eq!(a, b);
}

#[test]
fn instruction_cap_shortens_run() {
    let mut hardware = Config::default();
    hardware.general.max_insts_per_core = Some(10);
    let (exit, sim) = run_with(2, hardware);
    assert_eq!(exit.kind, ExitKind::WorkloadsComplete);
    assert!(sim.engine().cores().iter().all(|c| c.retired == 10));
}

#[test]
fn empty_image_replays_one_instruction() {
    let binary = workload_file(&[]);
    let config = crate::common::harness::run_config(1, &binary);
    let system = mcsim_core::System::build(&config).unwrap();
    let mut sim = Simulation::new(system);
    sim.instantiate().unwrap();
    let exit = sim.simulate().unwrap();
    assert_eq!(exit.kind, ExitKind::WorkloadsComplete);
    assert_eq!(sim.engine().cores()[0].retired, 1);
}

#[rstest]
#[case("4kB", 2)]
#[case("1kB", 4)]
#[case("8kB", 2)]
fn small_memory_still_completes(#[case] mem_size: &str, #[case] cores: usize) {
    let mut hardware = Config::default();
    hardware.system.mem_size = mem_size.into();
    let (exit, sim) = run_with(cores, hardware);
    assert_eq!(exit.kind, ExitKind::WorkloadsComplete, "{}", exit.cause);
    assert!(sim
        .engine()
        .cores()
        .iter()
        .all(|c| c.status == ThreadStatus::Halted && c.retired == TRACE_WORDS));
}

// ══════════════════════════════════════════════════════════
// 2. Tick limit
// ══════════════════════════════════════════════════════════

#[test]
fn configured_tick_limit_stops_run() {
    let mut hardware = Config::default();
    hardware.general.max_tick = Some(50_000);
    let (exit, sim) = run_with(2, hardware);
    assert_eq!(exit.kind, ExitKind::TickLimit);
    assert_eq!(exit.cause, CAUSE_TICK_LIMIT);
    assert_eq!(exit.tick, 50_000);
    assert!(sim
        .engine()
        .cores()
        .iter()
        .all(|c| c.status == ThreadStatus::Active && c.retired < TRACE_WORDS));
}

#[test]
fn explicit_limit_overrides_config() {
    let fx = Fixture::new(1);
    let mut sim = Simulation::new(fx.system);
    sim.instantiate().unwrap();
    let exit = sim.simulate_until(Some(5_000)).unwrap();
    assert_eq!(exit.kind, ExitKind::TickLimit);
    assert_eq!(exit.tick, 5_000);
}

#[test]
fn generous_limit_lets_workloads_finish() {
    let mut hardware = Config::default();
    hardware.general.max_tick = Some(u64::MAX / 2);
    let (exit, _) = run_with(1, hardware);
    assert_eq!(exit.kind, ExitKind::WorkloadsComplete);
}

// ══════════════════════════════════════════════════════════
// 3. Timing parameters
// ══════════════════════════════════════════════════════════

#[test]
fn atomic_mode_skips_crossbar_latency() {
    let (timing, _) = run(Fixture::new(1));
    let mut hardware = Config::default();
    hardware.system.mem_mode = MemMode::Atomic;
    let (atomic, _) = run_with(1, hardware);
    assert!(atomic.tick < timing.tick);
}

#[test]
fn faster_clock_finishes_sooner() {
    let (slow, _) = run(Fixture::new(1));
    let mut hardware = Config::default();
    hardware.system.clock = "2GHz".into();
    let (fast, _) = run_with(1, hardware);
    assert!(fast.tick < slow.tick);
}

#[test]
fn simple_memory_controller_runs() {
    let mut hardware = Config::default();
    hardware.memory.controller = MemoryControllerKind::Simple;
    let (exit, _) = run_with(1, hardware);
    assert_eq!(exit.kind, ExitKind::WorkloadsComplete);
}

// ══════════════════════════════════════════════════════════
// 4. Engine used directly
// ══════════════════════════════════════════════════════════

#[test]
fn simulate_without_instantiate_fails() {
    let mut engine = TimingEngine::new();
    assert!(engine.simulate(None).is_err());
    assert!(engine.cores().is_empty());
    assert_eq!(engine.cur_tick(), 0);
}

#[test]
fn exit_event_display() {
    let exit = ExitEvent::workloads_complete(1234);
    assert_eq!(
        exit.to_string(),
        "Exiting @ tick 1234 because exiting with last active thread context"
    );
}
