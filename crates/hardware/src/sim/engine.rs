//! Simulation engines.
//!
//! An `Engine` turns a validated `System` into runnable state and advances virtual time
//! until something ends the run. This module provides:
//! 1. **Engine trait:** `instantiate`, `simulate` and `cur_tick`, the surface the
//!    lifecycle driver consumes.
//! 2. **Exit events:** The tick and cause string reported when a run ends.
//! 3. **TimingEngine:** The built-in engine. Every core replays its process image as an
//!    instruction trace: each 4-byte word is fetched through the L1 instruction cache,
//!    words with an odd low byte also access data through the L1 data cache, and misses
//!    walk the L2 crossbar, the last-level cache, the system crossbar and the memory
//!    controller. A process exits when its trace is exhausted.

use std::fmt;
use std::sync::Arc;

use crate::common::constants::{INSTRUCTION_BYTES, PACKET_BYTES, PAGE_SIZE};
use crate::common::{EngineFault, Tick, TopologyError};
use crate::config::MemMode;
use crate::sim::event::{Event, EventQueue};
use crate::sim::simulator::Phase;
use crate::sim::workload::{ByteOrder, WorkloadImage};
use crate::soc::System;
use crate::soc::cache::{CacheModel, CacheParams};
use crate::soc::component::ComponentId;
use crate::soc::cpu::ThreadStatus;
use crate::soc::interconnect::{AddrMap, Crossbar};
use crate::soc::memory::controller::MemoryController;

/// Cause reported when every process has exited.
pub const CAUSE_WORKLOADS_COMPLETE: &str = "exiting with last active thread context";

/// Cause reported when the tick limit stops the run.
pub const CAUSE_TICK_LIMIT: &str = "simulate() limit reached";

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitKind {
    /// Every process reached its natural exit.
    WorkloadsComplete,
    /// The tick limit elapsed first.
    TickLimit,
    /// The engine failed while running.
    Fault,
}

/// Tick and cause of the end of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitEvent {
    /// Virtual time at exit.
    pub tick: Tick,
    /// Human-readable cause.
    pub cause: String,
    /// Classification of the cause.
    pub kind: ExitKind,
}

impl ExitEvent {
    /// Natural completion at `tick`.
    pub fn workloads_complete(tick: Tick) -> Self {
        Self {
            tick,
            cause: CAUSE_WORKLOADS_COMPLETE.to_string(),
            kind: ExitKind::WorkloadsComplete,
        }
    }

    /// Tick limit reached at `tick`.
    pub fn tick_limit(tick: Tick) -> Self {
        Self {
            tick,
            cause: CAUSE_TICK_LIMIT.to_string(),
            kind: ExitKind::TickLimit,
        }
    }

    /// Engine failure at `tick`.
    pub fn fault(tick: Tick, fault: &EngineFault) -> Self {
        Self {
            tick,
            cause: format!("engine fault: {fault}"),
            kind: ExitKind::Fault,
        }
    }
}

impl fmt::Display for ExitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exiting @ tick {} because {}", self.tick, self.cause)
    }
}

/// A simulation engine.
pub trait Engine {
    /// Allocates engine-side state for every component of `system`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineFault`] if a component precondition is not met.
    fn instantiate(&mut self, system: &System) -> Result<(), EngineFault>;

    /// Runs until every workload exits or `max_tick` elapses.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineFault`] if the run cannot continue.
    fn simulate(&mut self, max_tick: Option<Tick>) -> Result<ExitEvent, EngineFault>;

    /// Current virtual time.
    fn cur_tick(&self) -> Tick;
}

/// End-of-run view of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreReport {
    /// Core id.
    pub cpu_id: usize,
    /// Pid of its process.
    pub pid: u32,
    /// State of its thread.
    pub status: ThreadStatus,
    /// Trace instructions retired.
    pub retired: u64,
    /// Instruction cache hits and misses.
    pub icache: (u64, u64),
    /// Data cache hits and misses.
    pub dcache: (u64, u64),
}

/// Instruction stream shared by every process running the same image.
#[derive(Debug)]
struct Trace {
    words: Vec<(u64, u32)>,
    image_base: u64,
    data_base: u64,
    data_span: u64,
}

impl Trace {
    fn from_image(image: &WorkloadImage) -> Self {
        let mut words = Vec::new();
        for section in image.text() {
            for (i, chunk) in section.bytes.chunks(INSTRUCTION_BYTES as usize).enumerate() {
                let mut raw = [0u8; 4];
                raw[..chunk.len()].copy_from_slice(chunk);
                let word = match image.isa.byte_order {
                    ByteOrder::Little => u32::from_le_bytes(raw),
                    ByteOrder::Big => u32::from_be_bytes(raw),
                };
                words.push((section.addr + i as u64 * INSTRUCTION_BYTES, word));
            }
        }
        let (image_base, _) = image.image_span().unwrap_or((0, 0));
        let (data_base, data_end) = image.data_span().unwrap_or((0, PAGE_SIZE));
        Self {
            words,
            image_base,
            data_base,
            data_span: data_end.saturating_sub(data_base).max(8),
        }
    }

    /// Data address touched by `word`.
    fn data_addr(&self, word: u32) -> u64 {
        let offset = (u64::from(word >> 8) * 8) % self.data_span;
        self.data_base + (offset & !7)
    }
}

#[derive(Debug)]
struct CoreState {
    cpu_id: usize,
    pid: u32,
    path: String,
    status: ThreadStatus,
    icache: CacheModel,
    icache_params: CacheParams,
    dcache: CacheModel,
    dcache_params: CacheParams,
    next: usize,
    limit: usize,
    retired: u64,
    region_base: u64,
    region_size: u64,
}

impl CoreState {
    fn phys(&self, image_base: u64, vaddr: u64) -> u64 {
        self.region_base + vaddr.wrapping_sub(image_base) % self.region_size
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Inst,
    Data,
}

#[derive(Debug)]
struct EngineState {
    period: Tick,
    atomic: bool,
    trace: Arc<Trace>,
    cores: Vec<CoreState>,
    llcbus: Crossbar,
    llcbus_path: String,
    llcbus_map: AddrMap,
    llc_component: ComponentId,
    llc: CacheModel,
    llc_params: CacheParams,
    membus: Crossbar,
    membus_path: String,
    membus_map: AddrMap,
    mem_component: ComponentId,
    mem: Box<dyn MemoryController>,
    events: EventQueue,
}

impl EngineState {
    fn build(system: &System) -> Result<Self, EngineFault> {
        let image = Arc::clone(&system.workload().image);
        let mut trace = Trace::from_image(&image);
        if trace.words.is_empty() {
            tracing::warn!(
                binary = %image.path.display(),
                "workload image has no executable bytes; replaying a single instruction"
            );
            trace.words.push((trace.image_base, 0));
        }
        let trace = Arc::new(trace);
        let limit = system
            .general()
            .max_insts_per_core
            .map_or(trace.words.len(), |cap| {
                trace.words.len().min(usize::try_from(cap).unwrap_or(usize::MAX))
            });

        let mem_range = system.mem_ctrl().range;
        let cpus = system.cpus();
        let per_core = (mem_range.size() / cpus.len().max(1) as u64) & !(PAGE_SIZE - 1);
        // Less than a page per core: every process maps onto the whole range.
        let shared = per_core == 0;
        let region_size = if shared { mem_range.size() } else { per_core };
        if shared {
            tracing::warn!(
                range = %mem_range,
                cores = cpus.len(),
                "memory too small for a page per core; processes share the whole range"
            );
        }

        let mut cores = Vec::with_capacity(cpus.len());
        for (idx, cpu) in cpus.iter().enumerate() {
            let path = system.path(cpu.component);
            let pid = cpu
                .workload
                .filter(|pid| system.processes().iter().any(|p| p.pid == *pid))
                .ok_or_else(|| EngineFault::MissingWorkload(path.clone()))?;
            let (Some(icache), Some(dcache)) = (cpu.icache, cpu.dcache) else {
                return Err(EngineFault::Validation(TopologyError::UnknownPort(
                    format!("{path}.icache"),
                )));
            };
            cores.push(CoreState {
                cpu_id: cpu.cpu_id,
                pid,
                path,
                status: ThreadStatus::Active,
                icache: CacheModel::new(&icache.params),
                icache_params: icache.params,
                dcache: CacheModel::new(&dcache.params),
                dcache_params: dcache.params,
                next: 0,
                limit,
                retired: 0,
                region_base: if shared {
                    mem_range.start()
                } else {
                    mem_range.start() + idx as u64 * region_size
                },
                region_size,
            });
        }

        let llc = system.llc();
        let mut events = EventQueue::new();
        for idx in 0..cores.len() {
            events.schedule(0, Event::CoreStep(idx));
        }
        Ok(Self {
            period: system.clk_domain().period(),
            atomic: system.mem_mode() == MemMode::Atomic,
            trace,
            cores,
            llcbus: *system.llcbus(),
            llcbus_path: system.path(system.llcbus().component),
            llcbus_map: system.address_map(system.llcbus())?,
            llc_component: llc.component,
            llc: CacheModel::new(&llc.params),
            llc_params: llc.params,
            membus: *system.membus(),
            membus_path: system.path(system.membus().component),
            membus_map: system.address_map(system.membus())?,
            mem_component: system.mem_ctrl().component,
            mem: system.mem_ctrl().latency_model(),
            events,
        })
    }

    /// Retires the next instruction of core `idx` at `now`; returns the delay until the
    /// following one, or `None` once the process has exited.
    fn step(&mut self, idx: usize, now: Tick) -> Result<Option<Tick>, EngineFault> {
        let trace = Arc::clone(&self.trace);
        let core = &mut self.cores[idx];
        if core.next >= core.limit {
            core.status = ThreadStatus::Halted;
            tracing::info!(
                cpu = %core.path,
                pid = core.pid,
                retired = core.retired,
                tick = now,
                "process exited"
            );
            return Ok(None);
        }
        let (vaddr, word) = trace.words[core.next];
        core.next += 1;
        core.retired += 1;
        let pc = core.phys(trace.image_base, vaddr);

        let mut delay = self.period;
        delay += self.access(idx, Side::Inst, pc, false)?;
        if word & 1 == 1 {
            let addr = self.cores[idx].phys(trace.image_base, trace.data_addr(word));
            delay += self.access(idx, Side::Data, addr, word & 2 != 0)?;
        }
        tracing::trace!(cpu = idx, tick = now, pc, delay, "retired");
        Ok(Some(delay))
    }

    fn xbar_ticks(&self, xbar: &Crossbar) -> Tick {
        if self.atomic {
            return 0;
        }
        (xbar.transit_cycles(PACKET_BYTES) + xbar.response_cycles(PACKET_BYTES)) * self.period
    }

    fn access(
        &mut self,
        idx: usize,
        side: Side,
        addr: u64,
        is_write: bool,
    ) -> Result<Tick, EngineFault> {
        let core = &mut self.cores[idx];
        let (cache, params) = match side {
            Side::Inst => (&mut core.icache, core.icache_params),
            Side::Data => (&mut core.dcache, core.dcache_params),
        };
        let outcome = cache.access(addr, is_write);
        if outcome.hit {
            return Ok(params.hit_latency() * self.period);
        }

        let mut ticks = params.miss_latency() * self.period + self.xbar_ticks(&self.llcbus);
        let target = self
            .llcbus_map
            .route(addr)
            .map(|r| r.target.key.component);
        if target != Some(self.llc_component) {
            return Err(EngineFault::Unroutable {
                from: self.llcbus_path.clone(),
                addr,
            });
        }
        ticks += self.llc_access(addr, false)?;
        if outcome.writeback {
            ticks += self.llcbus.transit_cycles(PACKET_BYTES) * self.period;
        }
        Ok(ticks)
    }

    fn llc_access(&mut self, addr: u64, is_write: bool) -> Result<Tick, EngineFault> {
        let outcome = self.llc.access(addr, is_write);
        if outcome.hit {
            return Ok(self.llc_params.hit_latency() * self.period);
        }
        let mut ticks = self.llc_params.miss_latency() * self.period
            + self.xbar_ticks(&self.membus)
            + self.memory(addr)?;
        if outcome.writeback {
            ticks += self.membus.transit_cycles(PACKET_BYTES) * self.period;
        }
        Ok(ticks)
    }

    fn memory(&mut self, addr: u64) -> Result<Tick, EngineFault> {
        let target = self
            .membus_map
            .route(addr)
            .map(|r| r.target.key.component);
        if target != Some(self.mem_component) {
            return Err(EngineFault::Unroutable {
                from: self.membus_path.clone(),
                addr,
            });
        }
        Ok(self.mem.access_latency(addr))
    }

    fn all_exited(&self) -> bool {
        self.cores
            .iter()
            .all(|c| c.status == ThreadStatus::Halted)
    }
}

/// The built-in trace-driven timing engine.
#[derive(Debug, Default)]
pub struct TimingEngine {
    state: Option<EngineState>,
    cur_tick: Tick,
}

impl TimingEngine {
    /// Creates an engine with no state; call [`Engine::instantiate`] before running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-core progress, empty before instantiation.
    pub fn cores(&self) -> Vec<CoreReport> {
        self.state.as_ref().map_or_else(Vec::new, |state| {
            state
                .cores
                .iter()
                .map(|c| CoreReport {
                    cpu_id: c.cpu_id,
                    pid: c.pid,
                    status: c.status,
                    retired: c.retired,
                    icache: (c.icache.hits, c.icache.misses),
                    dcache: (c.dcache.hits, c.dcache.misses),
                })
                .collect()
        })
    }
}

impl Engine for TimingEngine {
    fn instantiate(&mut self, system: &System) -> Result<(), EngineFault> {
        let state = EngineState::build(system)?;
        tracing::info!(
            cores = state.cores.len(),
            period = state.period,
            trace_len = state.trace.words.len(),
            "engine instantiated"
        );
        self.state = Some(state);
        self.cur_tick = 0;
        Ok(())
    }

    fn simulate(&mut self, max_tick: Option<Tick>) -> Result<ExitEvent, EngineFault> {
        let Self { state, cur_tick } = self;
        let state = state.as_mut().ok_or(EngineFault::InvalidPhase {
            operation: "simulate",
            found: Phase::Built,
        })?;

        while let Some(next) = state.events.peek_tick() {
            if let Some(limit) = max_tick {
                if next > limit {
                    *cur_tick = limit.max(*cur_tick);
                    return Ok(ExitEvent::tick_limit(*cur_tick));
                }
            }
            let Some(scheduled) = state.events.pop() else {
                break;
            };
            *cur_tick = scheduled.tick;
            match scheduled.event {
                Event::CoreStep(idx) => match state.step(idx, scheduled.tick)? {
                    Some(delay) => state
                        .events
                        .schedule(scheduled.tick + delay, Event::CoreStep(idx)),
                    None if state.all_exited() => {
                        return Ok(ExitEvent::workloads_complete(*cur_tick));
                    }
                    None => {}
                },
            }
        }
        Ok(ExitEvent::workloads_complete(*cur_tick))
    }

    fn cur_tick(&self) -> Tick {
        self.cur_tick
    }
}
