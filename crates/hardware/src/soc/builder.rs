//! System construction and the top-level `System` graph.
//!
//! This module builds the complete multi-core system from a resolved `RunConfig`. It performs:
//! 1. **Clocking:** Creates the voltage and source clock domains; everything built afterwards
//!    inherits the single clock from the system container.
//! 2. **Cores:** Creates one cpu per core with sequential ids.
//! 3. **Shared hierarchy:** Creates the L2 crossbar, the shared last-level cache and the
//!    system crossbar, and chains them together.
//! 4. **Per-core wiring:** Private L1 instruction/data caches, the local interrupt controller
//!    and the hardware thread contexts of every cpu.
//! 5. **Memory:** The memory controller, its DRAM model and the system's sole address range.
//! 6. **Workloads:** Resolves the image once and binds one process per cpu.
//!
//! Construction is all-or-nothing: any failure returns an error and no `System` exists.
//! `validate` runs the freeze-time checks that instantiation depends on.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::common::units::{parse_memory_size, parse_time, parse_voltage};
use crate::common::{AddrRange, SimError, TopologyError};
use crate::config::{GeneralConfig, MemMode, MemoryControllerKind, RunConfig, XBarConfig};
use crate::sim::workload::{Process, SeWorkload, WorkloadImage};
use crate::soc::cache::{Cache, CacheParams};
use crate::soc::clock::{SrcClockDomain, VoltageDomain};
use crate::soc::component::{CacheLevel, ComponentId, ComponentKind, ComponentTree};
use crate::soc::cpu::Cpu;
use crate::soc::interconnect::{AddrMap, Crossbar, CrossbarKind};
use crate::soc::interrupts::InterruptController;
use crate::soc::memory::{MemCtrl, MemTiming};
use crate::soc::port::{Connection, PortEndpoint, PortKey, PortRegistry, PortRole};

/// Hardware thread contexts created per cpu.
const THREADS_PER_CPU: usize = 1;

/// Component and connection counts of a built system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopologySummary {
    /// Processing elements.
    pub cpus: usize,
    /// Private instruction caches.
    pub icaches: usize,
    /// Private data caches.
    pub dcaches: usize,
    /// Shared last-level caches.
    pub llcs: usize,
    /// Crossbars.
    pub crossbars: usize,
    /// Local interrupt controllers.
    pub interrupt_controllers: usize,
    /// Memory controllers.
    pub mem_ctrls: usize,
    /// Processes bound to cpus.
    pub processes: usize,
    /// Port connections.
    pub connections: usize,
}

/// Tree and port registry under construction.
struct GraphBuilder {
    tree: ComponentTree,
    ports: PortRegistry,
}

impl GraphBuilder {
    fn add(
        &mut self,
        parent: ComponentId,
        name: &str,
        kind: ComponentKind,
    ) -> Result<ComponentId, TopologyError> {
        self.tree.add_child(parent, name, kind)
    }

    fn declare(
        &mut self,
        component: ComponentId,
        role: PortRole,
    ) -> Result<PortKey, TopologyError> {
        let path = self.tree.path(component);
        self.ports.declare(component, role, &path, true)
    }

    fn connect(&mut self, a: PortKey, b: PortKey) -> Result<Connection, TopologyError> {
        self.ports.connect(a, b)
    }

    fn add_crossbar(
        &mut self,
        parent: ComponentId,
        name: &str,
        kind: CrossbarKind,
        params: XBarConfig,
    ) -> Result<Crossbar, TopologyError> {
        let component = self.add(parent, name, ComponentKind::Crossbar)?;
        let _ = self.declare(component, PortRole::CpuSidePorts)?;
        let _ = self.declare(component, PortRole::MemSidePorts)?;
        Ok(Crossbar {
            component,
            kind,
            params,
        })
    }

    fn add_cache(
        &mut self,
        parent: ComponentId,
        name: &str,
        params: CacheParams,
    ) -> Result<Cache, TopologyError> {
        let component = self.add(parent, name, ComponentKind::Cache(params.level))?;
        let _ = self.declare(component, PortRole::CpuSide)?;
        let _ = self.declare(component, PortRole::MemSide)?;
        Ok(Cache { component, params })
    }
}

/// The whole simulated machine: components, their connections and the bound workload.
#[derive(Clone, Debug)]
pub struct System {
    tree: ComponentTree,
    ports: PortRegistry,
    root: ComponentId,
    system_port: PortKey,
    voltage_domain: VoltageDomain,
    clk_domain: SrcClockDomain,
    mem_ranges: Vec<AddrRange>,
    mem_mode: MemMode,
    cpus: Vec<Cpu>,
    llcbus: Crossbar,
    llc: Cache,
    membus: Crossbar,
    mem_ctrl: MemCtrl,
    workload: SeWorkload,
    processes: Vec<Process>,
    general: GeneralConfig,
}

impl System {
    /// Builds the system described by `run`.
    ///
    /// # Errors
    ///
    /// * [`SimError::Topology`] for structural failures, including a zero core count.
    /// * [`SimError::Config`] if a hardware parameter does not parse.
    /// * [`SimError::Engine`] if the workload image cannot be loaded.
    pub fn build(run: &RunConfig) -> Result<Self, SimError> {
        if run.core_count == 0 {
            return Err(TopologyError::NoCores.into());
        }
        let hw = &run.hardware;
        tracing::info!(
            cores = run.core_count,
            llc_size = %run.llc_size,
            llc_assoc = run.llc_assoc,
            "building system"
        );

        let mut g = GraphBuilder {
            tree: ComponentTree::new(),
            ports: PortRegistry::new(),
        };
        let root = g.tree.add_root("system", ComponentKind::System);
        let system_port = g.declare(root, PortRole::SystemPort)?;

        // 1. Clock and voltage.
        let clk_id = g.add(root, "clk_domain", ComponentKind::ClockDomain)?;
        let vd_id = g.add(clk_id, "voltage_domain", ComponentKind::VoltageDomain)?;
        let voltage_domain = VoltageDomain {
            component: vd_id,
            millivolts: parse_voltage(&hw.system.voltage)?,
        };
        let clk_domain = SrcClockDomain {
            component: clk_id,
            frequency: hw.system.frequency()?,
            voltage_domain: vd_id,
        };
        g.tree.set_clock_domain(root, clk_id)?;

        let mem_size = parse_memory_size(&hw.system.mem_size)?;
        let mem_ranges = vec![AddrRange::with_size(hw.system.mem_base, mem_size)?];

        // 2. Cores, all on the system clock.
        let mut cpus = Vec::with_capacity(run.core_count);
        for cpu_id in 0..run.core_count {
            let component = g.add(root, &format!("cpu{cpu_id}"), ComponentKind::Cpu)?;
            g.tree.set_clock_domain(component, clk_id)?;
            let _ = g.declare(component, PortRole::IcachePort)?;
            let _ = g.declare(component, PortRole::DcachePort)?;
            cpus.push(Cpu::new(cpu_id, component));
        }

        // 3. L2 crossbar and the shared last-level cache below it.
        let llcbus = g.add_crossbar(
            root,
            "llcbus",
            CrossbarKind::L2XBar,
            hw.interconnect.l2_xbar,
        )?;
        let llc_params = CacheParams::new(CacheLevel::LastLevel, &hw.cache.llc, run.llc_geometry);
        let llc = g.add_cache(root, "llccache", llc_params)?;
        let _ = g.connect(llc.cpu_side(), llcbus.mem_side_ports())?;

        // 4. System crossbar above the last-level cache.
        let membus = g.add_crossbar(
            root,
            "membus",
            CrossbarKind::SystemXBar,
            hw.interconnect.system_xbar,
        )?;
        let _ = g.connect(llc.mem_side(), membus.cpu_side_ports())?;

        // 5. Per-core caches, interrupt controllers and thread contexts.
        let l1i_geometry = hw.cache.l1_i.geometry("l1_i")?;
        let l1d_geometry = hw.cache.l1_d.geometry("l1_d")?;
        for cpu in &mut cpus {
            let icache = g.add_cache(
                cpu.component,
                "icache",
                CacheParams::new(CacheLevel::L1Instruction, &hw.cache.l1_i, l1i_geometry),
            )?;
            let dcache = g.add_cache(
                cpu.component,
                "dcache",
                CacheParams::new(CacheLevel::L1Data, &hw.cache.l1_d, l1d_geometry),
            )?;
            let _ = g.connect(cpu.icache_port(), icache.cpu_side())?;
            let _ = g.connect(cpu.dcache_port(), dcache.cpu_side())?;
            let _ = g.connect(icache.mem_side(), llcbus.cpu_side_ports())?;
            let _ = g.connect(dcache.mem_side(), llcbus.cpu_side_ports())?;

            let int_id = g.add(cpu.component, "interrupts", ComponentKind::InterruptController)?;
            let interrupts = InterruptController {
                component: int_id,
                cpu_id: cpu.cpu_id,
            };
            let _ = g.declare(int_id, PortRole::Pio)?;
            let _ = g.declare(int_id, PortRole::IntRequestor)?;
            let _ = g.declare(int_id, PortRole::IntResponder)?;
            let _ = g.connect(interrupts.pio(), membus.mem_side_ports())?;
            let _ = g.connect(interrupts.int_requestor(), membus.cpu_side_ports())?;
            let _ = g.connect(interrupts.int_responder(), membus.mem_side_ports())?;

            cpu.icache = Some(icache);
            cpu.dcache = Some(dcache);
            cpu.interrupts = Some(interrupts);
            cpu.create_threads(THREADS_PER_CPU);
        }

        // 6. Functional access port.
        let _ = g.connect(system_port, membus.cpu_side_ports())?;

        // 7. Memory controller over the system's only range.
        let mc_id = g.add(root, "mem_ctrl", ComponentKind::MemCtrl)?;
        let dram_id = g.add(mc_id, "dram", ComponentKind::Dram)?;
        let timing = match hw.memory.controller {
            MemoryControllerKind::Dram => MemTiming::Dram(hw.memory.dram_timing()?),
            MemoryControllerKind::Simple => {
                MemTiming::Simple(parse_time(&hw.memory.simple_latency)?)
            }
        };
        let mem_ctrl = MemCtrl {
            component: mc_id,
            dram: dram_id,
            range: mem_ranges[0],
            timing,
        };
        let _ = g.declare(mc_id, PortRole::Port)?;
        let _ = g.connect(mem_ctrl.port(), membus.mem_side_ports())?;

        // 8. One image, one process per core.
        let image = WorkloadImage::load(&run.binary)?;
        tracing::info!(binary = %run.binary.display(), isa = %image.isa, "resolved workload");
        let workload = SeWorkload {
            component: g.add(root, "workload", ComponentKind::Workload)?,
            image: Arc::new(image),
        };
        let mut processes = Vec::with_capacity(cpus.len());
        for cpu in &mut cpus {
            let component = g.add(cpu.component, "workload", ComponentKind::Process)?;
            let process = Process::for_core(component, cpu.cpu_id, &run.binary)?;
            cpu.bind_workload(process.pid, &g.tree.path(cpu.component))?;
            processes.push(process);
        }

        tracing::debug!(
            components = g.tree.len(),
            connections = g.ports.connections().len(),
            "system built"
        );
        Ok(Self {
            tree: g.tree,
            ports: g.ports,
            root,
            system_port,
            voltage_domain,
            clk_domain,
            mem_ranges,
            mem_mode: hw.system.mem_mode,
            cpus,
            llcbus,
            llc,
            membus,
            mem_ctrl,
            workload,
            processes,
            general: hw.general.clone(),
        })
    }

    /// Adds a component under `parent` to a system that has not been instantiated yet.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownComponent`] if `parent` is not part of this system.
    pub fn add_component(
        &mut self,
        parent: ComponentId,
        name: &str,
        kind: ComponentKind,
    ) -> Result<ComponentId, TopologyError> {
        self.tree.add_child(parent, name, kind)
    }

    /// Declares a port on an existing component.
    ///
    /// # Errors
    ///
    /// * [`TopologyError::UnknownComponent`] if `component` is not part of this system.
    /// * [`TopologyError::PortAlreadyDeclared`] if the component already has that port.
    pub fn declare_port(
        &mut self,
        component: ComponentId,
        role: PortRole,
        required: bool,
    ) -> Result<PortKey, TopologyError> {
        let path = self.tree.get(component)?.path.clone();
        self.ports.declare(component, role, &path, required)
    }

    /// Connects two ports.
    ///
    /// # Errors
    ///
    /// See [`PortRegistry::connect`]; connecting an already connected single port fails
    /// with [`TopologyError::PortAlreadyConnected`].
    pub fn connect(&mut self, a: PortKey, b: PortKey) -> Result<Connection, TopologyError> {
        self.ports.connect(a, b)
    }

    /// Drives `component` from `domain` instead of the clock it inherits.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownComponent`] if either id is foreign.
    pub fn assign_clock_domain(
        &mut self,
        component: ComponentId,
        domain: ComponentId,
    ) -> Result<(), TopologyError> {
        self.tree.set_clock_domain(component, domain)
    }

    /// Freeze-time structural checks.
    ///
    /// # Errors
    ///
    /// * [`TopologyError::NoCores`] if the system has no cpu.
    /// * [`TopologyError::UnconnectedPort`] for the first required port with no peer.
    /// * [`TopologyError::UnreachableClockDomain`] for a clocked component not driven by
    ///   the system clock domain.
    /// * [`TopologyError::AddressRangeOverlap`] if declared ranges, or the ranges claimed
    ///   behind a crossbar, intersect.
    /// * [`TopologyError::RangeNotDeclared`] if the memory controller serves addresses
    ///   outside the system ranges.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.cpus.is_empty() {
            return Err(TopologyError::NoCores);
        }
        if let Some(port) = self.ports.unconnected_required().into_iter().next() {
            return Err(TopologyError::UnconnectedPort(port));
        }

        for node in self.tree.iter().filter(|n| n.kind.is_clocked()) {
            let domain = self.tree.clock_domain_of(node.id);
            if domain != Some(self.clk_domain.component) {
                return Err(TopologyError::UnreachableClockDomain(node.path.clone()));
            }
        }

        for (i, a) in self.mem_ranges.iter().enumerate() {
            if let Some(b) = self.mem_ranges[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(TopologyError::AddressRangeOverlap {
                    a: format!("system {a}"),
                    b: format!("system {b}"),
                });
            }
        }
        if !self
            .mem_ranges
            .iter()
            .any(|r| self.mem_ctrl.range.is_subset_of(r))
        {
            return Err(TopologyError::RangeNotDeclared {
                owner: self.tree.path(self.mem_ctrl.component),
                range: self.mem_ctrl.range,
            });
        }

        let _ = self.address_map(&self.llcbus)?;
        let _ = self.address_map(&self.membus)?;
        Ok(())
    }

    /// Address map of a crossbar: every range claimed behind each of its mem-side ports.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::AddressRangeOverlap`] if two claims intersect.
    pub fn address_map(&self, xbar: &Crossbar) -> Result<AddrMap, TopologyError> {
        let mut map = AddrMap::new();
        for peer in self.ports.peers(xbar.mem_side_ports()) {
            let owner = self.ports.label(peer.key);
            let mut visiting = vec![xbar.component];
            for range in self.ranges_behind(peer, &mut visiting)? {
                map.insert(range, peer, owner.clone())?;
            }
        }
        Ok(map)
    }

    /// Ranges answered by the response port `endpoint`, following caches and crossbars
    /// downstream.
    fn ranges_behind(
        &self,
        endpoint: PortEndpoint,
        visiting: &mut Vec<ComponentId>,
    ) -> Result<Vec<AddrRange>, TopologyError> {
        let component = endpoint.key.component;
        if visiting.contains(&component) {
            return Ok(Vec::new());
        }
        visiting.push(component);
        let ranges = match endpoint.key.role {
            PortRole::Port if component == self.mem_ctrl.component => vec![self.mem_ctrl.range],
            PortRole::Pio => self
                .interrupts_of(component)
                .map(|ic| ic.pio_range())
                .transpose()?
                .into_iter()
                .collect(),
            PortRole::IntResponder => self
                .interrupts_of(component)
                .map(|ic| ic.int_range())
                .transpose()?
                .into_iter()
                .collect(),
            PortRole::CpuSide => {
                let mut ranges = Vec::new();
                for peer in self.ports.peers(PortKey::new(component, PortRole::MemSide)) {
                    ranges.extend(self.ranges_behind(peer, visiting)?);
                }
                ranges
            }
            PortRole::CpuSidePorts => {
                let mut ranges = Vec::new();
                for peer in self.ports.peers(PortKey::new(component, PortRole::MemSidePorts)) {
                    ranges.extend(self.ranges_behind(peer, visiting)?);
                }
                ranges
            }
            _ => Vec::new(),
        };
        let _ = visiting.pop();
        Ok(ranges)
    }

    fn interrupts_of(&self, component: ComponentId) -> Option<InterruptController> {
        self.cpus
            .iter()
            .filter_map(|cpu| cpu.interrupts)
            .find(|ic| ic.component == component)
    }

    /// Counts of every component class and of the connections.
    pub fn summary(&self) -> TopologySummary {
        TopologySummary {
            cpus: self.tree.count(ComponentKind::Cpu),
            icaches: self
                .tree
                .count(ComponentKind::Cache(CacheLevel::L1Instruction)),
            dcaches: self.tree.count(ComponentKind::Cache(CacheLevel::L1Data)),
            llcs: self.tree.count(ComponentKind::Cache(CacheLevel::LastLevel)),
            crossbars: self.tree.count(ComponentKind::Crossbar),
            interrupt_controllers: self.tree.count(ComponentKind::InterruptController),
            mem_ctrls: self.tree.count(ComponentKind::MemCtrl),
            processes: self.processes.len(),
            connections: self.ports.connections().len(),
        }
    }

    /// Returns `true` if `other` has the same components under the same names, with the
    /// same parameters and connected the same way.
    pub fn isomorphic_to(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.cpus.len() == other.cpus.len()
            && self.cpus.iter().zip(&other.cpus).all(|(a, b)| {
                a.icache.map(|c| c.params) == b.icache.map(|c| c.params)
                    && a.dcache.map(|c| c.params) == b.dcache.map(|c| c.params)
            })
            && self.llc.params == other.llc.params
            && self.llcbus.params == other.llcbus.params
            && self.membus.params == other.membus.params
            && self.mem_ctrl.range == other.mem_ctrl.range
            && self.mem_ctrl.timing == other.mem_ctrl.timing
            && self.mem_ranges == other.mem_ranges
            && self.clk_domain.frequency == other.clk_domain.frequency
            && self
                .processes
                .iter()
                .zip(&other.processes)
                .all(|(a, b)| a.pid == b.pid && a.cmd == b.cmd && a.cpu_id == b.cpu_id)
    }

    /// Id-free description of the graph: node paths and kinds, and connections by label.
    fn shape(&self) -> (BTreeMap<String, ComponentKind>, Vec<(String, String)>) {
        let nodes = self
            .tree
            .iter()
            .map(|n| (n.path.clone(), n.kind))
            .collect();
        let endpoint = |e: PortEndpoint| format!("{}[{}]", self.ports.label(e.key), e.index);
        let mut edges: Vec<_> = self
            .ports
            .connections()
            .iter()
            .map(|c| (endpoint(c.request), endpoint(c.response)))
            .collect();
        edges.sort();
        (nodes, edges)
    }

    /// Ownership tree.
    pub const fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    /// Port registry.
    pub const fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    /// Root container.
    pub const fn root(&self) -> ComponentId {
        self.root
    }

    /// Dotted path of a component.
    pub fn path(&self, id: ComponentId) -> String {
        self.tree.path(id)
    }

    /// The system's functional access port.
    pub const fn system_port(&self) -> PortKey {
        self.system_port
    }

    /// Voltage domain.
    pub const fn voltage_domain(&self) -> &VoltageDomain {
        &self.voltage_domain
    }

    /// Source clock domain shared by every clocked component.
    pub const fn clk_domain(&self) -> &SrcClockDomain {
        &self.clk_domain
    }

    /// Declared memory ranges.
    pub fn mem_ranges(&self) -> &[AddrRange] {
        &self.mem_ranges
    }

    /// Memory access mode.
    pub const fn mem_mode(&self) -> MemMode {
        self.mem_mode
    }

    /// Cpus in id order.
    pub fn cpus(&self) -> &[Cpu] {
        &self.cpus
    }

    /// Crossbar between the L1s and the last-level cache.
    pub const fn llcbus(&self) -> &Crossbar {
        &self.llcbus
    }

    /// Shared last-level cache.
    pub const fn llc(&self) -> &Cache {
        &self.llc
    }

    /// System crossbar.
    pub const fn membus(&self) -> &Crossbar {
        &self.membus
    }

    /// Memory controller.
    pub const fn mem_ctrl(&self) -> &MemCtrl {
        &self.mem_ctrl
    }

    /// The shared workload.
    pub const fn workload(&self) -> &SeWorkload {
        &self.workload
    }

    /// Processes in cpu order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Run control settings carried from the configuration.
    pub const fn general(&self) -> &GeneralConfig {
        &self.general
    }
}
