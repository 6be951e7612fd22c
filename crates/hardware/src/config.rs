//! Configuration system for the multi-core system model.
//!
//! This module defines the configuration structures used to parameterize the model. It provides:
//! 1. **Defaults:** Baseline hardware constants (clock, memory range, caches, crossbars, DRAM).
//! 2. **Structures:** Hierarchical config for system, caches, interconnect, memory, and general
//!    run control, deserializable from JSON.
//! 3. **Run record:** `RunOptions` (raw command-line strings) resolved into a validated
//!    `RunConfig`, the sole input of graph construction.
//!
//! Use `Config::default()` for the stock machine or `Config::from_json_file` to override parts of it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::ConfigError;
use crate::common::units::{Frequency, Tick, parse_frequency, parse_memory_size, parse_time};

/// Default configuration constants for the model.
///
/// These values describe the stock machine when not explicitly overridden
/// in a JSON configuration file.
mod defaults {
    /// System clock frequency shared by every component.
    pub const CLOCK: &str = "1GHz";

    /// Supply voltage of the system voltage domain.
    pub const VOLTAGE: &str = "1V";

    /// Size of the single system memory range, starting at `MEM_BASE`.
    pub const MEM_SIZE: &str = "512MB";

    /// Base address of system memory.
    pub const MEM_BASE: u64 = 0;

    /// Cache line size in bytes.
    pub const CACHE_LINE: usize = 64;

    /// L1 instruction cache size.
    pub const L1I_SIZE: &str = "16kB";

    /// L1 data cache size.
    pub const L1D_SIZE: &str = "64kB";

    /// L1 associativity (both caches).
    pub const L1_ASSOC: usize = 2;

    /// L1 tag, data, and response latency in cycles.
    pub const L1_LATENCY: u64 = 2;

    /// L1 miss status holding registers.
    pub const L1_MSHRS: usize = 4;

    /// L1 targets per MSHR.
    pub const L1_TGTS_PER_MSHR: usize = 20;

    /// Last-level cache tag, data, and response latency in cycles.
    pub const LLC_LATENCY: u64 = 20;

    /// Last-level cache MSHRs.
    pub const LLC_MSHRS: usize = 20;

    /// Last-level cache targets per MSHR.
    pub const LLC_TGTS_PER_MSHR: usize = 12;

    /// Width in bytes of the crossbar between the L1s and the last-level cache.
    pub const L2_XBAR_WIDTH: u64 = 32;

    /// Width in bytes of the system crossbar.
    pub const SYSTEM_XBAR_WIDTH: u64 = 16;

    /// DDR3-1600 CAS latency.
    pub const T_CL: &str = "13.75ns";

    /// DDR3-1600 RAS-to-CAS delay.
    pub const T_RCD: &str = "13.75ns";

    /// DDR3-1600 row precharge time.
    pub const T_RP: &str = "13.75ns";

    /// DDR3-1600 burst time for one 64-byte packet.
    pub const T_BURST: &str = "5ns";

    /// DDR3 8x8 row buffer size in bytes.
    pub const ROW_BUFFER: u64 = 1024;

    /// Fixed latency of the simple memory controller.
    pub const SIMPLE_LATENCY: &str = "30ns";

    /// Default number of cores of a run.
    pub const CORES: &str = "4";

    /// Default last-level cache size of a run.
    pub const LLC_SIZE: &str = "256kB";

    /// Default last-level cache associativity of a run.
    pub const LLC_ASSOC: &str = "8";

    /// Default workload, relative to the working directory.
    pub const BINARY: &str = "tests/test-progs/hello/bin/x86/linux/hello";
}

/// Memory controller implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryControllerKind {
    /// DRAM controller with row buffer modeling (DDR3-1600 8x8 timings by default).
    #[default]
    #[serde(alias = "DRAM")]
    Dram,
    /// Fixed-latency controller.
    Simple,
}

/// Cache replacement policy used by the engine's tag stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Least Recently Used.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// First In First Out (round robin per set).
    #[serde(alias = "Fifo")]
    Fifo,
}

/// Memory access mode of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemMode {
    /// Requests travel through the hierarchy with per-hop latencies.
    #[default]
    Timing,
    /// Requests complete with a latency estimate and no queuing.
    Atomic,
}

/// Root hardware configuration.
///
/// # Examples
///
/// ```
/// use mcsim_core::config::{Config, MemoryControllerKind};
///
/// let json = r#"{
///     "system": { "clock": "2GHz" },
///     "memory": { "controller": "Simple" }
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.system.clock, "2GHz");
/// assert_eq!(config.memory.controller, MemoryControllerKind::Simple);
/// assert_eq!(config.cache.l1_d.size, "64kB");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clock, voltage and memory map
    pub system: SystemConfig,
    /// Cache parameters
    pub cache: CacheHierarchyConfig,
    /// Crossbar parameters
    pub interconnect: InterconnectConfig,
    /// Memory controller parameters
    pub memory: MemoryConfig,
    /// Run control
    pub general: GeneralConfig,
}

impl Config {
    /// Parses a JSON document; absent sections and fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigFile`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is malformed.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// Clock domain and memory map.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// System clock frequency
    #[serde(default = "SystemConfig::default_clock")]
    pub clock: String,

    /// Voltage of the system voltage domain
    #[serde(default = "SystemConfig::default_voltage")]
    pub voltage: String,

    /// Size of the system memory range
    #[serde(default = "SystemConfig::default_mem_size")]
    pub mem_size: String,

    /// Base address of the system memory range
    #[serde(default = "SystemConfig::default_mem_base")]
    pub mem_base: u64,

    /// Memory access mode
    #[serde(default)]
    pub mem_mode: MemMode,
}

impl SystemConfig {
    fn default_clock() -> String {
        defaults::CLOCK.to_string()
    }

    fn default_voltage() -> String {
        defaults::VOLTAGE.to_string()
    }

    fn default_mem_size() -> String {
        defaults::MEM_SIZE.to_string()
    }

    const fn default_mem_base() -> u64 {
        defaults::MEM_BASE
    }

    /// Parsed system clock frequency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFrequency`] if `clock` is malformed.
    pub fn frequency(&self) -> Result<Frequency, ConfigError> {
        parse_frequency(&self.clock)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            clock: Self::default_clock(),
            voltage: Self::default_voltage(),
            mem_size: Self::default_mem_size(),
            mem_base: defaults::MEM_BASE,
            mem_mode: MemMode::default(),
        }
    }
}

/// Parameters of the three cache types.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// Private L1 instruction cache
    #[serde(default = "CacheConfig::l1_i")]
    pub l1_i: CacheConfig,
    /// Private L1 data cache
    #[serde(default = "CacheConfig::l1_d")]
    pub l1_d: CacheConfig,
    /// Shared last-level cache; its size and associativity come from the run record
    #[serde(default = "CacheConfig::llc")]
    pub llc: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::l1_i(),
            l1_d: CacheConfig::l1_d(),
            llc: CacheConfig::llc(),
        }
    }
}

/// Individual cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total capacity
    #[serde(default = "CacheConfig::default_size")]
    pub size: String,

    /// Associativity (number of ways)
    #[serde(default = "CacheConfig::default_assoc")]
    pub assoc: usize,

    /// Line size in bytes
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Tag lookup latency in cycles
    #[serde(default = "CacheConfig::default_latency")]
    pub tag_latency: u64,

    /// Data array latency in cycles
    #[serde(default = "CacheConfig::default_latency")]
    pub data_latency: u64,

    /// Response latency in cycles
    #[serde(default = "CacheConfig::default_latency")]
    pub response_latency: u64,

    /// Miss status holding registers
    #[serde(default = "CacheConfig::default_mshrs")]
    pub mshrs: usize,

    /// Targets per MSHR
    #[serde(default = "CacheConfig::default_tgts")]
    pub tgts_per_mshr: usize,

    /// Replacement policy
    #[serde(default)]
    pub policy: ReplacementPolicy,
}

impl CacheConfig {
    fn default_size() -> String {
        defaults::L1I_SIZE.to_string()
    }

    const fn default_assoc() -> usize {
        defaults::L1_ASSOC
    }

    const fn default_line() -> usize {
        defaults::CACHE_LINE
    }

    const fn default_latency() -> u64 {
        defaults::L1_LATENCY
    }

    const fn default_mshrs() -> usize {
        defaults::L1_MSHRS
    }

    const fn default_tgts() -> usize {
        defaults::L1_TGTS_PER_MSHR
    }

    /// Stock L1 instruction cache: 16kB, 2-way, 2-cycle latencies.
    pub fn l1_i() -> Self {
        Self {
            size: defaults::L1I_SIZE.to_string(),
            assoc: defaults::L1_ASSOC,
            line_bytes: defaults::CACHE_LINE,
            tag_latency: defaults::L1_LATENCY,
            data_latency: defaults::L1_LATENCY,
            response_latency: defaults::L1_LATENCY,
            mshrs: defaults::L1_MSHRS,
            tgts_per_mshr: defaults::L1_TGTS_PER_MSHR,
            policy: ReplacementPolicy::Lru,
        }
    }

    /// Stock L1 data cache: 64kB, 2-way, 2-cycle latencies.
    pub fn l1_d() -> Self {
        Self {
            size: defaults::L1D_SIZE.to_string(),
            ..Self::l1_i()
        }
    }

    /// Stock last-level cache timing: 20-cycle latencies, 20 MSHRs.
    pub fn llc() -> Self {
        Self {
            size: defaults::LLC_SIZE.to_string(),
            assoc: 8,
            line_bytes: defaults::CACHE_LINE,
            tag_latency: defaults::LLC_LATENCY,
            data_latency: defaults::LLC_LATENCY,
            response_latency: defaults::LLC_LATENCY,
            mshrs: defaults::LLC_MSHRS,
            tgts_per_mshr: defaults::LLC_TGTS_PER_MSHR,
            policy: ReplacementPolicy::Lru,
        }
    }

    /// Validates size, associativity and line size together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSize`] if `size` does not parse and
    /// [`ConfigError::InvalidCacheGeometry`] if the three values do not form
    /// a power-of-two number of sets.
    pub fn geometry(&self, name: &str) -> Result<CacheGeometry, ConfigError> {
        let size_bytes = parse_memory_size(&self.size)?;
        CacheGeometry::new(name, size_bytes, self.assoc, self.line_bytes)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::l1_i()
    }
}

/// Validated cache dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheGeometry {
    /// Capacity in bytes.
    pub size_bytes: u64,
    /// Number of ways.
    pub assoc: usize,
    /// Line size in bytes.
    pub line_bytes: usize,
    /// Number of sets (power of two).
    pub num_sets: usize,
}

impl CacheGeometry {
    /// Checks that `size_bytes / (assoc * line_bytes)` is a whole power of two.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCacheGeometry`] naming `cache` otherwise.
    pub fn new(
        cache: &str,
        size_bytes: u64,
        assoc: usize,
        line_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidCacheGeometry {
            cache: cache.to_string(),
            reason: reason.to_string(),
        };
        if size_bytes == 0 {
            return Err(invalid("size must be non-zero"));
        }
        if assoc == 0 {
            return Err(invalid("associativity must be at least 1"));
        }
        if line_bytes == 0 || !line_bytes.is_power_of_two() {
            return Err(invalid("line size must be a power of two"));
        }
        let set_bytes = (assoc as u64) * (line_bytes as u64);
        if size_bytes % set_bytes != 0 {
            return Err(invalid("size is not a multiple of associativity x line size"));
        }
        let num_sets = usize::try_from(size_bytes / set_bytes)
            .map_err(|_| invalid("too many sets"))?;
        if !num_sets.is_power_of_two() {
            return Err(invalid("number of sets must be a power of two"));
        }
        Ok(Self {
            size_bytes,
            assoc,
            line_bytes,
            num_sets,
        })
    }
}

/// Crossbar parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct XBarConfig {
    /// Data path width in bytes
    pub width: u64,
    /// Cycles to accept a request
    pub frontend_latency: u64,
    /// Cycles to forward a request downstream
    pub forward_latency: u64,
    /// Cycles to return a response
    pub response_latency: u64,
}

impl XBarConfig {
    /// Crossbar between the L1s and the last-level cache.
    pub const fn l2_xbar() -> Self {
        Self {
            width: defaults::L2_XBAR_WIDTH,
            frontend_latency: 1,
            forward_latency: 0,
            response_latency: 1,
        }
    }

    /// System-wide crossbar in front of memory.
    pub const fn system_xbar() -> Self {
        Self {
            width: defaults::SYSTEM_XBAR_WIDTH,
            frontend_latency: 3,
            forward_latency: 4,
            response_latency: 2,
        }
    }
}

/// Parameters of both crossbars.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InterconnectConfig {
    /// Lower crossbar (L1s to LLC)
    #[serde(default = "XBarConfig::l2_xbar")]
    pub l2_xbar: XBarConfig,
    /// Upper crossbar (LLC, interrupts and system port to memory)
    #[serde(default = "XBarConfig::system_xbar")]
    pub system_xbar: XBarConfig,
}

impl Default for InterconnectConfig {
    fn default() -> Self {
        Self {
            l2_xbar: XBarConfig::l2_xbar(),
            system_xbar: XBarConfig::system_xbar(),
        }
    }
}

/// Memory controller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory controller type
    #[serde(default)]
    pub controller: MemoryControllerKind,

    /// CAS latency
    #[serde(default = "MemoryConfig::default_t_cl")]
    pub t_cl: String,

    /// RAS-to-CAS delay
    #[serde(default = "MemoryConfig::default_t_rcd")]
    pub t_rcd: String,

    /// Row precharge time
    #[serde(default = "MemoryConfig::default_t_rp")]
    pub t_rp: String,

    /// Burst time per packet
    #[serde(default = "MemoryConfig::default_t_burst")]
    pub t_burst: String,

    /// Row buffer size in bytes
    #[serde(default = "MemoryConfig::default_row_buffer")]
    pub row_buffer_bytes: u64,

    /// Latency of the simple controller
    #[serde(default = "MemoryConfig::default_simple_latency")]
    pub simple_latency: String,
}

impl MemoryConfig {
    fn default_t_cl() -> String {
        defaults::T_CL.to_string()
    }

    fn default_t_rcd() -> String {
        defaults::T_RCD.to_string()
    }

    fn default_t_rp() -> String {
        defaults::T_RP.to_string()
    }

    fn default_t_burst() -> String {
        defaults::T_BURST.to_string()
    }

    const fn default_row_buffer() -> u64 {
        defaults::ROW_BUFFER
    }

    fn default_simple_latency() -> String {
        defaults::SIMPLE_LATENCY.to_string()
    }

    /// DRAM timings converted to ticks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTime`] for a malformed timing string and
    /// [`ConfigError::InvalidSize`] for a row buffer that is not a power of two.
    pub fn dram_timing(&self) -> Result<DramTiming, ConfigError> {
        if !self.row_buffer_bytes.is_power_of_two() {
            return Err(ConfigError::InvalidSize {
                value: self.row_buffer_bytes.to_string(),
                reason: "row buffer size must be a power of two".to_string(),
            });
        }
        Ok(DramTiming {
            t_cl: parse_time(&self.t_cl)?,
            t_rcd: parse_time(&self.t_rcd)?,
            t_rp: parse_time(&self.t_rp)?,
            t_burst: parse_time(&self.t_burst)?,
            row_buffer_bytes: self.row_buffer_bytes,
        })
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            controller: MemoryControllerKind::default(),
            t_cl: Self::default_t_cl(),
            t_rcd: Self::default_t_rcd(),
            t_rp: Self::default_t_rp(),
            t_burst: Self::default_t_burst(),
            row_buffer_bytes: defaults::ROW_BUFFER,
            simple_latency: Self::default_simple_latency(),
        }
    }
}

/// DRAM timings in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramTiming {
    /// CAS latency.
    pub t_cl: Tick,
    /// RAS-to-CAS delay.
    pub t_rcd: Tick,
    /// Row precharge time.
    pub t_rp: Tick,
    /// Burst time per packet.
    pub t_burst: Tick,
    /// Row buffer size in bytes.
    pub row_buffer_bytes: u64,
}

/// Run control.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Stop the simulation at this tick if the workloads are still running
    #[serde(default)]
    pub max_tick: Option<Tick>,

    /// Cap on trace instructions replayed per core
    #[serde(default)]
    pub max_insts_per_core: Option<u64>,
}

/// The raw, unvalidated run parameters as they arrive from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of cores.
    pub num_cores: String,
    /// Last-level cache capacity.
    pub llc_size: String,
    /// Last-level cache associativity.
    pub llc_assoc: String,
    /// Workload executable.
    pub binary: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            num_cores: defaults::CORES.to_string(),
            llc_size: defaults::LLC_SIZE.to_string(),
            llc_assoc: defaults::LLC_ASSOC.to_string(),
            binary: PathBuf::from(defaults::BINARY),
        }
    }
}

/// The resolved configuration record consumed by graph construction.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of processing elements (at least 1).
    pub core_count: usize,
    /// Last-level cache capacity string, as given.
    pub llc_size: String,
    /// Last-level cache associativity.
    pub llc_assoc: usize,
    /// Validated last-level cache dimensions.
    pub llc_geometry: CacheGeometry,
    /// Workload executable, run by every core as its own process.
    pub binary: PathBuf,
    /// Hardware parameters of every other component.
    pub hardware: Config,
}

impl RunConfig {
    /// Validates raw options against a hardware configuration.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::InvalidCoreCount`] / [`ConfigError::NonPositiveCoreCount`] for a bad core count.
    /// * [`ConfigError::InvalidSize`] / [`ConfigError::InvalidAssociativity`] /
    ///   [`ConfigError::InvalidCacheGeometry`] for an unusable last-level cache.
    /// * [`ConfigError::MissingBinary`] if the workload does not exist.
    /// * Any parse error of the hardware configuration's own sizes, clocks and timings.
    pub fn resolve(options: &RunOptions, hardware: Config) -> Result<Self, ConfigError> {
        let raw_cores = options.num_cores.trim();
        let cores: i64 = raw_cores
            .parse()
            .map_err(|_| ConfigError::InvalidCoreCount(raw_cores.to_string()))?;
        if cores < 1 {
            return Err(ConfigError::NonPositiveCoreCount(cores));
        }
        let core_count =
            usize::try_from(cores).map_err(|_| ConfigError::InvalidCoreCount(raw_cores.into()))?;

        let llc_size_bytes = parse_memory_size(&options.llc_size)?;
        let raw_assoc = options.llc_assoc.trim();
        let llc_assoc: usize = raw_assoc
            .parse()
            .map_err(|_| ConfigError::InvalidAssociativity {
                value: raw_assoc.to_string(),
                reason: "not a positive integer".to_string(),
            })?;
        if llc_assoc == 0 {
            return Err(ConfigError::InvalidAssociativity {
                value: raw_assoc.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let llc_geometry = CacheGeometry::new(
            "llc",
            llc_size_bytes,
            llc_assoc,
            hardware.cache.llc.line_bytes,
        )?;

        Self::check_hardware(&hardware)?;

        if !options.binary.is_file() {
            return Err(ConfigError::MissingBinary(options.binary.clone()));
        }

        Ok(Self {
            core_count,
            llc_size: options.llc_size.trim().to_string(),
            llc_assoc,
            llc_geometry,
            binary: options.binary.clone(),
            hardware,
        })
    }

    /// Parses every quantity of the hardware configuration once so that graph
    /// construction only ever sees well-formed values.
    fn check_hardware(hardware: &Config) -> Result<(), ConfigError> {
        let _ = hardware.system.frequency()?;
        let _ = crate::common::units::parse_voltage(&hardware.system.voltage)?;
        let mem_size = parse_memory_size(&hardware.system.mem_size)?;
        if mem_size == 0 {
            return Err(ConfigError::InvalidSize {
                value: hardware.system.mem_size.clone(),
                reason: "memory size must be non-zero".to_string(),
            });
        }
        let _ = hardware.cache.l1_i.geometry("l1_i")?;
        let _ = hardware.cache.l1_d.geometry("l1_d")?;
        let _ = hardware.memory.dram_timing()?;
        let _ = parse_time(&hardware.memory.simple_latency)?;
        Ok(())
    }
}
