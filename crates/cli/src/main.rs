//! Multi-core system model CLI.
//!
//! This binary resolves a run configuration and drives one simulation. It performs:
//! 1. **Configuration:** Positional `binary`, `llc_size`, `llc_assoc` and `num_cores`
//!    (each with a default), optional JSON hardware overrides and a tick limit.
//! 2. **Construction:** Builds the system graph; configuration and topology errors end
//!    the process with status 1 before any simulated time passes.
//! 3. **Run:** Instantiates, simulates and prints the exit tick and cause.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use mcsim_core::common::Tick;
use mcsim_core::config::{Config, RunConfig, RunOptions};
use mcsim_core::{SimError, Simulation, System};

#[derive(Parser, Debug)]
#[command(
    name = "mcsim",
    author,
    version,
    about = "Multi-core system model with a shared last-level cache",
    long_about = "Builds N cores with private L1 caches, a shared last-level cache, two crossbars \
                  and a DRAM controller, runs the binary on every core as its own process and \
                  reports the exit tick.\n\nExamples:\n  mcsim\n  mcsim bin/hello 512kB 16 8\n  \
                  mcsim bin/hello --config hw.json --max-tick 1000000000"
)]
struct Cli {
    /// Workload binary, run by every core.
    binary: Option<PathBuf>,

    /// Last-level cache size (e.g. 256kB).
    llc_size: Option<String>,

    /// Last-level cache associativity.
    llc_assoc: Option<String>,

    /// Number of cores.
    num_cores: Option<String>,

    /// JSON file overriding hardware parameters.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks (1 tick = 1 ps).
    #[arg(long)]
    max_tick: Option<Tick>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Raw run options, falling back to the defaults for anything not given.
    fn run_options(&self) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            num_cores: self.num_cores.clone().unwrap_or(defaults.num_cores),
            llc_size: self.llc_size.clone().unwrap_or(defaults.llc_size),
            llc_assoc: self.llc_assoc.clone().unwrap_or(defaults.llc_assoc),
            binary: self.binary.clone().unwrap_or(defaults.binary),
        }
    }

    /// Hardware configuration with command-line overrides applied.
    fn hardware(&self) -> Result<Config, SimError> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if self.max_tick.is_some() {
            config.general.max_tick = self.max_tick;
        }
        Ok(config)
    }

    const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds, instantiates and runs one simulation, printing the summary to stdout.
fn run(cli: &Cli) -> Result<(), SimError> {
    let run = RunConfig::resolve(&cli.run_options(), cli.hardware()?)?;
    let system = System::build(&run)?;
    let mut sim = Simulation::new(system);
    sim.instantiate()?;

    println!("Beginning simulation!");
    let exit = sim.simulate()?;
    println!("{exit}");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
