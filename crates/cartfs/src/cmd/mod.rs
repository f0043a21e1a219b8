use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod probe;
pub mod put;
pub mod selftest;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Power the controller on and off and report timing.
    Probe(ProbeArgs),
    /// Copy a local file onto the device.
    Put(PutArgs),
    /// Exercise the driver against the in-memory controller.
    Selftest(SelftestArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, settings: Settings, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, settings, format),
        Command::Put(args) => put::run(args, settings, format),
        Command::Selftest(args) => selftest::run(args, settings, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to copy.
    pub local: PathBuf,
    /// Device file name. Default: the local file name.
    #[arg(long)]
    pub name: Option<String>,
    /// Read the file back and compare before powering off.
    #[arg(long)]
    pub verify: bool,
    /// Bytes handed to each driver write.
    #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk: u64,
}

#[derive(Args, Debug)]
pub struct SelftestArgs {
    /// Cache capacity in frames for the run.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_frames: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
