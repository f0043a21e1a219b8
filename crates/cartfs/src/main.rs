mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use cartfs_transport::Endpoint;
use clap::Parser;

use crate::cmd::Command;
use crate::config::Settings;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cartfs", version, about = "Cartridge storage driver CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// JSON settings file with `client` and `driver` sections.
    #[arg(long, value_name = "FILE", env = "CARTFS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Controller address (`host:port`, `tcp://host:port` or `unix://path`).
    #[arg(long, value_name = "HOST:PORT", env = "CARTFS_ADDR", global = true)]
    addr: Option<Endpoint>,

    /// Controller Unix socket path.
    #[arg(long, value_name = "PATH", conflicts_with = "addr", global = true)]
    unix: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn endpoint(&self) -> exit::CliResult<Option<Endpoint>> {
        match &self.unix {
            #[cfg(unix)]
            Some(path) => Ok(Some(Endpoint::Unix(path.clone()))),
            #[cfg(not(unix))]
            Some(_) => Err(exit::CliError::new(
                exit::USAGE,
                "--unix is not supported on this platform",
            )),
            None => Ok(self.addr.clone()),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = load_settings(&cli).and_then(|settings| cmd::run(cli.command, settings, format));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn load_settings(cli: &Cli) -> exit::CliResult<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.override_endpoint(cli.endpoint()?);
    Ok(settings)
}
