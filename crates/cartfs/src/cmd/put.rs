use std::fs;
use std::time::Instant;

use cartfs_client::BusClient;
use cartfs_driver::CartDriver;
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::PutArgs;
use crate::config::Settings;
use crate::exit::{driver_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{field_table, millis, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct PutOutput {
    name: String,
    bytes: usize,
    frames: usize,
    verified: Option<bool>,
    cache_hits: u64,
    cache_misses: u64,
    requests: u64,
    elapsed_ms: f64,
}

pub fn run(args: PutArgs, settings: Settings, format: OutputFormat) -> CliResult<i32> {
    let name = device_name(&args)?;
    let data = fs::read(&args.local)
        .map_err(|err| io_error(&format!("read {}", args.local.display()), err))?;
    let chunk = usize::try_from(args.chunk).unwrap_or(usize::MAX);

    let started = Instant::now();
    let mut driver = CartDriver::poweron(BusClient::new(settings.client), settings.driver)
        .map_err(|err| driver_error("power on failed", err))?;

    let fd = driver
        .open(&name)
        .map_err(|err| driver_error("open failed", err))?;
    for piece in data.chunks(chunk) {
        driver
            .write(fd, piece)
            .map_err(|err| driver_error("write failed", err))?;
        debug!(written = driver.position(fd).unwrap_or(0), total = data.len(), "put progress");
    }

    let verified = if args.verify {
        driver
            .seek(fd, 0)
            .map_err(|err| driver_error("seek failed", err))?;
        let mut back = vec![0u8; data.len()];
        let read = driver
            .read(fd, &mut back)
            .map_err(|err| driver_error("read back failed", err))?;
        Some(read == data.len() && back == data)
    } else {
        None
    };

    let frames = driver
        .files()
        .find(|file| file.handle == fd)
        .map(|file| file.frames.len())
        .unwrap_or(0);
    let stats = driver.cache().stats();
    driver
        .close(fd)
        .map_err(|err| driver_error("close failed", err))?;
    let client = driver
        .poweroff()
        .map_err(|err| driver_error("power off failed", err.into_error()))?;

    let out = PutOutput {
        name,
        bytes: data.len(),
        frames,
        verified,
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        requests: client.request_count(),
        elapsed_ms: millis(started.elapsed()),
    };
    info!(name = %out.name, bytes = out.bytes, frames = out.frames, "put complete");
    print_put(&out, format);

    match verified {
        Some(false) => Err(CliError::new(
            DATA_INVALID,
            format!("read-back of {} does not match {}", out.name, args.local.display()),
        )),
        _ => Ok(SUCCESS),
    }
}

fn device_name(args: &PutArgs) -> CliResult<String> {
    if let Some(name) = &args.name {
        if name.is_empty() {
            return Err(CliError::new(USAGE, "--name must not be empty"));
        }
        return Ok(name.clone());
    }
    args.local
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("cannot derive a file name from {}; pass --name", args.local.display()),
            )
        })
}

fn print_put(out: &PutOutput, format: OutputFormat) {
    let verified = match out.verified {
        Some(true) => "match",
        Some(false) => "MISMATCH",
        None => "skipped",
    };
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let table = field_table([
                ("name", out.name.clone()),
                ("bytes", out.bytes.to_string()),
                ("frames", out.frames.to_string()),
                ("verify", verified.to_string()),
                ("cache hits", out.cache_hits.to_string()),
                ("cache misses", out.cache_misses.to_string()),
                ("requests", out.requests.to_string()),
                ("elapsed", format!("{:.2}ms", out.elapsed_ms)),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}: {} bytes in {} frames, verify {}, {} requests, {:.2}ms",
                out.name, out.bytes, out.frames, verified, out.requests, out.elapsed_ms
            );
        }
    }
}
