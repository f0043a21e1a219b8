use std::time::Instant;

use cartfs_client::BusClient;
use cartfs_driver::CartDriver;
use serde::Serialize;

use crate::cmd::ProbeArgs;
use crate::config::Settings;
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{field_table, millis, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct ProbeOutput {
    endpoint: String,
    cartridges: u16,
    requests: u64,
    poweron_ms: f64,
    poweroff_ms: f64,
    total_ms: f64,
}

pub fn run(_args: ProbeArgs, settings: Settings, format: OutputFormat) -> CliResult<i32> {
    let endpoint = settings.client.endpoint.to_string();
    let cartridges = settings.driver.max_cartridges;

    let started = Instant::now();
    let driver = CartDriver::poweron(BusClient::new(settings.client), settings.driver)
        .map_err(|err| driver_error("power on failed", err))?;
    let powered_on = started.elapsed();

    let client = driver
        .poweroff()
        .map_err(|err| driver_error("power off failed", err.into_error()))?;
    let total = started.elapsed();

    let out = ProbeOutput {
        endpoint,
        cartridges,
        requests: client.request_count(),
        poweron_ms: millis(powered_on),
        poweroff_ms: millis(total - powered_on),
        total_ms: millis(total),
    };
    print_probe(&out, format);
    Ok(SUCCESS)
}

fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let table = field_table([
                ("endpoint", out.endpoint.clone()),
                ("cartridges", out.cartridges.to_string()),
                ("requests", out.requests.to_string()),
                ("power on", format!("{:.2}ms", out.poweron_ms)),
                ("power off", format!("{:.2}ms", out.poweroff_ms)),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Controller Probe:");
            println!("  Endpoint:   {}", out.endpoint);
            println!("  Cartridges: {}", out.cartridges);
            println!("  Requests:   {}", out.requests);
            println!("  Power on:   {:.2}ms", out.poweron_ms);
            println!("  Power off:  {:.2}ms", out.poweroff_ms);
        }
    }
}
