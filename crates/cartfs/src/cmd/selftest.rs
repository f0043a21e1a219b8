//! End-to-end driver checks against the in-memory controller.

use cartfs_cache::FrameCache;
use cartfs_client::LoopbackController;
use cartfs_driver::{CartDriver, DriverConfig, DriverError};
use cartfs_proto::FRAME_SIZE;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::SelftestArgs;
use crate::config::Settings;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat};

type Driver = CartDriver<LoopbackController>;
type CheckOutcome = Result<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct SelftestOutput {
    cache_frames: usize,
    checks: Vec<CheckResult>,
    requests: usize,
    overall: &'static str,
}

const DRIVER_CHECKS: [(&str, fn(&mut Driver) -> CheckOutcome); 4] = [
    ("short_roundtrip", short_roundtrip),
    ("frame_boundaries", frame_boundaries),
    ("partial_overwrite", partial_overwrite),
    ("end_of_file", end_of_file),
];

pub fn run(args: SelftestArgs, settings: Settings, format: OutputFormat) -> CliResult<i32> {
    let mut config = settings.driver;
    if let Some(frames) = args.cache_frames {
        config.cache_capacity = usize::try_from(frames).unwrap_or(usize::MAX);
    }

    let output = run_checks(config);
    print_selftest(&output, format);

    if output.overall == "pass" {
        Ok(SUCCESS)
    } else {
        Ok(HEALTH_CHECK_FAILED)
    }
}

fn run_checks(config: DriverConfig) -> SelftestOutput {
    let cache_frames = config.cache_capacity;
    let mut checks = vec![check("cache_unit", cache_unit(cache_frames))];
    let mut requests = 0;

    let controller = LoopbackController::new(config.max_cartridges, config.frames_per_cartridge);
    match CartDriver::poweron(controller, config) {
        Ok(mut driver) => {
            checks.push(check(
                "poweron",
                Ok(format!("{} cartridges zeroed", driver.config().max_cartridges)),
            ));
            for (name, run) in DRIVER_CHECKS {
                checks.push(check(name, run(&mut driver)));
            }
            match driver.poweroff() {
                Ok(controller) => {
                    requests = controller.requests().len();
                    checks.push(check("poweroff", Ok(format!("{requests} requests"))));
                }
                Err(err) => checks.push(check("poweroff", Err(err.error().to_string()))),
            }
        }
        Err(err) => {
            checks.push(check("poweron", Err(err.to_string())));
            for (name, _) in DRIVER_CHECKS {
                checks.push(CheckResult {
                    name,
                    status: CheckStatus::Skip,
                    detail: "device not powered on".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|c| c.status != CheckStatus::Pass);
    SelftestOutput {
        cache_frames,
        checks,
        requests,
        overall: if failed { "fail" } else { "pass" },
    }
}

fn check(name: &'static str, outcome: CheckOutcome) -> CheckResult {
    match outcome {
        Ok(detail) => CheckResult {
            name,
            status: CheckStatus::Pass,
            detail,
        },
        Err(detail) => CheckResult {
            name,
            status: CheckStatus::Fail,
            detail,
        },
    }
}

fn failed(err: DriverError) -> String {
    err.to_string()
}

fn padded(text: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_SIZE];
    frame[..text.len()].copy_from_slice(text);
    frame
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed))
        .collect()
}

/// Insert, read back and overwrite two frames directly in a cache.
fn cache_unit(capacity: usize) -> CheckOutcome {
    let mut cache = FrameCache::new(capacity).map_err(|err| err.to_string())?;
    for (frame, text) in [
        (0, &b"anddddddddddddd"[..]),
        (1, &b"xxxxxxxxxxxxxx"[..]),
        (1, &b"tttttttttttttt"[..]),
    ] {
        cache
            .insert(0, frame, padded(text))
            .map_err(|err| err.to_string())?;
        match cache.lookup(0, frame) {
            Some(block) if block[..text.len()] == *text => {}
            Some(_) => return Err(format!("frame {frame} returned stale content")),
            None => return Err(format!("frame {frame} missing right after insert")),
        }
    }
    Ok(format!("{} of {} slots used", cache.len(), cache.capacity()))
}

fn short_roundtrip(driver: &mut Driver) -> CheckOutcome {
    let fd = driver.open("a").map_err(failed)?;
    let written = driver.write(fd, b"anddddddddddddd").map_err(failed)?;
    driver.seek(fd, 0).map_err(failed)?;
    let mut buf = [0u8; 15];
    let read = driver.read(fd, &mut buf).map_err(failed)?;
    driver.close(fd).map_err(failed)?;

    if written != 15 || read != 15 || &buf != b"anddddddddddddd" {
        return Err(format!("wrote {written}, read {read} bytes"));
    }
    Ok("15 bytes".to_string())
}

fn frame_boundaries(driver: &mut Driver) -> CheckOutcome {
    let cases = [
        (0, FRAME_SIZE - 1),
        (0, FRAME_SIZE),
        (0, FRAME_SIZE + 1),
        (FRAME_SIZE, FRAME_SIZE),
        (FRAME_SIZE / 2, 3 * FRAME_SIZE),
        (FRAME_SIZE - 1, 2),
    ];

    for (i, &(offset, len)) in cases.iter().enumerate() {
        let fd = driver.open(&format!("boundary-{i}")).map_err(failed)?;
        driver.write(fd, &vec![0xA5; offset]).map_err(failed)?;

        let data = pattern(len, i as u8);
        driver.seek(fd, offset).map_err(failed)?;
        driver.write(fd, &data).map_err(failed)?;
        driver.seek(fd, offset).map_err(failed)?;
        let mut back = vec![0u8; len];
        let read = driver.read(fd, &mut back).map_err(failed)?;
        driver.close(fd).map_err(failed)?;

        if read != len || back != data {
            return Err(format!("{len} bytes at offset {offset} did not read back"));
        }
    }
    Ok(format!("{} ranges", cases.len()))
}

fn partial_overwrite(driver: &mut Driver) -> CheckOutcome {
    let fd = driver.open("neighbours").map_err(failed)?;
    let mut expected = pattern(2 * FRAME_SIZE, 99);
    driver.write(fd, &expected).map_err(failed)?;

    driver.seek(fd, FRAME_SIZE - 5).map_err(failed)?;
    driver.write(fd, b"0123456789").map_err(failed)?;
    expected[FRAME_SIZE - 5..FRAME_SIZE + 5].copy_from_slice(b"0123456789");

    driver.seek(fd, 0).map_err(failed)?;
    let mut back = vec![0u8; expected.len()];
    driver.read(fd, &mut back).map_err(failed)?;
    driver.close(fd).map_err(failed)?;

    if back != expected {
        return Err("bytes around the overwrite changed".to_string());
    }
    Ok("neighbouring bytes preserved".to_string())
}

fn end_of_file(driver: &mut Driver) -> CheckOutcome {
    let fd = driver.open("eof").map_err(failed)?;
    driver.write(fd, &pattern(FRAME_SIZE + 10, 1)).map_err(failed)?;

    driver.seek(fd, FRAME_SIZE).map_err(failed)?;
    let mut buf = [0u8; 64];
    let read = driver.read(fd, &mut buf).map_err(failed)?;
    if read != 10 {
        return Err(format!("read {read} bytes at end of file, expected 10"));
    }

    let past_end = driver.seek(fd, FRAME_SIZE + 11);
    driver.close(fd).map_err(failed)?;
    match past_end {
        Err(DriverError::InvalidArgument(_)) => Ok("short read and seek bound".to_string()),
        Err(err) => Err(format!("seek past end: {err}")),
        Ok(()) => Err("seek past end succeeded".to_string()),
    }
}

fn print_selftest(output: &SelftestOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHECK", "STATUS", "DETAIL"]);
            for c in &output.checks {
                table.add_row(vec![
                    c.name.to_string(),
                    status_text(c.status).to_string(),
                    c.detail.clone(),
                ]);
            }
            println!("{table}");
            println!("overall: {}", output.overall);
        }
        OutputFormat::Pretty => {
            println!("cartfs selftest (cache {} frames)\n", output.cache_frames);
            for c in &output.checks {
                println!("  [{:>4}] {:<18} {}", status_text(c.status), c.name, c.detail);
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Skip => "SKIP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_passes() {
        let output = run_checks(DriverConfig::default());
        assert_eq!(output.overall, "pass", "{:?}", output.checks);
        assert_eq!(output.checks.len(), 2 + DRIVER_CHECKS.len() + 1);
        assert!(output.requests > 0);
    }

    #[test]
    fn single_frame_cache_passes() {
        let config = DriverConfig {
            cache_capacity: 1,
            ..DriverConfig::default()
        };
        assert_eq!(run_checks(config).overall, "pass");
    }

    #[test]
    fn zero_cache_fails_and_skips_driver_checks() {
        let config = DriverConfig {
            cache_capacity: 0,
            ..DriverConfig::default()
        };
        let output = run_checks(config);
        assert_eq!(output.overall, "fail");
        assert_eq!(output.checks[0].status, CheckStatus::Fail);
        assert!(output
            .checks
            .iter()
            .skip(2)
            .all(|c| c.status == CheckStatus::Skip));
    }

    #[test]
    fn tiny_device_reports_failure() {
        let config = DriverConfig {
            max_cartridges: 1,
            frames_per_cartridge: 2,
            ..DriverConfig::default()
        };
        let output = run_checks(config);
        assert_eq!(output.overall, "fail");
        assert!(output
            .checks
            .iter()
            .any(|c| c.detail.contains("no free frames")));
    }

    #[test]
    fn output_serializes_status_lowercase() {
        let output = run_checks(DriverConfig::default());
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }
}
