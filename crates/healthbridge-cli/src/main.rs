mod config;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use healthbridge_core::decoder::{ReferenceDecoderFactory, ReferenceFrame};
use healthbridge_core::{CaptureRecord, HealthBridge, ReplayReport};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::BridgeConfig;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("HEALTHBRIDGE_BUILD_COMMIT"),
    " ",
    env!("HEALTHBRIDGE_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  healthbridge simulate --devices 3 --frames 20 -o capture.jsonl\n  healthbridge replay capture.jsonl -o report.json\n  echo '{\"method\":\"getStatus\"}' | healthbridge serve";

#[derive(Parser, Debug)]
#[command(name = "healthbridge")]
#[command(version = VERSION)]
#[command(
    about = "Per-device decoder sessions for wearable telemetry frames.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Config file (defaults to ./healthbridge.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON-lines capture through the bridge and write a JSON report.
    #[command(after_help = "Examples:\n  healthbridge replay capture.jsonl -o report.json\n  healthbridge replay 'captures/*.jsonl' --stdout --pretty")]
    Replay {
        /// Path (or glob pattern) of a .jsonl capture
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if any frame was rejected, failed or
        /// decoded to a non-success status
        #[arg(long)]
        strict: bool,

        /// Decoder type for devices created without one
        #[arg(long = "type", value_name = "N")]
        mode: Option<i32>,
    },
    /// Write a synthetic capture of reference frames.
    Simulate {
        #[command(flatten)]
        output: OutputArgs,

        /// Number of devices
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
        devices: u32,

        /// Frames per device
        #[arg(long, default_value_t = 10)]
        frames: u32,

        /// Corrupt the checksum of every K-th frame of each device
        #[arg(long, value_name = "K", value_parser = clap::value_parser!(u32).range(1..))]
        corrupt_every: Option<u32>,

        /// Decoder type recorded on each device's first frame
        #[arg(long = "type", value_name = "N")]
        mode: Option<i32>,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Answer method calls read from stdin, one JSON object per line.
    Serve {
        /// Default decoder type
        #[arg(long = "type", value_name = "N")]
        mode: Option<i32>,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output path
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write to stdout instead of a file
    #[arg(long, conflicts_with = "report")]
    stdout: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = BridgeConfig::load(cli.config.as_deref())
        .map_err(|err| {
            CliError::new(
                err.to_string(),
                Some("fix the config file or the HEALTHBRIDGE_* variables".to_string()),
            )
        })
        .and_then(|config| run(cli.command, config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands, config: BridgeConfig) -> Result<(), CliError> {
    match command {
        Commands::Replay {
            input,
            output,
            pretty,
            compact,
            quiet,
            strict,
            mode,
        } => {
            init_tracing(&config, quiet);
            let mode = mode.unwrap_or(config.default_type);
            cmd_replay(input, output, pretty, compact, quiet, strict, mode)
        }
        Commands::Simulate {
            output,
            devices,
            frames,
            corrupt_every,
            mode,
            quiet,
        } => {
            init_tracing(&config, quiet);
            cmd_simulate(output, devices, frames, corrupt_every, mode, quiet)
        }
        Commands::Serve { mode } => {
            init_tracing(&config, false);
            cmd_serve(mode.unwrap_or(config.default_type))
        }
    }
}

/// Logs go to stderr; stdout carries reports and replies only.
fn init_tracing(config: &BridgeConfig, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_replay(
    input: PathBuf,
    output: OutputArgs,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    mode: i32,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report = output_target(output)?;
    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let bridge = HealthBridge::with_default_type(ReferenceDecoderFactory, mode);
    let rep = healthbridge_core::replay_capture_file(&resolved_input, &bridge)
        .context("capture replay failed")?;
    let json = serialize_report(&rep, pretty, compact)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            write_output(&report, &json)?;
            if !quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if strict && rep.has_issues() {
        return Err(CliError::new(
            "frame issues detected",
            Some("inspect the devices section of the report".to_string()),
        ));
    }
    Ok(())
}

fn cmd_simulate(
    output: OutputArgs,
    devices: u32,
    frames: u32,
    corrupt_every: Option<u32>,
    mode: Option<i32>,
    quiet: bool,
) -> Result<(), CliError> {
    let target = output_target(output)?;
    let capture = simulate_capture(devices, frames, corrupt_every, mode)?;
    info!(devices, frames, "simulated capture");

    match target {
        None => print!("{}", capture),
        Some(path) => {
            write_output(&path, &capture)?;
            if !quiet {
                eprintln!("OK: capture written -> {}", path.display());
            }
        }
    }
    Ok(())
}

/// Frames are interleaved across devices, the way several bands stream at
/// once. Values are deterministic so captures can be diffed.
fn simulate_capture(
    devices: u32,
    frames: u32,
    corrupt_every: Option<u32>,
    mode: Option<i32>,
) -> Result<String, CliError> {
    let mut capture = String::new();
    for index in 0..frames {
        for device in 0..devices {
            let device_id = format!("band-{}", device + 1);
            let mut bytes = simulated_frame(device, index).encode();
            if corrupt_every.is_some_and(|k| (index + 1) % k == 0) {
                if let Some(last) = bytes.last_mut() {
                    *last = last.wrapping_add(1);
                }
            }
            let record_mode = if index == 0 { mode } else { None };
            let line = CaptureRecord::new(&device_id, &bytes, record_mode)
                .to_line()
                .context("JSON serialization failed")?;
            capture.push_str(&line);
            capture.push('\n');
        }
    }
    Ok(capture)
}

fn simulated_frame(device: u32, index: u32) -> ReferenceFrame {
    let phase = device.wrapping_mul(3).wrapping_add(index.wrapping_mul(7)) as u8;
    ReferenceFrame {
        timestamp: 1_000 + index,
        is_wearing: index % 17 != 16,
        pose: (device % 4) as u8,
        heart_rate: 60 + phase % 40,
        breath_rate: 12 + ((device + index) % 8) as u8,
        temperature: 36.0 + f64::from(index % 10) / 10.0,
        humidity: 40 + (device % 20) as u8,
        power: 100 - (index % 100) as u8,
        gyro: [(phase % 5) as i8 - 2, 0, 1],
        step_delta: (index % 3) as u8,
        samples: (0..8).map(|i| phase.wrapping_add(i * 16)).collect(),
    }
}

fn cmd_serve(mode: i32) -> Result<(), CliError> {
    let bridge = HealthBridge::with_default_type(ReferenceDecoderFactory, mode);
    info!(mode, "serving method calls on stdin");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut calls = 0u64;
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        calls += 1;
        let reply = serde_json::to_string(&bridge.handle_json(&line))
            .context("JSON serialization failed")?;
        writeln!(stdout, "{}", reply).context("Failed to write reply")?;
        stdout.flush().context("Failed to write reply")?;
    }

    let disposed = bridge.registry().dispose_all();
    info!(calls, disposed, "stdin closed");
    Ok(())
}

fn output_target(output: OutputArgs) -> Result<Option<PathBuf>, CliError> {
    if output.stdout {
        return Ok(None);
    }
    output.report.map(Some).ok_or_else(|| {
        CliError::new(
            "missing output path",
            Some("use -o/--report or --stdout".to_string()),
        )
    })
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_dir = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    if let Some(report_dir) = report_dir {
        let report_target = report_dir.join(
            report_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
        );
        if report_target == input_abs {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    Ok(())
}

fn serialize_report(rep: &ReplayReport, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .jsonl capture (see `healthbridge simulate`)".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .jsonl capture file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "jsonl" && ext != "ndjson" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .jsonl or .ndjson capture".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .jsonl".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
