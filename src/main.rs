//! procsnap - point-in-time process tree and memory metrics.
//!
//! The binary captures one snapshot and renders it as a terminal summary or
//! JSON export.

use anyhow::{bail, Context};
use clap::Parser;
use tracing::Level;

use procsnap::cli::{Args, LogLevel};
use procsnap::render::print_summary;
use procsnap::{capture, CaptureOptions};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off | LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    if !procsnap::supported() {
        bail!("no supported process enumeration backend: need a readable /proc or ps on PATH");
    }

    let mut options = CaptureOptions::new();
    options.pid = args.pid.clone();
    options.ppid = args.ppid.clone();
    if args.no_memory {
        options.memory = Some(false);
    }

    let processes = capture(&options).context("capture failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&processes).context("failed to serialize capture")?
        );
    } else {
        let memory_scale = args.memory_scale.map(|mib| mib * 1024 * 1024);
        print_summary(&processes, memory_scale);
    }

    Ok(())
}
