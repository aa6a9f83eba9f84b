//! CLI arguments for the procsnap binary.

use clap::{Parser, ValueEnum};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "procsnap",
    about = "Point-in-time process tree and memory metrics (RSS/PSS/USS)",
    long_about = "Point-in-time process tree and memory metrics (RSS/PSS/USS).\n\n\
                  Captures a snapshot of per-process CPU time, memory composition, and \
                  page faults from /proc on Linux (falling back to ps elsewhere, with \
                  vmmap memory detail on Darwin) and renders a summary or JSON export.",
    version = "0.1.0"
)]
pub struct Args {
    /// Report on these process ids
    #[arg(long)]
    pub pid: Vec<u32>,

    /// Report on these parent process ids and all of their descendants
    #[arg(short = 'p', long)]
    pub ppid: Vec<u32>,

    /// Skip detailed memory capture even when the platform supports it
    #[arg(long)]
    pub no_memory: bool,

    /// Scale memory bars to this many MiB (default: host total memory)
    #[arg(long)]
    pub memory_scale: Option<u64>,

    /// Emit the raw capture as JSON instead of the summary view
    #[arg(long)]
    pub json: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}
