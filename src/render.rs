//! Terminal rendering for the summary view.
//!
//! Consumes captured records read-only; all numeric fields stay raw in the
//! library and formatting happens only here.

use std::collections::BTreeMap;

use crate::general::{General, ProcessMap};
use crate::host::HostMemoryReader;

/// Eighth-block glyphs for sub-character bar resolution.
const BLOCKS: [&str; 9] = [" ", "\u{258f}", "\u{258e}", "\u{258d}", "\u{258c}", "\u{258b}", "\u{258a}", "\u{2589}", "\u{2588}"];

const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

const DEFAULT_MEMORY_SCALE: u64 = 512 * 1024 * 1024;

/// Color band for a percentage value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn of(percent: f64) -> Self {
        if percent > 80.0 {
            Intensity::High
        } else if percent > 50.0 {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }

    fn color(self) -> &'static str {
        match self {
            Intensity::Low => "\x1b[32m",
            Intensity::Medium => "\x1b[33m",
            Intensity::High => "\x1b[31m",
        }
    }
}

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const KEY: &str = "\x1b[36m";

/// Formats a 0..=1 fill level as a fixed-width bar.
pub fn bar(value: f64, width: usize) -> String {
    let value = value.clamp(0.0, 1.0);
    let blocks = width as f64 * value;
    let full_blocks = blocks.floor() as usize;
    let partial_block = ((blocks - blocks.floor()) * (BLOCKS.len() - 1) as f64).floor() as usize;

    let mut output = BLOCKS[BLOCKS.len() - 1].repeat(full_blocks);
    if partial_block > 0 && full_blocks < width {
        output.push_str(BLOCKS[partial_block]);
    }
    while output.chars().count() < width {
        output.push(' ');
    }
    output
}

/// Formats bytes with KiB/MiB/GiB switching at 1024 thresholds.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;

    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}

fn print_gauge(label: &str, percent: f64, detail: &str) {
    let intensity = Intensity::of(percent);
    println!(
        "{KEY}{:>20}{RESET} {}{:>7}{} [{}{}{}]",
        label,
        intensity.color(),
        detail,
        RESET,
        intensity.color(),
        bar(percent / 100.0, 60),
        RESET,
    );
}

fn print_memory(label: &str, size: u64, scale: u64) {
    let percent = if scale > 0 {
        size as f64 / scale as f64 * 100.0
    } else {
        0.0
    };
    print_gauge(label, percent, &format_size(size));
}

fn print_process(general: &General, scale: u64) -> (u64, bool) {
    println!(
        "{BOLD}{}{RESET} {}",
        general.process_id, general.command
    );

    print_gauge(
        "Processor Usage:",
        general.processor_utilization,
        &format!("{:.1}%", general.processor_utilization),
    );

    if let Some(memory) = &general.memory {
        print_memory("Memory (PSS):", memory.proportional_size, scale);
        print_memory("Private (USS):", memory.unique_size(), scale);
        (memory.proportional_size, true)
    } else {
        print_memory("Memory (RSS):", general.resident_size, scale);
        (general.resident_size, false)
    }
}

/// Prints the per-process summary followed by an aggregate total.
/// `memory_scale` overrides the bar scale in bytes; the default is the host
/// total memory when readable, else 512 MiB.
pub fn print_summary(processes: &ProcessMap, memory_scale: Option<u64>) {
    let scale = memory_scale
        .or_else(|| HostMemoryReader::new().capture().map(|memory| memory.total_size))
        .unwrap_or(DEFAULT_MEMORY_SCALE);

    // Sorted by pid for stable display; the capture map itself is unordered.
    let ordered: BTreeMap<u32, &General> = processes
        .iter()
        .map(|(pid, general)| (*pid, general))
        .collect();

    let mut memory_usage = 0;
    let mut proportional = true;

    for general in ordered.values() {
        let (usage, exact) = print_process(general, scale);
        memory_usage += usage;
        proportional &= exact;
    }

    println!("{BOLD}Summary{RESET}");
    let label = if proportional {
        "Memory (PSS):"
    } else {
        "Memory (RSS):"
    };
    print_memory(label, memory_usage, scale);
}
