//! Memory parsing from `/proc/<pid>/smaps`, `smaps_rollup`, and `stat`.
//!
//! `smaps_rollup` (Linux >= 4.14) is a single pre-aggregated record and is
//! preferred; without it every region of the full `smaps` table is summed.
//! Values in both files are kibibytes. Page fault counters come from the
//! `stat` line.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::memory::{Memory, MemoryBackend};
use crate::stat::parse_stat;

/// Memory backend reading the /proc pseudo-filesystem.
#[derive(Debug, Clone)]
pub struct ProcMemory {
    root: PathBuf,
}

impl Default for ProcMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcMemory {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Uses an alternate filesystem root in place of `/proc`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether smaps accounting is readable on this system.
    pub fn supported(&self) -> bool {
        let own = self.root.join("self");
        own.join("smaps_rollup").exists() || own.join("smaps").exists()
    }

    fn capture_composition(&self, proc_path: &Path) -> Option<Memory> {
        let rollup = proc_path.join("smaps_rollup");
        if rollup.exists() {
            let mut memory = parse_smaps_rollup(&rollup).ok()?;
            // The rollup has no per-region lines, so the region count comes
            // from the maps table instead.
            memory.map_count = count_lines(&proc_path.join("maps")).unwrap_or(0);
            return Some(memory);
        }

        parse_smaps(&proc_path.join("smaps")).ok()
    }
}

impl MemoryBackend for ProcMemory {
    fn capture(&self, pid: u32) -> Option<Memory> {
        let proc_path = self.root.join(pid.to_string());

        let mut memory = self.capture_composition(&proc_path)?;

        // Fault counters are a separate read; losing them degrades the
        // record but does not discard it.
        match fs::read_to_string(proc_path.join("stat")) {
            Ok(content) => {
                if let Some(record) = parse_stat(&content) {
                    memory.minor_faults = record.minor_faults;
                    memory.major_faults = record.major_faults;
                }
            }
            Err(error) => {
                debug!("failed to read stat for pid {}: {}", pid, error);
            }
        }

        Some(memory)
    }
}

/// Parses `/proc/<pid>/smaps_rollup`: one aggregated `Name: value kB` block.
fn parse_smaps_rollup(path: &Path) -> Result<Memory, std::io::Error> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut memory = Memory::default();

    for line in reader.lines() {
        let line = line?;
        accumulate_field(&mut memory, &line);
    }

    Ok(memory)
}

/// Parses the full `/proc/<pid>/smaps` table, summing named fields across
/// every region. Each region ends with a `VmFlags:` line, which doubles as
/// the region counter.
fn parse_smaps(path: &Path) -> Result<Memory, std::io::Error> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut memory = Memory::default();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with("VmFlags:") {
            memory.map_count += 1;
        } else {
            accumulate_field(&mut memory, &line);
        }
    }

    Ok(memory)
}

/// Adds one `Name: value kB` line into the record, converting to bytes.
/// Lines with unrecognized names (address headers, hugepage counters) are
/// skipped.
fn accumulate_field(memory: &mut Memory, line: &str) {
    let Some((name, value)) = line.split_once(':') else {
        return;
    };

    let Some(field) = field_mut(memory, name) else {
        return;
    };

    if let Some(kb) = parse_kb_value(value) {
        *field += kb * 1024;
    }
}

fn field_mut<'a>(memory: &'a mut Memory, name: &str) -> Option<&'a mut u64> {
    Some(match name {
        "Rss" => &mut memory.resident_size,
        "Pss" => &mut memory.proportional_size,
        "Shared_Clean" => &mut memory.shared_clean_size,
        "Shared_Dirty" => &mut memory.shared_dirty_size,
        "Private_Clean" => &mut memory.private_clean_size,
        "Private_Dirty" => &mut memory.private_dirty_size,
        "Referenced" => &mut memory.referenced_size,
        "Anonymous" => &mut memory.anonymous_size,
        "Swap" => &mut memory.swap_size,
        "SwapPss" => &mut memory.proportional_swap_size,
        _ => return None,
    })
}

/// Parses kibibyte values from smaps file lines (`"    1234 kB"`).
fn parse_kb_value(value: &str) -> Option<u64> {
    value.split_whitespace().next()?.parse().ok()
}

fn count_lines(path: &Path) -> Result<u64, std::io::Error> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut count = 0;
    for line in reader.lines() {
        line?;
        count += 1;
    }
    Ok(count)
}
