//! Memory composition from `vmmap` output on Darwin.
//!
//! Each mapped-region line has a fixed shape: region name, address range,
//! four bracketed sizes (virtual, resident, dirty, swap) with K/M/G
//! suffixes, permissions, and an `SM=` sharing-mode tag. Regions are
//! accumulated into the same [`Memory`] record the Linux backend produces.
//!
//! True proportional accounting (PSS) is unavailable on Darwin. The backend
//! approximates `proportional_size = resident_size / process_count`, where
//! the process count is supplied by the caller (default 1). This is a rough
//! estimate, not exact PSS, and the `proportional_size <= resident_size`
//! invariant is not guaranteed here.

use std::path::Path;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::command::drain;
use crate::memory::{Memory, MemoryBackend};

const VMMAP: &str = "/usr/bin/vmmap";

/// Matches one vmmap region line, e.g.
/// `__TEXT  102ab4000-102ab8000  [  16K  16K  0K  0K ] r-x/r-x SM=COW  /usr/bin/true`
static REGION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^\s*
        (?P<region_name>.+?)\s+
        (?P<start_address>[0-9a-fA-F]+)-(?P<end_address>[0-9a-fA-F]+)\s+
        \[\s*(?P<virtual_size>[\d.]+[KMG]?)\s+(?P<resident_size>[\d.]+[KMG]?)\s+(?P<dirty_size>[\d.]+[KMG]?)\s+(?P<swap_size>[\d.]+[KMG]?)\s*\]\s+
        (?P<permissions>[rwx\-/]+)\s+
        SM=(?P<sharing_mode>\w+)",
    )
    .expect("region pattern compiles")
});

/// Region names that indicate anonymous memory (allocator arenas, stacks).
static ANONYMOUS_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"MALLOC|VM_ALLOCATE|Stack|STACK|anonymous").expect("anonymous pattern compiles")
});

/// Memory backend spawning the `vmmap` inspection tool.
#[derive(Debug, Clone)]
pub struct VmmapMemory {
    command: String,
    process_count: u64,
}

impl Default for VmmapMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl VmmapMemory {
    pub fn new() -> Self {
        Self {
            command: VMMAP.to_string(),
            process_count: 1,
        }
    }

    /// Sets the number of processes sharing this process's group, used as
    /// the divisor for the proportional-size approximation.
    pub fn with_process_count(mut self, process_count: u64) -> Self {
        self.process_count = process_count.max(1);
        self
    }

    /// Whether the vmmap tool is present and executable.
    pub fn supported(&self) -> bool {
        is_executable(Path::new(&self.command))
    }
}

impl MemoryBackend for VmmapMemory {
    fn capture(&self, pid: u32) -> Option<Memory> {
        let mut command = Command::new(&self.command);
        command.arg(pid.to_string());

        let helper = match drain(&mut command) {
            Ok(helper) => helper,
            Err(error) => {
                debug!("failed to run {} for pid {}: {}", self.command, pid, error);
                return None;
            }
        };

        // vmmap exits nonzero when the target process vanished or is
        // inaccessible; that is an expected race, not an error.
        if !helper.success() {
            return None;
        }

        Some(parse_vmmap(&helper.output, self.process_count))
    }
}

/// Accumulates all matching region lines into one record.
fn parse_vmmap(output: &str, process_count: u64) -> Memory {
    let mut memory = Memory::default();

    for line in output.lines() {
        let Some(region) = REGION_LINE.captures(line) else {
            continue;
        };

        let resident_size = parse_size(&region["resident_size"]);
        let dirty_size = parse_size(&region["dirty_size"]);
        let swap_size = parse_size(&region["swap_size"]);

        memory.map_count += 1;
        memory.resident_size += resident_size;
        memory.swap_size += swap_size;

        // Sharing modes: PRV=private, COW=copy-on-write, SHM=shared,
        // NUL=empty, ALI=aliased, ZER=zero-filled, S/A=shared-alias.
        match &region["sharing_mode"] {
            "PRV" => {
                memory.private_clean_size += resident_size.saturating_sub(dirty_size);
                memory.private_dirty_size += dirty_size;
            }
            "COW" | "SHM" => {
                memory.shared_clean_size += resident_size.saturating_sub(dirty_size);
                memory.shared_dirty_size += dirty_size;
            }
            _ => {}
        }

        if ANONYMOUS_REGION.is_match(&region["region_name"]) {
            memory.anonymous_size += resident_size;
        }
    }

    memory.proportional_size = memory.resident_size / process_count.max(1);
    memory.proportional_swap_size = memory.swap_size;

    memory
}

/// Parses a vmmap size like `16K`, `2.5M`, `1G`, or plain bytes.
fn parse_size(text: &str) -> u64 {
    let text = text.trim();
    let (number, multiplier) = match text.chars().last() {
        Some('K') | Some('k') => (&text[..text.len() - 1], 1024.0),
        Some('M') | Some('m') => (&text[..text.len() - 1], 1024.0 * 1024.0),
        Some('G') | Some('g') => (&text[..text.len() - 1], 1024.0 * 1024.0 * 1024.0),
        _ => (text, 1.0),
    };

    (number.parse::<f64>().unwrap_or(0.0) * multiplier).round() as u64
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.exists()
}
