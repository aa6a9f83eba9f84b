//! Host-wide memory metrics, the sibling data source to per-process
//! capture.
//!
//! Container-aware: cgroup v2 limit files are preferred, then cgroup v1,
//! then `/proc/meminfo`. Display layers use the host total to scale
//! relative-usage bars. meminfo is read once per capture and reused for
//! total, used, and swap.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// In cgroups v1 an unlimited `memory.limit_in_bytes` is a sentinel near
/// 2^63; anything at or above 2^60 is treated as "no limit" and the reader
/// falls back to meminfo.
const CGROUP_V1_UNLIMITED_THRESHOLD: u64 = 1 << 60;

/// Host memory snapshot. All sizes in bytes; swap fields are `None` when
/// the host exposes no swap accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMemory {
    /// Cgroup limit when in a container, else physical RAM.
    pub total_size: u64,
    pub used_size: u64,
    /// MemAvailable-style: free plus reclaimable.
    pub free_size: u64,
    pub swap_total_size: Option<u64>,
    pub swap_used_size: Option<u64>,
}

/// Reads host memory from cgroup limit files or /proc/meminfo.
#[derive(Debug, Clone)]
pub struct HostMemoryReader {
    cgroup_root: PathBuf,
    proc_root: PathBuf,
}

impl Default for HostMemoryReader {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMemoryReader {
    pub fn new() -> Self {
        Self::with_roots("/sys/fs/cgroup", "/proc")
    }

    /// Uses alternate filesystem roots in place of `/sys/fs/cgroup` and
    /// `/proc`.
    pub fn with_roots(cgroup_root: impl Into<PathBuf>, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_root: cgroup_root.into(),
            proc_root: proc_root.into(),
        }
    }

    /// Whether host memory can be captured on this system.
    pub fn supported(&self) -> bool {
        self.proc_root.join("meminfo").exists()
    }

    /// Captures the current host memory, or `None` when no source yields a
    /// positive total.
    pub fn capture(&self) -> Option<HostMemory> {
        let meminfo = fs::read_to_string(self.proc_root.join("meminfo")).ok();
        let meminfo = meminfo.as_deref();

        let total_size = self.capture_total(meminfo)?;
        if total_size == 0 {
            return None;
        }

        let used_size = self.capture_used(total_size, meminfo).unwrap_or(0).min(total_size);
        let free_size = total_size - used_size;

        let (swap_total_size, swap_used_size) = capture_swap(meminfo);

        Some(HostMemory {
            total_size,
            used_size,
            free_size,
            swap_total_size,
            swap_used_size,
        })
    }

    /// Total memory: cgroup v2 `memory.max`, cgroup v1
    /// `memory.limit_in_bytes` below the unlimited sentinel, else MemTotal.
    fn capture_total(&self, meminfo: Option<&str>) -> Option<u64> {
        if let Ok(limit) = fs::read_to_string(self.cgroup_root.join("memory.max")) {
            let limit = limit.trim();
            if limit != "max" {
                return limit.parse().ok();
            }
        }

        if let Ok(limit) =
            fs::read_to_string(self.cgroup_root.join("memory/memory.limit_in_bytes"))
        {
            if let Ok(limit) = limit.trim().parse::<u64>() {
                if limit > 0 && limit < CGROUP_V1_UNLIMITED_THRESHOLD {
                    return Some(limit);
                }
            }
        }

        meminfo_value(meminfo?, "MemTotal:").map(|kb| kb * 1024)
    }

    /// Used memory: cgroup v2 `memory.current`, cgroup v1
    /// `memory.usage_in_bytes` (only when a real limit is set), else
    /// total minus MemAvailable (MemFree as a last resort).
    fn capture_used(&self, total_size: u64, meminfo: Option<&str>) -> Option<u64> {
        if let Ok(current) = fs::read_to_string(self.cgroup_root.join("memory.current")) {
            return current.trim().parse().ok();
        }

        if let Ok(limit) =
            fs::read_to_string(self.cgroup_root.join("memory/memory.limit_in_bytes"))
        {
            if let Ok(limit) = limit.trim().parse::<u64>() {
                if limit > 0 && limit < CGROUP_V1_UNLIMITED_THRESHOLD {
                    if let Ok(usage) =
                        fs::read_to_string(self.cgroup_root.join("memory/memory.usage_in_bytes"))
                    {
                        return usage.trim().parse().ok();
                    }
                }
            }
        }

        let meminfo = meminfo?;
        let available_kb =
            meminfo_value(meminfo, "MemAvailable:").or_else(|| meminfo_value(meminfo, "MemFree:"))?;

        Some(total_size.saturating_sub(available_kb * 1024))
    }
}

/// Swap total and used from meminfo; `(None, None)` when absent.
fn capture_swap(meminfo: Option<&str>) -> (Option<u64>, Option<u64>) {
    let Some(meminfo) = meminfo else {
        return (None, None);
    };

    let Some(swap_total_kb) = meminfo_value(meminfo, "SwapTotal:") else {
        return (None, None);
    };
    let swap_free_kb = meminfo_value(meminfo, "SwapFree:").unwrap_or(0);

    (
        Some(swap_total_kb * 1024),
        Some(swap_total_kb.saturating_sub(swap_free_kb) * 1024),
    )
}

/// Extracts a `Name:  1234 kB` value from meminfo, in kibibytes.
fn meminfo_value(meminfo: &str, prefix: &str) -> Option<u64> {
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix(prefix) {
            return rest.split_whitespace().next()?.parse().ok();
        }
    }
    None
}
