//! Per-process memory composition model and platform backends.
//!
//! This module provides:
//! - `Memory`: the uniform per-process memory record
//! - `linux`: smaps/smaps_rollup parsing from /proc
//! - `darwin`: vmmap output parsing
//!
//! Backends implement [`MemoryBackend`] and produce the same record shape
//! regardless of source. Detail capture is best-effort: a process that
//! vanished or cannot be read yields `None`, never an error.

use serde::{Deserialize, Serialize};

pub mod darwin;
pub mod linux;

pub use darwin::VmmapMemory;
pub use linux::ProcMemory;

/// Detailed memory composition for one process. All sizes in bytes.
///
/// `proportional_size` is PSS: resident memory with shared pages divided by
/// their share count. On Darwin true PSS is unavailable and the value is an
/// approximation (see [`VmmapMemory`]). Fault counters are cumulative since
/// process start and only populated on Linux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Number of memory-mapped regions.
    pub map_count: u64,
    pub resident_size: u64,
    pub proportional_size: u64,
    pub shared_clean_size: u64,
    pub shared_dirty_size: u64,
    pub private_clean_size: u64,
    pub private_dirty_size: u64,
    pub referenced_size: u64,
    pub anonymous_size: u64,
    pub swap_size: u64,
    pub proportional_swap_size: u64,
    pub minor_faults: u64,
    pub major_faults: u64,
}

impl Memory {
    /// The truly private footprint (USS): memory unaffected by
    /// copy-on-write sharing.
    pub fn unique_size(&self) -> u64 {
        self.private_clean_size + self.private_dirty_size
    }

    /// Total shared memory, clean and dirty.
    pub fn shared_size(&self) -> u64 {
        self.shared_clean_size + self.shared_dirty_size
    }

    /// Resident plus swapped-out memory.
    pub fn total_size(&self) -> u64 {
        self.resident_size + self.swap_size
    }
}

/// Per-platform strategy for capturing one process's memory composition.
pub trait MemoryBackend {
    /// Captures memory detail for `pid`. Returns `None` when the process
    /// vanished or its accounting files cannot be read; never an error, so
    /// one disappearing process cannot abort a multi-process capture.
    fn capture(&self, pid: u32) -> Option<Memory>;
}
