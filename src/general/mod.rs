//! General per-process information and platform enumeration backends.
//!
//! This module provides:
//! - `General`: identity, timing, and size fields for one process
//! - `linux`: direct /proc reads (no subprocess)
//! - `process_status`: portable `ps` invocation and parsing
//!
//! Both backends populate the same record shape and are substitutable; the
//! Linux integration tests cross-validate one against the other.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureError;
use crate::memory::Memory;

pub mod linux;
pub mod process_status;

pub use linux::ProcGeneral;
pub use process_status::PsGeneral;

/// Map of process id to its captured record.
pub type ProcessMap = HashMap<u32, General>;

/// General information about one observed process.
///
/// Sizes are bytes and times are fractional seconds, regardless of the
/// units of the underlying source. `processor_utilization` is a percentage
/// and is `0.0` from single-sample backends that cannot compute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct General {
    pub process_id: u32,
    /// Zero for kernel-adopted or root processes.
    pub parent_process_id: u32,
    pub process_group_id: u32,
    pub processor_utilization: f64,
    pub virtual_size: u64,
    pub resident_size: u64,
    pub processor_time: f64,
    pub elapsed_time: f64,
    /// Full command line when available, else the short process name.
    pub command: String,
    /// Detailed memory composition, absent when the detail backend is
    /// unsupported or the process vanished mid-capture.
    pub memory: Option<Memory>,
}

impl General {
    /// Best available memory footprint: proportional size when detailed
    /// accounting is present (accurate under sharing), else resident size
    /// as a degraded estimate.
    pub fn total_size(&self) -> u64 {
        match &self.memory {
            Some(memory) => memory.proportional_size,
            None => self.resident_size,
        }
    }

    /// Alias for [`General::total_size`] used by display layers.
    pub fn memory_usage(&self) -> u64 {
        self.total_size()
    }
}

/// Raw output of one enumeration pass, before subtree filtering.
pub struct Enumeration {
    pub processes: ProcessMap,
    /// Pid of a helper subprocess spawned for the enumeration (e.g. `ps`),
    /// which must be excluded from final results.
    pub helper_pid: Option<u32>,
}

/// Per-platform strategy for enumerating processes.
pub trait GeneralBackend {
    /// Enumerates the processes named in `pids`, or the entire process
    /// table when `all` is set (required when a parent filter will be
    /// applied, because the child set is not known in advance).
    ///
    /// Individual unreadable processes are skipped; an error here means the
    /// enumeration as a whole failed.
    fn enumerate(&self, pids: &[u32], all: bool) -> Result<Enumeration, CaptureError>;
}
