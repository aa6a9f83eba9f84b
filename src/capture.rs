//! Capture orchestration and backend resolution.
//!
//! `capture` is the public entry point: it resolves the platform backends
//! via capability probes, enumerates processes, applies the pid/ppid
//! subtree filter, and optionally attaches per-process memory detail.
//!
//! Backend resolution is an explicit, ordered function of which probes
//! succeeded: /proc is preferred (direct kernel reads, no subprocess), `ps`
//! is the portable fallback, and if neither is available the platform is
//! unsupported. Callers can check [`supported`] before capturing.

use thiserror::Error;

use crate::general::{Enumeration, GeneralBackend, ProcGeneral, ProcessMap, PsGeneral};
use crate::memory::{MemoryBackend, ProcMemory, VmmapMemory};
use crate::tree;

/// Errors surfaced by a capture. Only a failure of the primary enumeration
/// step reaches the caller; per-process detail failures are absorbed.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no supported process enumeration backend is available")]
    Unsupported,

    #[error("failed to run {command:?}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Options for one capture call.
///
/// - only `pid` set: enumerate just those processes
/// - `ppid` set: enumerate the full table and keep the subtree reachable
///   from `pid` and `ppid`
/// - neither set: the full process table
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    pub pid: Vec<u32>,
    pub ppid: Vec<u32>,
    /// Whether to attach detailed memory records; `None` means "when a
    /// memory backend is available".
    pub memory: Option<bool>,
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid.push(pid);
        self
    }

    pub fn ppid(mut self, ppid: u32) -> Self {
        self.ppid.push(ppid);
        self
    }

    pub fn memory(mut self, enabled: bool) -> Self {
        self.memory = Some(enabled);
        self
    }
}

/// Which process enumeration strategy the capability probes selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralCapability {
    Proc,
    ProcessStatus,
    Unsupported,
}

/// Which memory detail strategy the capability probes selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryCapability {
    ProcSmaps,
    Vmmap,
    Unsupported,
}

/// Pure resolution of probe results to an enumeration strategy, in fallback
/// priority order.
pub fn select_general_backend(proc_readable: bool, ps_available: bool) -> GeneralCapability {
    if proc_readable {
        GeneralCapability::Proc
    } else if ps_available {
        GeneralCapability::ProcessStatus
    } else {
        GeneralCapability::Unsupported
    }
}

/// Pure resolution of probe results to a memory detail strategy.
pub fn select_memory_backend(smaps_readable: bool, vmmap_executable: bool) -> MemoryCapability {
    if smaps_readable {
        MemoryCapability::ProcSmaps
    } else if vmmap_executable {
        MemoryCapability::Vmmap
    } else {
        MemoryCapability::Unsupported
    }
}

/// Probes the platform and returns a concrete enumeration backend, or
/// `None` when neither /proc nor `ps` is usable.
pub fn resolve_general_backend() -> Option<Box<dyn GeneralBackend>> {
    let proc_backend = ProcGeneral::new();
    let ps_backend = PsGeneral::new();

    match select_general_backend(proc_backend.supported(), ps_backend.supported()) {
        GeneralCapability::Proc => Some(Box::new(proc_backend)),
        GeneralCapability::ProcessStatus => Some(Box::new(ps_backend)),
        GeneralCapability::Unsupported => None,
    }
}

/// Probes the platform and returns a concrete memory detail backend, or
/// `None` when detailed accounting is unavailable.
pub fn resolve_memory_backend() -> Option<Box<dyn MemoryBackend>> {
    let proc_backend = ProcMemory::new();
    let vmmap_backend = VmmapMemory::new();

    match select_memory_backend(proc_backend.supported(), vmmap_backend.supported()) {
        MemoryCapability::ProcSmaps => Some(Box::new(proc_backend)),
        MemoryCapability::Vmmap => Some(Box::new(vmmap_backend)),
        MemoryCapability::Unsupported => None,
    }
}

/// Whether any process enumeration backend is available. Check this before
/// calling [`capture`]; an unsupported platform is a precondition failure,
/// not something a capture can recover from.
pub fn supported() -> bool {
    ProcGeneral::new().supported() || PsGeneral::new().supported()
}

/// Captures a point-in-time snapshot of process metrics, keyed by pid.
/// Output order carries no meaning; display layers sort as needed.
pub fn capture(options: &CaptureOptions) -> Result<ProcessMap, CaptureError> {
    let general_backend = resolve_general_backend().ok_or(CaptureError::Unsupported)?;
    let memory_backend = resolve_memory_backend();

    capture_with(general_backend.as_ref(), memory_backend.as_deref(), options)
}

/// Captures using explicitly injected backends. Exposed so tests can pair
/// arbitrary backends and cross-validate them.
pub fn capture_with(
    general_backend: &dyn GeneralBackend,
    memory_backend: Option<&dyn MemoryBackend>,
    options: &CaptureOptions,
) -> Result<ProcessMap, CaptureError> {
    // A parent filter needs the full table to resolve descendants; so does
    // a capture with no filters at all.
    let all = !options.ppid.is_empty() || options.pid.is_empty();

    let Enumeration {
        mut processes,
        helper_pid,
    } = general_backend.enumerate(&options.pid, all)?;

    if !options.ppid.is_empty() {
        let hierarchy = tree::build_tree(&processes);

        let mut seeds = options.pid.clone();
        seeds.extend_from_slice(&options.ppid);
        let selected = tree::expand(&seeds, &hierarchy);

        // The enumeration helper (if any) either falls outside the subtree
        // or is excluded here explicitly.
        processes
            .retain(|pid, _| selected.contains(pid) && Some(*pid) != helper_pid);
    } else if let Some(helper_pid) = helper_pid {
        processes.remove(&helper_pid);
    }

    let memory_enabled = options.memory.unwrap_or(memory_backend.is_some());
    if memory_enabled {
        if let Some(memory_backend) = memory_backend {
            for (pid, general) in processes.iter_mut() {
                // Absent on failure, never an error: one vanished process
                // must not abort the batch.
                general.memory = memory_backend.capture(*pid);
            }
        }
    }

    Ok(processes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::general::General;
    use crate::memory::Memory;

    struct FakeGeneral {
        processes: Vec<(u32, u32)>,
        helper_pid: Option<u32>,
    }

    impl GeneralBackend for FakeGeneral {
        fn enumerate(&self, pids: &[u32], all: bool) -> Result<Enumeration, CaptureError> {
            let mut processes = ProcessMap::default();
            for (pid, ppid) in &self.processes {
                if all || pids.contains(pid) {
                    processes.insert(
                        *pid,
                        General {
                            process_id: *pid,
                            parent_process_id: *ppid,
                            process_group_id: *pid,
                            processor_utilization: 0.0,
                            virtual_size: 0,
                            resident_size: 4096,
                            processor_time: 0.0,
                            elapsed_time: 0.0,
                            command: format!("process-{pid}"),
                            memory: None,
                        },
                    );
                }
            }
            Ok(Enumeration {
                processes,
                helper_pid: self.helper_pid,
            })
        }
    }

    /// Yields detail for even pids only; odd pids simulate a vanished
    /// process.
    struct FakeMemory;

    impl MemoryBackend for FakeMemory {
        fn capture(&self, pid: u32) -> Option<Memory> {
            (pid % 2 == 0).then(|| Memory {
                resident_size: 4096,
                proportional_size: 2048,
                ..Memory::default()
            })
        }
    }

    fn backend() -> FakeGeneral {
        // 1 -> [2, 3], 2 -> [4]; 99 is the ps helper, child of 1.
        FakeGeneral {
            processes: vec![(1, 0), (2, 1), (3, 1), (4, 2), (99, 1)],
            helper_pid: Some(99),
        }
    }

    #[test]
    fn test_capture_pid_only() {
        let options = CaptureOptions::new().pid(2).memory(false);
        let processes = capture_with(&backend(), None, &options).expect("captures");

        assert_eq!(processes.len(), 1);
        assert!(processes.contains_key(&2));
    }

    #[test]
    fn test_capture_subtree() {
        let options = CaptureOptions::new().ppid(2).memory(false);
        let processes = capture_with(&backend(), None, &options).expect("captures");

        let mut pids: Vec<u32> = processes.keys().copied().collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![2, 4]);
    }

    #[test]
    fn test_capture_union_of_pid_and_ppid_subtrees() {
        let options = CaptureOptions::new().pid(3).ppid(2).memory(false);
        let processes = capture_with(&backend(), None, &options).expect("captures");

        let mut pids: Vec<u32> = processes.keys().copied().collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![2, 3, 4]);
    }

    #[test]
    fn test_capture_excludes_helper_process() {
        // Full-table capture: the helper is removed from the map.
        let options = CaptureOptions::new().memory(false);
        let processes = capture_with(&backend(), None, &options).expect("captures");
        assert!(!processes.contains_key(&99));

        // Subtree capture rooted at the helper's parent: the helper is in
        // the reachable set but still excluded.
        let options = CaptureOptions::new().ppid(1).memory(false);
        let processes = capture_with(&backend(), None, &options).expect("captures");
        assert!(!processes.contains_key(&99));
        assert!(processes.contains_key(&2));
    }

    #[test]
    fn test_capture_memory_enrichment_is_best_effort() {
        let options = CaptureOptions::new().ppid(1);
        let processes =
            capture_with(&backend(), Some(&FakeMemory), &options).expect("captures");

        assert!(processes[&2].memory.is_some());
        assert!(processes[&4].memory.is_some());
        // Odd pids "vanished" mid-capture; the rest of the batch survives.
        assert!(processes[&1].memory.is_none());
        assert!(processes[&3].memory.is_none());

        assert_eq!(processes[&2].total_size(), 2048);
        assert_eq!(processes[&3].total_size(), 4096);
    }

    #[test]
    fn test_capture_memory_disabled() {
        let options = CaptureOptions::new().pid(2).memory(false);
        let processes =
            capture_with(&backend(), Some(&FakeMemory), &options).expect("captures");

        assert!(processes[&2].memory.is_none());
    }

    #[test]
    fn test_select_general_backend_priority() {
        assert_eq!(select_general_backend(true, true), GeneralCapability::Proc);
        assert_eq!(select_general_backend(true, false), GeneralCapability::Proc);
        assert_eq!(
            select_general_backend(false, true),
            GeneralCapability::ProcessStatus
        );
        assert_eq!(
            select_general_backend(false, false),
            GeneralCapability::Unsupported
        );
    }

    #[test]
    fn test_select_memory_backend_priority() {
        assert_eq!(select_memory_backend(true, true), MemoryCapability::ProcSmaps);
        assert_eq!(select_memory_backend(false, true), MemoryCapability::Vmmap);
        assert_eq!(
            select_memory_backend(false, false),
            MemoryCapability::Unsupported
        );
    }
}
