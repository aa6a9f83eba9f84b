//! Process enumeration by reading /proc directly.
//!
//! Reads the same data source the kernel uses for process accounting, so no
//! subprocess is spawned and no external command output is parsed. Each
//! process costs two reads: `stat` for identity/timing/size fields and
//! `cmdline` for the display command.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::capture::CaptureError;
use crate::general::{Enumeration, General, GeneralBackend, ProcessMap};
use crate::stat::parse_stat;

/// System clock ticks per second for stat times (utime, stime, starttime).
static CLK_TCK: Lazy<f64> = Lazy::new(|| {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK.
        // Returns -1 on error, 0 if undefined; both are handled by the > 0 check.
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
});

/// Page size in bytes; rss in stat is reported in pages.
static PAGE_SIZE: Lazy<u64> = Lazy::new(|| {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE.
        unsafe {
            let page_size = libc::sysconf(libc::_SC_PAGESIZE);
            if page_size > 0 {
                return page_size as u64;
            }
        }
    }
    4096
});

/// Process backend reading the /proc pseudo-filesystem.
#[derive(Debug, Clone)]
pub struct ProcGeneral {
    root: PathBuf,
}

impl Default for ProcGeneral {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcGeneral {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Uses an alternate filesystem root in place of `/proc`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether /proc is present and readable so processes can be listed
    /// without spawning `ps`.
    pub fn supported(&self) -> bool {
        fs::File::open(self.root.join("self").join("stat")).is_ok()
    }

    /// Scans the /proc root for numeric (pid) entries.
    fn scan_pids(&self) -> Vec<u32> {
        let mut pids = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if let Ok(pid) = name.parse::<u32>() {
                    pids.push(pid);
                }
            }
        }
        pids
    }

    fn read_process(&self, pid: u32, uptime_ticks: f64) -> Option<General> {
        let proc_path = self.root.join(pid.to_string());

        let content = fs::read_to_string(proc_path.join("stat")).ok()?;
        let record = parse_stat(&content)?;

        let processor_time = (record.utime_ticks + record.stime_ticks) as f64 / *CLK_TCK;
        let elapsed_time =
            ((uptime_ticks - record.start_time_ticks as f64) / *CLK_TCK).max(0.0);

        Some(General {
            process_id: pid,
            parent_process_id: record.parent_process_id,
            process_group_id: record.process_group_id,
            // An instantaneous percentage would need two time-separated
            // samples; a single stat read cannot provide it.
            processor_utilization: 0.0,
            virtual_size: record.virtual_size,
            resident_size: record.resident_pages * *PAGE_SIZE,
            processor_time,
            elapsed_time,
            command: self.read_command(&proc_path, &record.name),
            memory: None,
        })
    }

    /// Reads the full command line from `cmdline` (NUL-separated), joined
    /// with spaces for display; falls back to the short name from stat when
    /// empty or unreadable.
    fn read_command(&self, proc_path: &Path, fallback: &str) -> String {
        let Ok(content) = fs::read(proc_path.join("cmdline")) else {
            return fallback.to_string();
        };

        let command = content
            .split(|&byte| byte == 0)
            .filter(|part| !part.is_empty())
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join(" ");

        let command = command.trim();
        if command.is_empty() {
            fallback.to_string()
        } else {
            command.to_string()
        }
    }

    /// Host uptime in clock ticks, read once per capture batch and reused
    /// for every process to avoid skew and redundant I/O.
    fn read_uptime_ticks(&self) -> Result<f64, CaptureError> {
        let content = fs::read_to_string(self.root.join("uptime"))?;
        let seconds: f64 = content
            .split_whitespace()
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| {
                CaptureError::Io(std::io::Error::other("invalid uptime format"))
            })?;
        Ok(seconds * *CLK_TCK)
    }
}

impl GeneralBackend for ProcGeneral {
    fn enumerate(&self, pids: &[u32], all: bool) -> Result<Enumeration, CaptureError> {
        // A full scan is only needed when the caller wants the whole table
        // (e.g. to resolve a parent filter); otherwise read just the
        // requested ids.
        let pids_to_read = if all { self.scan_pids() } else { pids.to_vec() };

        let uptime_ticks = self.read_uptime_ticks()?;

        let mut processes = ProcessMap::default();
        for pid in pids_to_read {
            match self.read_process(pid, uptime_ticks) {
                Some(general) => {
                    processes.insert(pid, general);
                }
                None => {
                    // Process disappeared or is unreadable; expected race.
                    debug!("skipping pid {}: stat unreadable", pid);
                }
            }
        }

        Ok(Enumeration {
            processes,
            helper_pid: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT_42: &str = "42 (worker) S 1 42 42 0 -1 4194304 10 0 1 0 200 100 0 0 20 0 1 0 5000 104857600 256 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0";

    fn write_process(root: &Path, pid: u32, stat: &str, cmdline: &[u8]) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).expect("create pid dir");
        fs::write(dir.join("stat"), stat).expect("write stat");
        fs::write(dir.join("cmdline"), cmdline).expect("write cmdline");
    }

    fn fixture_root(uptime_seconds: f64) -> tempfile::TempDir {
        let root = tempdir().expect("tempdir");
        fs::write(
            root.path().join("uptime"),
            format!("{uptime_seconds:.2} 123.45"),
        )
        .expect("write uptime");
        root
    }

    #[test]
    fn test_enumerate_targeted() {
        let root = fixture_root(100.0);
        write_process(root.path(), 42, STAT_42, b"worker\0--verbose\0");

        let backend = ProcGeneral::with_root(root.path());
        let enumeration = backend.enumerate(&[42], false).expect("enumerates");
        let general = &enumeration.processes[&42];

        assert_eq!(general.process_id, 42);
        assert_eq!(general.parent_process_id, 1);
        assert_eq!(general.process_group_id, 42);
        assert_eq!(general.processor_utilization, 0.0);
        assert_eq!(general.virtual_size, 104857600);
        assert_eq!(general.resident_size, 256 * *PAGE_SIZE);
        assert_eq!(general.command, "worker --verbose");
        assert!(enumeration.helper_pid.is_none());

        // utime + stime = 300 ticks.
        let expected_time = 300.0 / *CLK_TCK;
        assert!((general.processor_time - expected_time).abs() < 1e-9);

        // uptime 100s = 100 * CLK_TCK ticks, starttime 5000 ticks.
        let expected_elapsed = (100.0 * *CLK_TCK - 5000.0) / *CLK_TCK;
        assert!((general.elapsed_time - expected_elapsed).abs() < 1e-9);
    }

    #[test]
    fn test_enumerate_full_scan_skips_non_numeric() {
        let root = fixture_root(100.0);
        write_process(root.path(), 42, STAT_42, b"worker\0");
        write_process(
            root.path(),
            43,
            "43 (child) S 42 42 43 0 -1 0 0 0 0 0 1 1 0 0 20 0 1 0 6000 1000 1 0 0 0 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0",
            b"",
        );
        fs::create_dir_all(root.path().join("sys")).expect("create non-pid dir");
        fs::write(root.path().join("version"), "test").expect("write non-pid file");

        let backend = ProcGeneral::with_root(root.path());
        let enumeration = backend.enumerate(&[], true).expect("enumerates");

        assert_eq!(enumeration.processes.len(), 2);
        assert!(enumeration.processes.contains_key(&42));
        assert!(enumeration.processes.contains_key(&43));
    }

    #[test]
    fn test_empty_cmdline_falls_back_to_stat_name() {
        let root = fixture_root(100.0);
        write_process(root.path(), 42, STAT_42, b"");

        let backend = ProcGeneral::with_root(root.path());
        let enumeration = backend.enumerate(&[42], false).expect("enumerates");

        assert_eq!(enumeration.processes[&42].command, "worker");
    }

    #[test]
    fn test_elapsed_time_clamped_at_zero() {
        // starttime later than the uptime snapshot (clock skew) clamps to 0.
        let root = fixture_root(1.0);
        write_process(root.path(), 42, STAT_42, b"worker\0");

        let backend = ProcGeneral::with_root(root.path());
        let enumeration = backend.enumerate(&[42], false).expect("enumerates");

        assert_eq!(enumeration.processes[&42].elapsed_time, 0.0);
    }

    #[test]
    fn test_vanished_process_is_skipped() {
        let root = fixture_root(100.0);
        write_process(root.path(), 42, STAT_42, b"worker\0");

        let backend = ProcGeneral::with_root(root.path());
        let enumeration = backend.enumerate(&[42, 777], false).expect("enumerates");

        assert_eq!(enumeration.processes.len(), 1);
        assert!(!enumeration.processes.contains_key(&777));
    }

    #[test]
    fn test_missing_uptime_is_an_enumeration_error() {
        let root = tempdir().expect("tempdir");
        let backend = ProcGeneral::with_root(root.path());

        assert!(backend.enumerate(&[42], false).is_err());
    }
}
