//! Process enumeration via the portable `ps` utility.
//!
//! Used where direct /proc reads are unsupported (non-Linux platforms,
//! sandboxes without a proc filesystem). `ps` is invoked with an explicit
//! column set in a stable order and its output is parsed by position, so
//! header localization cannot break the parse.

use std::process::Command;

use tracing::debug;

use crate::capture::CaptureError;
use crate::command::drain;
use crate::duration::parse_duration;
use crate::general::{Enumeration, General, GeneralBackend, ProcessMap};

const PS: &str = "ps";

/// Requested `-o` columns, in parse order. `command` must stay last: it is
/// the only field that may contain whitespace and absorbs the rest of the
/// line.
const COLUMNS: [&str; 9] = [
    "pid", "ppid", "pgid", "pcpu", "vsz", "rss", "time", "etime", "command",
];

/// Process backend spawning and parsing `ps`.
#[derive(Debug, Clone)]
pub struct PsGeneral {
    command: String,
}

impl Default for PsGeneral {
    fn default() -> Self {
        Self::new()
    }
}

impl PsGeneral {
    pub fn new() -> Self {
        Self::with_command(PS)
    }

    /// Uses an alternate command in place of `ps`.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Whether `ps` can be spawned on this system.
    pub fn supported(&self) -> bool {
        Command::new(&self.command)
            .args(["-p", &std::process::id().to_string(), "-o", "pid="])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl GeneralBackend for PsGeneral {
    fn enumerate(&self, pids: &[u32], all: bool) -> Result<Enumeration, CaptureError> {
        let mut command = Command::new(&self.command);

        if all {
            command.arg("ax");
        } else {
            command.args(["-p", &pid_list(pids)]);
        }
        command.args(["-o", &COLUMNS.join(",")]);

        let helper = drain(&mut command).map_err(|source| CaptureError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let mut processes = ProcessMap::default();
        for line in helper.output.lines() {
            match parse_line(line) {
                Some(general) => {
                    processes.insert(general.process_id, general);
                }
                None => {
                    // The header row and truncated/garbled rows land here.
                    debug!("skipping ps output line: {:?}", line);
                }
            }
        }

        Ok(Enumeration {
            processes,
            helper_pid: Some(helper.pid),
        })
    }
}

fn pid_list(pids: &[u32]) -> String {
    pids.iter()
        .map(|pid| pid.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses one `ps` output row by column position. Rows with fewer fields
/// than requested columns, or a non-numeric pid (the header), yield `None`.
fn parse_line(line: &str) -> Option<General> {
    let values = split_columns(line, COLUMNS.len());
    if values.len() < COLUMNS.len() {
        return None;
    }

    Some(General {
        process_id: values[0].parse().ok()?,
        parent_process_id: values[1].parse().unwrap_or(0),
        process_group_id: values[2].parse().unwrap_or(0),
        processor_utilization: values[3].parse().unwrap_or(0.0),
        // vsz and rss are reported in kibibytes.
        virtual_size: values[4].parse::<u64>().unwrap_or(0) * 1024,
        resident_size: values[5].parse::<u64>().unwrap_or(0) * 1024,
        processor_time: parse_duration(values[6]),
        elapsed_time: parse_duration(values[7]),
        command: values[8].to_string(),
        memory: None,
    })
}

/// Splits a row into at most `count` whitespace-separated columns; the last
/// column keeps its embedded whitespace.
fn split_columns(line: &str, count: usize) -> Vec<&str> {
    let mut values = Vec::with_capacity(count);
    let mut rest = line.trim();

    while values.len() + 1 < count {
        match rest.split_once(|character: char| character.is_whitespace()) {
            Some((head, tail)) => {
                values.push(head);
                rest = tail.trim_start();
            }
            None => break,
        }
    }

    if !rest.is_empty() {
        values.push(rest);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_columns() {
        let values = split_columns("  1   2  3 four five  six ", 4);
        assert_eq!(values, vec!["1", "2", "3", "four five  six"]);

        assert_eq!(split_columns("a b", 4), vec!["a", "b"]);
        assert!(split_columns("", 4).is_empty());
    }

    #[test]
    fn test_parse_line() {
        let line = "  1234     1  1234  2.5  104857  2048  01:01  01-00:00:00  /usr/bin/worker --flag value";
        let general = parse_line(line).expect("row parses");

        assert_eq!(general.process_id, 1234);
        assert_eq!(general.parent_process_id, 1);
        assert_eq!(general.process_group_id, 1234);
        assert_eq!(general.processor_utilization, 2.5);
        assert_eq!(general.virtual_size, 104857 * 1024);
        assert_eq!(general.resident_size, 2048 * 1024);
        assert_eq!(general.processor_time, 61.0);
        assert_eq!(general.elapsed_time, 86400.0);
        assert_eq!(general.command, "/usr/bin/worker --flag value");
        assert!(general.memory.is_none());
    }

    #[test]
    fn test_parse_line_skips_header() {
        let header = "  PID  PPID  PGID %CPU    VSZ   RSS     TIME       ELAPSED COMMAND";
        assert!(parse_line(header).is_none());
    }

    #[test]
    fn test_parse_line_skips_short_rows() {
        assert!(parse_line("1234 1 1234").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_pid_list() {
        assert_eq!(pid_list(&[1]), "1");
        assert_eq!(pid_list(&[1, 2, 42]), "1,2,42");
    }
}
