//! Parsing of the `/proc/[pid]/stat` fixed-field line.
//!
//! The comm field is parenthesized and may itself contain parentheses and
//! spaces (e.g. `(tmux: server)`), so the parser locates the *last* `)`
//! before splitting the remaining whitespace-separated fields. Field numbers
//! below follow proc(5), which counts from 1 with pid=1 and comm=2; after
//! the closing parenthesis, field N lands at index N - 3.

/// Fields extracted from a single `/proc/[pid]/stat` read.
///
/// Sizes are raw kernel units: `virtual_size` is bytes, `resident_pages` is
/// pages, times are clock ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatRecord {
    pub name: String,
    pub parent_process_id: u32,
    pub process_group_id: u32,
    pub minor_faults: u64,
    pub major_faults: u64,
    pub utime_ticks: u64,
    pub stime_ticks: u64,
    pub start_time_ticks: u64,
    pub virtual_size: u64,
    pub resident_pages: u64,
}

/// Parses the content of `/proc/[pid]/stat`. Returns `None` when the line
/// does not have the expected shape (truncated read, malformed comm).
pub(crate) fn parse_stat(content: &str) -> Option<StatRecord> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close <= open {
        return None;
    }

    let name = content[open + 1..close].to_string();
    let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();

    // Up to rss (field 24, index 21) must be present.
    if fields.len() < 22 {
        return None;
    }

    Some(StatRecord {
        name,
        parent_process_id: fields[1].parse().unwrap_or(0),  // ppid (4)
        process_group_id: fields[2].parse().unwrap_or(0),   // pgrp (5)
        minor_faults: fields[7].parse().unwrap_or(0),       // minflt (10)
        major_faults: fields[9].parse().unwrap_or(0),       // majflt (12)
        utime_ticks: fields[11].parse().unwrap_or(0),       // utime (14)
        stime_ticks: fields[12].parse().unwrap_or(0),       // stime (15)
        start_time_ticks: fields[19].parse().unwrap_or(0),  // starttime (22)
        virtual_size: fields[20].parse().unwrap_or(0),      // vsize (23)
        resident_pages: fields[21].parse().unwrap_or(0),    // rss (24)
    })
}
