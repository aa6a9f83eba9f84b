//! procsnap - point-in-time process tree and memory metrics.
//!
//! Given a process id (and optionally a parent id to capture a subtree),
//! produces a structured snapshot of resource consumption: CPU time, memory
//! composition (RSS/PSS/USS, swap, page faults), and process tree
//! relationships. Each capture is a single snapshot; callers that want
//! rates can capture twice and diff.
//!
//! # Backends
//!
//! - **Linux**: direct `/proc` reads for enumeration, `smaps_rollup` /
//!   `smaps` for memory detail
//! - **Portable**: `ps` invocation for enumeration where /proc is absent
//! - **Darwin**: `vmmap` for memory detail (proportional size is an
//!   approximation there, see [`memory::VmmapMemory`])
//!
//! Backends are selected once per capture by capability probes; check
//! [`capture::supported`] before capturing.
//!
//! # Usage
//!
//! ```no_run
//! use procsnap::{capture, CaptureOptions};
//!
//! let options = CaptureOptions::new().pid(std::process::id());
//! let processes = capture(&options).expect("platform supported");
//!
//! for (pid, general) in &processes {
//!     println!("{}: {} ({} bytes)", pid, general.command, general.total_size());
//! }
//! ```

pub mod capture;
pub mod cli;
pub mod duration;
pub mod general;
pub mod host;
pub mod memory;
pub mod render;
pub mod tree;

mod command;
mod stat;

// Re-export main types for convenience
pub use capture::{capture, supported, CaptureError, CaptureOptions};
pub use duration::parse_duration;
pub use general::{General, ProcessMap};
pub use host::{HostMemory, HostMemoryReader};
pub use memory::Memory;
