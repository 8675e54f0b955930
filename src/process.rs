//! Process-level figures reported by `/health` and `.status`.

use std::time::Duration;

/// Resident set size of this process in bytes, if the platform exposes it.
pub fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

/// Extract `VmRSS` (reported in kB) from a `/proc/<pid>/status` dump.
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kb * 1024)
}

/// Memory as shown in chat replies, e.g. `12.34 MB`.
pub fn format_memory(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) => format!("{:.2} MB", b as f64 / 1024.0 / 1024.0),
        None => "unknown".to_string(),
    }
}

/// Whole minutes, rounded down.
pub fn uptime_minutes(uptime: Duration) -> u64 {
    uptime.as_secs() / 60
}
