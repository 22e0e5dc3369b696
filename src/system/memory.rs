//! Total virtual memory (RAM plus swap) from /proc/meminfo.

use std::fs;

use crate::core::{Result, TuneError};

pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// MemTotal + SwapTotal in KB, the base quantity for tmpfs sizing.
pub fn virtual_memory_kb() -> Result<u64> {
    let raw = fs::read_to_string(PROC_MEMINFO)
        .map_err(|e| TuneError::IoError(format!("cannot read {}: {}", PROC_MEMINFO, e)))?;
    parse_meminfo(&raw)
}

fn parse_meminfo(raw: &str) -> Result<u64> {
    let mut mem_total = None;
    let mut swap_total = None;
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            mem_total = parse_kb_field(rest);
        } else if let Some(rest) = line.strip_prefix("SwapTotal:") {
            swap_total = parse_kb_field(rest);
        }
    }
    match mem_total {
        // A host without swap simply contributes 0.
        Some(mem) => Ok(mem + swap_total.unwrap_or(0)),
        None => Err(TuneError::ParseError(
            "MemTotal missing from /proc/meminfo".to_string(),
        )),
    }
}

fn parse_kb_field(rest: &str) -> Option<u64> {
    // Fields look like "   16389908 kB".
    rest.split_whitespace().next()?.parse().ok()
}
