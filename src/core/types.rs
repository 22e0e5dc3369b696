use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Result, TuneError};

// ============================================================================
// Tunable keys
// ============================================================================

/// Stable keys under which pre-change values are persisted. A key is unique
/// within the state store namespace; kernel parameters reuse their sysctl
/// names so logs and store records line up with `sysctl -a` output.
pub mod keys {
    pub const SHMMAX: &str = "kernel.shmmax";
    pub const SHMALL: &str = "kernel.shmall";
    pub const SEM: &str = "kernel.sem";
    pub const MAX_MAP_COUNT: &str = "vm.max_map_count";
    pub const PAGECACHE_LIMIT_MB: &str = "vm.pagecache_limit_mb";
    pub const PAGECACHE_LIMIT_IGNORE_DIRTY: &str = "vm.pagecache_limit_ignore_dirty";
    pub const TMPFS_SIZE: &str = "tmpfs.size";
    pub const TMPFS_MOUNT_OPTS: &str = "tmpfs.mount_opts";

    /// Every key that participates in the save/restore cycle, in apply order.
    pub const ALL: [&str; 8] = [
        SHMMAX,
        SHMALL,
        MAX_MAP_COUNT,
        SEM,
        PAGECACHE_LIMIT_MB,
        PAGECACHE_LIMIT_IGNORE_DIRTY,
        TMPFS_SIZE,
        TMPFS_MOUNT_OPTS,
    ];
}

// ============================================================================
// Semaphore limits (kernel.sem)
// ============================================================================

/// The four fields of `kernel.sem`, in the order the kernel reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemLimits {
    /// Maximum semaphores per array.
    pub semmsl: u64,
    /// Maximum semaphores system-wide.
    pub semmns: u64,
    /// Maximum operations per semop call.
    pub semopm: u64,
    /// Maximum number of arrays.
    pub semmni: u64,
}

impl fmt::Display for SemLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.semmsl, self.semmns, self.semopm, self.semmni
        )
    }
}

impl FromStr for SemLimits {
    type Err = TuneError;

    /// Parses the kernel's wire form, four integers separated by whitespace
    /// (`sysctl -n kernel.sem` uses tabs).
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<u64> = s
            .split_whitespace()
            .map(|f| {
                f.parse::<u64>()
                    .map_err(|_| TuneError::ParseError(format!("bad kernel.sem field '{}'", f)))
            })
            .collect::<Result<_>>()?;
        if fields.len() != 4 {
            return Err(TuneError::ParseError(format!(
                "kernel.sem needs 4 fields, got {} in '{}'",
                fields.len(),
                s
            )));
        }
        Ok(SemLimits {
            semmsl: fields[0],
            semmns: fields[1],
            semopm: fields[2],
            semmni: fields[3],
        })
    }
}

// ============================================================================
// Tunable values
// ============================================================================

/// A tunable's value in structured form. Multi-field parameters are kept as
/// named integer tuples rather than space-joined strings so comparison and
/// persistence work field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunableValue {
    Scalar(u64),
    Sem(SemLimits),
    Text(String),
}

impl fmt::Display for TunableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{}", v),
            Self::Sem(sem) => write!(f, "{}", sem),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Saved snapshot record
// ============================================================================

/// Persisted pre-change value of one tunable. Written at most once per
/// activation cycle, deleted by a successful revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSnapshot {
    pub key: String,
    pub value: TunableValue,
    pub saved_at: DateTime<Utc>,
}
