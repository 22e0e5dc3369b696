//! tmpfs sizing against total virtual memory.
//!
//! SAP instances back their shared memory with /dev/shm, so the mount is
//! sized to a percentage of RAM plus swap. The tool only ever grows the
//! mount: shrinking a live tmpfs can invalidate mapped segments, so a
//! required size at or below the current one is left alone.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Sysconfig;
use crate::core::{keys, Result, TunableValue, TuneError};
use crate::storage::SavedStateStore;
use crate::system::MountTable;

pub const DEFAULT_TMPFS_PATH: &str = "/dev/shm";

/// Share of virtual memory given to tmpfs when the profile does not say.
pub const DEFAULT_VSZ_PERCENT: u64 = 75;

/// Required tmpfs size in KB, integer arithmetic.
pub fn required_size_kb(virtual_memory_kb: u64, percent: u64) -> u64 {
    virtual_memory_kb * percent / 100
}

/// Rewrite a mount option string with a new size clause, dropping any prior
/// explicit size and keeping everything else.
pub fn options_with_size(options: &str, size_kb: u64) -> String {
    let kept: Vec<&str> = options
        .split(',')
        .filter(|opt| !opt.is_empty() && !opt.starts_with("size="))
        .collect();
    let size = format!("size={}k", size_kb);
    if kept.is_empty() {
        size
    } else {
        format!("{},{}", kept.join(","), size)
    }
}

pub fn apply_tmpfs(
    mounts: &mut dyn MountTable,
    store: &SavedStateStore,
    config: &Sysconfig,
    virtual_memory_kb: u64,
    path: &Path,
    dry_run: bool,
) -> Result<()> {
    let state = mounts
        .tmpfs_state(path)
        .map_err(|e| {
            TuneError::FatalPrecondition(format!(
                "cannot inspect tmpfs at '{}': {}",
                path.display(),
                e
            ))
        })?
        .ok_or_else(|| {
            TuneError::FatalPrecondition(format!("no tmpfs mounted at '{}'", path.display()))
        })?;

    let percent = config.get_u64("VSZ_TMPFS_PERCENT").unwrap_or_else(|| {
        warn!(
            "VSZ_TMPFS_PERCENT is not configured, defaulting to {}%",
            DEFAULT_VSZ_PERCENT
        );
        DEFAULT_VSZ_PERCENT
    });
    let required = required_size_kb(virtual_memory_kb, percent);

    if required <= state.size_kb {
        info!(
            "tmpfs {} left at {} KB (required {} KB)",
            path.display(),
            state.size_kb,
            required
        );
        return Ok(());
    }
    if dry_run {
        info!(
            "tmpfs {}: {} KB -> {} KB (dry run)",
            path.display(),
            state.size_kb,
            required
        );
        return Ok(());
    }

    // Both the size and the full prior option string are captured, so revert
    // can put the mount back exactly as it was.
    store.save(keys::TMPFS_SIZE, &TunableValue::Scalar(state.size_kb))?;
    store.save(keys::TMPFS_MOUNT_OPTS, &TunableValue::Text(state.options.clone()))?;

    let new_options = options_with_size(&state.options, required);
    mounts.remount(path, &new_options)?;
    info!(
        "tmpfs {}: {} KB -> {} KB",
        path.display(),
        state.size_kb,
        required
    );
    Ok(())
}
