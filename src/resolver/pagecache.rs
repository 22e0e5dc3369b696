//! Page-cache limiting (vm.pagecache_limit_mb), a SLES kernel feature.
//!
//! Unlike the shared-memory floors this class is allowed to lower the live
//! value: with the feature switched off the limit is forced to 0 no matter
//! what was configured or live before, which keeps a stale limit from
//! throttling a host after the profile disabled the feature.

use tracing::warn;

use crate::config::Sysconfig;
use crate::core::{keys, Result};
use crate::resolver::kernel::apply_scalar;
use crate::storage::SavedStateStore;
use crate::system::KernelParams;

pub fn apply_pagecache(
    kernel: &mut dyn KernelParams,
    store: &SavedStateStore,
    config: &Sysconfig,
    dry_run: bool,
) -> Result<()> {
    let enabled = config.is_enabled("ENABLE_PAGECACHE_LIMIT");

    let limit_mb = if enabled {
        config.get_u64("PAGECACHE_LIMIT_MB").unwrap_or_else(|| {
            warn!("ENABLE_PAGECACHE_LIMIT is set but PAGECACHE_LIMIT_MB is not, leaving the limit disabled");
            0
        })
    } else {
        0
    };

    // No floor: the resolved target is exactly the configured (or forced)
    // value, and decreases are permitted.
    apply_scalar(
        kernel,
        store,
        keys::PAGECACHE_LIMIT_MB,
        Some(limit_mb),
        None,
        dry_run,
    )?;

    if enabled {
        let ignore_dirty = config.get_u64("PAGECACHE_LIMIT_IGNORE_DIRTY").unwrap_or_else(|| {
            warn!("PAGECACHE_LIMIT_IGNORE_DIRTY is not configured, defaulting to 0");
            0
        });
        apply_scalar(
            kernel,
            store,
            keys::PAGECACHE_LIMIT_IGNORE_DIRTY,
            Some(ignore_dirty),
            None,
            dry_run,
        )?;
    }

    Ok(())
}
