//! Shared memory, map count, and semaphore tunables.
//!
//! Every write follows the same sequence: read the live value, resolve the
//! target, snapshot the live value, write the target. A target equal to the
//! live value short-circuits with zero writes and zero snapshots, which is
//! what makes a repeated apply a no-op.

use tracing::info;

use crate::config::Sysconfig;
use crate::core::{keys, Result, SemLimits, TunableValue, TuneError};
use crate::resolver::floor::{floors, resolve};
use crate::storage::SavedStateStore;
use crate::system::KernelParams;

pub fn apply_shmmax(
    kernel: &mut dyn KernelParams,
    store: &SavedStateStore,
    config: &Sysconfig,
    dry_run: bool,
) -> Result<()> {
    apply_scalar(
        kernel,
        store,
        keys::SHMMAX,
        config.get_u64("SHMMAX"),
        Some(floors::SHMMAX),
        dry_run,
    )
}

pub fn apply_shmall(
    kernel: &mut dyn KernelParams,
    store: &SavedStateStore,
    config: &Sysconfig,
    dry_run: bool,
) -> Result<()> {
    apply_scalar(
        kernel,
        store,
        keys::SHMALL,
        config.get_u64("SHMALL"),
        Some(floors::SHMALL),
        dry_run,
    )
}

pub fn apply_max_map_count(
    kernel: &mut dyn KernelParams,
    store: &SavedStateStore,
    config: &Sysconfig,
    dry_run: bool,
) -> Result<()> {
    apply_scalar(
        kernel,
        store,
        keys::MAX_MAP_COUNT,
        config.get_u64("MAX_MAP_COUNT"),
        Some(floors::MAX_MAP_COUNT),
        dry_run,
    )
}

/// Resolve all four kernel.sem fields independently, then snapshot and write
/// the tuple as one operation iff at least one field differs.
pub fn apply_sem(
    kernel: &mut dyn KernelParams,
    store: &SavedStateStore,
    config: &Sysconfig,
    dry_run: bool,
) -> Result<()> {
    let raw = read_current(kernel, keys::SEM)?;
    let current: SemLimits = raw.parse().map_err(|_| TuneError::UnresolvedTunable {
        key: keys::SEM.to_string(),
        reason: format!("current value '{}' is not a 4-field tuple", raw),
    })?;

    let target = SemLimits {
        semmsl: resolve(config.get_u64("SEMMSL"), Some(floors::SEMMSL), current.semmsl),
        semmns: resolve(config.get_u64("SEMMNS"), Some(floors::SEMMNS), current.semmns),
        semopm: resolve(config.get_u64("SEMOPM"), Some(floors::SEMOPM), current.semopm),
        semmni: resolve(config.get_u64("SEMMNI"), Some(floors::SEMMNI), current.semmni),
    };

    if target == current {
        info!("{} unchanged at {}", keys::SEM, current);
        return Ok(());
    }
    if dry_run {
        info!("{}: {} -> {} (dry run)", keys::SEM, current, target);
        return Ok(());
    }

    store.save(keys::SEM, &TunableValue::Sem(current))?;
    kernel.set(keys::SEM, &target.to_string())?;
    info!("{}: {} -> {}", keys::SEM, current, target);
    Ok(())
}

/// One scalar kernel parameter under the floor policy.
pub fn apply_scalar(
    kernel: &mut dyn KernelParams,
    store: &SavedStateStore,
    key: &str,
    configured: Option<u64>,
    floor: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let raw = read_current(kernel, key)?;
    let current: u64 = raw.parse().map_err(|_| TuneError::UnresolvedTunable {
        key: key.to_string(),
        reason: format!("current value '{}' is not an integer", raw),
    })?;

    let target = resolve(configured, floor, current);
    if target == current {
        info!("{} unchanged at {}", key, current);
        return Ok(());
    }
    if dry_run {
        info!("{}: {} -> {} (dry run)", key, current, target);
        return Ok(());
    }

    store.save(key, &TunableValue::Scalar(current))?;
    kernel.set(key, &target.to_string())?;
    info!("{}: {} -> {}", key, current, target);
    Ok(())
}

fn read_current(kernel: &dyn KernelParams, key: &str) -> Result<String> {
    kernel.get(key).map_err(|e| TuneError::UnresolvedTunable {
        key: key.to_string(),
        reason: format!("cannot read current value: {}", e),
    })
}
