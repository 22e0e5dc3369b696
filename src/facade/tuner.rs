//! High-level apply/revert orchestration.
//!
//! `Tuner` owns the state store and the system interfaces and runs the
//! tunables in a fixed sequence. Per-tunable failures are logged and the
//! sequence continues; only a missing precondition (config, tmpfs mount)
//! or an unusable state store stops an apply run. A revert run never
//! stops: every key degrades independently to a logged no-op.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Sysconfig;
use crate::core::{keys, Result, TunableValue, TuneError};
use crate::limits;
use crate::resolver::{kernel, pagecache, tmpfs};
use crate::storage::SavedStateStore;
use crate::system::{self, KernelParams, MountTable, ProcMounts, ServiceManager, Sysctl, Systemctl};

/// Socket unit backing SAP's UUID daemon.
pub const UUIDD_SOCKET: &str = "uuidd.socket";

/// Keys restored through the kernel-parameter interface, in revert order.
const KERNEL_KEYS: [&str; 6] = [
    keys::SHMMAX,
    keys::SHMALL,
    keys::MAX_MAP_COUNT,
    keys::SEM,
    keys::PAGECACHE_LIMIT_MB,
    keys::PAGECACHE_LIMIT_IGNORE_DIRTY,
];

/// Live value and pending snapshot of one tunable, for status reporting.
#[derive(Debug, Clone)]
pub struct TunableStatus {
    pub key: String,
    pub live: Option<String>,
    pub saved: Option<TunableValue>,
}

pub struct Tuner {
    config: Sysconfig,
    store: SavedStateStore,
    kernel: Box<dyn KernelParams>,
    mounts: Box<dyn MountTable>,
    services: Box<dyn ServiceManager>,
    tmpfs_path: PathBuf,
    limits_path: PathBuf,
    /// Test override; production reads /proc/meminfo.
    virtual_memory_kb: Option<u64>,
    dry_run: bool,
}

impl Tuner {
    /// Production wiring: sysctl, /proc/mounts, systemctl.
    pub fn new(config: Sysconfig, store: SavedStateStore) -> Self {
        Self::with_interfaces(
            config,
            store,
            Box::new(Sysctl),
            Box::new(ProcMounts),
            Box::new(Systemctl),
        )
    }

    /// Explicit interface wiring, the entry point for tests.
    pub fn with_interfaces(
        config: Sysconfig,
        store: SavedStateStore,
        kernel: Box<dyn KernelParams>,
        mounts: Box<dyn MountTable>,
        services: Box<dyn ServiceManager>,
    ) -> Self {
        Self {
            config,
            store,
            kernel,
            mounts,
            services,
            tmpfs_path: PathBuf::from(tmpfs::DEFAULT_TMPFS_PATH),
            limits_path: PathBuf::from(limits::DEFAULT_LIMITS_PATH),
            virtual_memory_kb: None,
            dry_run: false,
        }
    }

    pub fn with_tmpfs_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.tmpfs_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_limits_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.limits_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_virtual_memory_kb(mut self, kb: u64) -> Self {
        self.virtual_memory_kb = Some(kb);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    // ------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------

    pub fn apply(&mut self) -> Result<()> {
        info!("applying SAP tuning profile{}", if self.dry_run { " (dry run)" } else { "" });

        let r = kernel::apply_shmmax(self.kernel.as_mut(), &self.store, &self.config, self.dry_run);
        absorb_skippable(keys::SHMMAX, r)?;
        let r = kernel::apply_shmall(self.kernel.as_mut(), &self.store, &self.config, self.dry_run);
        absorb_skippable(keys::SHMALL, r)?;
        let r = kernel::apply_max_map_count(
            self.kernel.as_mut(),
            &self.store,
            &self.config,
            self.dry_run,
        );
        absorb_skippable(keys::MAX_MAP_COUNT, r)?;
        let r = kernel::apply_sem(self.kernel.as_mut(), &self.store, &self.config, self.dry_run);
        absorb_skippable(keys::SEM, r)?;
        let r = pagecache::apply_pagecache(
            self.kernel.as_mut(),
            &self.store,
            &self.config,
            self.dry_run,
        );
        absorb_skippable(keys::PAGECACHE_LIMIT_MB, r)?;

        let vsz = self.virtual_memory()?;
        let r = tmpfs::apply_tmpfs(
            self.mounts.as_mut(),
            &self.store,
            &self.config,
            vsz,
            &self.tmpfs_path,
            self.dry_run,
        );
        absorb_skippable(keys::TMPFS_SIZE, r)?;

        let rules = limits::configured_rules(&self.config);
        let r = limits::reconcile(&self.limits_path, &rules, self.dry_run);
        absorb_skippable("limits", r)?;

        self.ensure_uuidd();

        info!("apply finished");
        Ok(())
    }

    fn virtual_memory(&self) -> Result<u64> {
        match self.virtual_memory_kb {
            Some(kb) => Ok(kb),
            None => system::memory::virtual_memory_kb().map_err(|e| {
                TuneError::FatalPrecondition(format!("cannot size virtual memory: {}", e))
            }),
        }
    }

    /// Idempotent service enablement: the service manager is only called
    /// when the unit is not already active.
    fn ensure_uuidd(&mut self) {
        match self.services.is_active(UUIDD_SOCKET) {
            Ok(true) => debug!("{} already active", UUIDD_SOCKET),
            Ok(false) => {
                if self.dry_run {
                    info!("{} would be enabled and started (dry run)", UUIDD_SOCKET);
                    return;
                }
                if let Err(e) = self.services.enable(UUIDD_SOCKET) {
                    warn!("cannot enable {}: {}", UUIDD_SOCKET, e);
                    return;
                }
                if let Err(e) = self.services.start(UUIDD_SOCKET) {
                    warn!("cannot start {}: {}", UUIDD_SOCKET, e);
                    return;
                }
                info!("{} enabled and started", UUIDD_SOCKET);
            }
            Err(e) => warn!("cannot query {}: {}", UUIDD_SOCKET, e),
        }
    }

    // ------------------------------------------------------------------
    // Revert
    // ------------------------------------------------------------------

    /// Restore every tunable with a pending snapshot. Best effort: storage
    /// or system-call failures leave the key (and its snapshot) in place
    /// and the walk continues.
    pub fn revert(&mut self) -> Result<()> {
        info!("reverting SAP tuning profile{}", if self.dry_run { " (dry run)" } else { "" });

        for key in KERNEL_KEYS {
            self.revert_kernel_key(key);
        }
        self.revert_tmpfs();

        info!("revert finished");
        Ok(())
    }

    fn revert_kernel_key(&mut self, key: &str) {
        let value = match self.store.restore(key) {
            Ok(Some(v)) => v,
            Ok(None) => {
                debug!("no snapshot for {}, nothing to revert", key);
                return;
            }
            Err(e) => {
                warn!("cannot read snapshot for {}: {}", key, e);
                return;
            }
        };
        if self.dry_run {
            info!("{} would be restored to {} (dry run)", key, value);
            return;
        }
        match self.kernel.set(key, &value.to_string()) {
            Ok(()) => {
                info!("{} restored to {}", key, value);
                if let Err(e) = self.store.clear(key) {
                    warn!("restored {} but cannot clear its snapshot: {}", key, e);
                }
            }
            // The snapshot stays so a later revert can retry.
            Err(e) => warn!("cannot restore {}: {}", key, e),
        }
    }

    fn revert_tmpfs(&mut self) {
        let size = match self.store.restore(keys::TMPFS_SIZE) {
            Ok(v) => v,
            Err(e) => {
                warn!("cannot read snapshot for {}: {}", keys::TMPFS_SIZE, e);
                return;
            }
        };
        let opts = match self.store.restore(keys::TMPFS_MOUNT_OPTS) {
            Ok(v) => v,
            Err(e) => {
                warn!("cannot read snapshot for {}: {}", keys::TMPFS_MOUNT_OPTS, e);
                return;
            }
        };

        let options = match (&opts, &size) {
            (None, None) => {
                debug!("no tmpfs snapshot, nothing to revert");
                return;
            }
            (Some(TunableValue::Text(o)), Some(TunableValue::Scalar(kb))) => {
                tmpfs::options_with_size(o, *kb)
            }
            (Some(TunableValue::Text(o)), None) => o.clone(),
            (None, Some(TunableValue::Scalar(kb))) => format!("size={}k", kb),
            _ => {
                warn!("tmpfs snapshot records have unexpected types, leaving mount untouched");
                return;
            }
        };

        if self.dry_run {
            info!(
                "tmpfs {} would be remounted with '{}' (dry run)",
                self.tmpfs_path.display(),
                options
            );
            return;
        }
        match self.mounts.remount(&self.tmpfs_path, &options) {
            Ok(()) => {
                info!("tmpfs {} remounted with '{}'", self.tmpfs_path.display(), options);
                for key in [keys::TMPFS_SIZE, keys::TMPFS_MOUNT_OPTS] {
                    if let Err(e) = self.store.clear(key) {
                        warn!("restored tmpfs but cannot clear snapshot {}: {}", key, e);
                    }
                }
            }
            Err(e) => warn!("cannot remount tmpfs {}: {}", self.tmpfs_path.display(), e),
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Live values next to pending snapshots, for every managed key.
    pub fn status(&self) -> Vec<TunableStatus> {
        let mut report = Vec::new();

        for key in KERNEL_KEYS {
            report.push(TunableStatus {
                key: key.to_string(),
                live: self.kernel.get(key).ok(),
                saved: self.store.restore(key).ok().flatten(),
            });
        }

        let tmpfs_state = self.mounts.tmpfs_state(&self.tmpfs_path).ok().flatten();
        report.push(TunableStatus {
            key: keys::TMPFS_SIZE.to_string(),
            live: tmpfs_state.as_ref().map(|s| format!("{} KB", s.size_kb)),
            saved: self.store.restore(keys::TMPFS_SIZE).ok().flatten(),
        });
        report.push(TunableStatus {
            key: keys::TMPFS_MOUNT_OPTS.to_string(),
            live: tmpfs_state.map(|s| s.options),
            saved: self.store.restore(keys::TMPFS_MOUNT_OPTS).ok().flatten(),
        });

        report
    }
}

/// Apply-path error policy: per-tunable failures are logged and skipped,
/// missing preconditions and an unusable store abort the run.
fn absorb_skippable(key: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ (TuneError::FatalPrecondition(_) | TuneError::StorageUnavailable(_))) => Err(e),
        Err(e) => {
            warn!("skipping {}: {}", key, e);
            Ok(())
        }
    }
}
