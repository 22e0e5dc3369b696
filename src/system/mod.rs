//! Interfaces to the host: kernel parameters, mounts, services, memory.
//!
//! Each interface is a trait with a production implementation that shells
//! out to the usual administration utilities. Tests substitute in-memory
//! fakes. Command exit status is always checked; a failed write surfaces as
//! an error instead of being silently dropped.

pub mod memory;
pub mod mount;
pub mod service;
pub mod sysctl;

pub use mount::{MountTable, ProcMounts, TmpfsState};
pub use service::{ServiceManager, Systemctl};
pub use sysctl::{KernelParams, Sysctl};
