//! tmpfs mount inspection and remounting.

use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::core::{Result, TuneError};

pub const PROC_MOUNTS: &str = "/proc/mounts";

/// Current state of a tmpfs mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmpfsState {
    /// Filesystem size in KB (blocks times fragment size).
    pub size_kb: u64,
    /// The mount option string as listed in the mount table.
    pub options: String,
}

pub trait MountTable {
    /// State of the tmpfs mounted at `path`, or `None` when nothing is
    /// mounted there.
    fn tmpfs_state(&self, path: &Path) -> Result<Option<TmpfsState>>;

    /// Remount `path` with the given option string.
    fn remount(&mut self, path: &Path, options: &str) -> Result<()>;
}

/// Production implementation: options from /proc/mounts, size via statvfs,
/// remount through mount(8).
#[derive(Debug, Default)]
pub struct ProcMounts;

impl MountTable for ProcMounts {
    fn tmpfs_state(&self, path: &Path) -> Result<Option<TmpfsState>> {
        let raw = fs::read_to_string(PROC_MOUNTS)
            .map_err(|e| TuneError::IoError(format!("cannot read {}: {}", PROC_MOUNTS, e)))?;
        let Some(options) = find_tmpfs_options(&raw, path) else {
            return Ok(None);
        };
        let size_kb = statvfs_size_kb(path)?;
        Ok(Some(TmpfsState { size_kb, options }))
    }

    fn remount(&mut self, path: &Path, options: &str) -> Result<()> {
        let opts = format!("remount,{}", options);
        debug!("mount -o {} {}", opts, path.display());
        let output = Command::new("mount")
            .arg("-o")
            .arg(&opts)
            .arg(path)
            .output()
            .map_err(|e| {
                TuneError::CommandFailed(format!("mount -o {} {}: {}", opts, path.display(), e))
            })?;
        if !output.status.success() {
            return Err(TuneError::CommandFailed(format!(
                "mount -o {} {} exited with {}: {}",
                opts,
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Option string of the tmpfs mounted at `path`, from mount-table text with
/// `device mountpoint fstype options dump pass` lines.
fn find_tmpfs_options(mounts: &str, path: &Path) -> Option<String> {
    let wanted = path.to_str()?;
    for line in mounts.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() >= 4 && fields[1] == wanted && fields[2] == "tmpfs" {
            return Some(fields[3].to_string());
        }
    }
    None
}

fn statvfs_size_kb(path: &Path) -> Result<u64> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| TuneError::IoError(format!("path '{}' contains NUL", path.display())))?;
    let mut vfs: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut vfs) };
    if rc != 0 {
        return Err(TuneError::IoError(format!(
            "statvfs({}): {}",
            path.display(),
            std::io::Error::last_os_error()
        )));
    }
    Ok(vfs.f_blocks as u64 * vfs.f_frsize as u64 / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNTS: &str = "\
        sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0\n\
        proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0\n\
        tmpfs /dev/shm tmpfs rw,nosuid,nodev,size=8000000k 0 0\n\
        tmpfs /run tmpfs rw,nosuid,nodev,mode=755 0 0\n";

    #[test]
    fn finds_options_of_the_matching_mount_point() {
        assert_eq!(
            find_tmpfs_options(MOUNTS, Path::new("/dev/shm")),
            Some("rw,nosuid,nodev,size=8000000k".to_string())
        );
    }

    #[test]
    fn ignores_non_tmpfs_mount_points() {
        assert_eq!(find_tmpfs_options(MOUNTS, Path::new("/proc")), None);
    }

    #[test]
    fn missing_mount_point_yields_none() {
        assert_eq!(find_tmpfs_options(MOUNTS, Path::new("/mnt/data")), None);
    }
}
