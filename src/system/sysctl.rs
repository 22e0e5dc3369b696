//! Kernel parameter access through sysctl(8).

use std::process::Command;

use tracing::debug;

use crate::core::{Result, TuneError};

/// Read/write access to named kernel parameters.
pub trait KernelParams {
    fn get(&self, name: &str) -> Result<String>;
    fn set(&mut self, name: &str, value: &str) -> Result<()>;
}

/// Production implementation shelling out to the sysctl utility.
#[derive(Debug, Default)]
pub struct Sysctl;

impl KernelParams for Sysctl {
    fn get(&self, name: &str) -> Result<String> {
        let output = Command::new("sysctl")
            .args(["-n", name])
            .output()
            .map_err(|e| TuneError::CommandFailed(format!("sysctl -n {}: {}", name, e)))?;
        if !output.status.success() {
            return Err(TuneError::CommandFailed(format!(
                "sysctl -n {} exited with {}: {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let setting = format!("{}={}", name, value);
        debug!("sysctl -w {}", setting);
        let output = Command::new("sysctl")
            .args(["-w", &setting])
            .output()
            .map_err(|e| TuneError::CommandFailed(format!("sysctl -w {}: {}", setting, e)))?;
        if !output.status.success() {
            return Err(TuneError::CommandFailed(format!(
                "sysctl -w {} exited with {}: {}",
                setting,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
