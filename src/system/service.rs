//! Service manager access through systemctl(1).

use std::process::Command;

use tracing::debug;

use crate::core::{Result, TuneError};

pub trait ServiceManager {
    fn is_active(&self, unit: &str) -> Result<bool>;
    fn enable(&mut self, unit: &str) -> Result<()>;
    fn start(&mut self, unit: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct Systemctl;

impl Systemctl {
    fn run(&self, verb: &str, unit: &str) -> Result<()> {
        debug!("systemctl {} {}", verb, unit);
        let output = Command::new("systemctl")
            .args([verb, unit])
            .output()
            .map_err(|e| TuneError::CommandFailed(format!("systemctl {} {}: {}", verb, unit, e)))?;
        if !output.status.success() {
            return Err(TuneError::CommandFailed(format!(
                "systemctl {} {} exited with {}: {}",
                verb,
                unit,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl ServiceManager for Systemctl {
    fn is_active(&self, unit: &str) -> Result<bool> {
        // `is-active` exits non-zero for inactive units; only a spawn
        // failure is an error here.
        let output = Command::new("systemctl")
            .args(["is-active", "--quiet", unit])
            .status()
            .map_err(|e| {
                TuneError::CommandFailed(format!("systemctl is-active {}: {}", unit, e))
            })?;
        Ok(output.success())
    }

    fn enable(&mut self, unit: &str) -> Result<()> {
        self.run("enable", unit)
    }

    fn start(&mut self, unit: &str) -> Result<()> {
        self.run("start", unit)
    }
}
