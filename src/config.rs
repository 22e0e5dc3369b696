//! Sysconfig-style configuration input.
//!
//! The tuning profile is a plain `KEY="value"` file in the `/etc/sysconfig`
//! tradition. Values are held as opaque strings; typed accessors convert on
//! demand and treat garbage as absent (with a warning) so a single bad entry
//! never aborts a run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::core::{Result, TuneError};

/// Default profile location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sysconfig/saptuner";

#[derive(Debug, Clone, Default)]
pub struct Sysconfig {
    values: HashMap<String, String>,
}

impl Sysconfig {
    /// Load a profile from disk. A missing or unreadable file is a fatal
    /// precondition for the apply path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            TuneError::FatalPrecondition(format!(
                "cannot read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::parse(&raw))
    }

    /// Parse profile text. Blank lines and `#` comments are ignored; the
    /// first `=` splits key from value; surrounding single or double quotes
    /// are stripped.
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            values.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Self { values }
    }

    /// Insert or replace a single entry. Mainly useful in tests.
    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Numeric accessor. An entry that does not parse logs a warning and
    /// reads as absent.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let raw = self.get_str(key)?;
        match raw.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("configuration value {}='{}' is not an integer, ignoring", key, raw);
                None
            }
        }
    }

    /// True when the entry is the literal `yes` (case-insensitive).
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get_str(key)
            .map(|v| v.eq_ignore_ascii_case("yes"))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        &v[1..v.len() - 1]
    } else {
        v
    }
}
