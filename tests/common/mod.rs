//! In-memory stand-ins for the system interfaces.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use saptuner::core::Result;
use saptuner::system::{KernelParams, MountTable, ServiceManager, TmpfsState};
use saptuner::TuneError;

// ---------------------------------------------------------------------------
// FakeKernel
// ---------------------------------------------------------------------------

/// Kernel parameter table backed by a shared map, recording every write.
#[derive(Clone, Default)]
pub struct FakeKernel {
    values: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeKernel {
    pub fn with_values(pairs: &[(&str, &str)]) -> Self {
        let kernel = Self::default();
        {
            let mut values = kernel.values.lock().unwrap();
            for (k, v) in pairs {
                values.insert(k.to_string(), v.to_string());
            }
        }
        kernel
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Adjust the live table without recording a write.
    pub fn set_value(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn writes_for(&self, key: &str) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl KernelParams for FakeKernel {
    fn get(&self, name: &str) -> Result<String> {
        self.values
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| TuneError::CommandFailed(format!("unknown parameter '{}'", name)))
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeMounts
// ---------------------------------------------------------------------------

/// A single tmpfs mount whose state tracks remounts like the kernel would.
#[derive(Clone, Default)]
pub struct FakeMounts {
    state: Arc<Mutex<Option<TmpfsState>>>,
    remounts: Arc<Mutex<Vec<String>>>,
}

impl FakeMounts {
    pub fn with_tmpfs(size_kb: u64, options: &str) -> Self {
        let mounts = Self::default();
        *mounts.state.lock().unwrap() = Some(TmpfsState {
            size_kb,
            options: options.to_string(),
        });
        mounts
    }

    pub fn unmounted() -> Self {
        Self::default()
    }

    pub fn size_kb(&self) -> Option<u64> {
        self.state.lock().unwrap().as_ref().map(|s| s.size_kb)
    }

    pub fn options(&self) -> Option<String> {
        self.state.lock().unwrap().as_ref().map(|s| s.options.clone())
    }

    pub fn remounts(&self) -> Vec<String> {
        self.remounts.lock().unwrap().clone()
    }
}

impl MountTable for FakeMounts {
    fn tmpfs_state(&self, _path: &Path) -> Result<Option<TmpfsState>> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn remount(&mut self, _path: &Path, options: &str) -> Result<()> {
        self.remounts.lock().unwrap().push(options.to_string());
        let mut state = self.state.lock().unwrap();
        let Some(state) = state.as_mut() else {
            return Err(TuneError::CommandFailed("nothing mounted".to_string()));
        };
        state.options = options.to_string();
        if let Some(size) = options
            .split(',')
            .find_map(|opt| opt.strip_prefix("size="))
        {
            if let Ok(kb) = size.trim_end_matches('k').parse() {
                state.size_kb = kb;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeServices
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct FakeServices {
    active: Arc<Mutex<bool>>,
    enables: Arc<Mutex<Vec<String>>>,
    starts: Arc<Mutex<Vec<String>>>,
}

impl FakeServices {
    pub fn active() -> Self {
        let services = Self::default();
        *services.active.lock().unwrap() = true;
        services
    }

    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn enable_count(&self) -> usize {
        self.enables.lock().unwrap().len()
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }
}

impl ServiceManager for FakeServices {
    fn is_active(&self, _unit: &str) -> Result<bool> {
        Ok(*self.active.lock().unwrap())
    }

    fn enable(&mut self, unit: &str) -> Result<()> {
        self.enables.lock().unwrap().push(unit.to_string());
        Ok(())
    }

    fn start(&mut self, unit: &str) -> Result<()> {
        self.starts.lock().unwrap().push(unit.to_string());
        *self.active.lock().unwrap() = true;
        Ok(())
    }
}
