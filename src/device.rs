//! Exclusive ownership of a capture device across sessions.
//!
//! A lock file in the runtime directory marks the owner. Acquiring a device
//! that is already locked fails immediately; the lock goes away when the
//! lease is dropped.

use log::{info, warn};
use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::error::DeviceError;

#[derive(Debug)]
pub struct DeviceLock {
    device: String,
    path: PathBuf,
}

fn lock_name(device: &str) -> String {
    let safe: String = device
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("repctl-{safe}.lock")
}

pub fn lock_path(runtime_dir: &Path, device: &str) -> PathBuf {
    runtime_dir.join(lock_name(device))
}

impl DeviceLock {
    /// Takes the lease on `device`. A lock left behind by a process that no
    /// longer exists is reclaimed once; a live owner yields `Busy`.
    pub fn acquire(runtime_dir: &Path, device: &str) -> Result<Self, DeviceError> {
        fs::create_dir_all(runtime_dir)?;
        let path = lock_path(runtime_dir, device);

        let mut reclaimed = false;
        let mut f = loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => break f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let holder = fs::read_to_string(&path).ok();
                    let pid: Option<u32> = holder.as_deref().and_then(|s| s.trim().parse().ok());
                    if let Some(dead) = pid.filter(|p| !reclaimed && !process_alive(*p)) {
                        warn!("reclaiming stale lock on '{device}' left by pid {dead}");
                        fs::remove_file(&path)?;
                        reclaimed = true;
                        continue;
                    }
                    let owner = holder
                        .map(|s| format!("pid {}", s.trim()))
                        .unwrap_or_else(|| "another session".to_string());
                    return Err(DeviceError::Busy {
                        device: device.to_string(),
                        owner,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        };
        write!(f, "{}", std::process::id())?;

        info!("acquired capture device '{device}'");
        Ok(Self {
            device: device.to_string(),
            path,
        })
    }
}

/// Without procfs every owner counts as alive.
fn process_alive(pid: u32) -> bool {
    let proc = Path::new("/proc");
    !proc.is_dir() || proc.join(pid.to_string()).exists()
}

impl Drop for DeviceLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("released capture device '{}'", self.device),
            Err(e) => warn!("failed to release {}: {e}", self.path.display()),
        }
    }
}

/// Who holds `device`, if anyone.
pub fn owner(runtime_dir: &Path, device: &str) -> Option<String> {
    fs::read_to_string(lock_path(runtime_dir, device))
        .ok()
        .map(|s| s.trim().to_string())
}
