// Target registry backed by a JSON file; re-read on every call so edits apply without restart.

use crate::models::{Target, TargetPatch};
use crate::probe::validate_target;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid target address: {0:?}")]
    InvalidAddress(String),
    #[error("target already exists: {0}")]
    Duplicate(String),
    #[error("target not found: {0}")]
    NotFound(String),
}

pub struct TargetRepo {
    path: PathBuf,
    /// Last successfully read list, served when the file is unreadable.
    last_known: Mutex<Vec<Target>>,
    /// Serializes read-modify-write edits.
    write_lock: tokio::sync::Mutex<()>,
}

impl TargetRepo {
    /// Open the registry, creating an empty one if the file does not exist.
    /// Fails only when no registry can be read or created at all.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            write_file(&path, &[])?;
            tracing::info!(path = %path.display(), "created empty target registry");
        }
        let initial = read_file(&path)?;
        Ok(Self {
            path,
            last_known: Mutex::new(initial),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Fresh read of every registry entry.
    #[instrument(skip(self), fields(repo = "targets", operation = "load"))]
    pub fn load(&self) -> Result<Vec<Target>, RegistryError> {
        let targets = read_file(&self.path)?;
        if let Ok(mut guard) = self.last_known.lock() {
            *guard = targets.clone();
        }
        Ok(targets)
    }

    /// Enabled targets from a fresh read; on failure, the last known set.
    pub fn enabled_targets(&self) -> Vec<Target> {
        let all = match self.load() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "load_targets",
                    "target registry unreadable, using last known set"
                );
                self.last_known
                    .lock()
                    .map(|g| g.clone())
                    .unwrap_or_default()
            }
        };
        all.into_iter().filter(|t| t.enabled).collect()
    }

    pub fn get(&self, address: &str) -> Result<Target, RegistryError> {
        let address = normalize_address(address);
        self.load()?
            .into_iter()
            .find(|t| t.address == address)
            .ok_or_else(|| RegistryError::NotFound(address.clone()))
    }

    #[instrument(skip(self, target), fields(repo = "targets", operation = "add", address = %target.address))]
    pub async fn add(&self, mut target: Target) -> Result<Target, RegistryError> {
        target.address = validate_target(&target.address)
            .map_err(|_| RegistryError::InvalidAddress(target.address.clone()))?
            .to_string();
        let _guard = self.write_lock.lock().await;
        let mut targets = self.load()?;
        if targets.iter().any(|t| t.address == target.address) {
            return Err(RegistryError::Duplicate(target.address));
        }
        targets.push(target.clone());
        self.save(&targets)?;
        Ok(target)
    }

    #[instrument(skip(self, patch), fields(repo = "targets", operation = "update"))]
    pub async fn update(&self, address: &str, patch: TargetPatch) -> Result<Target, RegistryError> {
        let address = normalize_address(address);
        let _guard = self.write_lock.lock().await;
        let mut targets = self.load()?;
        let entry = targets
            .iter_mut()
            .find(|t| t.address == address)
            .ok_or_else(|| RegistryError::NotFound(address.clone()))?;
        if let Some(name) = patch.display_name {
            entry.display_name = name;
        }
        if let Some(location) = patch.location {
            entry.location = location;
        }
        if let Some(enabled) = patch.enabled {
            entry.enabled = enabled;
        }
        let updated = entry.clone();
        self.save(&targets)?;
        Ok(updated)
    }

    pub async fn set_enabled(&self, address: &str, enabled: bool) -> Result<Target, RegistryError> {
        self.update(
            address,
            TargetPatch {
                enabled: Some(enabled),
                ..TargetPatch::default()
            },
        )
        .await
    }

    #[instrument(skip(self), fields(repo = "targets", operation = "remove"))]
    pub async fn remove(&self, address: &str) -> Result<Target, RegistryError> {
        let address = normalize_address(address);
        let _guard = self.write_lock.lock().await;
        let mut targets = self.load()?;
        let idx = targets
            .iter()
            .position(|t| t.address == address)
            .ok_or_else(|| RegistryError::NotFound(address.clone()))?;
        let removed = targets.remove(idx);
        self.save(&targets)?;
        Ok(removed)
    }

    fn save(&self, targets: &[Target]) -> Result<(), RegistryError> {
        write_file(&self.path, targets)?;
        if let Ok(mut guard) = self.last_known.lock() {
            *guard = targets.to_vec();
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<Target>, RegistryError> {
    let s = std::fs::read_to_string(path)?;
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Vec<Target> = serde_json::from_str(&s)?;
    Ok(normalize(parsed))
}

/// Canonical form of an address: the parsed IP when it is one, otherwise the trimmed text.
pub fn normalize_address(address: &str) -> String {
    validate_target(address)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| address.trim().to_string())
}

/// Canonicalize addresses and keep only the first entry for each one.
fn normalize(targets: Vec<Target>) -> Vec<Target> {
    let mut seen = HashSet::with_capacity(targets.len());
    let mut out = Vec::with_capacity(targets.len());
    for mut target in targets {
        target.address = normalize_address(&target.address);
        if !seen.insert(target.address.clone()) {
            tracing::warn!(
                target_address = %target.address,
                operation = "load_targets",
                "duplicate registry entry ignored"
            );
            continue;
        }
        out.push(target);
    }
    out
}

/// Write via a sibling temp file and rename so readers never see a partial file.
fn write_file(path: &Path, targets: &[Target]) -> Result<(), RegistryError> {
    let json = serde_json::to_string_pretty(targets)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_address_canonicalizes_ips() {
        assert_eq!(normalize_address(" 10.0.0.1 "), "10.0.0.1");
        assert_eq!(normalize_address("0:0:0:0:0:0:0:1"), "::1");
        assert_eq!(normalize_address(" not-an-ip "), "not-an-ip");
    }

    #[test]
    fn normalize_keeps_first_of_duplicates() {
        let targets = vec![
            Target::new("10.0.0.1", "first"),
            Target::new(" 10.0.0.1", "second"),
            Target::new("10.0.0.2", "other"),
        ];
        let out = normalize(targets);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].display_name, "first");
        assert_eq!(out[1].address, "10.0.0.2");
    }
}
