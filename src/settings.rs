use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard},
    time::Duration,
};

use crate::db::WriteFailurePolicy;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorSettings {
    /// Store file is `<data dir>/<database_name>.sqlite3`.
    pub database_name: String,
    pub sample_interval_ms: u64,
    pub write_failure_policy: WriteFailurePolicy,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            database_name: "motion".into(),
            sample_interval_ms: 100,
            write_failure_policy: WriteFailurePolicy::Halt,
        }
    }
}

impl CollectorSettings {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Per-user data directory for the collector.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs_next::data_dir()
        .map(|dir| dir.join("motion-collector"))
        .context("no per-user data directory available on this platform")
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CollectorSettings>,
}

impl SettingsStore {
    /// Loads `settings.json` from `dir`. A missing file is created with the
    /// defaults; an unreadable one falls back to defaults without being
    /// overwritten.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                CollectorSettings::default()
            })
        } else {
            let defaults = CollectorSettings::default();
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            persist(&path, &defaults)?;
            info!("Wrote default settings to {}", path.display());
            defaults
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, CollectorSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn settings(&self) -> CollectorSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: CollectorSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        persist(&self.path, &settings)?;
        *guard = settings;
        Ok(())
    }
}

fn persist(path: &Path, data: &CollectorSettings) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}
