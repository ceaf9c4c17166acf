// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime configuration for document handles and the shared backup directory.
//!
//! The home directory is an explicit value here; nothing else in the crate reads ambient
//! process state to find the backup root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{RetentionBudget, StoreError, WriteDurability};

pub const DEFAULT_BACKUP_SUBDIR: &str = "VioletUML";
pub const DEFAULT_MAX_DIRECTORY_BYTES: u64 = 100_000_000;
pub const DEFAULT_AUTOSAVE_EXTENSION: &str = "html";
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_AUTOSAVE_LOCK_TIMEOUT_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphFileConfig {
    /// Base directory the backup root hangs off (normally the user's home).
    pub home_dir: PathBuf,
    /// Fixed subpath of `home_dir` holding every document's autosave file.
    pub backup_subdir: String,
    /// Retention budget for the whole backup directory.
    pub max_directory_bytes: u64,
    /// Extension (without dot) of timestamp-named autosave files.
    pub autosave_extension: String,
    pub autosave_interval_secs: u64,
    /// How long an autosave tick may wait for the document lock before skipping.
    pub autosave_lock_timeout_ms: u64,
    /// Opt into fsync of autosave and explicit-save writes.
    pub durable_writes: bool,
}

impl Default for GraphFileConfig {
    fn default() -> Self {
        Self::for_home(dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}

impl GraphFileConfig {
    pub fn for_home(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            backup_subdir: DEFAULT_BACKUP_SUBDIR.to_owned(),
            max_directory_bytes: DEFAULT_MAX_DIRECTORY_BYTES,
            autosave_extension: DEFAULT_AUTOSAVE_EXTENSION.to_owned(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            autosave_lock_timeout_ms: DEFAULT_AUTOSAVE_LOCK_TIMEOUT_MS,
            durable_writes: false,
        }
    }

    /// Loads a TOML config file; missing keys fall back to [`GraphFileConfig::default`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| StoreError::Config {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Like [`GraphFileConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        match Self::load(path) {
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn with_max_directory_bytes(mut self, max_directory_bytes: u64) -> Self {
        self.max_directory_bytes = max_directory_bytes;
        self
    }

    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval_secs = interval.as_secs();
        self
    }

    pub fn backup_root(&self) -> PathBuf {
        self.home_dir.join(&self.backup_subdir)
    }

    /// Returns the backup root, creating it on first use.
    pub fn ensure_backup_root(&self) -> Result<PathBuf, StoreError> {
        let root = self.backup_root();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(root)
    }

    pub fn budget(&self) -> RetentionBudget {
        RetentionBudget::new(self.max_directory_bytes)
    }

    pub fn durability(&self) -> WriteDurability {
        if self.durable_writes {
            WriteDurability::Durable
        } else {
            WriteDurability::BestEffort
        }
    }

    /// Autosave period; a zero value is clamped to one second.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    pub fn autosave_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.autosave_lock_timeout_ms)
    }
}
