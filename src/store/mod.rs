// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for autosave backups on disk.
//!
//! The store module owns the shared backup directory: atomic file replacement, the per-document
//! autosave slot, and the retention policy that keeps the directory under its byte budget.

pub mod atomic;
pub mod autosave;
pub mod backup_dir;
pub mod retention;

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::codec::CodecError;
use crate::config::GraphFileConfig;

pub use atomic::{write_atomic, WriteDurability};
pub use autosave::{AutosaveStore, AutosaveWrite};
pub use backup_dir::{BackupDirectory, BackupFile, LocalBackupDirectory};
pub use retention::{
    select_for_deletion, RetentionBudget, RetentionPolicy, SweepOutcome, SweepReport,
};

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Codec {
        path: PathBuf,
        source: CodecError,
    },
    Config {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    InvalidBackupName {
        name: String,
    },
    NoFreeBackupSlot {
        root: PathBuf,
        stem: String,
    },
    SymlinkRefused {
        path: PathBuf,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Codec { path, source } => write!(f, "cannot encode backup {path:?}: {source}"),
            Self::Config { path, source } => write!(f, "invalid config {path:?}: {source}"),
            Self::InvalidBackupName { name } => {
                write!(f, "backup name must be a plain file name: {name:?}")
            }
            Self::NoFreeBackupSlot { root, stem } => {
                write!(f, "no free backup slot for {stem:?} in {root:?}")
            }
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Codec { source, .. } => Some(source),
            Self::Config { source, .. } => Some(source.as_ref()),
            Self::InvalidBackupName { .. } => None,
            Self::NoFreeBackupSlot { .. } => None,
            Self::SymlinkRefused { .. } => None,
        }
    }
}

/// One retention sweep over the configured backup root, without writing anything.
///
/// This is the startup/cleanup entry point; autosave runs the same policy after every write.
pub fn sweep_backup_root(config: &GraphFileConfig) -> Result<SweepReport, StoreError> {
    let root = config.ensure_backup_root()?;
    RetentionPolicy::new(config.budget()).sweep(&LocalBackupDirectory::new(root))
}
