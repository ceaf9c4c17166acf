// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};

use super::atomic::{is_temp_file_name, write_atomic, WriteDurability};
use super::backup_dir::LocalBackupDirectory;
use super::retention::{RetentionPolicy, SweepReport};
use super::StoreError;
use crate::codec::{encode_to_vec, PersistenceCodec};
use crate::config::GraphFileConfig;

const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const MAX_BACKUP_SLOTS: u32 = 1000;

#[derive(Debug)]
pub enum AutosaveWrite {
    Written(SweepReport),
    /// The backup file was removed externally; autosave only ever replaces an existing file.
    SkippedMissingBackup,
}

/// One document's slot in the shared backup directory.
#[derive(Debug, Clone)]
pub struct AutosaveStore {
    path: PathBuf,
    directory: LocalBackupDirectory,
    policy: RetentionPolicy,
    durability: WriteDurability,
}

impl AutosaveStore {
    fn in_root(root: PathBuf, file_name: &str, config: &GraphFileConfig) -> Self {
        Self {
            path: root.join(file_name),
            directory: LocalBackupDirectory::new(root),
            policy: RetentionPolicy::new(config.budget()),
            durability: config.durability(),
        }
    }

    /// Reserves a timestamp-named backup for a new document and creates it empty.
    ///
    /// Documents created within the same second get `_2`, `_3`, ... appended to the stamp.
    pub fn create_new(config: &GraphFileConfig, now: NaiveDateTime) -> Result<Self, StoreError> {
        let root = config.ensure_backup_root()?;
        let stem = now.format(BACKUP_STAMP_FORMAT).to_string();
        let extension = config.autosave_extension.trim_start_matches('.');

        for slot in 1..=MAX_BACKUP_SLOTS {
            let file_name = if slot == 1 {
                format!("{stem}.{extension}")
            } else {
                format!("{stem}_{slot}.{extension}")
            };
            let path = root.join(&file_name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self::in_root(root, &file_name, config)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("backup slot {path:?} taken, trying next suffix");
                }
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }

        Err(StoreError::NoFreeBackupSlot { root, stem })
    }

    /// Binds the backup to an opened document's own file name, creating the file if absent.
    ///
    /// An existing backup of the same name is kept as is; it may hold unsaved work from an
    /// earlier session.
    pub fn bind_to_source(config: &GraphFileConfig, file_name: &str) -> Result<Self, StoreError> {
        if !is_plain_file_name(file_name) {
            return Err(StoreError::InvalidBackupName {
                name: file_name.to_owned(),
            });
        }

        let root = config.ensure_backup_root()?;
        let path = root.join(file_name);
        if fs::symlink_metadata(&path).is_ok_and(|md| md.file_type().is_symlink()) {
            return Err(StoreError::SymlinkRefused { path });
        }
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self::in_root(root, file_name, config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &LocalBackupDirectory {
        &self.directory
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn write<G>(
        &self,
        codec: &dyn PersistenceCodec<G>,
        graph: &G,
    ) -> Result<AutosaveWrite, StoreError> {
        if !self.exists() {
            return Ok(AutosaveWrite::SkippedMissingBackup);
        }
        let bytes = encode_to_vec(codec, graph).map_err(|source| StoreError::Codec {
            path: self.path.clone(),
            source,
        })?;
        self.write_bytes(&bytes)
    }

    /// Replaces the backup with an already-encoded snapshot, then sweeps the directory.
    ///
    /// Only the write itself can fail; a sweep that cannot run is logged and carried in the
    /// returned report.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<AutosaveWrite, StoreError> {
        if !self.exists() {
            return Ok(AutosaveWrite::SkippedMissingBackup);
        }
        write_atomic(&self.path, bytes, self.durability)?;
        let report = self.sweep().unwrap_or_else(|err| {
            warn!("backup {:?} written, retention sweep not run: {err}", self.path);
            SweepReport::not_started(err)
        });
        Ok(AutosaveWrite::Written(report))
    }

    pub fn sweep(&self) -> Result<SweepReport, StoreError> {
        self.policy.sweep(&self.directory)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || is_temp_file_name(name) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}
