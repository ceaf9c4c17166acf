// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::atomic::is_temp_file_name;
use super::StoreError;

/// A directory entry considered for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    path: PathBuf,
    modified_ms: u64,
    size_bytes: u64,
}

impl BackupFile {
    pub fn new(path: impl Into<PathBuf>, modified_ms: u64, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            modified_ms,
            size_bytes,
        }
    }

    fn from_metadata(path: PathBuf, md: &fs::Metadata) -> Self {
        let modified_ms = md.modified().map(millis_since_epoch).unwrap_or(0);
        Self::new(path, modified_ms, md.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last-modified time, truncated to milliseconds; entries sharing it are evicted together.
    pub fn modified_ms(&self) -> u64 {
        self.modified_ms
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Filesystem primitives the retention sweep runs against.
pub trait BackupDirectory {
    fn root(&self) -> &Path;

    /// Regular files directly inside the root, excluding in-flight temp files.
    fn list_entries(&self) -> Result<Vec<BackupFile>, StoreError>;

    /// True on-disk size of the whole directory tree, measured now.
    fn total_size(&self) -> Result<u64, StoreError>;

    /// Live last-modified time of one entry, in the same units as
    /// [`BackupFile::modified_ms`]; `None` once the file is gone.
    fn modified_ms(&self, path: &Path) -> io::Result<Option<u64>>;

    /// Deletes one entry; an already-missing file is not an error.
    fn remove(&self, entry: &BackupFile) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBackupDirectory {
    root: PathBuf,
}

impl LocalBackupDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BackupDirectory for LocalBackupDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_entries(&self) -> Result<Vec<BackupFile>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries.filter_map(|entry| entry.ok()) {
            if is_temp_file_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            // Vanished between listing and stat: a sibling already removed it.
            let Ok(md) = entry.metadata() else {
                continue;
            };
            if !md.is_file() {
                continue;
            }
            files.push(BackupFile::from_metadata(entry.path(), &md));
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn total_size(&self) -> Result<u64, StoreError> {
        match directory_size(&self.root) {
            Ok(size) => Ok(size),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(StoreError::Io {
                path: self.root.clone(),
                source,
            }),
        }
    }

    fn modified_ms(&self, path: &Path) -> io::Result<Option<u64>> {
        match fs::symlink_metadata(path) {
            Ok(md) => Ok(Some(md.modified().map(millis_since_epoch).unwrap_or(0))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn remove(&self, entry: &BackupFile) -> io::Result<()> {
        match fs::remove_file(entry.path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Recursive byte count; symlinks are counted by their own size and never followed.
fn directory_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else {
            continue;
        };
        let md = match fs::symlink_metadata(entry.path()) {
            Ok(md) => md,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        let size = if md.is_dir() {
            match directory_size(&entry.path()) {
                Ok(size) => size,
                Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
                Err(err) => return Err(err),
            }
        } else {
            md.len()
        };
        total = total.saturating_add(size);
    }
    Ok(total)
}
