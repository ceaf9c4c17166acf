// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Deterministic backup-directory fixtures (no RNG).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use graphfile::store::BackupFile;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("graphfile_bench_{prefix}_{pid}_{nanos}_{counter}"));
        fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// 64 backups, every timestamp distinct.
    Distinct64,
    /// 512 backups sharing 32 timestamps.
    Batched512,
}

impl Case {
    fn shape(self) -> (usize, u64) {
        match self {
            Self::Distinct64 => (64, 64),
            Self::Batched512 => (512, 32),
        }
    }
}

pub const BACKUP_BYTES: u64 = 1_024;

/// In-memory listing for planning benchmarks.
pub fn listing(case: Case) -> Vec<BackupFile> {
    let (count, stamps) = case.shape();
    (0..count)
        .map(|i| {
            let modified_ms = 1_000_000 + (i as u64 % stamps) * 1_000;
            BackupFile::new(format!("/backups/{i:05}.html"), modified_ms, BACKUP_BYTES)
        })
        .collect()
}

/// Materialises `case` under `root` with pinned mtimes.
pub fn populate(root: &Path, case: Case) {
    let (count, stamps) = case.shape();
    let payload = vec![b'x'; BACKUP_BYTES as usize];
    for i in 0..count {
        let path = root.join(format!("{i:05}.html"));
        fs::write(&path, &payload).expect("write backup fixture");
        let secs = 1_000 + (i as u64 % stamps);
        fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)))
            .expect("pin backup mtime");
    }
}

pub fn total_bytes(case: Case) -> u64 {
    case.shape().0 as u64 * BACKUP_BYTES
}
