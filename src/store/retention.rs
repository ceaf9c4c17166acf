// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Size-bounded eviction of autosave backups.
//!
//! Eviction works in timestamp batches: every file sharing the oldest last-modified time is
//! removed together, then the directory is measured again. The loop ends when the directory
//! fits the budget or when no timestamps are left, so a sweep always terminates even if a single
//! remaining file is larger than the whole budget.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::backup_dir::{BackupDirectory, BackupFile};
use super::StoreError;
use crate::config::DEFAULT_MAX_DIRECTORY_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionBudget {
    max_directory_bytes: u64,
}

impl RetentionBudget {
    pub const fn new(max_directory_bytes: u64) -> Self {
        Self {
            max_directory_bytes,
        }
    }

    pub fn max_directory_bytes(&self) -> u64 {
        self.max_directory_bytes
    }

    pub fn is_satisfied_by(&self, total_bytes: u64) -> bool {
        total_bytes <= self.max_directory_bytes
    }
}

impl Default for RetentionBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIRECTORY_BYTES)
    }
}

/// Entries grouped by exact timestamp, oldest batch first.
fn eviction_batches(entries: &[BackupFile]) -> BTreeMap<u64, Vec<&BackupFile>> {
    let mut batches = BTreeMap::<u64, Vec<&BackupFile>>::new();
    for entry in entries {
        batches.entry(entry.modified_ms()).or_default().push(entry);
    }
    batches
}

/// Plans a sweep from the listed sizes alone, without touching the filesystem.
///
/// The live [`RetentionPolicy::sweep`] re-measures the directory between batches instead,
/// because sibling documents keep writing into it.
pub fn select_for_deletion(entries: &[BackupFile], budget: RetentionBudget) -> Vec<BackupFile> {
    let mut total = entries
        .iter()
        .fold(0u64, |acc, entry| acc.saturating_add(entry.size_bytes()));
    let mut selected = Vec::new();

    for batch in eviction_batches(entries).into_values() {
        if budget.is_satisfied_by(total) {
            break;
        }
        for entry in batch {
            total = total.saturating_sub(entry.size_bytes());
            selected.push(entry.clone());
        }
    }

    selected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    WithinBudget,
    /// Every candidate timestamp was evicted and the directory is still over budget.
    Exhausted,
    /// The directory could not be measured; see [`SweepReport::interrupted_by`].
    Interrupted,
}

#[derive(Debug)]
pub struct SweepReport {
    initial_bytes: u64,
    final_bytes: u64,
    removed: Vec<PathBuf>,
    rewritten: Vec<PathBuf>,
    failed: Vec<(PathBuf, io::Error)>,
    interrupted_by: Option<StoreError>,
    outcome: SweepOutcome,
}

impl SweepReport {
    fn untouched(total_bytes: u64) -> Self {
        Self {
            initial_bytes: total_bytes,
            final_bytes: total_bytes,
            removed: Vec::new(),
            rewritten: Vec::new(),
            failed: Vec::new(),
            interrupted_by: None,
            outcome: SweepOutcome::WithinBudget,
        }
    }

    /// A sweep that could not measure or list the directory and touched nothing.
    ///
    /// Byte counts are zero: nothing was measured.
    pub(crate) fn not_started(error: StoreError) -> Self {
        Self {
            interrupted_by: Some(error),
            outcome: SweepOutcome::Interrupted,
            ..Self::untouched(0)
        }
    }

    pub fn initial_bytes(&self) -> u64 {
        self.initial_bytes
    }

    pub fn final_bytes(&self) -> u64 {
        self.final_bytes
    }

    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    /// Candidates left in place because they were written again after the directory was listed.
    pub fn rewritten(&self) -> &[PathBuf] {
        &self.rewritten
    }

    /// Per-file deletion failures; the sweep carried on past each of them.
    pub fn failed(&self) -> &[(PathBuf, io::Error)] {
        &self.failed
    }

    /// The measurement failure that stopped the sweep early. Files listed in
    /// [`SweepReport::removed`] were deleted before it happened.
    pub fn interrupted_by(&self) -> Option<&StoreError> {
        self.interrupted_by.as_ref()
    }

    pub fn outcome(&self) -> SweepOutcome {
        self.outcome
    }

    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.failed.is_empty()
    }

    pub fn was_removed(&self, path: &Path) -> bool {
        self.removed.iter().any(|removed| removed == path)
    }
}

/// The one eviction policy shared by autosave and the standalone cleanup entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    budget: RetentionBudget,
}

impl RetentionPolicy {
    pub fn new(budget: RetentionBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> RetentionBudget {
        self.budget
    }

    pub fn select_for_deletion(&self, entries: &[BackupFile]) -> Vec<BackupFile> {
        select_for_deletion(entries, self.budget)
    }

    /// Evicts timestamp batches, oldest first, until the directory fits the budget.
    ///
    /// Fails only when the directory cannot be measured or listed up front, before anything is
    /// deleted. A candidate whose live timestamp no longer matches its batch was rewritten by
    /// another writer after the listing and is kept. A failed re-measure between batches stops
    /// the sweep with [`SweepOutcome::Interrupted`] and the bytes left are estimated from the
    /// listed sizes of the files removed in that batch.
    pub fn sweep<D>(&self, directory: &D) -> Result<SweepReport, StoreError>
    where
        D: BackupDirectory + ?Sized,
    {
        let initial_bytes = directory.total_size()?;
        if self.budget.is_satisfied_by(initial_bytes) {
            return Ok(SweepReport::untouched(initial_bytes));
        }

        let entries = directory.list_entries()?;
        let mut report = SweepReport::untouched(initial_bytes);
        let mut total = initial_bytes;

        for (modified_ms, batch) in eviction_batches(&entries) {
            if self.budget.is_satisfied_by(total) {
                break;
            }
            let mut evicted_bytes = 0u64;
            for entry in batch {
                if evict(directory, entry, modified_ms, &mut report) {
                    evicted_bytes = evicted_bytes.saturating_add(entry.size_bytes());
                }
            }
            match directory.total_size() {
                Ok(measured) => total = measured,
                Err(err) => {
                    warn!(
                        "cannot re-measure backup directory {:?}, stopping sweep: {err}",
                        directory.root()
                    );
                    total = total.saturating_sub(evicted_bytes);
                    report.interrupted_by = Some(err);
                    break;
                }
            }
        }

        report.final_bytes = total;
        if report.interrupted_by.is_some() {
            report.outcome = SweepOutcome::Interrupted;
        } else if !self.budget.is_satisfied_by(total) {
            report.outcome = SweepOutcome::Exhausted;
            warn!(
                "backup directory {:?} over budget after evicting every candidate: {total} > {}",
                directory.root(),
                self.budget.max_directory_bytes()
            );
        }

        debug!(
            "retention sweep over {:?}: {} -> {} bytes, {} removed, {} rewritten, {} failed",
            directory.root(),
            report.initial_bytes,
            report.final_bytes,
            report.removed.len(),
            report.rewritten.len(),
            report.failed.len()
        );

        Ok(report)
    }
}

/// Removes one candidate if it still carries its batch timestamp; true when it is gone.
fn evict<D>(directory: &D, entry: &BackupFile, batch_ms: u64, report: &mut SweepReport) -> bool
where
    D: BackupDirectory + ?Sized,
{
    match directory.modified_ms(entry.path()) {
        Ok(Some(live_ms)) if live_ms != batch_ms => {
            debug!(
                "keeping backup {:?}: rewritten since listing ({batch_ms} -> {live_ms})",
                entry.path()
            );
            report.rewritten.push(entry.path().to_path_buf());
            return false;
        }
        Ok(_) => {}
        Err(err) => {
            warn!("cannot stat backup {:?} before removal: {err}", entry.path());
            report.failed.push((entry.path().to_path_buf(), err));
            return false;
        }
    }

    match directory.remove(entry) {
        Ok(()) => {
            report.removed.push(entry.path().to_path_buf());
            true
        }
        Err(err) => {
            warn!("cannot remove backup {:?} (mtime {batch_ms}): {err}", entry.path());
            report.failed.push((entry.path().to_path_buf(), err));
            false
        }
    }
}

#[cfg(test)]
mod tests;
