// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};

use super::{select_for_deletion, RetentionBudget, RetentionPolicy, SweepOutcome};
use crate::store::backup_dir::{BackupDirectory, BackupFile, LocalBackupDirectory};
use crate::store::StoreError;
use crate::test_support::{set_mtime, write_backup, TempDir};

/// In-memory directory: path -> (modified_ms, size). Counts size queries.
struct FakeDirectory {
    root: PathBuf,
    files: RefCell<BTreeMap<PathBuf, (u64, u64)>>,
    undeletable: BTreeSet<PathBuf>,
    size_queries: Cell<usize>,
    failing_size_query: Option<usize>,
}

impl FakeDirectory {
    fn with_files(files: &[(&str, u64, u64)]) -> Self {
        let root = PathBuf::from("/backups");
        let files = files
            .iter()
            .map(|(name, modified_ms, size)| (root.join(name), (*modified_ms, *size)))
            .collect();
        Self {
            root,
            files: RefCell::new(files),
            undeletable: BTreeSet::new(),
            size_queries: Cell::new(0),
            failing_size_query: None,
        }
    }

    /// The `nth` size query (1-based) fails with an I/O error.
    fn failing_size_query(mut self, nth: usize) -> Self {
        self.failing_size_query = Some(nth);
        self
    }

    fn undeletable(mut self, name: &str) -> Self {
        self.undeletable.insert(self.root.join(name));
        self
    }

    fn remaining(&self) -> Vec<String> {
        self.files
            .borrow()
            .keys()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

impl BackupDirectory for FakeDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_entries(&self) -> Result<Vec<BackupFile>, StoreError> {
        Ok(self
            .files
            .borrow()
            .iter()
            .map(|(path, (modified_ms, size))| BackupFile::new(path, *modified_ms, *size))
            .collect())
    }

    fn total_size(&self) -> Result<u64, StoreError> {
        let query = self.size_queries.get() + 1;
        self.size_queries.set(query);
        if self.failing_size_query == Some(query) {
            return Err(StoreError::Io {
                path: self.root.clone(),
                source: io::Error::other("stat failed"),
            });
        }
        Ok(self.files.borrow().values().map(|(_, size)| size).sum())
    }

    fn modified_ms(&self, path: &Path) -> io::Result<Option<u64>> {
        Ok(self.files.borrow().get(path).map(|(modified_ms, _)| *modified_ms))
    }

    fn remove(&self, entry: &BackupFile) -> io::Result<()> {
        if self.undeletable.contains(entry.path()) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.files.borrow_mut().remove(entry.path());
        Ok(())
    }
}

fn policy(max: u64) -> RetentionPolicy {
    RetentionPolicy::new(RetentionBudget::new(max))
}

fn names(entries: &[BackupFile]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn plan_removes_only_the_oldest_when_timestamps_are_distinct() {
    let entries = vec![
        BackupFile::new("/b/new.html", 3_000, 40),
        BackupFile::new("/b/old.html", 1_000, 40),
        BackupFile::new("/b/mid.html", 2_000, 40),
    ];
    let selected = select_for_deletion(&entries, RetentionBudget::new(100));
    assert_eq!(names(&selected), vec!["old.html"]);
}

#[test]
fn plan_removes_every_file_sharing_the_oldest_timestamp() {
    let entries = vec![
        BackupFile::new("/b/a.html", 1_000, 40),
        BackupFile::new("/b/b.html", 1_000, 40),
        BackupFile::new("/b/c.html", 2_000, 40),
    ];
    let selected = select_for_deletion(&entries, RetentionBudget::new(100));
    assert_eq!(names(&selected), vec!["a.html", "b.html"]);
}

#[test]
fn plan_within_budget_selects_nothing() {
    let entries = vec![
        BackupFile::new("/b/a.html", 1_000, 50),
        BackupFile::new("/b/b.html", 2_000, 50),
    ];
    assert!(select_for_deletion(&entries, RetentionBudget::new(100)).is_empty());
    assert!(select_for_deletion(&[], RetentionBudget::new(0)).is_empty());
}

#[test]
fn sweep_with_distinct_timestamps_keeps_eighty_bytes() {
    let dir = FakeDirectory::with_files(&[
        ("a.html", 1_000, 40),
        ("b.html", 2_000, 40),
        ("c.html", 3_000, 40),
    ]);

    let report = policy(100).sweep(&dir).unwrap();

    assert_eq!(dir.remaining(), vec!["b.html", "c.html"]);
    assert_eq!(report.initial_bytes(), 120);
    assert_eq!(report.final_bytes(), 80);
    assert_eq!(report.outcome(), SweepOutcome::WithinBudget);
    assert!(report.was_removed(Path::new("/backups/a.html")));
}

#[test]
fn sweep_with_shared_oldest_timestamp_removes_the_whole_batch() {
    let dir = FakeDirectory::with_files(&[
        ("a.html", 1_000, 40),
        ("b.html", 1_000, 40),
        ("c.html", 2_000, 40),
    ]);

    let report = policy(100).sweep(&dir).unwrap();

    assert_eq!(dir.remaining(), vec!["c.html"]);
    assert_eq!(report.removed().len(), 2);
    assert_eq!(report.final_bytes(), 40);
}

#[test]
fn sweep_over_empty_directory_is_a_noop() {
    let dir = FakeDirectory::with_files(&[]);
    let report = policy(0).sweep(&dir).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.outcome(), SweepOutcome::WithinBudget);
}

#[test]
fn sweep_within_budget_does_not_list_and_is_idempotent() {
    let dir = FakeDirectory::with_files(&[("a.html", 1_000, 30), ("b.html", 2_000, 30)]);

    let first = policy(100).sweep(&dir).unwrap();
    let second = policy(100).sweep(&dir).unwrap();

    assert!(first.is_noop());
    assert!(second.is_noop());
    assert_eq!(dir.remaining(), vec!["a.html", "b.html"]);
    assert_eq!(dir.size_queries.get(), 2);
}

#[test]
fn second_sweep_after_eviction_deletes_nothing() {
    let dir = FakeDirectory::with_files(&[
        ("a.html", 1_000, 40),
        ("b.html", 2_000, 40),
        ("c.html", 3_000, 40),
    ]);
    policy(100).sweep(&dir).unwrap();
    let again = policy(100).sweep(&dir).unwrap();
    assert!(again.is_noop());
}

#[test]
fn single_oversized_file_terminates_as_exhausted() {
    let dir = FakeDirectory::with_files(&[("huge.html", 1_000, 500)]).undeletable("huge.html");

    let report = policy(100).sweep(&dir).unwrap();

    assert_eq!(report.outcome(), SweepOutcome::Exhausted);
    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.final_bytes(), 500);
}

#[test]
fn failed_deletion_is_recorded_and_the_sweep_continues() {
    let dir = FakeDirectory::with_files(&[
        ("a.html", 1_000, 40),
        ("b.html", 2_000, 40),
        ("c.html", 3_000, 40),
    ])
    .undeletable("a.html");

    let report = policy(100).sweep(&dir).unwrap();

    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.failed()[0].0, PathBuf::from("/backups/a.html"));
    assert_eq!(report.failed()[0].1.kind(), io::ErrorKind::PermissionDenied);
    assert_eq!(dir.remaining(), vec!["a.html", "c.html"]);
    assert_eq!(report.outcome(), SweepOutcome::WithinBudget);
}

#[test]
fn sweep_remeasures_after_every_batch() {
    let dir = FakeDirectory::with_files(&[
        ("a.html", 1_000, 40),
        ("b.html", 2_000, 40),
        ("c.html", 3_000, 40),
        ("d.html", 4_000, 40),
    ]);

    policy(100).sweep(&dir).unwrap();

    // Initial measurement plus one per evicted batch.
    assert_eq!(dir.size_queries.get(), 3);
    assert_eq!(dir.remaining(), vec!["c.html", "d.html"]);
}

#[test]
fn failed_remeasure_keeps_the_files_already_removed() {
    let dir = FakeDirectory::with_files(&[
        ("a.html", 1_000, 40),
        ("b.html", 2_000, 40),
        ("c.html", 3_000, 40),
    ])
    .failing_size_query(2);

    let report = policy(100).sweep(&dir).unwrap();

    assert_eq!(report.outcome(), SweepOutcome::Interrupted);
    assert!(report.was_removed(Path::new("/backups/a.html")));
    assert_eq!(report.final_bytes(), 80);
    assert!(matches!(report.interrupted_by(), Some(StoreError::Io { .. })));
    assert_eq!(dir.remaining(), vec!["b.html", "c.html"]);
}

#[test]
fn unmeasurable_directory_fails_before_touching_anything() {
    let dir = FakeDirectory::with_files(&[("a.html", 1_000, 400)]).failing_size_query(1);

    let err = policy(100).sweep(&dir).unwrap_err();

    assert!(matches!(err, StoreError::Io { .. }));
    assert_eq!(dir.remaining(), vec!["a.html"]);
}

#[test]
fn not_started_report_carries_the_error() {
    let err = StoreError::Io {
        path: PathBuf::from("/backups"),
        source: io::Error::other("stat failed"),
    };

    let report = super::SweepReport::not_started(err);

    assert_eq!(report.outcome(), SweepOutcome::Interrupted);
    assert!(report.is_noop());
    assert!(report.interrupted_by().is_some());
}

/// Local directory where one file is rewritten by a sibling right after it was listed.
struct RewrittenAfterListing {
    inner: LocalBackupDirectory,
    rewritten: PathBuf,
    new_secs: u64,
}

impl BackupDirectory for RewrittenAfterListing {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn list_entries(&self) -> Result<Vec<BackupFile>, StoreError> {
        let entries = self.inner.list_entries()?;
        set_mtime(&self.rewritten, self.new_secs);
        Ok(entries)
    }

    fn total_size(&self) -> Result<u64, StoreError> {
        self.inner.total_size()
    }

    fn modified_ms(&self, path: &Path) -> io::Result<Option<u64>> {
        self.inner.modified_ms(path)
    }

    fn remove(&self, entry: &BackupFile) -> io::Result<()> {
        self.inner.remove(entry)
    }
}

struct LocalCtx {
    tmp: TempDir,
    dir: LocalBackupDirectory,
}

#[fixture]
fn local() -> LocalCtx {
    let tmp = TempDir::new("retention-local");
    let dir = LocalBackupDirectory::new(tmp.path());
    LocalCtx { tmp, dir }
}

#[rstest]
fn local_sweep_evicts_by_mtime_on_disk(local: LocalCtx) {
    let root = local.tmp.path();
    write_backup(&root.join("20240101_000000.html"), 40, 1_000);
    write_backup(&root.join("diagram.class.violet.html"), 40, 2_000);
    write_backup(&root.join("20240103_000000.html"), 40, 3_000);

    let report = policy(100).sweep(&local.dir).unwrap();

    assert!(!root.join("20240101_000000.html").exists());
    assert!(root.join("diagram.class.violet.html").exists());
    assert!(root.join("20240103_000000.html").exists());
    assert_eq!(report.final_bytes(), 80);
}

#[rstest]
fn local_sweep_counts_nested_files_against_the_budget(local: LocalCtx) {
    let root = local.tmp.path();
    write_backup(&root.join("old.html"), 40, 1_000);
    write_backup(&root.join("new.html"), 40, 2_000);
    std::fs::create_dir(root.join("nested")).unwrap();
    write_backup(&root.join("nested").join("stray.html"), 40, 500);

    let report = policy(100).sweep(&local.dir).unwrap();

    // Nested entries count but are never candidates.
    assert!(report.was_removed(&root.join("old.html")));
    assert!(root.join("nested").join("stray.html").exists());
    assert_eq!(report.final_bytes(), 80);
}

#[rstest]
fn backup_rewritten_after_listing_is_kept(local: LocalCtx) {
    let root = local.tmp.path();
    write_backup(&root.join("sibling.html"), 40, 1_000);
    write_backup(&root.join("old.html"), 40, 2_000);
    write_backup(&root.join("mine.html"), 40, 3_000);
    let dir = RewrittenAfterListing {
        inner: local.dir.clone(),
        rewritten: root.join("sibling.html"),
        new_secs: 9_000,
    };

    let report = policy(100).sweep(&dir).unwrap();

    assert!(root.join("sibling.html").exists());
    assert!(!root.join("old.html").exists());
    assert!(root.join("mine.html").exists());
    assert_eq!(report.rewritten(), [root.join("sibling.html")]);
    assert_eq!(report.removed(), [root.join("old.html")]);
    assert_eq!(report.outcome(), SweepOutcome::WithinBudget);
}
