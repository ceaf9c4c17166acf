// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nereid graph files: document lifecycle for editable diagram graphs.
//!
//! A [`document::DocumentHandle`] owns one in-memory graph and keeps three persistence paths
//! apart: explicit save (through a [`chooser::FileChooser`] and a [`codec::PersistenceCodec`]),
//! best-effort autosave into a shared backup directory, and size-bounded retention of that
//! directory ([`store::RetentionPolicy`]).

pub mod chooser;
pub mod codec;
pub mod config;
pub mod document;
pub mod model;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use chooser::{FileChooser, FileLocation, LocalFileChooser, Selection};
pub use codec::{CodecError, JsonCodec, PersistenceCodec};
pub use config::GraphFileConfig;
pub use document::{
    AutosaveOutcome, AutosaveScheduler, DocumentError, DocumentErrorKind, DocumentEvent,
    DocumentEventKind, DocumentHandle, DocumentListener, DocumentServices, ExportFormat,
    ListenerId, SaveOutcome, SnapshotExporter,
};
pub use store::{sweep_backup_root, StoreError, SweepOutcome, SweepReport};
