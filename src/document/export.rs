// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One-shot snapshot exporters keyed by format name.
//!
//! The native format is always available through the document's codec. Image, PDF, clipboard
//! and printer targets are hosted outside this crate and registered as additional exporters.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::codec::{CodecError, PersistenceCodec};

/// Lowercase format key, e.g. `json`, `png`, `pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportFormat(SmolStr);

impl ExportFormat {
    pub fn new(name: &str) -> Self {
        Self(SmolStr::new(name.trim().to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExportFormat {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub enum ExportError {
    Codec(CodecError),
    Io(io::Error),
    Renderer(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(source) => write!(f, "{source}"),
            Self::Io(source) => write!(f, "export sink error: {source}"),
            Self::Renderer(source) => write!(f, "renderer failed: {source}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(source) => Some(source),
            Self::Io(source) => Some(source),
            Self::Renderer(source) => Some(source.as_ref()),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(source: io::Error) -> Self {
        Self::Io(source)
    }
}

pub trait SnapshotExporter<G>: Send + Sync {
    fn export(&self, graph: &G, sink: &mut dyn Write) -> Result<(), ExportError>;
}

impl<G, F> SnapshotExporter<G> for F
where
    F: Fn(&G, &mut dyn Write) -> Result<(), ExportError> + Send + Sync,
{
    fn export(&self, graph: &G, sink: &mut dyn Write) -> Result<(), ExportError> {
        self(graph, sink)
    }
}

/// Exports the native persisted format.
pub struct CodecExporter<G> {
    codec: Arc<dyn PersistenceCodec<G>>,
}

impl<G> CodecExporter<G> {
    pub fn new(codec: Arc<dyn PersistenceCodec<G>>) -> Self {
        Self { codec }
    }
}

impl<G> SnapshotExporter<G> for CodecExporter<G> {
    fn export(&self, graph: &G, sink: &mut dyn Write) -> Result<(), ExportError> {
        self.codec.encode(graph, sink).map_err(ExportError::Codec)
    }
}

pub struct ExporterRegistry<G> {
    exporters: BTreeMap<ExportFormat, Arc<dyn SnapshotExporter<G>>>,
}

impl<G> Default for ExporterRegistry<G> {
    fn default() -> Self {
        Self {
            exporters: BTreeMap::new(),
        }
    }
}

impl<G> Clone for ExporterRegistry<G> {
    fn clone(&self) -> Self {
        Self {
            exporters: self.exporters.clone(),
        }
    }
}

impl<G> fmt::Debug for ExporterRegistry<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.exporters.keys()).finish()
    }
}

impl<G> ExporterRegistry<G> {
    /// Registers `exporter` for `format`, replacing any previous one.
    pub fn register(&mut self, format: ExportFormat, exporter: Arc<dyn SnapshotExporter<G>>) {
        self.exporters.insert(format, exporter);
    }

    pub fn get(&self, format: &ExportFormat) -> Option<&Arc<dyn SnapshotExporter<G>>> {
        self.exporters.get(format)
    }

    pub fn contains(&self, format: &ExportFormat) -> bool {
        self.exporters.contains_key(format)
    }

    pub fn formats(&self) -> impl Iterator<Item = &ExportFormat> {
        self.exporters.keys()
    }
}
