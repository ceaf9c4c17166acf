// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::io;

use super::export::{ExportError, ExportFormat};
use crate::chooser::FileLocation;
use crate::codec::CodecError;
use crate::store::StoreError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentErrorKind {
    Initialization,
    Read,
    Codec,
    Persistence,
    Cancelled,
    UnsupportedFormat,
}

#[derive(Debug)]
pub enum DocumentError {
    PayloadInit {
        source: BoxError,
    },
    BackupInit {
        source: StoreError,
    },
    /// The user aborted choosing a file to open.
    Cancelled,
    Read {
        location: Option<FileLocation>,
        source: io::Error,
    },
    Codec {
        location: FileLocation,
        source: CodecError,
    },
    Persistence {
        location: Option<FileLocation>,
        source: io::Error,
    },
    Encode {
        location: Option<FileLocation>,
        source: CodecError,
    },
    Export {
        format: ExportFormat,
        source: ExportError,
    },
    UnsupportedFormat {
        format: ExportFormat,
    },
}

impl DocumentError {
    pub fn kind(&self) -> DocumentErrorKind {
        match self {
            Self::PayloadInit { .. } | Self::BackupInit { .. } => DocumentErrorKind::Initialization,
            Self::Cancelled => DocumentErrorKind::Cancelled,
            Self::Read { .. } => DocumentErrorKind::Read,
            Self::Codec { .. } => DocumentErrorKind::Codec,
            Self::Persistence { .. } | Self::Encode { .. } | Self::Export { .. } => {
                DocumentErrorKind::Persistence
            }
            Self::UnsupportedFormat { .. } => DocumentErrorKind::UnsupportedFormat,
        }
    }
}

fn describe(location: &Option<FileLocation>) -> String {
    match location {
        Some(location) => location.to_string(),
        None => "<unchosen>".to_owned(),
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadInit { source } => write!(f, "cannot build document payload: {source}"),
            Self::BackupInit { source } => write!(f, "cannot create autosave backup: {source}"),
            Self::Cancelled => f.write_str("open cancelled"),
            Self::Read { location, source } => {
                write!(f, "cannot read {}: {source}", describe(location))
            }
            Self::Codec { location, source } => write!(f, "cannot decode {location}: {source}"),
            Self::Persistence { location, source } => {
                write!(f, "cannot save {}: {source}", describe(location))
            }
            Self::Encode { location, source } => {
                write!(f, "cannot encode document for {}: {source}", describe(location))
            }
            Self::Export { format, source } => write!(f, "{format} export failed: {source}"),
            Self::UnsupportedFormat { format } => {
                write!(f, "no exporter registered for format `{format}`")
            }
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PayloadInit { source } => Some(source.as_ref()),
            Self::BackupInit { source } => Some(source),
            Self::Cancelled => None,
            Self::Read { source, .. } => Some(source),
            Self::Codec { source, .. } => Some(source),
            Self::Persistence { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::Export { source, .. } => Some(source),
            Self::UnsupportedFormat { .. } => None,
        }
    }
}
