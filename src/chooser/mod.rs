// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! File-selection seam: where documents are read from and written to.
//!
//! Interactive hosts implement [`FileChooser`] over their own dialogs. The local types here
//! cover plain filesystem access and headless use.

use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::model::ExtensionFilter;
use crate::store::{write_atomic, StoreError, WriteDurability};

/// A document's save location: bare file name plus the directory holding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocation {
    filename: String,
    directory: PathBuf,
}

impl FileLocation {
    pub fn new(filename: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            directory: directory.into(),
        }
    }

    /// Splits a file path; `None` if it has no file name component.
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_owned();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(Self {
            filename,
            directory,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Result of a user-facing choice. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Chosen(T),
    Cancelled,
}

impl<T> Selection<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Selection<U> {
        match self {
            Self::Chosen(value) => Selection::Chosen(f(value)),
            Self::Cancelled => Selection::Cancelled,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Chosen(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

pub trait FileReader: Send {
    fn location(&self) -> &FileLocation;

    /// Opens the byte stream; `Ok(None)` means there is nothing to read at the location.
    fn open_stream(&mut self) -> io::Result<Option<Box<dyn Read + Send>>>;
}

pub trait FileWriter: Send {
    /// The resolved target; a successful save adopts it as the document's location.
    fn location(&self) -> &FileLocation;

    /// Writes the complete encoded document. Either all bytes land or the target is untouched.
    fn commit(&mut self, bytes: &[u8]) -> io::Result<()>;
}

pub trait FileChooser: Send + Sync {
    fn choose_read_target(&self) -> io::Result<Selection<FileLocation>>;

    fn reader_for(&self, location: &FileLocation) -> io::Result<Selection<Box<dyn FileReader>>>;

    fn choose_write_target(&self, filter: &ExtensionFilter) -> io::Result<Selection<FileLocation>>;

    fn writer_for(&self, location: &FileLocation) -> io::Result<Box<dyn FileWriter>>;
}

#[derive(Debug, Clone)]
pub struct LocalFileReader {
    location: FileLocation,
}

impl LocalFileReader {
    pub fn new(location: FileLocation) -> Self {
        Self { location }
    }
}

impl FileReader for LocalFileReader {
    fn location(&self) -> &FileLocation {
        &self.location
    }

    fn open_stream(&mut self) -> io::Result<Option<Box<dyn Read + Send>>> {
        match fs::File::open(self.location.path()) {
            Ok(file) => Ok(Some(Box::new(io::BufReader::new(file)))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalFileWriter {
    location: FileLocation,
    durability: WriteDurability,
}

impl LocalFileWriter {
    /// Binds to `location` with its directory made absolute against the working directory.
    pub fn new(location: &FileLocation, durability: WriteDurability) -> io::Result<Self> {
        let directory = if location.directory().is_absolute() {
            location.directory().to_path_buf()
        } else {
            env::current_dir()?.join(location.directory())
        };
        Ok(Self {
            location: FileLocation::new(location.filename(), directory),
            durability,
        })
    }

    /// Appends the filter's extension to the file name unless it already carries it.
    pub fn with_filter(mut self, filter: &ExtensionFilter) -> Self {
        self.location.filename = filter.apply(&self.location.filename);
        self
    }
}

impl FileWriter for LocalFileWriter {
    fn location(&self) -> &FileLocation {
        &self.location
    }

    fn commit(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_atomic(&self.location.path(), bytes, self.durability).map_err(|err| match err {
            StoreError::Io { source, .. } => source,
            other => io::Error::other(other),
        })
    }
}

/// Non-interactive chooser over the local filesystem.
///
/// Prompts are answered from preset targets; without one the prompt counts as cancelled.
#[derive(Debug, Clone, Default)]
pub struct LocalFileChooser {
    durability: WriteDurability,
    read_target: Option<FileLocation>,
    write_target: Option<FileLocation>,
}

impl LocalFileChooser {
    pub fn new(durability: WriteDurability) -> Self {
        Self {
            durability,
            read_target: None,
            write_target: None,
        }
    }

    pub fn with_read_target(mut self, location: FileLocation) -> Self {
        self.read_target = Some(location);
        self
    }

    pub fn with_write_target(mut self, location: FileLocation) -> Self {
        self.write_target = Some(location);
        self
    }
}

impl FileChooser for LocalFileChooser {
    fn choose_read_target(&self) -> io::Result<Selection<FileLocation>> {
        Ok(match &self.read_target {
            Some(location) => Selection::Chosen(location.clone()),
            None => Selection::Cancelled,
        })
    }

    fn reader_for(&self, location: &FileLocation) -> io::Result<Selection<Box<dyn FileReader>>> {
        Ok(Selection::Chosen(Box::new(LocalFileReader::new(
            location.clone(),
        ))))
    }

    fn choose_write_target(&self, filter: &ExtensionFilter) -> io::Result<Selection<FileLocation>> {
        Ok(match &self.write_target {
            Some(location) => Selection::Chosen(FileLocation::new(
                filter.apply(location.filename()),
                location.directory(),
            )),
            None => Selection::Cancelled,
        })
    }

    fn writer_for(&self, location: &FileLocation) -> io::Result<Box<dyn FileWriter>> {
        Ok(Box::new(LocalFileWriter::new(location, self.durability)?))
    }
}
