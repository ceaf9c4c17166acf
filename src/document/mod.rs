// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document handles: one editable graph, its save location, dirty state and autosave slot.
//!
//! All mutable state of a handle sits behind a single re-entrant lock. The owning thread may
//! call back into the handle from listener callbacks; the autosave path only ever tries the lock
//! for a bounded time and skips the tick when the owner is busy.

pub mod error;
pub mod export;
pub mod listeners;
pub mod scheduler;

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use parking_lot::ReentrantMutex;

use crate::chooser::{FileChooser, FileLocation, FileReader, FileWriter, Selection};
use crate::codec::{encode_to_vec, CodecError, PersistenceCodec};
use crate::config::GraphFileConfig;
use crate::model::{DocumentId, Graph};
use crate::store::{AutosaveStore, AutosaveWrite, StoreError, SweepReport};

pub use error::{BoxError, DocumentError, DocumentErrorKind};
pub use export::{CodecExporter, ExportError, ExportFormat, ExporterRegistry, SnapshotExporter};
pub use listeners::{DocumentEvent, DocumentEventKind, DocumentListener, ListenerError, ListenerId};
pub use scheduler::AutosaveScheduler;

use listeners::ListenerRegistry;

/// Collaborators shared by every handle of one payload type.
pub struct DocumentServices<G> {
    config: GraphFileConfig,
    chooser: Arc<dyn FileChooser>,
    codec: Arc<dyn PersistenceCodec<G>>,
    exporters: ExporterRegistry<G>,
}

impl<G> Clone for DocumentServices<G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            chooser: Arc::clone(&self.chooser),
            codec: Arc::clone(&self.codec),
            exporters: self.exporters.clone(),
        }
    }
}

impl<G> fmt::Debug for DocumentServices<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentServices")
            .field("config", &self.config)
            .field("codec", &self.codec.format_name())
            .field("exporters", &self.exporters)
            .finish_non_exhaustive()
    }
}

impl<G: 'static> DocumentServices<G> {
    /// The codec's own format is registered as an exporter under its format name.
    pub fn new(
        config: GraphFileConfig,
        chooser: Arc<dyn FileChooser>,
        codec: Arc<dyn PersistenceCodec<G>>,
    ) -> Self {
        let mut exporters = ExporterRegistry::default();
        exporters.register(
            ExportFormat::new(codec.format_name()),
            Arc::new(CodecExporter::new(Arc::clone(&codec))),
        );
        Self {
            config,
            chooser,
            codec,
            exporters,
        }
    }

    pub fn with_exporter(
        mut self,
        format: impl Into<ExportFormat>,
        exporter: Arc<dyn SnapshotExporter<G>>,
    ) -> Self {
        self.exporters.register(format.into(), exporter);
        self
    }

    pub fn config(&self) -> &GraphFileConfig {
        &self.config
    }

    pub fn chooser(&self) -> &Arc<dyn FileChooser> {
        &self.chooser
    }

    pub fn codec(&self) -> &Arc<dyn PersistenceCodec<G>> {
        &self.codec
    }

    pub fn exporters(&self) -> &ExporterRegistry<G> {
        &self.exporters
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(FileLocation),
    /// The user dismissed the save-as prompt; nothing changed.
    Cancelled,
}

#[derive(Debug)]
pub enum AutosaveOutcome {
    Written(SweepReport),
    SkippedMissingBackup,
    /// The document lock was held elsewhere for longer than the configured timeout.
    SkippedBusy,
    Failed(StoreError),
}

impl AutosaveOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

struct DocumentMeta {
    location: Option<FileLocation>,
    dirty: bool,
    listeners: ListenerRegistry,
}

/// Payload and bookkeeping borrow independently: while the payload is lent to `with_graph` or
/// `edit`, the accessors and listener methods stay usable on the owning thread.
struct DocumentState<G> {
    graph: RefCell<G>,
    meta: RefCell<DocumentMeta>,
}

pub struct DocumentHandle<G: Graph> {
    id: DocumentId,
    services: DocumentServices<G>,
    autosave: AutosaveStore,
    state: ReentrantMutex<DocumentState<G>>,
}

impl<G: Graph> fmt::Debug for DocumentHandle<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("id", &self.id)
            .field("autosave", &self.autosave.path())
            .finish_non_exhaustive()
    }
}

impl<G: Graph> DocumentHandle<G> {
    /// Builds a fresh unnamed document and reserves its timestamp-named backup.
    pub fn create_new<F, E>(
        services: DocumentServices<G>,
        graph_factory: F,
    ) -> Result<Self, DocumentError>
    where
        F: FnOnce() -> Result<G, E>,
        E: Into<BoxError>,
    {
        Self::create_new_at(services, graph_factory, Local::now().naive_local())
    }

    /// Like [`DocumentHandle::create_new`] with an explicit clock reading for the backup name.
    pub fn create_new_at<F, E>(
        services: DocumentServices<G>,
        graph_factory: F,
        now: NaiveDateTime,
    ) -> Result<Self, DocumentError>
    where
        F: FnOnce() -> Result<G, E>,
        E: Into<BoxError>,
    {
        let graph = graph_factory().map_err(|err| DocumentError::PayloadInit {
            source: err.into(),
        })?;
        let autosave = AutosaveStore::create_new(&services.config, now)
            .map_err(|source| DocumentError::BackupInit { source })?;

        let handle = Self::assemble(services, graph, None, autosave);
        info!(
            "created {} with backup {:?}",
            handle.id,
            handle.autosave.path()
        );
        Ok(handle)
    }

    pub fn open_existing(
        services: DocumentServices<G>,
        file: &FileLocation,
    ) -> Result<Self, DocumentError> {
        let reader = match services
            .chooser
            .reader_for(file)
            .map_err(|source| DocumentError::Read {
                location: Some(file.clone()),
                source,
            })? {
            Selection::Chosen(reader) => reader,
            Selection::Cancelled => return Err(DocumentError::Cancelled),
        };
        Self::open_from_reader(services, reader)
    }

    /// Prompts for the file to open, then behaves like [`DocumentHandle::open_existing`].
    pub fn open_chosen(services: DocumentServices<G>) -> Result<Self, DocumentError> {
        let file = match services
            .chooser
            .choose_read_target()
            .map_err(|source| DocumentError::Read {
                location: None,
                source,
            })? {
            Selection::Chosen(file) => file,
            Selection::Cancelled => return Err(DocumentError::Cancelled),
        };
        Self::open_existing(services, &file)
    }

    fn open_from_reader(
        services: DocumentServices<G>,
        mut reader: Box<dyn FileReader>,
    ) -> Result<Self, DocumentError> {
        let location = reader.location().clone();
        let mut stream = match reader.open_stream() {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                return Err(DocumentError::Read {
                    location: Some(location),
                    source: io::Error::new(io::ErrorKind::NotFound, "no byte stream for document"),
                })
            }
            Err(source) => {
                return Err(DocumentError::Read {
                    location: Some(location),
                    source,
                })
            }
        };

        let graph = services
            .codec
            .decode(&mut stream)
            .map_err(|source| match source {
                CodecError::Io(source) => DocumentError::Read {
                    location: Some(location.clone()),
                    source,
                },
                source => DocumentError::Codec {
                    location: location.clone(),
                    source,
                },
            })?;
        let autosave = AutosaveStore::bind_to_source(&services.config, location.filename())
            .map_err(|source| DocumentError::BackupInit { source })?;

        let handle = Self::assemble(services, graph, Some(location), autosave);
        info!(
            "opened {} from {} with backup {:?}",
            handle.id,
            describe_location(handle.location().as_ref()),
            handle.autosave.path()
        );
        Ok(handle)
    }

    fn assemble(
        services: DocumentServices<G>,
        graph: G,
        location: Option<FileLocation>,
        autosave: AutosaveStore,
    ) -> Self {
        Self {
            id: DocumentId::next(),
            services,
            autosave,
            state: ReentrantMutex::new(DocumentState {
                graph: RefCell::new(graph),
                meta: RefCell::new(DocumentMeta {
                    location,
                    dirty: false,
                    listeners: ListenerRegistry::default(),
                }),
            }),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn services(&self) -> &DocumentServices<G> {
        &self.services
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().meta.borrow().dirty
    }

    /// True until the first successful explicit save.
    pub fn is_new(&self) -> bool {
        self.state.lock().meta.borrow().location.is_none()
    }

    pub fn location(&self) -> Option<FileLocation> {
        self.state.lock().meta.borrow().location.clone()
    }

    pub fn autosave_path(&self) -> &Path {
        self.autosave.path()
    }

    /// Read access to the payload.
    ///
    /// Returns `None` without calling `f` when an [`DocumentHandle::edit`] further up this
    /// thread's stack holds the payload.
    pub fn with_graph<R>(&self, f: impl FnOnce(&G) -> R) -> Option<R> {
        let guard = self.state.lock();
        let Ok(graph) = guard.graph.try_borrow() else {
            warn!("{}: payload read during an edit ignored", self.id);
            return None;
        };
        Some(f(&*graph))
    }

    /// Mutates the payload, then marks the document modified.
    ///
    /// Returns `None` without calling `f` when the payload is already lent out on this thread.
    /// Listeners notified afterwards may call back into the handle.
    pub fn edit<R>(&self, f: impl FnOnce(&mut G) -> R) -> Option<R> {
        let guard = self.state.lock();
        let result = {
            let Ok(mut graph) = guard.graph.try_borrow_mut() else {
                warn!("{}: nested edit ignored", self.id);
                return None;
            };
            f(&mut *graph)
        };
        self.mark_modified();
        drop(guard);
        Some(result)
    }

    /// Flags unsaved changes and notifies listeners before returning.
    pub fn mark_modified(&self) {
        let guard = self.state.lock();
        let delivery = {
            let mut meta = guard.meta.borrow_mut();
            meta.dirty = true;
            meta.listeners.delivery()
        };
        delivery.dispatch(&DocumentEvent::modified(self.id));
        drop(guard);
    }

    pub fn save(&self) -> Result<SaveOutcome, DocumentError> {
        let guard = self.state.lock();
        let location = guard.meta.borrow().location.clone();
        let Some(location) = location else {
            return self.save_as();
        };

        let writer = self
            .services
            .chooser
            .writer_for(&location)
            .map_err(|source| DocumentError::Persistence {
                location: Some(location.clone()),
                source,
            })?;
        self.persist_with(&guard, writer)
    }

    /// Always prompts for a target filtered by the payload's extension.
    pub fn save_as(&self) -> Result<SaveOutcome, DocumentError> {
        let guard = self.state.lock();
        let filter = match guard.graph.try_borrow() {
            Ok(graph) => graph.extension_filter(),
            Err(_) => {
                return Err(DocumentError::Persistence {
                    location: None,
                    source: payload_in_use(),
                })
            }
        };

        let target = match self
            .services
            .chooser
            .choose_write_target(&filter)
            .map_err(|source| DocumentError::Persistence {
                location: None,
                source,
            })? {
            Selection::Chosen(target) => target,
            Selection::Cancelled => {
                debug!("save-as of {} cancelled", self.id);
                return Ok(SaveOutcome::Cancelled);
            }
        };

        let writer = self
            .services
            .chooser
            .writer_for(&target)
            .map_err(|source| DocumentError::Persistence {
                location: Some(target.clone()),
                source,
            })?;
        self.persist_with(&guard, writer)
    }

    fn persist_with(
        &self,
        state: &DocumentState<G>,
        mut writer: Box<dyn FileWriter>,
    ) -> Result<SaveOutcome, DocumentError> {
        let bytes = {
            let graph = state
                .graph
                .try_borrow()
                .map_err(|_| DocumentError::Persistence {
                    location: Some(writer.location().clone()),
                    source: payload_in_use(),
                })?;
            encode_to_vec(self.services.codec.as_ref(), &*graph).map_err(|source| {
                DocumentError::Encode {
                    location: Some(writer.location().clone()),
                    source,
                }
            })?
        };
        writer
            .commit(&bytes)
            .map_err(|source| DocumentError::Persistence {
                location: Some(writer.location().clone()),
                source,
            })?;

        let location = writer.location().clone();
        let delivery = {
            let mut meta = state.meta.borrow_mut();
            meta.dirty = false;
            meta.location = Some(location.clone());
            meta.listeners.delivery()
        };
        delivery.dispatch(&DocumentEvent::saved(self.id));
        Ok(SaveOutcome::Saved(location))
    }

    /// Writes the current payload to the bound backup and sweeps the backup directory.
    ///
    /// Never changes the dirty flag or the location and never notifies listeners. The snapshot
    /// is encoded under the document lock; the disk write and sweep run after releasing it.
    pub fn autosave(&self) -> AutosaveOutcome {
        let timeout = self.services.config.autosave_lock_timeout();
        let Some(guard) = self.state.try_lock_for(timeout) else {
            debug!("autosave of {} skipped: document busy", self.id);
            return AutosaveOutcome::SkippedBusy;
        };
        // Re-entered from inside an edit on the owning thread.
        let Ok(graph) = guard.graph.try_borrow() else {
            debug!("autosave of {} skipped: payload borrowed", self.id);
            return AutosaveOutcome::SkippedBusy;
        };

        if !self.autosave.exists() {
            debug!(
                "autosave of {} skipped: backup {:?} is gone",
                self.id,
                self.autosave.path()
            );
            return AutosaveOutcome::SkippedMissingBackup;
        }

        let bytes = match encode_to_vec(self.services.codec.as_ref(), &*graph) {
            Ok(bytes) => bytes,
            Err(source) => {
                let err = StoreError::Codec {
                    path: self.autosave.path().to_path_buf(),
                    source,
                };
                warn!("autosave of {} failed: {err}", self.id);
                return AutosaveOutcome::Failed(err);
            }
        };
        drop(graph);
        drop(guard);

        match self.autosave.write_bytes(&bytes) {
            Ok(AutosaveWrite::Written(report)) => AutosaveOutcome::Written(report),
            Ok(AutosaveWrite::SkippedMissingBackup) => AutosaveOutcome::SkippedMissingBackup,
            Err(err) => {
                warn!("autosave of {} failed: {err}", self.id);
                AutosaveOutcome::Failed(err)
            }
        }
    }

    /// Serializes the payload into `sink` through the exporter registered for `format`.
    pub fn export_snapshot(
        &self,
        sink: &mut dyn Write,
        format: &ExportFormat,
    ) -> Result<(), DocumentError> {
        let exporter = self.services.exporters.get(format).ok_or_else(|| {
            DocumentError::UnsupportedFormat {
                format: format.clone(),
            }
        })?;

        let guard = self.state.lock();
        let Ok(graph) = guard.graph.try_borrow() else {
            return Err(DocumentError::Export {
                format: format.clone(),
                source: ExportError::from(payload_in_use()),
            });
        };
        exporter
            .export(&*graph, sink)
            .map_err(|source| DocumentError::Export {
                format: format.clone(),
                source,
            })
    }

    pub fn add_listener(&self, listener: impl DocumentListener + 'static) -> ListenerId {
        let guard = self.state.lock();
        let id = guard.meta.borrow_mut().listeners.add(Arc::new(listener));
        id
    }

    /// Once this returns, the listener receives no further events, including from a delivery
    /// already in progress on this thread.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let guard = self.state.lock();
        let removed = guard.meta.borrow_mut().listeners.remove(id);
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().meta.borrow().listeners.len()
    }

    /// Runs the retention sweep over the backup directory without writing anything.
    pub fn remove_backups(&self) -> Result<SweepReport, StoreError> {
        self.autosave.sweep()
    }
}

fn payload_in_use() -> io::Error {
    io::Error::new(io::ErrorKind::WouldBlock, "payload is lent to an edit on this thread")
}

fn describe_location(location: Option<&FileLocation>) -> String {
    location.map_or_else(|| "<new>".to_owned(), ToString::to_string)
}
