// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use crate::model::DocumentId;

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentEventKind {
    Modified,
    Saved,
}

impl fmt::Display for DocumentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modified => f.write_str("modified"),
            Self::Saved => f.write_str("saved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentEvent {
    document: DocumentId,
    kind: DocumentEventKind,
}

impl DocumentEvent {
    pub fn modified(document: DocumentId) -> Self {
        Self {
            document,
            kind: DocumentEventKind::Modified,
        }
    }

    pub fn saved(document: DocumentId) -> Self {
        Self {
            document,
            kind: DocumentEventKind::Saved,
        }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn kind(&self) -> DocumentEventKind {
        self.kind
    }
}

/// Receives lifecycle events synchronously on the thread that caused them.
///
/// A listener may call back into the emitting handle. Errors and panics are logged and do not
/// stop delivery to the remaining listeners.
pub trait DocumentListener: Send + Sync {
    fn on_event(&self, event: &DocumentEvent) -> Result<(), ListenerError>;
}

impl<F> DocumentListener for F
where
    F: Fn(&DocumentEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &DocumentEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Clone)]
struct Subscription {
    id: ListenerId,
    listener: Arc<dyn DocumentListener>,
    active: Arc<AtomicBool>,
}

/// Ordered subscriber set. Lives behind the owning handle's lock.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.subscriptions.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, listener: Arc<dyn DocumentListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            listener,
            active: Arc::new(AtomicBool::new(true)),
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let Some(index) = self.subscriptions.iter().position(|sub| sub.id == id) else {
            return false;
        };
        let removed = self.subscriptions.remove(index);
        // An in-flight delivery still holds a clone of this subscription.
        removed.active.store(false, Ordering::Release);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Snapshot of the current subscribers; later additions are not part of it.
    pub(crate) fn delivery(&self) -> Delivery {
        Delivery {
            subscriptions: self.subscriptions.clone(),
        }
    }
}

pub(crate) struct Delivery {
    subscriptions: Vec<Subscription>,
}

impl Delivery {
    pub(crate) fn dispatch(&self, event: &DocumentEvent) {
        for sub in &self.subscriptions {
            if !sub.active.load(Ordering::Acquire) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| sub.listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(
                        "{} failed handling {} event for {}: {err}",
                        sub.id,
                        event.kind(),
                        event.document()
                    );
                }
                Err(_) => {
                    warn!(
                        "{} panicked handling {} event for {}",
                        sub.id,
                        event.kind(),
                        event.document()
                    );
                }
            }
        }
    }
}
