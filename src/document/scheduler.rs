// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use log::debug;

use super::{AutosaveOutcome, DocumentHandle};
use crate::model::Graph;

#[derive(Debug, Default)]
struct SchedulerState {
    stopped: bool,
    ticks: u64,
}

#[derive(Debug, Default)]
struct SchedulerInner {
    state: Mutex<SchedulerState>,
    cv: Condvar,
}

/// Periodic autosave on a dedicated thread.
///
/// The worker holds only a weak reference to the handle: dropping the last strong reference
/// ends the loop at the next tick. Stopping or dropping the scheduler wakes the worker at once
/// and joins it.
#[derive(Debug)]
pub struct AutosaveScheduler {
    inner: Arc<SchedulerInner>,
    worker: Option<JoinHandle<()>>,
}

impl AutosaveScheduler {
    pub fn start<G: Graph>(
        handle: &Arc<DocumentHandle<G>>,
        interval: Duration,
    ) -> io::Result<Self> {
        let inner = Arc::new(SchedulerInner::default());
        let document = Arc::downgrade(handle);

        let worker = std::thread::Builder::new()
            .name("graphfile-autosave".to_owned())
            .spawn({
                let inner = Arc::clone(&inner);
                move || Self::run_worker(inner, document, interval)
            })?;

        Ok(Self {
            inner,
            worker: Some(worker),
        })
    }

    /// Starts with the interval from the handle's configuration.
    pub fn for_handle<G: Graph>(handle: &Arc<DocumentHandle<G>>) -> io::Result<Self> {
        let interval = handle.services().config().autosave_interval();
        Self::start(handle, interval)
    }

    /// Number of autosave attempts made so far.
    pub fn ticks(&self) -> u64 {
        self.inner
            .state
            .lock()
            .expect("autosave scheduler lock poisoned")
            .ticks
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        {
            // Also runs from Drop: recover a poisoned lock instead of panicking again.
            let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.stopped = true;
            self.inner.cv.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn run_worker<G: Graph>(
        inner: Arc<SchedulerInner>,
        document: Weak<DocumentHandle<G>>,
        interval: Duration,
    ) {
        loop {
            {
                let state = inner
                    .state
                    .lock()
                    .expect("autosave scheduler lock poisoned");
                let (state, _) = inner
                    .cv
                    .wait_timeout_while(state, interval, |state| !state.stopped)
                    .expect("autosave scheduler cv poisoned");
                if state.stopped {
                    return;
                }
            }

            let Some(handle) = document.upgrade() else {
                debug!("autosave worker exiting: document dropped");
                return;
            };
            let outcome = handle.autosave();
            drop(handle);

            if let AutosaveOutcome::Written(report) = &outcome {
                debug!(
                    "autosave tick: {} backups evicted, {} bytes in backup directory",
                    report.removed().len(),
                    report.final_bytes()
                );
            }
            inner
                .state
                .lock()
                .expect("autosave scheduler lock poisoned")
                .ticks += 1;
        }
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
