//! In-process host dispatcher.
//!
//! Plays the host's role for one worker generation: delivers install,
//! activate and fetch events in order, grants `skip_waiting` and
//! `claim_clients`, and tracks lifetime extensions of fetch events.
//!
//! State machine:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |                          |
//!               +-------> Redundant <------+
//! ```
//!
//! An installed generation waits while a previous generation still controls
//! clients, unless it called `skip_waiting` or the previous generation is
//! released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::Error;
use crate::events::{FetchEvent, HostControl};
use crate::http::{Request, Response};
use crate::lifecycle::{ActivateReport, InstallReport};
use crate::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Default)]
struct HostFlags {
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

#[async_trait]
impl HostControl for HostFlags {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.clients_claimed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Drives one worker generation through its lifecycle.
pub struct Dispatcher<W> {
    worker: Arc<W>,
    state: Mutex<WorkerState>,
    flags: HostFlags,
    previous_controller: AtomicBool,
    in_flight: Mutex<Vec<Arc<FetchEvent>>>,
}

impl<W: Worker> Dispatcher<W> {
    /// `previous_controller` says whether an older generation currently
    /// controls open clients.
    pub fn new(worker: W, previous_controller: bool) -> Self {
        Self {
            worker: Arc::new(worker),
            state: Mutex::new(WorkerState::Parsed),
            flags: HostFlags::default(),
            previous_controller: AtomicBool::new(previous_controller),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Whether the worker asked to skip the waiting phase.
    pub fn skipped_waiting(&self) -> bool {
        self.flags.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether the worker controls open clients: it claimed them, or there
    /// were none under an older generation.
    pub fn controls_clients(&self) -> bool {
        self.state() == WorkerState::Activated
            && (self.flags.clients_claimed.load(Ordering::SeqCst) || !self.previous_controller.load(Ordering::SeqCst))
    }

    /// The previous generation's clients have all closed.
    pub fn release_previous(&self) {
        self.previous_controller.store(false, Ordering::SeqCst);
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(Error::InvalidState(format!("expected {from:?}, worker is {:?}", *state)));
        }
        *state = to;
        Ok(())
    }

    fn settle_state(&self, to: WorkerState) {
        *self.state.lock() = to;
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        match self.worker.on_install(&self.flags).await {
            Ok(report) => {
                self.settle_state(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                self.settle_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        if self.state() == WorkerState::Installed
            && self.previous_controller.load(Ordering::SeqCst)
            && !self.skipped_waiting()
        {
            return Err(Error::InvalidState("waiting for the previous generation's clients to close".into()));
        }

        self.transition(WorkerState::Installed, WorkerState::Activating)?;
        match self.worker.on_activate(&self.flags).await {
            Ok(report) => {
                self.settle_state(WorkerState::Activated);
                Ok(report)
            }
            Err(e) => {
                self.settle_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Deliver a fetch event and return the worker's response.
    ///
    /// The response is returned as soon as the worker responds; lifetime
    /// extensions keep running until [`Dispatcher::settle`].
    pub async fn dispatch(&self, request: Request) -> Result<Response, Error> {
        let state = self.state();
        if state != WorkerState::Activated {
            return Err(Error::InvalidState(format!("cannot resolve requests while {state:?}")));
        }

        let (event, rx) = FetchEvent::new(request);
        let event = Arc::new(event);
        self.worker.on_resolve(&event).await;

        if !event.has_responded() {
            return Err(Error::InvalidState(format!("worker did not respond to {}", event.request().url)));
        }
        if event.pending() > 0 {
            let mut in_flight = self.in_flight.lock();
            in_flight.retain(|tracked| !tracked.is_settled());
            in_flight.push(Arc::clone(&event));
        }

        rx.await
            .map_err(|_| Error::InvalidState("fetch event responder dropped".into()))?
    }

    /// Await every outstanding lifetime extension.
    pub async fn settle(&self) {
        let events = std::mem::take(&mut *self.in_flight.lock());
        for event in events {
            event.settled().await;
        }
    }
}
