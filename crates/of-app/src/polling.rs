//! Background training-progress poller.
//!
//! The worker asks for progress right away and then once per interval until
//! it sees the final stage. The handle owns the worker: cancelling or
//! dropping it stops the loop and joins the thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use of_api::Transport;
use of_core::{FlowId, TrainingStage};
use tracing::{debug, warn};

use crate::flow_service;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Progress(TrainingStage),
    /// Final stage reached; the worker has stopped.
    Completed,
    /// A request failed. Polling continues with the next tick.
    Error(String),
}

pub struct ProgressPoller {
    flow_id: FlowId,
    events: Receiver<PollEvent>,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressPoller {
    pub fn start<T: Transport + 'static>(
        session: Session<T>,
        flow_id: FlowId,
        interval: Duration,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let (cancel_tx, cancel_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            run(&session, flow_id, interval, &cancel_rx, &event_tx);
            debug!(%flow_id, "progress poller stopped");
        });

        Self {
            flow_id,
            events: event_rx,
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    pub fn events(&self) -> &Receiver<PollEvent> {
        &self.events
    }

    /// Wait up to `timeout` for the next event. `None` on timeout or once the
    /// worker is gone and every event has been read.
    pub fn next_event(&self, timeout: Duration) -> Option<PollEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the worker and wait for it. Safe to call more than once.
    pub fn cancel(&mut self) {
        // Dropping the sender wakes the worker out of its wait.
        self.cancel.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(flow_id = %self.flow_id, "progress poller panicked");
            }
        }
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    interval: Duration,
    cancel: &Receiver<()>,
    events: &Sender<PollEvent>,
) {
    loop {
        match flow_service::poll_flow_progress(session, flow_id) {
            Ok(stage) => {
                if events.send(PollEvent::Progress(stage)).is_err() {
                    return;
                }
                if stage.is_terminal() {
                    let _ = events.send(PollEvent::Completed);
                    return;
                }
            }
            Err(err) => {
                warn!(%flow_id, error = %err, "progress poll failed");
                if events.send(PollEvent::Error(err.to_string())).is_err() {
                    return;
                }
            }
        }

        match cancel.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
