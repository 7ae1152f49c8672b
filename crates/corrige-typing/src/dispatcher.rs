//! Serial consumer of key events.
//!
//! Every press goes through the session gate, the idle-timeout check, and
//! then either word completion or the buffer. Events are handled strictly one
//! at a time so the buffer sees keystrokes in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};

use crate::coordinator::{CorrectionCoordinator, CorrectionOutcome};
use crate::display::{DisplayProjection, DisplaySink};
use crate::keyboard::{is_printable, is_word_separator, KeyEvent};
use crate::state::{SessionMachine, SessionState};
use crate::writing::Writing;

/// What happened to a single key event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Release, non-text key, or a rune that is neither printable nor a separator.
    Ignored,
    /// Dropped at the gate because the session does not accept input.
    Rejected(SessionState),
    /// The rune was appended to the current word.
    Appended(char),
    /// A separator arrived with no word in progress.
    EmptySeparator,
    /// A separator completed a word.
    WordCompleted(CorrectionOutcome),
}

/// Routes key events into the buffer and the correction coordinator.
pub struct InputDispatcher {
    session: SessionMachine,
    writing: Writing,
    coordinator: Arc<CorrectionCoordinator>,
    display: DisplaySink,
    projection: DisplayProjection,
    runtime: Handle,
    stopped: AtomicBool,
    shutdown: Notify,
}

impl std::fmt::Debug for InputDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDispatcher")
            .field("session", &self.session)
            .field("words", &self.writing.word_count())
            .finish_non_exhaustive()
    }
}

impl InputDispatcher {
    pub fn new(
        session: SessionMachine,
        writing: Writing,
        coordinator: Arc<CorrectionCoordinator>,
        display: DisplaySink,
        projection: DisplayProjection,
        runtime: Handle,
    ) -> Self {
        Self {
            session,
            writing,
            coordinator,
            display,
            projection,
            runtime,
            stopped: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Handle one key event synchronously.
    ///
    /// May block for the duration of a replace sequence.
    pub fn handle_event(&self, event: &KeyEvent) -> DispatchOutcome {
        if !event.is_press() {
            return DispatchOutcome::Ignored;
        }
        let Some(rune) = event.rune() else {
            return DispatchOutcome::Ignored;
        };

        let state = self.session.current();
        if !state.accepts_input() {
            tracing::trace!(state = %state, "Key dropped at session gate");
            return DispatchOutcome::Rejected(state);
        }

        if self.writing.check_timeout() {
            tracing::debug!("Writing buffer timed out");
            self.session.transition(SessionState::Idle);
        }

        if is_word_separator(rune) {
            return self.complete_word();
        }

        if !is_printable(rune) {
            return DispatchOutcome::Ignored;
        }

        if self.session.is(SessionState::Idle) {
            self.session.transition(SessionState::Listening);
        }
        self.writing.add_char(rune);
        self.refresh_display();
        DispatchOutcome::Appended(rune)
    }

    fn complete_word(&self) -> DispatchOutcome {
        let Some(word) = self.writing.complete_word() else {
            self.settle_if_empty();
            return DispatchOutcome::EmptySeparator;
        };

        tracing::debug!(word = %word.text, "Word completed");
        let outcome = self.coordinator.handle_completed_word(&word);
        self.settle_if_empty();
        DispatchOutcome::WordCompleted(outcome)
    }

    fn settle_if_empty(&self) {
        if self.writing.is_empty() && !self.session.is(SessionState::Correcting) {
            self.session.transition(SessionState::Idle);
        }
    }

    /// Publish the projection of the current session and buffer.
    pub fn refresh_display(&self) {
        self.display
            .publish(self.projection.project(self.session.current(), &self.writing));
    }

    /// Drain `rx` until every sender is dropped or `stop` is called.
    /// Returns the number of events handled.
    ///
    /// Blocks the calling thread; run it on a blocking worker.
    pub fn run(&self, mut rx: mpsc::UnboundedReceiver<KeyEvent>) -> usize {
        let mut handled = 0usize;
        while !self.stopped.load(Ordering::SeqCst) {
            let next = self.runtime.block_on(async {
                tokio::select! {
                    biased;
                    _ = self.shutdown.notified() => None,
                    event = rx.recv() => event,
                }
            });
            let Some(event) = next else {
                break;
            };
            self.handle_event(&event);
            handled += 1;
        }
        tracing::debug!(handled, "Dispatcher finished");
        handled
    }

    /// Make `run` return after the event in progress, even if senders remain.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
