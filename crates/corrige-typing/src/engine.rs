//! Typing engine: owns the session, the buffer and the display sink, and wires
//! them to the correction coordinator and the input dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use corrige_core::config::CorrigeConfig;
use corrige_core::types::{DisplayUpdate, SpellLookup};

use crate::coordinator::{CorrectionCoordinator, CorrectionSettings};
use crate::dispatcher::InputDispatcher;
use crate::display::{DisplayProjection, DisplaySink, DEFAULT_CAPACITY};
use crate::keyboard::{InputInjector, KeyEvent};
use crate::state::{SessionMachine, SessionState};
use crate::writing::Writing;

/// Everything the engine needs to know at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub word_timeout: Duration,
    pub correction: CorrectionSettings,
    pub display_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            word_timeout: Duration::from_secs(5),
            correction: CorrectionSettings::default(),
            display_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&CorrigeConfig> for EngineSettings {
    fn from(config: &CorrigeConfig) -> Self {
        Self {
            word_timeout: config.writing.word_timeout(),
            correction: CorrectionSettings::from(config),
            display_capacity: config.display.channel_capacity,
        }
    }
}

/// A fully wired typing session.
pub struct TypingEngine {
    session: SessionMachine,
    writing: Writing,
    display: DisplaySink,
    coordinator: Arc<CorrectionCoordinator>,
    dispatcher: Arc<InputDispatcher>,
    runtime: Handle,
}

impl std::fmt::Debug for TypingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingEngine")
            .field("session", &self.session)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl TypingEngine {
    /// Build an engine and return it with the receiving end of its display queue.
    ///
    /// Pass `None` as `injector` for detect-only operation. Timers and the
    /// dispatcher worker are spawned on `runtime`.
    pub fn new(
        settings: EngineSettings,
        lookup: Arc<dyn SpellLookup>,
        injector: Option<Arc<dyn InputInjector>>,
        runtime: Handle,
    ) -> (Self, mpsc::Receiver<DisplayUpdate>) {
        let session = SessionMachine::new();
        session.on_transition(|from, to| {
            tracing::debug!("Session state: {} -> {}", from, to);
        });

        let writing = Writing::new(settings.word_timeout);
        let (display, display_rx) = DisplaySink::channel(settings.display_capacity);
        let coordinator = Arc::new(CorrectionCoordinator::new(
            session.clone(),
            writing.clone(),
            Arc::clone(&lookup),
            injector,
            display.clone(),
            settings.correction,
            runtime.clone(),
        ));
        let dispatcher = Arc::new(InputDispatcher::new(
            session.clone(),
            writing.clone(),
            Arc::clone(&coordinator),
            display.clone(),
            DisplayProjection::new(lookup),
            runtime.clone(),
        ));

        tracing::info!(
            auto_correct = coordinator.can_inject(),
            timeout_ms = writing.timeout().as_millis() as u64,
            "Typing engine created"
        );

        let engine = Self {
            session,
            writing,
            display,
            coordinator,
            dispatcher,
            runtime,
        };
        (engine, display_rx)
    }

    /// Reset to `Idle` with an empty buffer and show the initial display.
    pub fn start(&self) {
        self.writing.clear();
        self.session.transition(SessionState::Idle);
        self.dispatcher.refresh_display();
        tracing::info!("Typing engine started");
    }

    /// Consume key events on a blocking worker until the sender side closes
    /// or the engine shuts down.
    pub fn spawn_dispatcher(&self, rx: mpsc::UnboundedReceiver<KeyEvent>) -> JoinHandle<usize> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.runtime.spawn_blocking(move || dispatcher.run(rx))
    }

    /// Handle a single event inline. Mostly useful for embedding and tests.
    pub fn handle_event(&self, event: &KeyEvent) {
        self.dispatcher.handle_event(event);
    }

    /// Stop collecting input until `resume`.
    pub fn pause(&self) {
        if self.session.transition(SessionState::Paused) {
            tracing::info!("Typing engine paused");
            self.dispatcher.refresh_display();
        }
    }

    /// Leave `Paused`. Does nothing in any other state.
    pub fn resume(&self) {
        if !self.session.is(SessionState::Paused) {
            return;
        }
        let next = if self.writing.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Listening
        };
        self.session.transition(next);
        self.dispatcher.refresh_display();
        tracing::info!("Typing engine resumed");
    }

    pub fn state(&self) -> SessionState {
        self.session.current()
    }

    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    pub fn full_text(&self) -> String {
        self.writing.full_text()
    }

    pub fn word_count(&self) -> usize {
        self.writing.word_count()
    }

    /// Stop the dispatcher worker, leave `Correcting` if a re-arm is pending
    /// and close the display queue.
    pub fn shutdown(&self) {
        self.dispatcher.stop();
        self.coordinator.shutdown();
        self.display.stop();
        tracing::info!(words = self.writing.word_count(), "Typing engine stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================
