//! Correction coordinator: decides what to do with each completed word and
//! runs the select, delete, retype sequence against the focused application.
//!
//! The session stays `Correcting` for the whole sequence and for a settle
//! delay afterwards, so the synthetic keystrokes echoed back by the key hook
//! are dropped at the dispatcher gate. Leaving `Correcting` is done by a
//! deferred re-arm task that is scheduled once per correction, whatever the
//! injection outcome.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use corrige_core::config::CorrigeConfig;
use corrige_core::types::{DisplayStatus, SpellLookup, Suggestion};

use crate::display::{DisplayProjection, DisplaySink};
use crate::keyboard::{
    select_previous_word_modifiers, InjectError, InputInjector, Key, PlatformFamily,
};
use crate::state::{SessionMachine, SessionState};
use crate::writing::{Word, Writing};

/// Tunables for the correction decision and the re-arm delay.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionSettings {
    /// Minimum top-suggestion score that triggers a rewrite.
    pub acceptance_threshold: f64,
    /// Suggestions requested per completed word.
    pub max_suggestions: usize,
    /// Time between the end of a replace sequence and re-accepting input.
    pub settle_delay: Duration,
    /// When false, misspellings only produce a hint.
    pub auto_correct: bool,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.8,
            max_suggestions: 3,
            settle_delay: Duration::from_millis(200),
            auto_correct: true,
        }
    }
}

impl From<&CorrigeConfig> for CorrectionSettings {
    fn from(config: &CorrigeConfig) -> Self {
        Self {
            acceptance_threshold: config.correction.acceptance_threshold,
            max_suggestions: config.correction.max_suggestions,
            settle_delay: config.correction.settle_delay(),
            auto_correct: config.general.auto_correct,
        }
    }
}

/// Step of the replace sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStep {
    Select,
    Delete,
    Type,
}

impl fmt::Display for ReplaceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceStep::Select => write!(f, "selecting word"),
            ReplaceStep::Delete => write!(f, "deleting word"),
            ReplaceStep::Type => write!(f, "typing correction"),
        }
    }
}

/// A replace sequence aborted at `step`.
#[derive(Debug, thiserror::Error)]
#[error("error {step}: {source}")]
pub struct ReplaceError {
    pub step: ReplaceStep,
    #[source]
    pub source: InjectError,
}

/// What the coordinator did with a completed word.
#[derive(Debug)]
pub enum CorrectionOutcome {
    /// The word is in the dictionary.
    Correct,
    /// Misspelled, and the dictionary had nothing to offer.
    Unknown,
    /// Misspelled; the best suggestion was only displayed.
    Hint { suggestion: Suggestion },
    /// The word was rewritten on screen.
    Corrected { replacement: String },
    /// The replace sequence aborted part way.
    Failed {
        replacement: String,
        error: ReplaceError,
    },
}

/// The pending transition out of `Correcting`.
struct RearmTask {
    handle: JoinHandle<()>,
    rearm: Rearm,
}

/// Handles the re-arm needs, cloned into the deferred task.
#[derive(Clone)]
struct Rearm {
    session: SessionMachine,
    writing: Writing,
    display: DisplaySink,
    projection: DisplayProjection,
}

impl Rearm {
    fn run(&self) {
        if self.session.is(SessionState::Correcting) {
            let next = if self.writing.is_empty() {
                SessionState::Idle
            } else {
                SessionState::Listening
            };
            self.session.transition(next);
        }
        self.display
            .publish(self.projection.project(self.session.current(), &self.writing));
        tracing::info!("Auto-correction finished, input unlocked");
    }
}

/// Runs spell checks on completed words and rewrites the confident ones.
pub struct CorrectionCoordinator {
    session: SessionMachine,
    writing: Writing,
    lookup: Arc<dyn SpellLookup>,
    injector: Option<Arc<dyn InputInjector>>,
    display: DisplaySink,
    projection: DisplayProjection,
    settings: CorrectionSettings,
    platform: PlatformFamily,
    runtime: Handle,
    pending: Mutex<Option<RearmTask>>,
}

impl fmt::Debug for CorrectionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrectionCoordinator")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("platform", &self.platform)
            .field("has_injector", &self.injector.is_some())
            .finish()
    }
}

impl CorrectionCoordinator {
    /// Create a coordinator. Without an injector it only ever displays hints.
    ///
    /// `runtime` is where re-arm tasks are spawned; the coordinator itself may
    /// be driven from any thread.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: SessionMachine,
        writing: Writing,
        lookup: Arc<dyn SpellLookup>,
        injector: Option<Arc<dyn InputInjector>>,
        display: DisplaySink,
        settings: CorrectionSettings,
        runtime: Handle,
    ) -> Self {
        let projection = DisplayProjection::new(Arc::clone(&lookup));
        Self {
            session,
            writing,
            lookup,
            injector,
            display,
            projection,
            settings,
            platform: PlatformFamily::current(),
            runtime,
            pending: Mutex::new(None),
        }
    }

    /// Override the host platform used to pick the word-selection shortcut.
    pub fn with_platform(mut self, platform: PlatformFamily) -> Self {
        self.platform = platform;
        self
    }

    pub fn settings(&self) -> &CorrectionSettings {
        &self.settings
    }

    pub fn can_inject(&self) -> bool {
        self.injector.is_some() && self.settings.auto_correct
    }

    fn pending(&self) -> MutexGuard<'_, Option<RearmTask>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check a just-completed word and correct it if the dictionary is confident.
    ///
    /// `word` must already be the last entry of the writing history.
    pub fn handle_completed_word(&self, word: &Word) -> CorrectionOutcome {
        let result = self.lookup.check(&word.text, self.settings.max_suggestions);

        if result.is_correct {
            tracing::debug!(word = %word.text, "Spelling correct");
            self.display
                .send(format!("{} ✓", word.text), DisplayStatus::Correct);
            return CorrectionOutcome::Correct;
        }

        let Some(best) = result.best().cloned() else {
            tracing::debug!(word = %word.text, "Spelling incorrect, no suggestions");
            self.display
                .send(format!("{} ?", word.text), DisplayStatus::Incorrect);
            return CorrectionOutcome::Unknown;
        };

        let scored: Vec<_> = result.suggestions.iter().map(|s| (&s.value, s.score)).collect();
        tracing::debug!(word = %word.text, suggestions = ?scored, "Spelling incorrect");

        let confident = best.score >= self.settings.acceptance_threshold;
        let allowed = confident && self.settings.auto_correct && self.session.can_correct();
        let typable = |injector: &Arc<dyn InputInjector>| {
            injector.can_type(&format!("{} ", best.value))
        };
        let injector = match &self.injector {
            Some(injector) if allowed && typable(injector) => Arc::clone(injector),
            _ => {
                if !confident {
                    tracing::debug!(
                        score = best.score,
                        threshold = self.settings.acceptance_threshold,
                        "Best suggestion score too low, skipping auto-correction"
                    );
                } else if allowed && self.injector.is_some() {
                    tracing::debug!(
                        replacement = %best.value,
                        "Injector cannot type replacement, showing hint"
                    );
                }
                self.display.send(
                    format!("{} → {}", word.text, best.value),
                    DisplayStatus::Suggestion,
                );
                return CorrectionOutcome::Hint { suggestion: best };
            }
        };

        self.correct(injector.as_ref(), &word.text, best.value)
    }

    fn correct(
        &self,
        injector: &dyn InputInjector,
        original: &str,
        replacement: String,
    ) -> CorrectionOutcome {
        tracing::info!(original, replacement = %replacement, "Auto-correcting");

        self.session.transition(SessionState::Correcting);
        self.display.correcting();

        let result = self.replace_sequence(injector, &replacement);

        match &result {
            Err(e) if e.step == ReplaceStep::Select => {
                // Nothing on screen changed, keep the history as typed.
            }
            _ => {
                self.writing.replace_last_word(&replacement);
            }
        }

        self.schedule_rearm();

        match result {
            Ok(()) => CorrectionOutcome::Corrected { replacement },
            Err(error) => {
                tracing::warn!(error = %error, "Correction failed");
                CorrectionOutcome::Failed { replacement, error }
            }
        }
    }

    fn replace_sequence(
        &self,
        injector: &dyn InputInjector,
        replacement: &str,
    ) -> Result<(), ReplaceError> {
        let step = |step: ReplaceStep| move |source: InjectError| ReplaceError { step, source };

        injector
            .combo(select_previous_word_modifiers(self.platform), Key::Left)
            .map_err(step(ReplaceStep::Select))?;
        injector
            .tap(Key::Backspace)
            .map_err(step(ReplaceStep::Delete))?;
        injector
            .type_text(&format!("{} ", replacement))
            .map_err(step(ReplaceStep::Type))?;
        injector.flush();
        Ok(())
    }

    fn schedule_rearm(&self) {
        let rearm = Rearm {
            session: self.session.clone(),
            writing: self.writing.clone(),
            display: self.display.clone(),
            projection: self.projection.clone(),
        };
        let delay = self.settings.settle_delay;
        let task_rearm = rearm.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task_rearm.run();
        });

        let previous = self.pending().replace(RearmTask { handle, rearm });
        if let Some(previous) = previous {
            if !previous.handle.is_finished() {
                tracing::warn!("Re-arm scheduled while another was pending");
            }
        }
    }

    /// Whether a re-arm is scheduled and has not run yet.
    pub fn rearm_pending(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Cancel a pending re-arm timer and leave `Correcting` immediately.
    pub fn shutdown(&self) {
        let task = self.pending().take();
        if let Some(task) = task {
            if !task.handle.is_finished() {
                task.handle.abort();
                task.rearm.run();
                tracing::debug!("Pending re-arm cancelled and applied");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
