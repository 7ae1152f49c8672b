//! Session state machine with transition listeners.
//!
//! Four states gate what the dispatcher may do:
//! - Idle: nothing in progress, input accepted
//! - Listening: a word is being typed, input accepted
//! - Correcting: a replace sequence is in flight, input dropped
//! - Paused: input dropped
//!
//! Any state may move to any other; guards live in the callers. Listeners run
//! after the lock is released, in registration order, and may call back into
//! the machine.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operational state of a typing session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Idle,
    Listening,
    Correcting,
    Paused,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Listening => write!(f, "listening"),
            SessionState::Correcting => write!(f, "correcting"),
            SessionState::Paused => write!(f, "paused"),
        }
    }
}

impl SessionState {
    /// Whether key events are processed in this state.
    pub fn accepts_input(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Listening)
    }

    /// Whether a correction may start from this state.
    pub fn allows_correction(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Listening)
    }
}

/// Callback invoked with `(from, to)` after every effective transition.
pub type TransitionListener = Arc<dyn Fn(SessionState, SessionState) + Send + Sync>;

struct SessionInner {
    current: SessionState,
    listeners: Vec<TransitionListener>,
}

/// Thread-safe session state machine.
///
/// Cloning yields another handle to the same machine.
#[derive(Clone)]
pub struct SessionMachine {
    inner: Arc<Mutex<SessionInner>>,
}

impl fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionMachine")
            .field("current", &inner.current)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                current: SessionState::Idle,
                listeners: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> SessionState {
        self.lock().current
    }

    pub fn is(&self, state: SessionState) -> bool {
        self.current() == state
    }

    /// Move to `to` and notify listeners.
    ///
    /// Self-transitions change nothing and notify nobody. Returns whether the
    /// state changed.
    pub fn transition(&self, to: SessionState) -> bool {
        let (from, listeners) = {
            let mut inner = self.lock();
            let from = inner.current;
            if from == to {
                return false;
            }
            inner.current = to;
            (from, inner.listeners.clone())
        };

        for listener in &listeners {
            listener(from, to);
        }
        true
    }

    /// Register a callback for transitions. Listeners cannot be removed.
    pub fn on_transition<F>(&self, listener: F)
    where
        F: Fn(SessionState, SessionState) + Send + Sync + 'static,
    {
        self.lock().listeners.push(Arc::new(listener));
    }

    pub fn can_accept_input(&self) -> bool {
        self.current().accepts_input()
    }

    pub fn can_correct(&self) -> bool {
        self.current().allows_correction()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALL: [SessionState; 4] = [
        SessionState::Idle,
        SessionState::Listening,
        SessionState::Correcting,
        SessionState::Paused,
    ];

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Listening.to_string(), "listening");
        assert_eq!(SessionState::Correcting.to_string(), "correcting");
        assert_eq!(SessionState::Paused.to_string(), "paused");
    }

    #[test]
    fn test_gates() {
        let sm = SessionMachine::new();
        for state in ALL {
            sm.transition(state);
            let open = matches!(state, SessionState::Idle | SessionState::Listening);
            assert_eq!(sm.can_accept_input(), open, "accept input in {}", state);
            assert_eq!(sm.can_correct(), open, "correct in {}", state);
        }
    }

    #[test]
    fn test_any_state_reaches_any_other() {
        for from in ALL {
            for to in ALL {
                let sm = SessionMachine::new();
                sm.transition(from);
                sm.transition(to);
                assert_eq!(sm.current(), to);
            }
        }
    }

    #[test]
    fn test_self_transition_is_silent() {
        let sm = SessionMachine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        sm.on_transition(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!sm.transition(SessionState::Idle));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(sm.transition(SessionState::Listening));
        assert!(!sm.transition(SessionState::Listening));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let sm = SessionMachine::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let log = Arc::clone(&log);
            sm.on_transition(move |from, to| {
                log.lock().unwrap().push((id, from, to));
            });
        }

        sm.transition(SessionState::Correcting);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                (0, SessionState::Idle, SessionState::Correcting),
                (1, SessionState::Idle, SessionState::Correcting),
                (2, SessionState::Idle, SessionState::Correcting),
            ]
        );
    }

    #[test]
    fn test_listener_may_reenter_machine() {
        let sm = SessionMachine::new();
        let handle = sm.clone();
        sm.on_transition(move |_, to| {
            // Reads and nested transitions must not deadlock.
            assert_eq!(handle.current(), to);
            if to == SessionState::Correcting {
                handle.transition(SessionState::Listening);
            }
        });

        sm.transition(SessionState::Correcting);
        assert_eq!(sm.current(), SessionState::Listening);
    }

    #[test]
    fn test_listener_registered_during_notification_sees_next_transition() {
        let sm = SessionMachine::new();
        let late_calls = Arc::new(AtomicUsize::new(0));
        let handle = sm.clone();
        let counter = Arc::clone(&late_calls);
        sm.on_transition(move |_, _| {
            let counter = Arc::clone(&counter);
            handle.on_transition(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        sm.transition(SessionState::Listening);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        sm.transition(SessionState::Idle);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clone_is_shared() {
        let sm1 = SessionMachine::new();
        let sm2 = sm1.clone();
        sm1.transition(SessionState::Paused);
        assert!(sm2.is(SessionState::Paused));
    }
}
