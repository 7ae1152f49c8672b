//! Display updates: a bounded, lossy channel to the presentation layer.
//!
//! Producers never block. When the queue is full the update is dropped, so a
//! slow presentation layer can only make the display stale, never delay key
//! handling. A single forwarder drains the queue into a `DisplayBoundary`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use corrige_core::types::{DisplayStatus, DisplayUpdate, SpellLookup};

use crate::state::SessionState;
use crate::writing::Writing;

/// Default number of updates buffered before new ones are dropped.
pub const DEFAULT_CAPACITY: usize = 100;

/// Receiving end of the presentation pipeline.
pub trait DisplayBoundary: Send + 'static {
    fn present(&mut self, update: &DisplayUpdate);
}

impl<F> DisplayBoundary for F
where
    F: FnMut(&DisplayUpdate) + Send + 'static,
{
    fn present(&mut self, update: &DisplayUpdate) {
        self(update)
    }
}

/// Producer side of the display queue. Cloning yields another handle.
#[derive(Debug, Clone)]
pub struct DisplaySink {
    tx: Arc<Mutex<Option<mpsc::Sender<DisplayUpdate>>>>,
}

impl DisplaySink {
    /// Create a sink and the receiver its forwarder should drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DisplayUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        };
        (sink, rx)
    }

    fn lock(&self) -> MutexGuard<'_, Option<mpsc::Sender<DisplayUpdate>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an update without blocking. Returns whether it was queued.
    pub fn send(&self, text: impl Into<String>, status: DisplayStatus) -> bool {
        self.publish(DisplayUpdate::new(text, status))
    }

    /// Queue a prepared update without blocking. Returns whether it was queued.
    pub fn publish(&self, update: DisplayUpdate) -> bool {
        let guard = self.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        match tx.try_send(update) {
            Ok(()) => true,
            Err(TrySendError::Full(update)) => {
                tracing::trace!(status = %update.status, "Display queue full, update dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn waiting(&self) -> bool {
        self.send("Waiting...", DisplayStatus::Waiting)
    }

    pub fn correcting(&self) -> bool {
        self.send("Correcting...", DisplayStatus::Correcting)
    }

    /// Close the queue. Later calls, and later sends, do nothing.
    pub fn stop(&self) {
        if self.lock().take().is_some() {
            tracing::debug!("Display sink stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().is_none()
    }
}

/// Drain `rx` into `boundary` until every sender is gone and the queue is empty.
///
/// The task resolves to the number of updates forwarded.
pub fn spawn_forwarder<B>(
    mut rx: mpsc::Receiver<DisplayUpdate>,
    mut boundary: B,
) -> JoinHandle<usize>
where
    B: DisplayBoundary,
{
    tokio::spawn(async move {
        let mut forwarded = 0usize;
        while let Some(update) = rx.recv().await {
            boundary.present(&update);
            forwarded += 1;
        }
        tracing::debug!(forwarded, "Display forwarder finished");
        forwarded
    })
}

/// Projects session and buffer state into the text shown to the user.
#[derive(Clone)]
pub struct DisplayProjection {
    lookup: Arc<dyn SpellLookup>,
}

impl std::fmt::Debug for DisplayProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayProjection").finish_non_exhaustive()
    }
}

impl DisplayProjection {
    pub fn new(lookup: Arc<dyn SpellLookup>) -> Self {
        Self { lookup }
    }

    pub fn project(&self, state: SessionState, writing: &Writing) -> DisplayUpdate {
        match state {
            SessionState::Correcting => {
                DisplayUpdate::new("Correcting...", DisplayStatus::Correcting)
            }
            SessionState::Idle => DisplayUpdate::new("Waiting...", DisplayStatus::Waiting),
            SessionState::Paused => DisplayUpdate::new("Paused", DisplayStatus::Waiting),
            SessionState::Listening => {
                let current = writing.current_word();
                if current.is_empty() {
                    return match writing.last_word() {
                        Some(last) => {
                            DisplayUpdate::new(format!("{} ✓", last.text), DisplayStatus::Correct)
                        }
                        None => DisplayUpdate::new("Listening...", DisplayStatus::Listening),
                    };
                }

                let result = self.lookup.check(&current.text, 1);
                if result.is_correct {
                    DisplayUpdate::new(format!("{} ✓", current.text), DisplayStatus::Correct)
                } else if let Some(best) = result.best() {
                    DisplayUpdate::new(
                        format!("{} → {}", current.text, best.value),
                        DisplayStatus::Suggestion,
                    )
                } else {
                    DisplayUpdate::new(format!("{} ?", current.text), DisplayStatus::Incorrect)
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use corrige_core::types::Suggestion;
    use std::time::Duration;

    struct FixedLookup;

    impl SpellLookup for FixedLookup {
        fn is_correct(&self, word: &str) -> bool {
            word == "chat"
        }

        fn suggest(&self, word: &str, _max: usize) -> Vec<Suggestion> {
            if word == "chta" {
                vec![Suggestion::new("chat", 0.5)]
            } else {
                Vec::new()
            }
        }
    }

    fn projection() -> DisplayProjection {
        DisplayProjection::new(Arc::new(FixedLookup))
    }

    fn typed(text: &str) -> Writing {
        let w = Writing::new(Duration::from_secs(5));
        for c in text.chars() {
            w.add_char(c);
        }
        w
    }

    #[tokio::test]
    async fn test_send_and_forward() {
        let (sink, rx) = DisplaySink::channel(10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let forwarder = spawn_forwarder(rx, move |u: &DisplayUpdate| {
            log.lock().unwrap().push(u.clone());
        });

        assert!(sink.waiting());
        assert!(sink.send("chat ✓", DisplayStatus::Correct));
        assert!(sink.correcting());
        sink.stop();

        assert_eq!(forwarder.await.unwrap(), 3);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].status, DisplayStatus::Waiting);
        assert_eq!(seen[1], DisplayUpdate::new("chat ✓", DisplayStatus::Correct));
        assert_eq!(seen[2].text, "Correcting...");
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (sink, mut rx) = DisplaySink::channel(DEFAULT_CAPACITY);

        let accepted = (0..200)
            .filter(|i| sink.send(format!("update {}", i), DisplayStatus::Listening))
            .count();
        assert_eq!(accepted, 100);

        sink.stop();
        let mut retained = Vec::new();
        while let Some(update) = rx.recv().await {
            retained.push(update);
        }
        assert_eq!(retained.len(), 100);
        // The oldest updates are the ones kept.
        assert_eq!(retained[0].text, "update 0");
        assert_eq!(retained[99].text, "update 99");
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_disables_send() {
        let (sink, mut rx) = DisplaySink::channel(4);
        let other = sink.clone();
        assert!(!sink.is_stopped());

        sink.stop();
        sink.stop();
        other.stop();

        assert!(sink.is_stopped());
        assert!(other.is_stopped());
        assert!(!sink.waiting());
        assert!(!other.send("late", DisplayStatus::Correct));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forwarder_drains_queue_after_close() {
        let (sink, rx) = DisplaySink::channel(8);
        for i in 0..5 {
            sink.send(format!("{}", i), DisplayStatus::Listening);
        }
        sink.stop();

        let count = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&count);
        let forwarder = spawn_forwarder(rx, move |_: &DisplayUpdate| {
            *counter.lock().unwrap() += 1;
        });
        assert_eq!(forwarder.await.unwrap(), 5);
        assert_eq!(*count.lock().unwrap(), 5);
    }

    #[test]
    fn test_send_after_receiver_dropped_is_harmless() {
        let (sink, rx) = DisplaySink::channel(4);
        drop(rx);
        assert!(!sink.waiting());
    }

    #[test]
    fn test_projection_fixed_states() {
        let p = projection();
        let w = typed("");
        assert_eq!(
            p.project(SessionState::Idle, &w),
            DisplayUpdate::new("Waiting...", DisplayStatus::Waiting)
        );
        assert_eq!(
            p.project(SessionState::Correcting, &w),
            DisplayUpdate::new("Correcting...", DisplayStatus::Correcting)
        );
        assert_eq!(
            p.project(SessionState::Paused, &w),
            DisplayUpdate::new("Paused", DisplayStatus::Waiting)
        );
        assert_eq!(
            p.project(SessionState::Listening, &w),
            DisplayUpdate::new("Listening...", DisplayStatus::Listening)
        );
    }

    #[test]
    fn test_projection_current_word() {
        let p = projection();
        assert_eq!(
            p.project(SessionState::Listening, &typed("Chat")),
            DisplayUpdate::new("Chat ✓", DisplayStatus::Correct)
        );
        assert_eq!(
            p.project(SessionState::Listening, &typed("chta")),
            DisplayUpdate::new("chta → chat", DisplayStatus::Suggestion)
        );
        assert_eq!(
            p.project(SessionState::Listening, &typed("xyz")),
            DisplayUpdate::new("xyz ?", DisplayStatus::Incorrect)
        );
    }

    #[test]
    fn test_projection_shows_last_completed_word() {
        let p = projection();
        let w = typed("chien");
        w.complete_word();
        assert_eq!(
            p.project(SessionState::Listening, &w),
            DisplayUpdate::new("chien ✓", DisplayStatus::Correct)
        );
    }
}
