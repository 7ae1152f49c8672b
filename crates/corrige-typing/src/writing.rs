//! Word buffer: the word being typed plus the words completed before it.
//!
//! An idle gap longer than the configured timeout discards the whole buffer,
//! history included, on the next keystroke. All accessors return owned
//! snapshots taken under the lock.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A single word, complete or in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// When the first character was typed. `None` for an empty word.
    pub started_at: Option<DateTime<Utc>>,
}

impl Word {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Default)]
struct WritingInner {
    words: Vec<Word>,
    current: Word,
    last_event: Option<Instant>,
}

impl WritingInner {
    fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        self.last_event
            .is_some_and(|last| now.saturating_duration_since(last) > timeout)
    }

    fn clear(&mut self) {
        self.words.clear();
        self.current = Word::default();
        self.last_event = None;
    }
}

/// Shared word buffer. Cloning yields another handle to the same buffer.
#[derive(Debug, Clone)]
pub struct Writing {
    inner: Arc<RwLock<WritingInner>>,
    timeout: Duration,
}

impl Writing {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(WritingInner::default())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn read(&self) -> RwLockReadGuard<'_, WritingInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WritingInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a character to the current word.
    ///
    /// Clears the whole buffer first if the idle timeout has elapsed.
    pub fn add_char(&self, c: char) {
        self.add_char_at(c, Instant::now());
    }

    fn add_char_at(&self, c: char, now: Instant) {
        let mut inner = self.write();
        if inner.timed_out(now, self.timeout) {
            tracing::debug!(
                discarded_words = inner.words.len(),
                "Idle timeout elapsed, discarding buffer"
            );
            inner.clear();
        }
        inner.last_event = Some(now);

        if inner.current.is_empty() {
            inner.current.started_at = Some(Utc::now());
        }
        inner.current.text.push(c);
    }

    /// Move the current word into history and return it.
    ///
    /// Returns `None` without touching anything if no word is in progress.
    pub fn complete_word(&self) -> Option<Word> {
        let mut inner = self.write();
        if inner.current.is_empty() {
            return None;
        }
        let word = std::mem::take(&mut inner.current);
        inner.words.push(word.clone());
        Some(word)
    }

    /// Overwrite the text of the most recent completed word.
    ///
    /// Returns `false` if there is no completed word.
    pub fn replace_last_word(&self, text: &str) -> bool {
        let mut inner = self.write();
        match inner.words.last_mut() {
            Some(last) => {
                last.text = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove and return the most recent completed word.
    pub fn remove_last_word(&self) -> Option<Word> {
        self.write().words.pop()
    }

    /// Discard history, the current word, and the idle clock.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Clear the buffer if the idle timeout has elapsed. Returns whether it did.
    pub fn check_timeout(&self) -> bool {
        self.check_timeout_at(Instant::now())
    }

    fn check_timeout_at(&self, now: Instant) -> bool {
        let mut inner = self.write();
        if inner.timed_out(now, self.timeout) {
            inner.clear();
            true
        } else {
            false
        }
    }

    /// Whether the idle timeout has elapsed, without clearing anything.
    pub fn is_timed_out(&self) -> bool {
        self.read().timed_out(Instant::now(), self.timeout)
    }

    pub fn current_word(&self) -> Word {
        self.read().current.clone()
    }

    pub fn last_word(&self) -> Option<Word> {
        self.read().words.last().cloned()
    }

    pub fn words(&self) -> Vec<Word> {
        self.read().words.clone()
    }

    /// History and current word joined by single spaces.
    pub fn full_text(&self) -> String {
        let inner = self.read();
        let mut parts: Vec<&str> = inner.words.iter().map(|w| w.text.as_str()).collect();
        if !inner.current.is_empty() {
            parts.push(&inner.current.text);
        }
        parts.join(" ")
    }

    /// Completed words, plus one if a word is in progress.
    pub fn word_count(&self) -> usize {
        let inner = self.read();
        inner.words.len() + usize::from(!inner.current.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.read();
        inner.words.is_empty() && inner.current.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
