//! System-wide key capture using `rdev`.
//!
//! `rdev::listen` blocks its thread forever, so the source runs on a
//! dedicated thread and forwards events into an unbounded queue. Stopping
//! drops the queue's sender and makes the callback inert; the hook itself
//! lives until process exit.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use rdev::{listen, Event, EventType};
use tokio::sync::mpsc;

use corrige_core::error::CorrigeError;

use crate::keyboard::KeyEvent;

/// Convert an rdev event into a key event. Mouse and wheel events yield `None`.
///
/// `name` is the text the key produced, as reported by the OS.
pub fn from_parts(event_type: &EventType, name: Option<&str>) -> Option<KeyEvent> {
    match event_type {
        EventType::KeyPress(_) => {
            let mut chars = name.unwrap_or_default().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(KeyEvent::press(c)),
                _ => Some(KeyEvent::press_non_text()),
            }
        }
        EventType::KeyRelease(_) => Some(KeyEvent::release(None)),
        _ => None,
    }
}

/// Sending end of the key-event queue shared with the hook callback.
#[derive(Debug, Clone, Default)]
struct Outlet {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<KeyEvent>>>>,
}

impl Outlet {
    fn lock(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<KeyEvent>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `tx`. Returns false if a sender is already installed.
    fn open(&self, tx: mpsc::UnboundedSender<KeyEvent>) -> bool {
        let mut sender = self.lock();
        if sender.is_some() {
            return false;
        }
        *sender = Some(tx);
        true
    }

    fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Push `event`, dropping the sender once the receiver is gone.
    fn forward(&self, event: KeyEvent) {
        let mut sender = self.lock();
        let Some(tx) = sender.as_ref() else {
            return;
        };
        if tx.send(event).is_err() {
            tracing::debug!("Key event queue closed, muting key hook");
            sender.take();
        }
    }

    /// Drop the sender so the receiving side sees the queue close.
    fn close(&self) -> bool {
        self.lock().take().is_some()
    }
}

/// Global keyboard listener feeding a key-event queue.
#[derive(Debug, Default)]
pub struct RdevKeySource {
    outlet: Outlet,
}

impl RdevKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.outlet.is_open()
    }

    /// Start listening on a background thread and push events into `tx`.
    ///
    /// The callback goes quiet once `stop` is called or the receiver is dropped.
    pub fn start(&self, tx: mpsc::UnboundedSender<KeyEvent>) -> Result<(), CorrigeError> {
        if !self.outlet.open(tx) {
            return Err(CorrigeError::KeySource(
                "Key source already started".to_string(),
            ));
        }
        let outlet = self.outlet.clone();
        let thread_outlet = self.outlet.clone();

        let spawned = thread::Builder::new()
            .name("corrige-key-hook".to_string())
            .spawn(move || {
                let callback = move |event: Event| {
                    if let Some(key_event) = from_parts(&event.event_type, event.name.as_deref()) {
                        outlet.forward(key_event);
                    }
                };

                tracing::info!("Keyboard hook listening");
                if let Err(e) = listen(callback) {
                    tracing::error!(error = ?e, "Keyboard hook failed");
                    thread_outlet.close();
                }
            });

        if let Err(e) = spawned {
            self.outlet.close();
            return Err(e.into());
        }
        Ok(())
    }

    /// Mute the hook and close the key-event queue.
    pub fn stop(&self) {
        if self.outlet.close() {
            tracing::info!("Keyboard hook stopped");
        }
    }
}
