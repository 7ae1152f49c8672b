//! Corrige Typing crate - keystroke capture, word buffering, and in-place auto-correction.
//!
//! Key events flow from a key source through an unbounded queue into the
//! `InputDispatcher`, which fills the `Writing` buffer and hands completed
//! words to the `CorrectionCoordinator`. Confident corrections are retyped in
//! the focused application through an `InputInjector` while the session sits
//! in `Correcting`. Display updates go out through a bounded, lossy queue.

pub mod coordinator;
pub mod dispatcher;
pub mod display;
pub mod engine;
pub mod key_source;
pub mod keyboard;
pub mod state;
pub mod text_inject;
pub mod writing;

pub use coordinator::{
    CorrectionCoordinator, CorrectionOutcome, CorrectionSettings, ReplaceError, ReplaceStep,
};
pub use dispatcher::{DispatchOutcome, InputDispatcher};
pub use display::{spawn_forwarder, DisplayBoundary, DisplayProjection, DisplaySink};
pub use engine::{EngineSettings, TypingEngine};
pub use key_source::RdevKeySource;
pub use keyboard::{
    InjectError, InjectorCapabilities, InputInjector, Key, KeyEvent, KeyKind, Modifiers,
    PlatformFamily,
};
pub use state::{SessionMachine, SessionState};
pub use text_inject::SystemInjector;
pub use writing::{Word, Writing};
