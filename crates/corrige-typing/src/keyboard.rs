//! Key events, rune classification, and the synthetic input contract.
//!
//! Platform backends (`key_source`, `text_inject`) translate to and from
//! these types; everything else in the crate only sees this module.

use std::fmt;

use corrige_core::error::CorrigeError;

// =============================================================================
// Incoming events
// =============================================================================

/// Whether a key went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Press,
    Release,
}

/// A raw keyboard event as delivered by a key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyKind,
    /// The text this key produced, `None` for non-text keys (arrows, modifiers).
    pub rune: Option<char>,
}

impl KeyEvent {
    pub fn press(rune: char) -> Self {
        Self {
            kind: KeyKind::Press,
            rune: Some(rune),
        }
    }

    /// A press of a key that produces no text.
    pub fn press_non_text() -> Self {
        Self {
            kind: KeyKind::Press,
            rune: None,
        }
    }

    pub fn release(rune: Option<char>) -> Self {
        Self {
            kind: KeyKind::Release,
            rune,
        }
    }

    pub fn is_press(&self) -> bool {
        self.kind == KeyKind::Press
    }

    pub fn rune(&self) -> Option<char> {
        self.rune
    }
}

/// Runes that end the current word.
pub fn is_word_separator(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t' | '\r')
}

/// Runes appended to the current word. Separators are checked first by callers.
///
/// Control characters such as Backspace or Escape are never part of a word.
pub fn is_printable(c: char) -> bool {
    c != '\0' && !c.is_control()
}

// =============================================================================
// Outgoing synthetic input
// =============================================================================

/// Non-text keys used by the replace sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Backspace,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Left => write!(f, "Left"),
            Key::Backspace => write!(f, "Backspace"),
        }
    }
}

/// Modifier set held down during a combo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const ALT_SHIFT: Modifiers = Modifiers {
        ctrl: false,
        alt: true,
        shift: true,
        meta: false,
    };

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.meta, "Meta"),
        ]
        .into_iter()
        .filter_map(|(held, name)| held.then_some(name))
        .collect();
        write!(f, "{}", names.join("+"))
    }
}

/// Host OS family, as far as word-selection shortcuts are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    Mac,
    /// Windows, Linux and the BSDs.
    Other,
}

impl PlatformFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            PlatformFamily::Mac
        } else {
            PlatformFamily::Other
        }
    }
}

/// Modifiers that, combined with `Left`, select the word left of the cursor.
pub fn select_previous_word_modifiers(platform: PlatformFamily) -> Modifiers {
    match platform {
        PlatformFamily::Mac => Modifiers::ALT_SHIFT,
        PlatformFamily::Other => Modifiers::CTRL_SHIFT,
    }
}

/// What an injector needs from the OS before it can work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectorCapabilities {
    pub needs_accessibility_permission: bool,
}

/// Errors from a synthetic input backend.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Input backend failed: {0}")]
    Backend(String),
    #[error("Cannot type character {0:?} on this platform")]
    Unsupported(char),
}

impl From<InjectError> for CorrigeError {
    fn from(err: InjectError) -> Self {
        CorrigeError::Injection(err.to_string())
    }
}

/// Sends synthetic keystrokes to the focused application.
///
/// Calls block until the backend has accepted the events.
pub trait InputInjector: Send + Sync {
    fn combo(&self, modifiers: Modifiers, key: Key) -> Result<(), InjectError>;

    fn tap(&self, key: Key) -> Result<(), InjectError>;

    fn type_text(&self, text: &str) -> Result<(), InjectError>;

    /// Whether `type_text` can produce every character of `text`.
    ///
    /// Checked before anything on screen is touched.
    fn can_type(&self, _text: &str) -> bool {
        true
    }

    /// Wait until every event sent so far has been delivered.
    fn flush(&self);

    fn capabilities(&self) -> InjectorCapabilities;

    /// Ask the OS for whatever `capabilities` reports as missing.
    /// Returns whether injection is usable afterwards.
    fn request_permissions(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        for c in [' ', '\n', '\t', '\r'] {
            assert!(is_word_separator(c), "{:?} should separate words", c);
        }
        for c in ['a', '-', '\'', '.', 'é'] {
            assert!(!is_word_separator(c));
        }
    }

    #[test]
    fn test_printable() {
        assert!(is_printable('a'));
        assert!(is_printable('É'));
        assert!(is_printable('\''));
        assert!(is_printable('7'));
        assert!(!is_printable('\0'));
        assert!(!is_printable('\u{8}'));
        assert!(!is_printable('\u{1b}'));
    }

    #[test]
    fn test_key_event_constructors() {
        let press = KeyEvent::press('x');
        assert!(press.is_press());
        assert_eq!(press.rune(), Some('x'));

        let arrow = KeyEvent::press_non_text();
        assert!(arrow.is_press());
        assert_eq!(arrow.rune(), None);

        let release = KeyEvent::release(Some('x'));
        assert!(!release.is_press());
    }

    #[test]
    fn test_select_previous_word_strategy() {
        assert_eq!(
            select_previous_word_modifiers(PlatformFamily::Mac),
            Modifiers::ALT_SHIFT
        );
        assert_eq!(
            select_previous_word_modifiers(PlatformFamily::Other),
            Modifiers::CTRL_SHIFT
        );
    }

    #[test]
    fn test_current_platform_matches_target() {
        let expected = if cfg!(target_os = "macos") {
            PlatformFamily::Mac
        } else {
            PlatformFamily::Other
        };
        assert_eq!(PlatformFamily::current(), expected);
    }

    #[test]
    fn test_modifiers_display() {
        assert_eq!(Modifiers::CTRL_SHIFT.to_string(), "Ctrl+Shift");
        assert_eq!(Modifiers::ALT_SHIFT.to_string(), "Alt+Shift");
        assert_eq!(Modifiers::default().to_string(), "");
        assert!(Modifiers::default().is_empty());
        assert!(!Modifiers::CTRL_SHIFT.is_empty());
    }

    #[test]
    fn test_inject_error_into_corrige_error() {
        let err: CorrigeError = InjectError::Unsupported('ß').into();
        assert!(matches!(err, CorrigeError::Injection(_)));
        assert!(err.to_string().contains("'ß'"));
    }
}
