//! Synthetic keyboard input for the focused application.
//!
//! Shortcuts and single keys go through `rdev::simulate`. Text goes through
//! `SendInput` with `KEYEVENTF_UNICODE` on Windows, so any character can be
//! typed. Elsewhere each character is mapped to a key on a US layout and
//! simulated. Text with characters outside that layout is pasted through the
//! clipboard instead, and the previous clipboard text is put back afterwards.

use std::thread;
use std::time::Duration;

#[cfg(not(target_os = "windows"))]
use arboard::Clipboard;
use rdev::{simulate, EventType, Key as RdevKey};

use crate::keyboard::{InjectError, InjectorCapabilities, InputInjector, Key, Modifiers};

/// Pause between simulated events. Some backends drop events sent back to back.
pub const DEFAULT_EVENT_DELAY: Duration = Duration::from_millis(20);

/// Time for the clipboard owner to publish new contents before pasting.
#[cfg(not(target_os = "windows"))]
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(50);

/// Time for the target application to read the clipboard before it is restored.
#[cfg(not(target_os = "windows"))]
const PASTE_SETTLE: Duration = Duration::from_millis(100);

/// Injector backed by the OS input APIs.
#[derive(Debug, Clone)]
pub struct SystemInjector {
    delay: Duration,
}

impl Default for SystemInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInjector {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_EVENT_DELAY,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    fn send(&self, event: EventType) -> Result<(), InjectError> {
        simulate(&event)
            .map_err(|e| InjectError::Backend(format!("Failed to simulate {:?}: {:?}", event, e)))?;
        thread::sleep(self.delay);
        Ok(())
    }

    fn press_and_release(&self, key: RdevKey) -> Result<(), InjectError> {
        self.send(EventType::KeyPress(key))?;
        self.send(EventType::KeyRelease(key))
    }

    /// Run `body` with `held` pressed. Held keys are released even when `body` fails.
    fn holding<F>(&self, held: &[RdevKey], body: F) -> Result<(), InjectError>
    where
        F: FnOnce() -> Result<(), InjectError>,
    {
        let mut pressed = Vec::with_capacity(held.len());
        let mut result = Ok(());
        for key in held {
            match self.send(EventType::KeyPress(*key)) {
                Ok(()) => pressed.push(*key),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        if result.is_ok() {
            result = body();
        }
        for key in pressed.iter().rev() {
            if let Err(e) = self.send(EventType::KeyRelease(*key)) {
                tracing::warn!(key = ?key, error = %e, "Failed to release modifier");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    #[cfg(target_os = "windows")]
    fn type_unicode(&self, text: &str) -> Result<(), InjectError> {
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP,
            KEYEVENTF_UNICODE,
        };

        let unicode_input = |unit: u16, flags| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: 0,
                    wScan: unit,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };

        // Characters outside the BMP go out as surrogate pairs.
        let inputs: Vec<INPUT> = text
            .encode_utf16()
            .flat_map(|unit| {
                [
                    unicode_input(unit, KEYEVENTF_UNICODE),
                    unicode_input(unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
                ]
            })
            .collect();

        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };

        if sent as usize != inputs.len() {
            return Err(InjectError::Backend(format!(
                "SendInput only sent {} of {} events",
                sent,
                inputs.len()
            )));
        }
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    fn type_unicode(&self, text: &str) -> Result<(), InjectError> {
        // Map everything up front so a partial word is never typed.
        let Some(strokes) = keystrokes(text) else {
            return self.paste(text);
        };

        for (key, shifted) in strokes {
            if shifted {
                self.holding(&[RdevKey::ShiftLeft], || self.press_and_release(key))?;
            } else {
                self.press_and_release(key)?;
            }
        }
        Ok(())
    }

    /// Put `text` on the clipboard and send the paste shortcut.
    #[cfg(not(target_os = "windows"))]
    fn paste(&self, text: &str) -> Result<(), InjectError> {
        let mut clipboard = Clipboard::new().map_err(|e| {
            tracing::warn!(error = %e, "Clipboard unavailable, cannot paste text");
            let missing = text.chars().find(|c| char_to_stroke(*c).is_none());
            InjectError::Unsupported(missing.unwrap_or_default())
        })?;
        let previous = clipboard.get_text().ok();

        clipboard
            .set_text(text)
            .map_err(|e| InjectError::Backend(format!("Failed to set clipboard: {}", e)))?;
        thread::sleep(CLIPBOARD_SETTLE);

        tracing::debug!(text_len = text.len(), "Pasting text through clipboard");
        let modifier = if cfg!(target_os = "macos") {
            RdevKey::MetaLeft
        } else {
            RdevKey::ControlLeft
        };
        let result = self.holding(&[modifier], || self.press_and_release(RdevKey::KeyV));
        thread::sleep(PASTE_SETTLE);

        if let Some(previous) = previous {
            if let Err(e) = clipboard.set_text(previous) {
                tracing::warn!(error = %e, "Failed to restore clipboard");
            }
        }
        result
    }
}

impl InputInjector for SystemInjector {
    fn combo(&self, modifiers: Modifiers, key: Key) -> Result<(), InjectError> {
        tracing::debug!(modifiers = %modifiers, key = %key, "Sending key combo");
        self.holding(&modifier_keys(modifiers), || {
            self.press_and_release(rdev_key(key))
        })
    }

    fn tap(&self, key: Key) -> Result<(), InjectError> {
        tracing::debug!(key = %key, "Sending key tap");
        self.press_and_release(rdev_key(key))
    }

    fn type_text(&self, text: &str) -> Result<(), InjectError> {
        if text.is_empty() {
            return Ok(());
        }
        tracing::debug!(text_len = text.len(), "Typing text");
        self.type_unicode(text)
    }

    #[cfg(not(target_os = "windows"))]
    fn can_type(&self, text: &str) -> bool {
        keystrokes(text).is_some() || Clipboard::new().is_ok()
    }

    fn flush(&self) {
        thread::sleep(self.delay);
    }

    fn capabilities(&self) -> InjectorCapabilities {
        InjectorCapabilities {
            needs_accessibility_permission: cfg!(target_os = "macos"),
        }
    }

    fn request_permissions(&self) -> bool {
        if self.capabilities().needs_accessibility_permission {
            tracing::warn!(
                "Synthetic input requires Accessibility permission. Grant it in \
                 System Settings > Privacy & Security > Accessibility if corrections do nothing"
            );
        }
        true
    }
}

fn rdev_key(key: Key) -> RdevKey {
    match key {
        Key::Left => RdevKey::LeftArrow,
        Key::Backspace => RdevKey::Backspace,
    }
}

fn modifier_keys(modifiers: Modifiers) -> Vec<RdevKey> {
    [
        (modifiers.ctrl, RdevKey::ControlLeft),
        (modifiers.alt, RdevKey::Alt),
        (modifiers.shift, RdevKey::ShiftLeft),
        (modifiers.meta, RdevKey::MetaLeft),
    ]
    .into_iter()
    .filter_map(|(held, key)| held.then_some(key))
    .collect()
}

#[cfg_attr(target_os = "windows", allow(dead_code))]
const LETTERS: [RdevKey; 26] = [
    RdevKey::KeyA,
    RdevKey::KeyB,
    RdevKey::KeyC,
    RdevKey::KeyD,
    RdevKey::KeyE,
    RdevKey::KeyF,
    RdevKey::KeyG,
    RdevKey::KeyH,
    RdevKey::KeyI,
    RdevKey::KeyJ,
    RdevKey::KeyK,
    RdevKey::KeyL,
    RdevKey::KeyM,
    RdevKey::KeyN,
    RdevKey::KeyO,
    RdevKey::KeyP,
    RdevKey::KeyQ,
    RdevKey::KeyR,
    RdevKey::KeyS,
    RdevKey::KeyT,
    RdevKey::KeyU,
    RdevKey::KeyV,
    RdevKey::KeyW,
    RdevKey::KeyX,
    RdevKey::KeyY,
    RdevKey::KeyZ,
];

#[cfg_attr(target_os = "windows", allow(dead_code))]
const DIGITS: [RdevKey; 10] = [
    RdevKey::Num0,
    RdevKey::Num1,
    RdevKey::Num2,
    RdevKey::Num3,
    RdevKey::Num4,
    RdevKey::Num5,
    RdevKey::Num6,
    RdevKey::Num7,
    RdevKey::Num8,
    RdevKey::Num9,
];

/// Strokes for the whole of `text`, or `None` if any character has no key.
#[cfg_attr(target_os = "windows", allow(dead_code))]
fn keystrokes(text: &str) -> Option<Vec<(RdevKey, bool)>> {
    text.chars().map(char_to_stroke).collect()
}

/// Key and shift state producing `c` on a US layout.
#[cfg_attr(target_os = "windows", allow(dead_code))]
fn char_to_stroke(c: char) -> Option<(RdevKey, bool)> {
    if c.is_ascii_lowercase() {
        return Some((LETTERS[(c as u8 - b'a') as usize], false));
    }
    if c.is_ascii_uppercase() {
        return Some((LETTERS[(c as u8 - b'A') as usize], true));
    }
    if c.is_ascii_digit() {
        return Some((DIGITS[(c as u8 - b'0') as usize], false));
    }

    let stroke = match c {
        ' ' => (RdevKey::Space, false),
        '\n' => (RdevKey::Return, false),
        '\t' => (RdevKey::Tab, false),
        '-' => (RdevKey::Minus, false),
        '=' => (RdevKey::Equal, false),
        ',' => (RdevKey::Comma, false),
        '.' => (RdevKey::Dot, false),
        '/' => (RdevKey::Slash, false),
        ';' => (RdevKey::SemiColon, false),
        '\'' => (RdevKey::Quote, false),
        '[' => (RdevKey::LeftBracket, false),
        ']' => (RdevKey::RightBracket, false),
        '\\' => (RdevKey::BackSlash, false),
        '`' => (RdevKey::BackQuote, false),
        ')' => (RdevKey::Num0, true),
        '!' => (RdevKey::Num1, true),
        '@' => (RdevKey::Num2, true),
        '#' => (RdevKey::Num3, true),
        '$' => (RdevKey::Num4, true),
        '%' => (RdevKey::Num5, true),
        '^' => (RdevKey::Num6, true),
        '&' => (RdevKey::Num7, true),
        '*' => (RdevKey::Num8, true),
        '(' => (RdevKey::Num9, true),
        '_' => (RdevKey::Minus, true),
        '+' => (RdevKey::Equal, true),
        '<' => (RdevKey::Comma, true),
        '>' => (RdevKey::Dot, true),
        '?' => (RdevKey::Slash, true),
        ':' => (RdevKey::SemiColon, true),
        '"' => (RdevKey::Quote, true),
        '{' => (RdevKey::LeftBracket, true),
        '}' => (RdevKey::RightBracket, true),
        '|' => (RdevKey::BackSlash, true),
        '~' => (RdevKey::BackQuote, true),
        _ => return None,
    };
    Some(stroke)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
