//! Symbolic Key Actions
//!
//! Maps abstract key/action names to the raw byte sequences a terminal
//! application expects on its input stream. The set of actions is a fixed
//! enum validated at this boundary; call sites never pass raw strings
//! around as key names.
//!
//! Literal text takes a separate path: [`encode_text`] performs no
//! translation at all, so a search term can never be reinterpreted as a
//! control sequence, and an action name can never leak through as typed
//! text. Keeping the two paths distinct is a correctness invariant.

use crate::error::{HarnessError, Result};

/// A symbolic input action, independent of its concrete encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    // Directional movement
    Up,
    Down,
    Left,
    Right,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,

    // Editing
    Tab,
    Space,
    Confirm,
    Cancel,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Process control
    Interrupt,
    Suspend,
    EndOfInput,
}

impl KeyAction {
    /// Every supported action, for table-driven validation.
    pub const ALL: [KeyAction; 27] = [
        KeyAction::Up,
        KeyAction::Down,
        KeyAction::Left,
        KeyAction::Right,
        KeyAction::Home,
        KeyAction::End,
        KeyAction::PageUp,
        KeyAction::PageDown,
        KeyAction::Tab,
        KeyAction::Space,
        KeyAction::Confirm,
        KeyAction::Cancel,
        KeyAction::F1,
        KeyAction::F2,
        KeyAction::F3,
        KeyAction::F4,
        KeyAction::F5,
        KeyAction::F6,
        KeyAction::F7,
        KeyAction::F8,
        KeyAction::F9,
        KeyAction::F10,
        KeyAction::F11,
        KeyAction::F12,
        KeyAction::Interrupt,
        KeyAction::Suspend,
        KeyAction::EndOfInput,
    ];

    /// Look up an action by its canonical kebab-case name.
    ///
    /// Unrecognized names fail with [`HarnessError::UnknownAction`] rather
    /// than silently passing through as literal text.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "move-up" => Ok(KeyAction::Up),
            "move-down" => Ok(KeyAction::Down),
            "move-left" => Ok(KeyAction::Left),
            "move-right" => Ok(KeyAction::Right),
            "home" => Ok(KeyAction::Home),
            "end" => Ok(KeyAction::End),
            "page-up" => Ok(KeyAction::PageUp),
            "page-down" => Ok(KeyAction::PageDown),
            "tab" => Ok(KeyAction::Tab),
            "space" => Ok(KeyAction::Space),
            "confirm" => Ok(KeyAction::Confirm),
            "cancel" => Ok(KeyAction::Cancel),
            "f1" => Ok(KeyAction::F1),
            "f2" => Ok(KeyAction::F2),
            "f3" => Ok(KeyAction::F3),
            "f4" => Ok(KeyAction::F4),
            "f5" => Ok(KeyAction::F5),
            "f6" => Ok(KeyAction::F6),
            "f7" => Ok(KeyAction::F7),
            "f8" => Ok(KeyAction::F8),
            "f9" => Ok(KeyAction::F9),
            "f10" => Ok(KeyAction::F10),
            "f11" => Ok(KeyAction::F11),
            "f12" => Ok(KeyAction::F12),
            "interrupt" => Ok(KeyAction::Interrupt),
            "suspend" => Ok(KeyAction::Suspend),
            "end-of-input" => Ok(KeyAction::EndOfInput),
            _ => Err(HarnessError::UnknownAction {
                name: name.to_string(),
            }),
        }
    }

    /// The canonical name accepted by [`KeyAction::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            KeyAction::Up => "move-up",
            KeyAction::Down => "move-down",
            KeyAction::Left => "move-left",
            KeyAction::Right => "move-right",
            KeyAction::Home => "home",
            KeyAction::End => "end",
            KeyAction::PageUp => "page-up",
            KeyAction::PageDown => "page-down",
            KeyAction::Tab => "tab",
            KeyAction::Space => "space",
            KeyAction::Confirm => "confirm",
            KeyAction::Cancel => "cancel",
            KeyAction::F1 => "f1",
            KeyAction::F2 => "f2",
            KeyAction::F3 => "f3",
            KeyAction::F4 => "f4",
            KeyAction::F5 => "f5",
            KeyAction::F6 => "f6",
            KeyAction::F7 => "f7",
            KeyAction::F8 => "f8",
            KeyAction::F9 => "f9",
            KeyAction::F10 => "f10",
            KeyAction::F11 => "f11",
            KeyAction::F12 => "f12",
            KeyAction::Interrupt => "interrupt",
            KeyAction::Suspend => "suspend",
            KeyAction::EndOfInput => "end-of-input",
        }
    }

    /// Encode the action as the byte sequence written to the pty.
    ///
    /// Total over the enum; every sequence is non-empty and distinct.
    pub fn encode(self) -> &'static [u8] {
        match self {
            KeyAction::Up => b"\x1b[A",
            KeyAction::Down => b"\x1b[B",
            KeyAction::Right => b"\x1b[C",
            KeyAction::Left => b"\x1b[D",
            KeyAction::Home => b"\x1b[H",
            KeyAction::End => b"\x1b[F",
            KeyAction::PageUp => b"\x1b[5~",
            KeyAction::PageDown => b"\x1b[6~",
            KeyAction::Tab => b"\t",
            KeyAction::Space => b" ",
            KeyAction::Confirm => b"\r",
            KeyAction::Cancel => b"\x1b",
            KeyAction::F1 => b"\x1bOP",
            KeyAction::F2 => b"\x1bOQ",
            KeyAction::F3 => b"\x1bOR",
            KeyAction::F4 => b"\x1bOS",
            KeyAction::F5 => b"\x1b[15~",
            KeyAction::F6 => b"\x1b[17~",
            KeyAction::F7 => b"\x1b[18~",
            KeyAction::F8 => b"\x1b[19~",
            KeyAction::F9 => b"\x1b[20~",
            KeyAction::F10 => b"\x1b[21~",
            KeyAction::F11 => b"\x1b[23~",
            KeyAction::F12 => b"\x1b[24~",
            KeyAction::Interrupt => b"\x03",
            KeyAction::Suspend => b"\x1a",
            KeyAction::EndOfInput => b"\x04",
        }
    }
}

/// Encode literal text for the pty input stream.
///
/// Identity mapping: the returned bytes are exactly the bytes of `text`,
/// with no key translation applied.
pub fn encode_text(text: &str) -> &[u8] {
    text.as_bytes()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_encodings_nonempty_and_distinct() {
        let mut seen = HashSet::new();
        for action in KeyAction::ALL {
            let bytes = action.encode();
            assert!(!bytes.is_empty(), "{:?} encodes to nothing", action);
            assert!(seen.insert(bytes), "{:?} shares an encoding", action);
        }
        assert_eq!(seen.len(), KeyAction::ALL.len());
    }

    #[test]
    fn test_name_round_trip() {
        for action in KeyAction::ALL {
            assert_eq!(KeyAction::from_name(action.name()).unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = KeyAction::from_name("warp-drive").unwrap_err();
        match err {
            HarnessError::UnknownAction { name } => assert_eq!(name, "warp-drive"),
            other => panic!("expected UnknownAction, got {:?}", other),
        }
    }

    #[test]
    fn test_action_names_are_not_text() {
        // A name that happens to be typed as text must come back verbatim,
        // never translated into the action's control bytes.
        assert_eq!(encode_text("confirm"), b"confirm");
        assert_ne!(encode_text("confirm"), KeyAction::Confirm.encode());
    }

    #[test]
    fn test_encode_text_identity() {
        assert_eq!(encode_text(""), b"");
        assert_eq!(encode_text("hello world"), b"hello world");
        assert_eq!(encode_text("nginx-1"), b"nginx-1");
        // Multibyte content passes through untouched too
        assert_eq!(encode_text("héllo"), "héllo".as_bytes());
    }

    #[test]
    fn test_control_codes() {
        assert_eq!(KeyAction::Interrupt.encode(), &[0x03]);
        assert_eq!(KeyAction::Suspend.encode(), &[0x1a]);
        assert_eq!(KeyAction::EndOfInput.encode(), &[0x04]);
        assert_eq!(KeyAction::Confirm.encode(), &[0x0d]);
        assert_eq!(KeyAction::Cancel.encode(), &[0x1b]);
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(KeyAction::F1.encode(), b"\x1bOP");
        assert_eq!(KeyAction::F5.encode(), b"\x1b[15~");
        assert_eq!(KeyAction::F12.encode(), b"\x1b[24~");
    }
}
