//! Pilotfish Terminal-Session Harness
//!
//! Drives a full-screen console program under a pseudo-terminal: spawns it,
//! feeds it synthetic keystrokes, waits for expected output with bounded
//! timeouts, and reconstructs a stable, line-oriented snapshot of its screen
//! from the raw byte stream. This crate provides:
//!
//! - `keys`: symbolic key actions and their byte encodings
//! - `pty`: POSIX pseudo-terminal management
//! - `session`: child-process lifecycle, raw I/O, and pattern waits
//! - `screen`: raw output to line-oriented snapshot reconstruction
//! - `protocol`: intention-revealing operations for test scenarios

pub mod error;
pub mod keys;
pub mod protocol;
pub mod pty;
pub mod screen;
pub mod session;

pub use error::{HarnessError, Result};
pub use keys::{encode_text, KeyAction};
pub use protocol::TuiDriver;
pub use screen::{reconstruct, ScreenSnapshot};
pub use session::{Session, SessionConfig, SessionState};
