//! Screen reconstruction
//!
//! Converts the raw, control-character-laden byte stream captured from the
//! pty into a stable, line-oriented snapshot. Full-screen programs redraw
//! by repositioning the cursor with bare carriage returns instead of
//! emitting clean line breaks, so reconstruction treats CR as a line
//! boundary, strips styling and control sequences, and recovers table rows
//! that arrived concatenated on a single physical line.
//!
//! Reconstruction is a pure function of the input: given the same raw
//! bytes, the snapshot is always identical. It never fails; anything it
//! does not recognize passes through as-is.

pub mod rows;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The harness's best line-oriented view of the target's screen.
///
/// Derived on demand from the session's accumulated output; immutable,
/// superseded (not updated) by the next reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    /// Reconstructed lines, top to bottom
    pub lines: Vec<String>,
}

impl ScreenSnapshot {
    /// True if the snapshot holds no lines at all
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    /// Render the snapshot as newline-joined text
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Reconstruct a [`ScreenSnapshot`] from raw captured output.
///
/// 1. CR and CRLF both become line boundaries;
/// 2. styling/control escape sequences are stripped;
/// 3. fully-blank lines are trimmed from both ends (interior whitespace is
///    preserved verbatim);
/// 4. lines carrying box-drawing borders go through the row-recovery
///    heuristic in [`rows`].
pub fn reconstruct(raw: &str) -> ScreenSnapshot {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let cleaned: Vec<String> = normalized.split('\n').map(strip_controls).collect();

    let content = match cleaned.iter().position(|line| !line.trim().is_empty()) {
        Some(first) => {
            let last = cleaned
                .iter()
                .rposition(|line| !line.trim().is_empty())
                .unwrap_or(first);
            &cleaned[first..=last]
        },
        None => &cleaned[0..0],
    };

    let mut lines = Vec::with_capacity(content.len());
    for line in content {
        if rows::has_table_border(line) {
            lines.extend(rows::split_rows(line));
        } else {
            lines.push(line.clone());
        }
    }

    ScreenSnapshot { lines }
}

/// CSI sequences: colors, attributes, cursor movement, erasure
fn csi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;:?]*[ -/]*[@-~]").expect("static regex"))
}

/// OSC strings (window title etc.), terminator optional so a partial
/// sequence at the end of the buffer is still removed
fn osc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?").expect("static regex"))
}

/// Remaining escapes: charset designation, single-byte Fe controls, and a
/// stray ESC with nothing after it
fn esc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b[()#%][0-9A-Za-z]|\x1b[@-_]|\x1b").expect("static regex"))
}

/// Strip escape sequences and non-printing control characters from one line
fn strip_controls(line: &str) -> String {
    let stripped = osc_re().replace_all(line, "");
    let stripped = csi_re().replace_all(&stripped, "");
    let stripped = esc_re().replace_all(&stripped, "");
    stripped
        .chars()
        .filter(|c| *c == '\t' || !c.is_control())
        .collect()
}
