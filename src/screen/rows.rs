//! Row recovery for concatenated table dumps
//!
//! Full-screen programs redraw tabular views by repositioning the cursor,
//! so an entire multi-row table can arrive from the pty as one physical
//! line, delimited only by box-drawing border characters. This module
//! splits such a line back into logical rows.
//!
//! The split is a best-effort heuristic, not a parser. It keys on a
//! recurring structural anchor: a 12-digit hexadecimal identifier directly
//! after a vertical border, which is the leading column of the target's
//! list views. That anchor shape is tuned to one table layout; this module
//! is the only place that knows it, so it can be replaced without touching
//! session or protocol code. Unrecognized structure passes through
//! unchanged.

use std::sync::OnceLock;

use regex::Regex;

/// Vertical border between table columns
const VERTICAL: char = '║';

/// Corner characters marking a table's header and footer borders
const CORNERS: [char; 4] = ['╔', '╗', '╚', '╝'];

/// `║` followed by a 12-digit hex identifier: the start of a table row
fn row_anchor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"║\s+[0-9a-f]{12}").expect("static regex"))
}

/// A complete `╔…╗` header border run
fn header_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"╔[^║]*╗").expect("static regex"))
}

/// A complete `╚…╝` footer border run
fn footer_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"╚[^║]*╝").expect("static regex"))
}

/// Does this line look like a flattened table?
pub fn has_table_border(line: &str) -> bool {
    line.contains(VERTICAL) && line.chars().any(|c| CORNERS.contains(&c))
}

/// Split a flattened table line into logical rows.
///
/// Tries the identifier anchor first, then the header/footer border runs.
/// If neither applies, the line is returned unsplit.
pub fn split_rows(line: &str) -> Vec<String> {
    let anchors: Vec<_> = row_anchor().find_iter(line).collect();
    if !anchors.is_empty() {
        return split_at_anchors(line, &anchors);
    }
    split_at_border_runs(line)
}

/// Each anchor starts a row; the content between two consecutive anchors
/// (or between the last anchor and end of line) forms one row.
fn split_at_anchors(line: &str, anchors: &[regex::Match<'_>]) -> Vec<String> {
    let mut rows = Vec::with_capacity(anchors.len() + 1);
    let mut cursor = 0;

    for (i, anchor) in anchors.iter().enumerate() {
        if anchor.start() > cursor {
            let before = line[cursor..anchor.start()].trim();
            if !before.is_empty() {
                rows.push(before.to_string());
            }
        }
        let end = anchors
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(line.len());
        let row = line[anchor.start()..end].trim();
        if !row.is_empty() {
            rows.push(row.to_string());
        }
        cursor = end;
    }

    rows
}

/// Fallback: peel off the header and footer border runs as their own rows.
fn split_at_border_runs(line: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut rest = line;
    let mut matched = false;

    if let Some(header) = header_run().find(rest) {
        matched = true;
        let before = rest[..header.start()].trim();
        if !before.is_empty() {
            rows.push(before.to_string());
        }
        rows.push(header.as_str().trim().to_string());
        rest = &rest[header.end()..];
    }

    if let Some(footer) = footer_run().find(rest) {
        matched = true;
        let before = rest[..footer.start()].trim();
        if !before.is_empty() {
            rows.push(before.to_string());
        }
        rows.push(footer.as_str().trim().to_string());
        rest = &rest[footer.end()..];
    }

    if !matched {
        // Nothing recognizable; emit the line unsplit and unmodified
        return vec![line.to_string()];
    }

    let tail = rest.trim();
    if !tail.is_empty() {
        rows.push(tail.to_string());
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_detection() {
        assert!(has_table_border("╔══╗║ x ║╚══╝"));
        assert!(has_table_border("║ a1b2c3d4e5f6 ║ with ╝"));
        assert!(!has_table_border("║ vertical only ║"));
        assert!(!has_table_border("plain text"));
    }

    #[test]
    fn test_two_anchored_rows_split() {
        let line = "║ a1b2c3d4e5f6  nginx   Up 2 hours ║ f6e5d4c3b2a1  redis   Up 1 hour ╝";
        let rows = split_rows(line);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("║ a1b2c3d4e5f6"));
        assert!(rows[1].starts_with("║ f6e5d4c3b2a1"));
    }

    #[test]
    fn test_header_precedes_first_anchor() {
        let line = "╔═══════════╗║ a1b2c3d4e5f6  web  Up ║";
        let rows = split_rows(line);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "╔═══════════╗");
        assert!(rows[1].starts_with("║ a1b2c3d4e5f6"));
    }

    #[test]
    fn test_header_footer_fallback() {
        // No identifier anchor in sight; split at the border runs instead
        let line = "╔═ CONTAINERS ═╗║ NAME  STATE ║╚══════════════╝";
        let rows = split_rows(line);
        assert_eq!(
            rows,
            vec!["╔═ CONTAINERS ═╗", "║ NAME  STATE ║", "╚══════════════╝"]
        );
    }

    #[test]
    fn test_unrecognized_structure_passes_through() {
        let line = "║ odd layout with a lone corner ╝ trailing";
        assert_eq!(split_rows(line), vec![line.to_string()]);
    }

    #[test]
    fn test_uppercase_hex_is_not_an_anchor() {
        // The target renders identifiers in lowercase; uppercase is data
        let line = "║ A1B2C3D4E5F6  shout  ║ a1b2c3d4e5f6  quiet  ╝";
        let rows = split_rows(line);
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("║ a1b2c3d4e5f6"));
    }

    #[test]
    fn test_anchor_needs_full_width_id() {
        // An 11-digit token is not an identifier column
        let line = "╔══╗║ a1b2c3d4e5f  short ║╚══╝";
        let rows = split_rows(line);
        assert_eq!(rows.len(), 3, "fallback should have split border runs");
    }
}
