//! Fixed-width box-drawn renderings of query results.
//!
//! Two formatters share the helpers in this module:
//! - [`table`]: generic rows (column set taken from the first row)
//! - [`graph`]: property-graph nodes with multi-line cells
//!
//! Both are pure and deterministic, and degrade to [`NO_DATA`] instead of
//! failing on empty or malformed input.

pub mod graph;
pub mod table;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub use graph::{GraphNode, format_graph, format_graph_nodes};
pub use table::{TabularRow, format_table, format_value_table};

/// Sentinel rendered for empty or unusable payloads.
pub const NO_DATA: &str = "No data available";

/// How a result payload should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayFormat {
    /// Plain rows, one line each.
    #[default]
    #[serde(rename = "table")]
    Tabular,
    /// Pre-flattened graph nodes (labels, name, properties, relationships).
    #[serde(rename = "neo4j_graph")]
    Graph,
}

impl DisplayFormat {
    /// Parses the backend's `display_format` field; unknown values are tabular.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("neo4j_graph") => Self::Graph,
            _ => Self::Tabular,
        }
    }
}

/// Row and column caps for [`format_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLimits {
    /// Rows rendered before the footer switches to "showing first N".
    pub max_rows: usize,
    /// Maximum column width; longer cells are cut with `...`.
    pub max_column_width: usize,
}

impl TableLimits {
    pub const DEFAULT_MAX_ROWS: usize = 100;
    pub const DEFAULT_MAX_COLUMN_WIDTH: usize = 40;
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            max_rows: Self::DEFAULT_MAX_ROWS,
            max_column_width: Self::DEFAULT_MAX_COLUMN_WIDTH,
        }
    }
}

/// Terminal column width of `text`.
pub(crate) fn display_width(text: &str) -> usize {
    text.width()
}

/// Cuts `text` to at most `max_width` columns, ending with `marker`.
///
/// Returns the original string when it already fits.
pub(crate) fn truncate_with_marker(text: &str, max_width: usize, marker: &str) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(marker.width());
    let mut truncated = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        truncated.push(ch);
    }
    truncated.push_str(marker);
    truncated
}

/// Left-justifies `text` in a field of `width` columns.
pub(crate) fn pad_right(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(pad))
}

/// Right-justifies `text` in a field of `width` columns.
pub(crate) fn pad_left(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("{}{text}", " ".repeat(pad))
}

/// Makes a cell value safe to place on a single table line.
///
/// Newlines and tabs would break the grid; escape bytes would let cell text
/// drive the terminal.
pub(crate) fn sanitize_cell(s: &str) -> Cow<'_, str> {
    if s.contains(['\n', '\r', '\t', '\x1b']) {
        Cow::Owned(
            s.replace("\r\n", " ")
                .replace(['\n', '\r'], " ")
                .replace('\t', "    ")
                .replace('\x1b', ""),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// One horizontal rule: `left` + `fill` runs of each width joined by `junction` + `right`.
pub(crate) fn rule(widths: &[usize], left: char, fill: char, junction: char, right: char) -> String {
    let mut line = String::new();
    line.push(left);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            line.push(junction);
        }
        line.extend(std::iter::repeat_n(fill, *width));
    }
    line.push(right);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_marker_fits() {
        assert_eq!(truncate_with_marker("hello", 5, "..."), "hello");
    }

    #[test]
    fn test_truncate_with_marker_dots() {
        assert_eq!(truncate_with_marker("hello world", 8, "..."), "hello...");
    }

    #[test]
    fn test_truncate_with_marker_ellipsis_char() {
        assert_eq!(truncate_with_marker("hello world", 8, "…"), "hello w…");
    }

    #[test]
    fn test_truncate_with_marker_wide_chars() {
        // "中文" is four columns wide
        assert_eq!(truncate_with_marker("中文test", 6, "…"), "中文t…");
    }

    #[test]
    fn test_padding_uses_display_width() {
        assert_eq!(pad_right("中", 4), "中  ");
        assert_eq!(pad_left("7", 3), "  7");
    }

    #[test]
    fn test_sanitize_cell_flattens_newlines() {
        assert_eq!(sanitize_cell("a\nb\r\nc\td"), "a b c    d");
        assert!(matches!(sanitize_cell("clean"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_rule() {
        assert_eq!(rule(&[2, 3], '┌', '─', '┬', '┐'), "┌──┬───┐");
    }

    #[test]
    fn test_display_format_from_wire() {
        assert_eq!(DisplayFormat::from_wire(Some("neo4j_graph")), DisplayFormat::Graph);
        assert_eq!(DisplayFormat::from_wire(Some("table")), DisplayFormat::Tabular);
        assert_eq!(DisplayFormat::from_wire(None), DisplayFormat::Tabular);
    }
}
