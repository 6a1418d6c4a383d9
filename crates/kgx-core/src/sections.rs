//! Splits accumulated streaming text into typed sections.
//!
//! The parser is re-run over the whole buffer on every update. A marker line
//! that is still being typed (`=== DATA TA`) is plain text in one parse and
//! a header in the next, so sections are always rebuilt from scratch rather
//! than patched.

use serde_json::Value;

/// Header lines that open an analysis section.
pub const ANALYSIS_MARKERS: [&str; 2] = ["=== ANALYSIS ===", "=== 分析 ==="];
/// Header lines that open a plain data table.
pub const TABLE_MARKERS: [&str; 2] = ["=== DATA TABLE ===", "=== 数据表 ==="];
/// Header lines that open a graph data table.
pub const GRAPH_MARKERS: [&str; 2] = ["=== GRAPH DATA ===", "=== 图数据 ==="];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Analysis,
    TableHeader,
    GraphTableHeader,
    TableBody,
    GraphTableBody,
    PlainText,
}

impl SectionKind {
    pub fn is_table_body(self) -> bool {
        matches!(self, Self::TableBody | Self::GraphTableBody)
    }

    pub fn is_header(self) -> bool {
        matches!(self, Self::TableHeader | Self::GraphTableHeader)
    }
}

/// A contiguous run of lines of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSection {
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

impl ContentSection {
    fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }
}

/// Result of [`parse_content`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContent {
    /// The whole text is one JSON document; it is shown pretty-printed.
    Json(Value),
    Sections(Vec<ContentSection>),
}

/// Parses `text`, preferring a whole-document JSON reading.
///
/// Only objects and arrays count as JSON here: a stream that happens to
/// start with `42` is still prose.
pub fn parse_content(text: &str) -> ParsedContent {
    let trimmed = text.trim();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str::<Value>(trimmed)
        && (value.is_object() || value.is_array())
    {
        return ParsedContent::Json(value);
    }
    ParsedContent::Sections(parse_sections(text))
}

/// Splits `text` into sections in a single pass over its lines.
pub fn parse_sections(text: &str) -> Vec<ContentSection> {
    let mut sections = Vec::new();
    let mut current = ContentSection::new(SectionKind::PlainText);

    for line in text.lines() {
        let marker = line.trim();

        if ANALYSIS_MARKERS.contains(&marker) {
            flush(&mut sections, &mut current, SectionKind::Analysis);
            current.lines.push(line.to_string());
            continue;
        }

        let table_kind = if TABLE_MARKERS.contains(&marker) {
            Some((SectionKind::TableHeader, SectionKind::TableBody))
        } else if GRAPH_MARKERS.contains(&marker) {
            Some((SectionKind::GraphTableHeader, SectionKind::GraphTableBody))
        } else {
            None
        };
        if let Some((header, body)) = table_kind {
            flush(&mut sections, &mut current, header);
            current.lines.push(line.to_string());
            flush(&mut sections, &mut current, body);
            continue;
        }

        if current.kind.is_table_body() {
            if closes_table(current.kind, line) {
                current.lines.push(line.to_string());
                flush(&mut sections, &mut current, SectionKind::PlainText);
            } else if has_box_glyph(line) {
                current.lines.push(line.to_string());
            } else if current.lines.is_empty() && line.trim().is_empty() {
                // spacing between a header and its grid
            } else {
                flush(&mut sections, &mut current, SectionKind::Analysis);
                current.lines.push(line.to_string());
            }
            continue;
        }

        current.lines.push(line.to_string());
    }

    if !current.lines.is_empty() {
        sections.push(current);
    }
    sections
}

/// Joins sections back into text that parses to the same sections.
pub fn join_sections(sections: &[ContentSection]) -> String {
    sections
        .iter()
        .flat_map(|s| s.lines.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when `text` contains any analysis or data marker line.
///
/// Such payloads are fully formed when they arrive and skip the reveal
/// animation.
pub fn has_section_markers(text: &str) -> bool {
    text.lines().any(|line| {
        let marker = line.trim();
        ANALYSIS_MARKERS.contains(&marker)
            || TABLE_MARKERS.contains(&marker)
            || GRAPH_MARKERS.contains(&marker)
    })
}

/// True for any line that is exactly a section marker.
pub fn is_marker_line(line: &str) -> bool {
    has_section_markers(line)
}

/// Any glyph from the Unicode box-drawing block: single, double, or junction.
pub fn has_box_glyph(line: &str) -> bool {
    line.chars().any(|c| ('\u{2500}'..='\u{257F}').contains(&c))
}

/// Footer lines end a table body. Graph tables count nodes instead of rows.
fn closes_table(kind: SectionKind, line: &str) -> bool {
    if has_box_glyph(line) {
        return false;
    }
    let line = line.trim_end();
    if line.contains("rows") || line.ends_with(" row") {
        return true;
    }
    kind == SectionKind::GraphTableBody && (line.contains("nodes") || line.ends_with(" node)"))
}

/// Pushes `current` if it holds anything (header sections always hold their
/// marker) and starts a fresh section of `next` kind.
fn flush(sections: &mut Vec<ContentSection>, current: &mut ContentSection, next: SectionKind) {
    let done = std::mem::replace(current, ContentSection::new(next));
    if !done.lines.is_empty() {
        sections.push(done);
    }
}
