//! Turns display text into renderable sections.
//!
//! The view layer calls [`compose`] with the reveal engine's current display
//! buffer on every frame. Table bodies are swapped for freshly formatted
//! output when the structured payload behind them is known.

use serde_json::Value;

use crate::format::{DisplayFormat, TableLimits, format_graph};
use crate::search::QueryResults;
use crate::sections::{
    ANALYSIS_MARKERS, ContentSection, GRAPH_MARKERS, ParsedContent, SectionKind, TABLE_MARKERS,
    parse_content,
};

pub use crate::sections::has_section_markers;

const NO_ANALYSIS: &str = "No analysis available";

/// A section ready for drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSection {
    pub kind: SectionKind,
    /// Marker text without the `===` decoration, for headers and marked
    /// analysis sections.
    pub title: Option<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    /// Pretty-printed JSON document.
    Json(String),
    Sections(Vec<RenderedSection>),
}

impl Composition {
    /// Flattens back to text for non-styled output.
    pub fn to_plain_text(&self) -> String {
        match self {
            Composition::Json(pretty) => pretty.clone(),
            Composition::Sections(sections) => {
                let mut out = Vec::new();
                for section in sections {
                    if let Some(title) = &section.title {
                        out.push(format!("=== {title} ==="));
                    }
                    out.extend(section.lines.iter().cloned());
                }
                out.join("\n")
            }
        }
    }
}

/// Composes `display` for drawing.
///
/// `raw` is the structured payload behind any table body in the text.
pub fn compose(
    display: &str,
    raw: Option<&Value>,
    format: DisplayFormat,
    limits: &TableLimits,
) -> Composition {
    let sections = match parse_content(display) {
        ParsedContent::Json(value) => {
            return Composition::Json(
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| display.to_string()),
            );
        }
        ParsedContent::Sections(sections) => sections,
    };

    Composition::Sections(
        sections
            .into_iter()
            .map(|section| render_section(section, raw, format, limits))
            .collect(),
    )
}

fn render_section(
    section: ContentSection,
    raw: Option<&Value>,
    format: DisplayFormat,
    limits: &TableLimits,
) -> RenderedSection {
    let ContentSection { kind, mut lines } = section;
    match kind {
        SectionKind::TableHeader | SectionKind::GraphTableHeader => RenderedSection {
            kind,
            title: lines.first().map(|line| marker_title(line)),
            lines: Vec::new(),
        },
        SectionKind::Analysis => {
            let marked = lines
                .first()
                .is_some_and(|line| ANALYSIS_MARKERS.contains(&line.trim()));
            let title = marked.then(|| marker_title(&lines.remove(0)));
            RenderedSection { kind, title, lines }
        }
        SectionKind::TableBody | SectionKind::GraphTableBody => {
            let lines = match raw {
                Some(data) => {
                    let effective = if kind == SectionKind::GraphTableBody {
                        format
                    } else {
                        DisplayFormat::Tabular
                    };
                    format_graph(data, effective, limits)
                        .lines()
                        .map(str::to_string)
                        .collect()
                }
                None => lines,
            };
            RenderedSection {
                kind,
                title: None,
                lines,
            }
        }
        SectionKind::PlainText => RenderedSection {
            kind,
            title: None,
            lines,
        },
    }
}

fn marker_title(line: &str) -> String {
    line.trim().trim_matches('=').trim().to_string()
}

/// Full content for one comparison panel: the interpretation under an
/// analysis marker, then the formatted data under a data marker.
///
/// The result always carries section markers, so it is shown without the
/// reveal animation.
pub fn panel_content(results: &QueryResults, format: DisplayFormat, limits: &TableLimits) -> String {
    let mut out = String::new();
    out.push_str(ANALYSIS_MARKERS[0]);
    out.push('\n');
    match results.interpretation.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => out.push_str(text),
        _ => out.push_str(NO_ANALYSIS),
    }
    out.push('\n');
    if let Some(error) = &results.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    out.push('\n');
    out.push_str(match format {
        DisplayFormat::Graph => GRAPH_MARKERS[0],
        DisplayFormat::Tabular => TABLE_MARKERS[0],
    });
    out.push('\n');
    out.push_str(&format_graph(&results.data_value(), format, limits));
    out
}
