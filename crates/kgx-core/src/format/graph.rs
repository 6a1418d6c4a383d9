//! Property-graph browser style table for graph nodes.
//!
//! Each node takes `max(|properties|, |relationships|, 1)` physical lines;
//! only the first carries the labels and name.
//!
//! ```text
//! ╔══════════╤══════╤══════════════╤═══════════════╗
//! ║ Labels   │ Name │ Properties   │ Relationships ║
//! ╠══════════╪══════╪══════════════╪═══════════════╣
//! ║ [:State] │ Iowa │ acres: 9,000 │ →BORDERS(6)   ║
//! ╚══════════╧══════╧══════════════╧═══════════════╝
//! (1 nodes)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::table::format_number;
use super::{
    DisplayFormat, NO_DATA, TableLimits, display_width, format_value_table, pad_right, rule,
    sanitize_cell, truncate_with_marker,
};

const HEADERS: [&str; 4] = ["Labels", "Name", "Properties", "Relationships"];
const DEFAULT_LABELS: &str = "[:Node]";

/// A node as delivered by the graph backend, already flattened for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Kept for callers; not rendered.
    pub node_id: String,
    pub labels: String,
    pub name: String,
    /// One display line per entry.
    pub properties: Vec<String>,
    /// One display line per entry.
    pub relationships: Vec<String>,
}

impl GraphNode {
    /// Builds a node from loosely-shaped JSON.
    ///
    /// Accepts `node_id`/`nodeId`, label strings or arrays, and
    /// properties/relationships given as arrays, single strings, or objects.
    pub fn from_value(value: &Value) -> Self {
        let labels = match field(value, &["labels"]) {
            Some(Value::Array(items)) => {
                let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                if parts.is_empty() {
                    String::new()
                } else {
                    format!("[:{}]", parts.join(":"))
                }
            }
            Some(other) => scalar_text(other).unwrap_or_default(),
            None => String::new(),
        };

        Self {
            node_id: field(value, &["node_id", "nodeId"])
                .and_then(scalar_text)
                .unwrap_or_default(),
            labels: if labels.trim().is_empty() {
                DEFAULT_LABELS.to_string()
            } else {
                labels
            },
            name: field(value, &["name"]).and_then(scalar_text).unwrap_or_default(),
            properties: display_lines(field(value, &["properties"])),
            relationships: display_lines(field(value, &["relationships"])),
        }
    }

    fn line_count(&self) -> usize {
        self.properties.len().max(self.relationships.len()).max(1)
    }

    /// Cells for physical line `line` of this node.
    fn cells(&self, line: usize) -> [&str; 4] {
        let (labels, name) = if line == 0 {
            (self.labels.as_str(), self.name.as_str())
        } else {
            ("", "")
        };
        [
            labels,
            name,
            self.properties.get(line).map_or("", String::as_str),
            self.relationships.get(line).map_or("", String::as_str),
        ]
    }
}

/// Formats `data` in graph style when `format` is [`DisplayFormat::Graph`].
///
/// Falls back to the plain table formatter for tabular payloads and for
/// anything that is not a non-empty array.
pub fn format_graph(data: &Value, format: DisplayFormat, limits: &TableLimits) -> String {
    if format != DisplayFormat::Graph {
        return format_value_table(data, limits);
    }
    match data.as_array() {
        Some(items) if !items.is_empty() => {
            let nodes: Vec<GraphNode> = items.iter().map(GraphNode::from_value).collect();
            format_graph_nodes(&nodes)
        }
        _ => format_value_table(data, limits),
    }
}

/// Formats already-parsed nodes.
pub fn format_graph_nodes(nodes: &[GraphNode]) -> String {
    if nodes.is_empty() {
        return NO_DATA.to_string();
    }

    let sanitized: Vec<Vec<[String; 4]>> = nodes
        .iter()
        .map(|node| {
            (0..node.line_count())
                .map(|line| node.cells(line).map(|c| sanitize_cell(c).into_owned()))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| display_width(h)).collect();
    for lines in &sanitized {
        for cells in lines {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(display_width(cell));
            }
        }
    }
    let widths: Vec<usize> = widths.into_iter().map(|w| w + 2).collect();

    let mut out = Vec::new();
    out.push(rule(&widths, '╔', '═', '╤', '╗'));
    out.push(row_line(&widths, &HEADERS));
    out.push(rule(&widths, '╠', '═', '╪', '╣'));
    for (idx, lines) in sanitized.iter().enumerate() {
        for cells in lines {
            out.push(row_line(&widths, &cells.each_ref().map(String::as_str)));
        }
        if idx + 1 < sanitized.len() {
            out.push(rule(&widths, '╟', '─', '┼', '╢'));
        }
    }
    out.push(rule(&widths, '╚', '═', '╧', '╝'));
    out.push(format!("({} nodes)", nodes.len()));

    out.join("\n")
}

fn row_line(widths: &[usize], cells: &[&str; 4]) -> String {
    let mut line = String::from("║");
    for (i, (width, cell)) in widths.iter().zip(cells).enumerate() {
        if i > 0 {
            line.push('│');
        }
        let inner = width.saturating_sub(2);
        line.push(' ');
        line.push_str(&pad_right(&truncate_with_marker(cell, inner, "…"), inner));
        line.push(' ');
    }
    line.push('║');
    line
}

fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| value.get(*name))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn display_lines(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, v)| match v {
                Value::Number(n) => format!("{key}: {}", format_number(n)),
                other => format!("{key}: {}", scalar_text(other).unwrap_or_default()),
            })
            .collect(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => scalar_text(other).into_iter().collect(),
    }
}
