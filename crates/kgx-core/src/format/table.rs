//! Box-drawn text table for generic result rows.
//!
//! ```text
//! ┌───────┬──────────┐
//! │ state │ yield    │
//! ╞═══════╪══════════╡
//! │ Iowa  │ 1,234.50 │
//! │ Ohio  │      987 │
//! └───────┴──────────┘
//!        2 rows
//! ```

use serde_json::{Map, Number, Value};

use super::{
    NO_DATA, TableLimits, display_width, pad_left, pad_right, rule, sanitize_cell,
    truncate_with_marker,
};

/// One result row: column name to scalar value.
pub type TabularRow = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

struct Column {
    header: String,
    width: usize,
    align: Align,
}

/// Formats rows as a box-drawn table.
///
/// The column set comes from the first row's keys in their original order.
/// Keys missing from later rows render blank; extra keys are ignored.
pub fn format_table(rows: &[TabularRow], limits: &TableLimits) -> String {
    let Some(first) = rows.first() else {
        return NO_DATA.to_string();
    };
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    if keys.is_empty() {
        return NO_DATA.to_string();
    }

    let max_width = limits.max_column_width;
    let shown = &rows[..rows.len().min(limits.max_rows)];

    let numeric: Vec<bool> = keys.iter().map(|key| is_numeric_column(shown, key)).collect();

    let body: Vec<Vec<String>> = shown
        .iter()
        .map(|row| {
            keys.iter()
                .zip(&numeric)
                .map(|(key, &numeric)| fit(&cell_text(row.get(*key), numeric), max_width))
                .collect()
        })
        .collect();

    let columns: Vec<Column> = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let header = fit(key, max_width);
            let width = body
                .iter()
                .map(|cells| display_width(&cells[idx]))
                .chain(std::iter::once(display_width(&header)))
                .max()
                .unwrap_or(0)
                .min(max_width);
            let align = if numeric[idx] {
                Align::Right
            } else {
                Align::Left
            };
            Column {
                header,
                width,
                align,
            }
        })
        .collect();

    let widths: Vec<usize> = columns.iter().map(|c| c.width + 2).collect();
    let mut lines = Vec::with_capacity(body.len() + 6);

    lines.push(rule(&widths, '┌', '─', '┬', '┐'));
    lines.push(row_line(
        columns.iter().map(|c| pad_right(&c.header, c.width)),
    ));
    lines.push(rule(&widths, '╞', '═', '╪', '╡'));
    for cells in &body {
        lines.push(row_line(columns.iter().zip(cells).map(|(col, cell)| {
            match col.align {
                Align::Left => pad_right(cell, col.width),
                Align::Right => pad_left(cell, col.width),
            }
        })));
    }
    let bottom = rule(&widths, '└', '─', '┴', '┘');
    let total_width = display_width(&bottom);
    lines.push(bottom);
    lines.push(center(&footer(rows.len(), limits.max_rows), total_width));

    lines.join("\n")
}

/// Formats an arbitrary JSON payload with [`format_table`].
///
/// Only arrays of objects produce a table; anything else (or an array
/// without objects) yields [`NO_DATA`].
pub fn format_value_table(data: &Value, limits: &TableLimits) -> String {
    let rows: Vec<TabularRow> = data
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default();
    format_table(&rows, limits)
}

fn row_line(cells: impl Iterator<Item = String>) -> String {
    let mut line = String::from("│");
    for cell in cells {
        line.push(' ');
        line.push_str(&cell);
        line.push_str(" │");
    }
    line
}

fn footer(total: usize, max_rows: usize) -> String {
    if total > max_rows {
        format!("{total} rows (showing first {max_rows})")
    } else if total == 1 {
        "1 row".to_string()
    } else {
        format!("{total} rows")
    }
}

fn center(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text)) / 2;
    format!("{}{text}", " ".repeat(pad))
}

fn fit(text: &str, max_width: usize) -> String {
    truncate_with_marker(&sanitize_cell(text), max_width, "...")
}

/// Renders one cell value. Null and missing values are blank. In numeric
/// columns, numeric-looking strings get the same formatting as numbers.
fn cell_text(value: Option<&Value>, numeric: bool) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) if numeric => format_numeric_str(s).unwrap_or_else(|| s.clone()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => format_number(n),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// A column is right-aligned when it has at least one value and every
/// non-null value is a number or a numeric-looking string.
fn is_numeric_column(rows: &[TabularRow], key: &str) -> bool {
    let mut seen = false;
    for value in rows.iter().filter_map(|row| row.get(key)) {
        match value {
            Value::Null => {}
            Value::Number(_) => seen = true,
            Value::String(s) if is_numeric_str(s) => seen = true,
            _ => return false,
        }
    }
    seen
}

fn is_numeric_str(s: &str) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}

fn format_numeric_str(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(with_sign(i < 0, group_thousands(&i.unsigned_abs().to_string())));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(format_float)
}

/// Integers get thousands separators; everything else also gets exactly
/// two decimal places.
pub(crate) fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return with_sign(i < 0, group_thousands(&i.unsigned_abs().to_string()));
    }
    if let Some(u) = n.as_u64() {
        return group_thousands(&u.to_string());
    }
    n.as_f64().map_or_else(|| n.to_string(), format_float)
}

pub(crate) fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let negative = value.is_sign_negative() && value != 0.0;
    if value.fract() == 0.0 {
        return with_sign(negative, group_thousands(&format!("{:.0}", value.abs())));
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    with_sign(
        negative,
        format!("{}.{frac_part}", group_thousands(int_part)),
    )
}

fn with_sign(negative: bool, digits: String) -> String {
    if negative { format!("-{digits}") } else { digits }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
