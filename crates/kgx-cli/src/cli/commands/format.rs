//! Format command handler.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use kgx_core::config::Config;
use kgx_core::format::{DisplayFormat, format_graph, format_value_table};
use serde_json::Value;

/// Formats a JSON payload from `file` (or stdin) and prints it.
pub fn run(graph: bool, file: Option<&Path>, config: &Config) -> Result<()> {
    let input = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("read stdin")?;
            buf
        }
    };
    let data: Value = serde_json::from_str(&input).context("parse JSON input")?;

    let output = if graph {
        format_graph(&data, DisplayFormat::Graph, &config.table)
    } else {
        format_value_table(&data, &config.table)
    };
    println!("{output}");
    Ok(())
}
