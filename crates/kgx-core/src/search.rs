//! The search protocol: request validation and the frame vocabulary.
//!
//! The backend streams progress (`status`), `keywords`, row counts,
//! interpretation `chunk`s, in-band `error`s, and a final `complete`
//! message carrying both result sets. [`SearchSession`] folds those into
//! the state a view needs.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::format::DisplayFormat;
use crate::stream::{IngestError, StreamMessage};

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_RESULTS_LIMIT: u32 = 500;
/// Backend default when `max_results` is omitted.
pub const DEFAULT_MAX_RESULTS: u32 = 200;

const BLOCKED_KEYWORDS: [&str; 6] = ["DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE"];

/// Body of `POST /api/v1/search/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

impl SearchRequest {
    /// Normalizes and validates a query the same way the backend does.
    ///
    /// # Errors
    /// Returns an error for empty or overlong queries, write keywords, or an
    /// out-of-range `max_results`.
    pub fn new(query: &str, max_results: Option<u32>) -> Result<Self> {
        let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
        if query.is_empty() {
            bail!("Query cannot be empty");
        }
        let chars = query.chars().count();
        if chars > MAX_QUERY_CHARS {
            bail!("Query is {chars} characters; the limit is {MAX_QUERY_CHARS}");
        }
        let upper = query.to_uppercase();
        if let Some(keyword) = BLOCKED_KEYWORDS.iter().find(|k| upper.contains(*k)) {
            bail!("Query contains potentially dangerous pattern: {keyword}");
        }
        if let Some(n) = max_results
            && !(1..=MAX_RESULTS_LIMIT).contains(&n)
        {
            bail!("max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {n}");
        }
        Ok(Self { query, max_results })
    }
}

/// Which side of the comparison a result set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Traditional,
    Graph,
}

impl Panel {
    pub fn title(self) -> &'static str {
        match self {
            Panel::Traditional => "Traditional (SQL)",
            Panel::Graph => "Knowledge Graph",
        }
    }
}

/// One database's results in the final message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResults {
    pub data: Vec<Value>,
    pub execution_time: f64,
    pub row_count: u64,
    pub interpretation: Option<String>,
    pub error: Option<String>,
    /// Raw wire value; see [`QueryResults::display_format`].
    #[serde(rename = "display_format")]
    pub display_format_hint: Option<String>,
}

impl QueryResults {
    /// Resolves how this result set is drawn in `panel`.
    ///
    /// An explicit wire value wins. Otherwise graph results are drawn as
    /// nodes only when every row carries node fields.
    pub fn display_format(&self, panel: Panel) -> DisplayFormat {
        if let Some(hint) = self.display_format_hint.as_deref() {
            return DisplayFormat::from_wire(Some(hint));
        }
        match panel {
            Panel::Traditional => DisplayFormat::Tabular,
            Panel::Graph if !self.data.is_empty() && self.data.iter().all(is_node_shaped) => {
                DisplayFormat::Graph
            }
            Panel::Graph => DisplayFormat::Tabular,
        }
    }

    pub fn data_value(&self) -> Value {
        Value::Array(self.data.clone())
    }
}

fn is_node_shaped(row: &Value) -> bool {
    ["labels", "node_id", "nodeId"]
        .iter()
        .any(|key| row.get(key).is_some())
}

/// Payload of the terminal `status: "complete"` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    pub query: String,
    pub keywords: Vec<String>,
    pub sql_results: QueryResults,
    pub graph_results: QueryResults,
    pub total_execution_time: f64,
}

impl SearchResults {
    pub fn panel(&self, panel: Panel) -> &QueryResults {
        match panel {
            Panel::Traditional => &self.sql_results,
            Panel::Graph => &self.graph_results,
        }
    }
}

/// A decoded frame, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchUpdate {
    Progress {
        status: String,
        message: Option<String>,
    },
    Keywords(Vec<String>),
    RowCounts {
        sql: u64,
        graph: u64,
    },
    /// Interpretation text to append.
    Chunk(String),
    /// In-band backend error; the stream still ends normally.
    Failed(String),
    Complete(Box<SearchResults>),
    Other(StreamMessage),
}

impl SearchUpdate {
    pub fn from_message(message: StreamMessage) -> Self {
        if let Some(error) = message.get("error").and_then(Value::as_str) {
            return Self::Failed(error.to_string());
        }
        if message.is_complete() {
            return match serde_json::from_value::<SearchResults>(Value::Object(
                message.clone().into_fields(),
            )) {
                Ok(results) => Self::Complete(Box::new(results)),
                Err(err) => {
                    warn!(error = %err, "Unreadable completion message");
                    Self::Other(message)
                }
            };
        }
        if let Some(chunk) = message.get("chunk").and_then(Value::as_str) {
            return Self::Chunk(chunk.to_string());
        }
        if let Some(keywords) = message.get("keywords").and_then(Value::as_array) {
            return Self::Keywords(
                keywords
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            );
        }
        if message.get("sql_rows").is_some() || message.get("graph_rows").is_some() {
            let count = |key: &str| message.get(key).and_then(Value::as_u64).unwrap_or(0);
            return Self::RowCounts {
                sql: count("sql_rows"),
                graph: count("graph_rows"),
            };
        }
        if let Some(status) = message.status() {
            return Self::Progress {
                status: status.to_string(),
                message: message
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
        }
        Self::Other(message)
    }
}

/// What [`SearchSession::apply`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Nothing,
    Status,
    Analysis,
    Completed,
    Failed,
}

/// Accumulated state of one search.
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    pub query: String,
    pub status: Option<String>,
    pub status_message: Option<String>,
    pub keywords: Vec<String>,
    pub row_counts: Option<(u64, u64)>,
    pub results: Option<SearchResults>,
    pub error: Option<String>,
    analysis: String,
    finished: bool,
}

impl SearchSession {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Cumulative interpretation text received so far.
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn apply(&mut self, update: SearchUpdate) -> SessionChange {
        match update {
            SearchUpdate::Progress { status, message } => {
                self.status = Some(status);
                self.status_message = message;
                SessionChange::Status
            }
            SearchUpdate::Keywords(keywords) => {
                self.keywords = keywords;
                SessionChange::Status
            }
            SearchUpdate::RowCounts { sql, graph } => {
                self.row_counts = Some((sql, graph));
                SessionChange::Status
            }
            SearchUpdate::Chunk(chunk) => {
                if chunk.is_empty() {
                    return SessionChange::Nothing;
                }
                self.analysis.push_str(&chunk);
                SessionChange::Analysis
            }
            SearchUpdate::Failed(error) => {
                self.error = Some(error);
                self.finished = true;
                SessionChange::Failed
            }
            SearchUpdate::Complete(results) => {
                if self.keywords.is_empty() {
                    self.keywords.clone_from(&results.keywords);
                }
                self.row_counts.get_or_insert((
                    results.sql_results.row_count,
                    results.graph_results.row_count,
                ));
                self.status = Some(crate::stream::STATUS_COMPLETE.to_string());
                self.status_message = None;
                self.results = Some(*results);
                self.finished = true;
                SessionChange::Completed
            }
            SearchUpdate::Other(_) => SessionChange::Nothing,
        }
    }

    /// Records that the stream ended without a completion message.
    pub fn end_of_stream(&mut self) -> SessionChange {
        if self.finished {
            return SessionChange::Nothing;
        }
        self.finished = true;
        if self.results.is_none() && self.error.is_none() {
            self.error = Some("Stream ended before results arrived".to_string());
            return SessionChange::Failed;
        }
        SessionChange::Status
    }

    pub fn transport_failed(&mut self, error: &IngestError) -> SessionChange {
        self.error = Some(error.to_string());
        self.finished = true;
        SessionChange::Failed
    }

    /// One-line summary: status, keywords, row counts, timing.
    pub fn status_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(error) = &self.error {
            parts.push(format!("error: {error}"));
        } else if let Some(message) = &self.status_message {
            parts.push(message.clone());
        } else if let Some(status) = &self.status {
            parts.push(status.clone());
        }
        if !self.keywords.is_empty() {
            parts.push(format!("keywords: {}", self.keywords.join(", ")));
        }
        if let Some((sql, graph)) = self.row_counts {
            parts.push(format!("rows: {sql} sql / {graph} graph"));
        }
        if let Some(results) = &self.results {
            parts.push(format!("{:.2}s", results.total_execution_time));
        }
        parts.join(" · ")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn update(value: Value) -> SearchUpdate {
        SearchUpdate::from_message(StreamMessage::try_from(value).unwrap())
    }

    #[test]
    fn test_request_collapses_whitespace() {
        let req = SearchRequest::new("  corn   yield\tIowa \n", None).unwrap();
        assert_eq!(req.query, "corn yield Iowa");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"query": "corn yield Iowa"})
        );
    }

    #[test]
    fn test_request_rejections() {
        assert!(SearchRequest::new("   ", None).is_err());
        assert!(SearchRequest::new(&"a".repeat(501), None).is_err());
        assert!(SearchRequest::new(&"a".repeat(500), None).is_ok());
        assert!(SearchRequest::new("drop table farms", None).is_err());
        assert!(SearchRequest::new("corn", Some(0)).is_err());
        assert!(SearchRequest::new("corn", Some(501)).is_err());
        assert!(SearchRequest::new("corn", Some(500)).is_ok());
    }

    #[test]
    fn test_classifies_frames() {
        assert_eq!(
            update(json!({"status": "extracting", "message": "Extracting keywords..."})),
            SearchUpdate::Progress {
                status: "extracting".into(),
                message: Some("Extracting keywords...".into())
            }
        );
        assert_eq!(
            update(json!({"keywords": ["corn", "Iowa"]})),
            SearchUpdate::Keywords(vec!["corn".into(), "Iowa".into()])
        );
        assert_eq!(
            update(json!({"sql_rows": 25, "graph_rows": 30})),
            SearchUpdate::RowCounts { sql: 25, graph: 30 }
        );
        assert_eq!(update(json!({"chunk": "Io"})), SearchUpdate::Chunk("Io".into()));
        assert_eq!(
            update(json!({"error": "boom"})),
            SearchUpdate::Failed("boom".into())
        );
        assert!(matches!(update(json!({"other": 1})), SearchUpdate::Other(_)));
    }

    #[test]
    fn test_complete_message_parses_results() {
        let SearchUpdate::Complete(results) = update(json!({
            "status": "complete",
            "query": "corn",
            "keywords": ["corn"],
            "sql_results": {
                "data": [{"state": "Iowa"}],
                "execution_time": 0.45,
                "row_count": 1,
                "interpretation": "Iowa leads."
            },
            "graph_results": {"data": [], "row_count": 0},
            "total_execution_time": 1.25
        })) else {
            panic!("expected completion");
        };
        assert_eq!(results.sql_results.row_count, 1);
        assert_eq!(results.sql_results.interpretation.as_deref(), Some("Iowa leads."));
        assert!(results.graph_results.interpretation.is_none());
    }

    #[test]
    fn test_session_accumulates_analysis() {
        let mut session = SearchSession::new("corn");
        assert_eq!(session.apply(update(json!({"chunk": "Iowa "}))), SessionChange::Analysis);
        assert_eq!(session.apply(update(json!({"chunk": "leads."}))), SessionChange::Analysis);
        assert_eq!(session.apply(update(json!({"chunk": ""}))), SessionChange::Nothing);
        assert_eq!(session.analysis(), "Iowa leads.");
    }

    #[test]
    fn test_session_status_line() {
        let mut session = SearchSession::new("corn");
        session.apply(update(json!({"status": "executing", "message": "Executing..."})));
        session.apply(update(json!({"keywords": ["corn"]})));
        session.apply(update(json!({"sql_rows": 3, "graph_rows": 4})));
        assert_eq!(
            session.status_line(),
            "Executing... · keywords: corn · rows: 3 sql / 4 graph"
        );
    }

    #[test]
    fn test_end_without_results_is_failure() {
        let mut session = SearchSession::new("corn");
        assert_eq!(session.end_of_stream(), SessionChange::Failed);
        assert!(session.error.is_some());
        assert_eq!(session.end_of_stream(), SessionChange::Nothing);
    }

    #[test]
    fn test_graph_panel_format_resolution() {
        let nodes = QueryResults {
            data: vec![json!({"labels": "[:State]", "name": "Iowa"})],
            ..QueryResults::default()
        };
        assert_eq!(nodes.display_format(Panel::Graph), DisplayFormat::Graph);
        assert_eq!(nodes.display_format(Panel::Traditional), DisplayFormat::Tabular);

        let rows = QueryResults {
            data: vec![json!({"farm": {"id": 1}, "relationships": 5})],
            ..QueryResults::default()
        };
        assert_eq!(rows.display_format(Panel::Graph), DisplayFormat::Tabular);

        let explicit = QueryResults {
            display_format_hint: Some("neo4j_graph".into()),
            ..rows
        };
        assert_eq!(explicit.display_format(Panel::Traditional), DisplayFormat::Graph);
    }
}
