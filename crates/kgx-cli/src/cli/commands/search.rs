//! Search command handlers.

use std::io::{Write, stdout};

use anyhow::{Context, Result, bail};
use kgx_core::api::ApiClient;
use kgx_core::compose::{compose, panel_content};
use kgx_core::config::Config;
use kgx_core::search::{Panel, SearchRequest, SearchResults, SearchSession, SearchUpdate, SessionChange};
use kgx_core::stream::{IngestError, IngestEvent};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Builds a validated request; the flag wins over `max_results` in config.
pub fn build_request(query: &str, max_results: Option<u32>, config: &Config) -> Result<SearchRequest> {
    SearchRequest::new(query, max_results.or(config.max_results)).context("invalid search request")
}

#[cfg(feature = "tui")]
pub async fn run_tui(config: &Config, request: SearchRequest) -> Result<()> {
    kgx_tui::run_search(config, request).await
}

#[cfg(not(feature = "tui"))]
pub async fn run_tui(config: &Config, request: SearchRequest) -> Result<()> {
    run_plain(config, request).await
}

/// Streams the analysis text to stdout as it arrives, then prints both
/// panels once the results are in.
pub async fn run_plain(config: &Config, request: SearchRequest) -> Result<()> {
    let client = ApiClient::new(config.resolve_base_url()?, config.connect_timeout())?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = client
        .stream_client()
        .context("build search stream client")?
        .open(&request, tx);

    let mut session = SearchSession::new(request.query.as_str());
    let mut transport_error: Option<IngestError> = None;
    let mut printed = 0;
    let mut out = stdout();

    while let Some(event) = rx.recv().await {
        let change = match event {
            IngestEvent::Message(message) | IngestEvent::Complete(Some(message)) => {
                session.apply(SearchUpdate::from_message(message))
            }
            IngestEvent::Complete(None) => session.end_of_stream(),
            IngestEvent::Error(err) => {
                error!(kind = %err.kind, "Search stream failed: {err}");
                let change = session.transport_failed(&err);
                transport_error = Some(err);
                change
            }
        };

        match change {
            SessionChange::Nothing => {}
            SessionChange::Status => eprintln!("[{}]", session.status_line()),
            SessionChange::Analysis => {
                let analysis = session.analysis();
                write!(out, "{}", analysis.get(printed..).unwrap_or_default())?;
                out.flush()?;
                printed = analysis.len();
            }
            SessionChange::Completed | SessionChange::Failed => {}
        }
    }
    let outcome = handle.wait().await;
    debug!(?outcome, "Search stream finished");

    if printed > 0 {
        writeln!(out)?;
    }
    if let Some(err) = transport_error {
        return Err(anyhow::Error::new(err).context("search stream failed"));
    }
    if let Some(message) = &session.error {
        bail!("search failed: {message}");
    }
    if let Some(results) = &session.results {
        print_results(&mut out, results, config)?;
    }
    Ok(())
}

fn print_results(out: &mut impl Write, results: &SearchResults, config: &Config) -> Result<()> {
    if !results.keywords.is_empty() {
        writeln!(out, "\nKeywords: {}", results.keywords.join(", "))?;
    }
    for panel in [Panel::Traditional, Panel::Graph] {
        let data = results.panel(panel);
        let format = data.display_format(panel);
        let content = panel_content(data, format, &config.table);
        let raw = data.data_value();
        let composed = compose(&content, Some(&raw), format, &config.table);
        writeln!(
            out,
            "\n## {} ({} rows, {:.2}s)\n",
            panel.title(),
            data.row_count,
            data.execution_time
        )?;
        writeln!(out, "{}", composed.to_plain_text())?;
    }
    writeln!(out, "\nTotal: {:.2}s", results.total_execution_time)?;
    Ok(())
}
