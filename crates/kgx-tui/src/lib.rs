//! Full-screen comparison view for kgx.

pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};

use anyhow::{Context, Result};
use kgx_core::api::ApiClient;
use kgx_core::config::Config;
use kgx_core::search::SearchRequest;
pub use runtime::TuiRuntime;
use tokio::sync::mpsc;
use tracing::info;

use crate::state::AppState;

/// Runs one search in the full-screen view until the user quits.
///
/// # Errors
/// Returns an error if stdout is not a terminal, the backend URL is invalid,
/// or the terminal cannot be driven.
pub async fn run_search(config: &Config, request: SearchRequest) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "The comparison view requires a terminal.\n\
             Use `kgx search --plain '...'` for non-interactive output."
        );
    }

    let client = ApiClient::new(config.resolve_base_url()?, config.connect_timeout())?;
    let stream_client = client
        .stream_client()
        .context("Failed to build search stream client")?;
    info!(url = stream_client.url(), query = %request.query, "Starting search");

    let state = AppState::new(&request.query, config.reveal, config.table);

    terminal::install_panic_hook();
    let tui = terminal::setup_terminal()?;

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = stream_client.open(&request, tx);
    let mut runtime = TuiRuntime::new(tui, state, handle, rx);
    let result = runtime.run().await;

    terminal::restore_terminal()?;
    result
}
