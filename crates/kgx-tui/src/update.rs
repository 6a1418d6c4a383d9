//! Reducer: applies terminal and stream events to [`AppState`].
//!
//! Functions here mutate state and return the side effects the runtime must
//! perform; they never touch the terminal or the network themselves.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use kgx_core::compose::panel_content;
use kgx_core::search::{Panel, SearchUpdate, SessionChange};
use kgx_core::stream::IngestEvent;
use tracing::{info, warn};

use crate::state::{AppState, PanelId};

const SCROLL_STEP: i32 = 1;
const PAGE_STEP: i32 = 10;

/// Side effects requested by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEffect {
    /// Abort the search stream.
    CancelStream,
    Redraw,
}

/// Applies one ingestion event.
pub fn handle_ingest(state: &mut AppState, event: IngestEvent) -> Option<UiEffect> {
    let change = match event {
        IngestEvent::Message(message) => state.session.apply(SearchUpdate::from_message(message)),
        IngestEvent::Complete(Some(message)) => {
            state.session.apply(SearchUpdate::from_message(message))
        }
        IngestEvent::Complete(None) => state.session.end_of_stream(),
        IngestEvent::Error(error) => {
            warn!(kind = %error.kind, "Search stream failed: {error}");
            state.session.transport_failed(&error)
        }
    };

    match change {
        SessionChange::Nothing => None,
        SessionChange::Status | SessionChange::Failed => Some(UiEffect::Redraw),
        SessionChange::Analysis => {
            let analysis = state.session.analysis().to_string();
            state.live.set_content(&analysis);
            Some(UiEffect::Redraw)
        }
        SessionChange::Completed => {
            show_results(state);
            Some(UiEffect::Redraw)
        }
    }
}

/// Fills both comparison panels from the final results.
fn show_results(state: &mut AppState) {
    let Some(results) = state.session.results.clone() else {
        return;
    };
    info!(
        sql_rows = results.sql_results.row_count,
        graph_rows = results.graph_results.row_count,
        "Search complete"
    );
    for (id, panel) in [
        (PanelId::Traditional, Panel::Traditional),
        (PanelId::Graph, Panel::Graph),
    ] {
        let data = results.panel(panel);
        let format = data.display_format(panel);
        let content = panel_content(data, format, &state.limits);
        let view = state.panel_mut(id);
        view.format = format;
        view.raw = Some(data.data_value());
        view.set_content(&content);
    }
}

/// Applies one terminal event.
pub fn handle_terminal(state: &mut AppState, event: &Event) -> Option<UiEffect> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(state, key),
        Event::Resize(..) => Some(UiEffect::Redraw),
        _ => None,
    }
}

fn handle_key(state: &mut AppState, key: &KeyEvent) -> Option<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => quit(state),
        KeyCode::Char('c') if ctrl => quit(state),
        KeyCode::Char('s') => {
            for id in PanelId::ALL {
                state.panel_mut(id).skip();
            }
            Some(UiEffect::Redraw)
        }
        KeyCode::Tab => {
            state.focus = state.focus.next();
            Some(UiEffect::Redraw)
        }
        KeyCode::Up | KeyCode::Char('k') => scroll(state, -SCROLL_STEP),
        KeyCode::Down | KeyCode::Char('j') => scroll(state, SCROLL_STEP),
        KeyCode::PageUp => scroll(state, -PAGE_STEP),
        KeyCode::PageDown => scroll(state, PAGE_STEP),
        KeyCode::End => {
            state.panel_mut(state.focus).scroll = None;
            Some(UiEffect::Redraw)
        }
        _ => None,
    }
}

fn quit(state: &mut AppState) -> Option<UiEffect> {
    state.should_quit = true;
    for id in PanelId::ALL {
        state.panel_mut(id).shutdown();
    }
    Some(UiEffect::CancelStream)
}

fn scroll(state: &mut AppState, delta: i32) -> Option<UiEffect> {
    let panel = state.panel_mut(state.focus);
    let current = panel.view_top.get();
    panel.scroll_by(delta, current);
    Some(UiEffect::Redraw)
}
