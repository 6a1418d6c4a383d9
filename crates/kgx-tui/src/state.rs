//! View state: the search session plus one reveal-driven panel per view.

use std::cell::Cell;

use kgx_core::compose::has_section_markers;
use kgx_core::format::{DisplayFormat, TableLimits};
use kgx_core::reveal::{Advance, RevealConfig, RevealEngine, RevealMode, Tick, TickClock};
use kgx_core::search::{Panel, SearchSession};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Live,
    Traditional,
    Graph,
}

impl PanelId {
    pub const ALL: [PanelId; 3] = [PanelId::Live, PanelId::Traditional, PanelId::Graph];

    pub fn next(self) -> Self {
        match self {
            PanelId::Live => PanelId::Traditional,
            PanelId::Traditional => PanelId::Graph,
            PanelId::Graph => PanelId::Live,
        }
    }
}

/// One animated text panel.
#[derive(Debug)]
pub struct PanelState {
    pub title: &'static str,
    pub engine: RevealEngine,
    pub clock: TickClock,
    /// Structured payload behind any table section in the text.
    pub raw: Option<Value>,
    pub format: DisplayFormat,
    /// Top line when scrolled by hand; `None` follows the tail.
    pub scroll: Option<u16>,
    /// Top line of the last drawn frame.
    pub view_top: Cell<u16>,
}

impl PanelState {
    pub fn new(title: &'static str, reveal: RevealConfig) -> Self {
        let engine = RevealEngine::new(reveal);
        let clock = TickClock::for_engine(&engine);
        Self {
            title,
            engine,
            clock,
            raw: None,
            format: DisplayFormat::Tabular,
            scroll: None,
            view_top: Cell::new(0),
        }
    }

    /// Feeds the full content known so far. Marked-up payloads skip the
    /// animation.
    pub fn set_content(&mut self, text: &str) {
        if has_section_markers(text) {
            self.engine.show_instantly(text);
        } else if let Advance::Restarted { from } = self.engine.advance(text) {
            debug!(panel = self.title, from, "Panel reveal restarted");
        }
        self.clock.sync(&self.engine);
    }

    /// Advances the reveal by one character. Returns true when the display
    /// changed.
    pub fn on_tick(&mut self) -> bool {
        let tick = self.engine.tick();
        self.clock.sync(&self.engine);
        tick != Tick::Idle
    }

    pub fn skip(&mut self) {
        self.engine.skip();
        self.clock.sync(&self.engine);
    }

    pub fn is_typing(&self) -> bool {
        self.engine.mode() == RevealMode::Typing
    }

    /// Stops the ticker and drops its timer.
    pub fn shutdown(&mut self) {
        self.engine.stop_ticker();
        self.clock.disarm();
    }

    pub fn scroll_by(&mut self, delta: i32, current_top: u16) {
        let base = i32::from(self.scroll.unwrap_or(current_top));
        self.scroll = Some((base + delta).clamp(0, i32::from(u16::MAX)) as u16);
    }
}

/// Whole-screen state.
#[derive(Debug)]
pub struct AppState {
    pub session: SearchSession,
    pub live: PanelState,
    pub traditional: PanelState,
    pub graph: PanelState,
    pub focus: PanelId,
    pub limits: TableLimits,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(query: &str, reveal: RevealConfig, limits: TableLimits) -> Self {
        Self {
            session: SearchSession::new(query),
            live: PanelState::new("Live analysis", reveal),
            traditional: PanelState::new(Panel::Traditional.title(), reveal),
            graph: PanelState::new(Panel::Graph.title(), reveal),
            focus: PanelId::Live,
            limits,
            should_quit: false,
        }
    }

    pub fn panel(&self, id: PanelId) -> &PanelState {
        match id {
            PanelId::Live => &self.live,
            PanelId::Traditional => &self.traditional,
            PanelId::Graph => &self.graph,
        }
    }

    pub fn panel_mut(&mut self, id: PanelId) -> &mut PanelState {
        match id {
            PanelId::Live => &mut self.live,
            PanelId::Traditional => &mut self.traditional,
            PanelId::Graph => &mut self.graph,
        }
    }

    pub fn any_typing(&self) -> bool {
        PanelId::ALL.iter().any(|id| self.panel(*id).is_typing())
    }
}
