//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! Event sources are multiplexed with `tokio::select!`:
//! - terminal input, read on a dedicated thread and sent to the inbox
//! - ingestion events from the search stream
//! - one reveal clock per panel
//! - the frame interval, which redraws only when something changed

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use kgx_core::stream::{IngestEvent, StreamHandle};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::render;
use crate::state::{AppState, PanelId};
use crate::terminal::Tui;
use crate::update::{self, UiEffect};

/// Target frame rate while panels animate (60fps = ~16ms per frame).
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// How long the input thread blocks in `poll` before rechecking its stop token.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Full-screen comparison runtime.
pub struct TuiRuntime {
    terminal: Tui,
    pub state: AppState,
    inbox_rx: mpsc::UnboundedReceiver<Event>,
    ingest_rx: mpsc::UnboundedReceiver<IngestEvent>,
    stream: StreamHandle,
    input_stop: CancellationToken,
    input_thread: Option<JoinHandle<()>>,
}

impl TuiRuntime {
    /// Creates the runtime and starts the input thread.
    pub fn new(
        terminal: Tui,
        state: AppState,
        stream: StreamHandle,
        ingest_rx: mpsc::UnboundedReceiver<IngestEvent>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let input_stop = CancellationToken::new();
        let input_thread = spawn_input_thread(inbox_tx, input_stop.clone());
        Self {
            terminal,
            state,
            inbox_rx,
            ingest_rx,
            stream,
            input_stop,
            input_thread: Some(input_thread),
        }
    }

    /// Runs until the user quits.
    ///
    /// # Errors
    /// Returns an error if drawing to the terminal fails.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.event_loop().await;
        self.shutdown();
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut frame = interval(FRAME_DURATION);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut dirty = true;

        while !self.state.should_quit {
            tokio::select! {
                biased;
                Some(event) = self.inbox_rx.recv() => {
                    let effect = update::handle_terminal(&mut self.state, &event);
                    dirty |= self.execute_effect(effect);
                }
                Some(event) = self.ingest_rx.recv() => {
                    let effect = update::handle_ingest(&mut self.state, event);
                    dirty |= self.execute_effect(effect);
                }
                () = self.state.live.clock.tick() => {
                    dirty |= self.state.live.on_tick();
                }
                () = self.state.traditional.clock.tick() => {
                    dirty |= self.state.traditional.on_tick();
                }
                () = self.state.graph.clock.tick() => {
                    dirty |= self.state.graph.on_tick();
                }
                _ = frame.tick() => {
                    if dirty {
                        self.terminal.draw(|f| render::render(&self.state, f))?;
                        dirty = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs a reducer effect. Returns true when a redraw is needed.
    fn execute_effect(&mut self, effect: Option<UiEffect>) -> bool {
        match effect {
            Some(UiEffect::CancelStream) => {
                debug!("Cancelling search stream");
                self.stream.cancel();
                true
            }
            Some(UiEffect::Redraw) => true,
            None => false,
        }
    }

    /// Stops the stream, every tick timer and the input thread.
    fn shutdown(&mut self) {
        self.stream.cancel();
        for id in PanelId::ALL {
            self.state.panel_mut(id).shutdown();
        }
        self.input_stop.cancel();
        if let Some(handle) = self.input_thread.take()
            && handle.join().is_err()
        {
            warn!("Input thread panicked");
        }
    }
}

/// Forwards crossterm events to the inbox from a plain thread until `stop`
/// fires.
fn spawn_input_thread(
    tx: mpsc::UnboundedSender<Event>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.is_cancelled() {
            match event::poll(INPUT_POLL) {
                Ok(false) => {}
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Terminal read failed: {err}");
                        break;
                    }
                },
                Err(err) => {
                    warn!("Terminal poll failed: {err}");
                    break;
                }
            }
        }
    })
}
