//! Character-by-character reveal of a growing, possibly rewritten text.
//!
//! [`RevealEngine`] owns the *target* (everything known so far) and the
//! *display* (the prefix shown so far). Callers hand it the full cumulative
//! text on every update via [`RevealEngine::advance`]; a ticker drives
//! [`RevealEngine::tick`], which reveals exactly one more character.
//!
//! An update that merely extends what is on screen keeps the running ticker
//! and just raises the ceiling. Anything else (a shrink, a rewrite of
//! already-shown text) restarts the reveal, either from empty or from a bulk
//! prefix for very large payloads.
//!
//! The engine holds no timer itself. It exposes whether a ticker should be
//! running and a generation counter that changes every time the ticker must
//! be (re)started; [`TickClock`] turns that into a tokio interval.

mod clock;

pub use clock::TickClock;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reveal tuning. All values are policy defaults, not invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Milliseconds per revealed character, clamped to [1, 1000].
    pub speed_ms: u64,
    /// Maximum typing lag (characters) tolerated before an update restarts.
    pub lag_tolerance: usize,
    /// Targets longer than this jump straight to this many characters.
    pub bulk_reveal_threshold: usize,
}

impl RevealConfig {
    pub const DEFAULT_SPEED_MS: u64 = 30;
    pub const MIN_SPEED_MS: u64 = 1;
    pub const MAX_SPEED_MS: u64 = 1000;
    pub const DEFAULT_LAG_TOLERANCE: usize = 10;
    pub const DEFAULT_BULK_REVEAL_THRESHOLD: usize = 10_000;

    /// Tick period after clamping `speed_ms`.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(
            self.speed_ms
                .clamp(Self::MIN_SPEED_MS, Self::MAX_SPEED_MS),
        )
    }

    #[must_use]
    pub fn with_speed_ms(mut self, speed_ms: u64) -> Self {
        self.speed_ms = speed_ms.clamp(Self::MIN_SPEED_MS, Self::MAX_SPEED_MS);
        self
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            speed_ms: Self::DEFAULT_SPEED_MS,
            lag_tolerance: Self::DEFAULT_LAG_TOLERANCE,
            bulk_reveal_threshold: Self::DEFAULT_BULK_REVEAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealMode {
    /// Nothing to show yet.
    #[default]
    Idle,
    /// The ticker is advancing the cursor.
    Typing,
    /// Display equals target.
    Complete,
}

/// Observable reveal state. `cursor` counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealState {
    pub target: String,
    pub display: String,
    pub cursor: usize,
    pub mode: RevealMode,
}

/// What [`RevealEngine::advance`] did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The update equals the current display.
    Ignored,
    /// The target grew; display, cursor, and ticker are untouched.
    Extended,
    /// The reveal restarted from `from` characters.
    Restarted { from: usize },
}

/// What one [`RevealEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No ticker should be running.
    Idle,
    /// One more character is visible.
    Revealed,
    /// The last character became visible; the ticker is now stopped.
    Completed,
}

type CompletionHook = Box<dyn FnMut() + Send>;

/// Reveal state machine bound to one content stream.
pub struct RevealEngine {
    config: RevealConfig,
    state: RevealState,
    /// Byte offset in `target` matching `cursor`.
    cursor_byte: usize,
    /// Characters in `target`.
    target_chars: usize,
    ticking: bool,
    generation: u64,
    on_complete: Option<CompletionHook>,
}

impl std::fmt::Debug for RevealEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("ticking", &self.ticking)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Default for RevealEngine {
    fn default() -> Self {
        Self::new(RevealConfig::default())
    }
}

impl RevealEngine {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            state: RevealState::default(),
            cursor_byte: 0,
            target_chars: 0,
            ticking: false,
            generation: 0,
            on_complete: None,
        }
    }

    /// Registers a hook called once per transition into `Complete`.
    #[must_use]
    pub fn with_on_complete(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    pub fn state(&self) -> &RevealState {
        &self.state
    }

    pub fn display(&self) -> &str {
        &self.state.display
    }

    pub fn target(&self) -> &str {
        &self.state.target
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn mode(&self) -> RevealMode {
        self.state.mode
    }

    /// True while a ticker should be driving [`Self::tick`].
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Changes whenever the ticker must be started or restarted.
    pub fn tick_generation(&self) -> u64 {
        self.generation
    }

    /// Feeds the full text known so far.
    pub fn advance(&mut self, new_target: &str) -> Advance {
        if new_target == self.state.display {
            return Advance::Ignored;
        }

        // how far the new text runs ahead of what is on screen
        let lag = new_target
            .chars()
            .count()
            .saturating_sub(self.state.display.chars().count());
        let continuous = new_target.len() >= self.state.display.len()
            && new_target.starts_with(self.state.display.as_str());

        if !continuous || lag > self.config.lag_tolerance {
            return self.restart(new_target);
        }

        self.set_target(new_target);
        if self.state.cursor < self.target_chars {
            self.state.mode = RevealMode::Typing;
            if !self.ticking {
                self.start_ticker();
            }
        }
        Advance::Extended
    }

    /// Reveals one more character.
    pub fn tick(&mut self) -> Tick {
        if !self.ticking {
            return Tick::Idle;
        }
        if let Some(ch) = self.state.target[self.cursor_byte..].chars().next() {
            self.cursor_byte += ch.len_utf8();
            self.state.cursor += 1;
            self.state.display.push(ch);
        }
        if self.state.cursor >= self.target_chars {
            self.ticking = false;
            self.complete();
            return Tick::Completed;
        }
        Tick::Revealed
    }

    /// Stops the ticker and shows the whole target.
    pub fn skip(&mut self) {
        if self.state.mode == RevealMode::Complete && !self.ticking {
            return;
        }
        self.ticking = false;
        self.jump_to(self.target_chars);
        self.complete();
    }

    /// Replaces the target and shows it at once, bypassing the animation.
    ///
    /// Used for payloads that arrive fully formed (section-marked results).
    pub fn show_instantly(&mut self, text: &str) {
        if self.state.mode == RevealMode::Complete && self.state.target == text {
            return;
        }
        self.ticking = false;
        self.set_target(text);
        self.jump_to(self.target_chars);
        self.complete();
    }

    /// Drops all state and stops the ticker, as for a brand-new query.
    pub fn reset(&mut self) {
        self.state = RevealState::default();
        self.cursor_byte = 0;
        self.target_chars = 0;
        self.stop_ticker();
    }

    /// Stops the ticker without touching the text.
    pub fn stop_ticker(&mut self) {
        if self.ticking {
            self.ticking = false;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    fn restart(&mut self, new_target: &str) -> Advance {
        self.set_target(new_target);
        let from = if self.target_chars > self.config.bulk_reveal_threshold {
            self.config.bulk_reveal_threshold
        } else {
            0
        };
        debug!(
            from,
            target_chars = self.target_chars,
            "reveal restarted"
        );
        self.jump_to(from);

        if self.target_chars == 0 {
            self.ticking = false;
            self.generation = self.generation.wrapping_add(1);
            self.state.mode = RevealMode::Idle;
        } else {
            self.state.mode = RevealMode::Typing;
            self.start_ticker();
        }
        Advance::Restarted { from }
    }

    fn start_ticker(&mut self) {
        self.ticking = true;
        self.generation = self.generation.wrapping_add(1);
    }

    fn set_target(&mut self, text: &str) {
        text.clone_into(&mut self.state.target);
        self.target_chars = text.chars().count();
    }

    /// Sets display and cursor to the first `chars` characters of the target.
    fn jump_to(&mut self, chars: usize) {
        let byte = self
            .state
            .target
            .char_indices()
            .nth(chars)
            .map_or(self.state.target.len(), |(idx, _)| idx);
        self.cursor_byte = byte;
        self.state.cursor = chars.min(self.target_chars);
        self.state.display.clear();
        self.state.display.push_str(&self.state.target[..byte]);
    }

    fn complete(&mut self) {
        self.state.mode = RevealMode::Complete;
        if let Some(hook) = self.on_complete.as_mut() {
            hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counted() -> (RevealEngine, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&count);
        let engine = RevealEngine::default().with_on_complete(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        (engine, count)
    }

    fn run_to_end(engine: &mut RevealEngine) -> usize {
        let mut ticks = 0;
        while engine.is_ticking() {
            engine.tick();
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn test_first_content_starts_typing() {
        let mut engine = RevealEngine::default();
        assert_eq!(engine.mode(), RevealMode::Idle);
        assert_eq!(engine.advance("Hello"), Advance::Extended);
        assert_eq!(engine.mode(), RevealMode::Typing);
        assert!(engine.is_ticking());
        assert_eq!(engine.display(), "");
    }

    #[test]
    fn test_completion_fires_once_after_exactly_len_ticks() {
        let (mut engine, count) = counted();
        engine.advance("abcdef");
        let ticks = run_to_end(&mut engine);
        assert_eq!(ticks, 6);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(engine.mode(), RevealMode::Complete);
        assert_eq!(engine.tick(), Tick::Idle);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identical_content_is_ignored_mid_typing() {
        let mut engine = RevealEngine::default();
        engine.advance("Hello");
        engine.tick();
        engine.tick();
        let generation = engine.tick_generation();
        assert_eq!(engine.advance("He"), Advance::Ignored);
        assert_eq!(engine.tick_generation(), generation);
        assert_eq!(engine.cursor(), 2);
    }

    #[test]
    fn test_extension_keeps_cursor_and_ticker() {
        let mut engine = RevealEngine::default();
        engine.advance("Hello");
        let generation = engine.tick_generation();
        assert_eq!(engine.advance("Hello, wor"), Advance::Extended);
        assert_eq!(engine.tick_generation(), generation);

        let mut cursors = vec![engine.cursor()];
        while engine.is_ticking() {
            engine.tick();
            cursors.push(engine.cursor());
        }
        assert!(cursors.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(engine.display(), "Hello, wor");
    }

    #[test]
    fn test_quick_follow_up_reaches_full_text() {
        let mut engine = RevealEngine::default();
        engine.advance("Hello");
        engine.advance("Hello, world");
        assert_eq!(engine.cursor(), 0);

        let mut cursors = vec![engine.cursor()];
        while engine.is_ticking() {
            engine.tick();
            cursors.push(engine.cursor());
        }
        assert!(cursors.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(engine.display(), "Hello, world");
    }

    #[test]
    fn test_extension_mid_typing_never_resets() {
        let mut engine = RevealEngine::default();
        engine.advance("The quick");
        for _ in 0..4 {
            engine.tick();
        }
        assert_eq!(engine.advance("The quick br"), Advance::Extended);
        assert_eq!(engine.cursor(), 4);
        assert_eq!(engine.display(), "The ");
    }

    #[test]
    fn test_extension_beyond_lag_tolerance_restarts() {
        let mut engine = RevealEngine::default();
        engine.advance("Hello");
        engine.tick();
        engine.tick();
        let generation = engine.tick_generation();

        assert_eq!(
            engine.advance("Hello, wonderful world"),
            Advance::Restarted { from: 0 }
        );
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.display(), "");
        assert_eq!(engine.target(), "Hello, wonderful world");
        assert_ne!(engine.tick_generation(), generation);
    }

    #[test]
    fn test_zero_lag_tolerance_restarts_every_jump() {
        let mut engine = RevealEngine::new(RevealConfig {
            lag_tolerance: 0,
            ..RevealConfig::default()
        });
        let mut text = String::new();
        let mut restarts = 0;
        for _ in 0..5 {
            text.push_str("twenty chars of text");
            if matches!(engine.advance(&text), Advance::Restarted { .. }) {
                restarts += 1;
            }
            engine.tick();
        }
        assert_eq!(restarts, 5);
    }

    #[test]
    fn test_large_initial_payload_jumps_to_bulk_prefix() {
        let mut engine = RevealEngine::default();
        let big = "y".repeat(50_000);
        assert_eq!(engine.advance(&big), Advance::Restarted { from: 10_000 });
        assert_eq!(engine.cursor(), 10_000);
        assert_eq!(engine.display().len(), 10_000);
        assert_eq!(engine.mode(), RevealMode::Typing);
        assert!(engine.is_ticking());
    }

    #[test]
    fn test_rewrite_restarts_from_empty() {
        let mut engine = RevealEngine::default();
        engine.advance("Hello");
        run_to_end(&mut engine);
        let generation = engine.tick_generation();

        assert_eq!(engine.advance("Goodbye"), Advance::Restarted { from: 0 });
        assert_eq!(engine.display(), "");
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.mode(), RevealMode::Typing);
        assert_ne!(engine.tick_generation(), generation);
    }

    #[test]
    fn test_shrink_restarts() {
        let mut engine = RevealEngine::default();
        engine.advance("Hello world");
        run_to_end(&mut engine);
        assert_eq!(engine.advance("Hello"), Advance::Restarted { from: 0 });
        assert!("Hello".starts_with(engine.display()));
    }

    #[test]
    fn test_large_restart_jumps_to_bulk_prefix() {
        let mut engine = RevealEngine::default();
        engine.advance("x");
        run_to_end(&mut engine);
        let big = "y".repeat(12_000);
        assert_eq!(engine.advance(&big), Advance::Restarted { from: 10_000 });
        assert_eq!(engine.cursor(), 10_000);
        assert_eq!(engine.display().len(), 10_000);
        assert!(big.starts_with(engine.display()));
        assert_eq!(run_to_end(&mut engine), 2_000);
    }

    #[test]
    fn test_completion_fires_again_after_later_extension() {
        let (mut engine, count) = counted();
        engine.advance("ab");
        run_to_end(&mut engine);
        assert_eq!(engine.advance("abcd"), Advance::Extended);
        assert!(engine.is_ticking());
        run_to_end(&mut engine);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(engine.display(), "abcd");
    }

    #[test]
    fn test_skip_completes_once() {
        let (mut engine, count) = counted();
        engine.advance("some text");
        engine.tick();
        engine.skip();
        assert_eq!(engine.display(), "some text");
        assert_eq!(engine.cursor(), 9);
        assert!(!engine.is_ticking());
        engine.skip();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_show_instantly_bypasses_ticker() {
        let (mut engine, count) = counted();
        engine.show_instantly("=== DATA TABLE ===\n┌─┐");
        assert_eq!(engine.mode(), RevealMode::Complete);
        assert_eq!(engine.display(), engine.target());
        assert!(!engine.is_ticking());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_multibyte_characters_tick_one_at_a_time() {
        let mut engine = RevealEngine::default();
        engine.advance("é中🎉");
        engine.tick();
        assert_eq!(engine.display(), "é");
        engine.tick();
        assert_eq!(engine.display(), "é中");
        assert_eq!(engine.tick(), Tick::Completed);
        assert_eq!(engine.cursor(), 3);
    }

    #[test]
    fn test_shrink_to_empty_goes_idle() {
        let (mut engine, count) = counted();
        engine.advance("abc");
        run_to_end(&mut engine);
        assert_eq!(engine.advance(""), Advance::Restarted { from: 0 });
        assert_eq!(engine.mode(), RevealMode::Idle);
        assert!(!engine.is_ticking());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_clears_state_and_ticker() {
        let mut engine = RevealEngine::default();
        engine.advance("abc");
        engine.reset();
        assert_eq!(engine.state(), &RevealState::default());
        assert!(!engine.is_ticking());
    }

    #[test]
    fn test_speed_is_clamped() {
        let config = RevealConfig::default().with_speed_ms(0);
        assert_eq!(config.tick_period(), Duration::from_millis(1));
        let config = RevealConfig {
            speed_ms: 50_000,
            ..RevealConfig::default()
        };
        assert_eq!(config.tick_period(), Duration::from_millis(1000));
    }
}
