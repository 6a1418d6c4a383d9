//! Terminal lifecycle for the comparison view.
//!
//! Restore runs on normal exit, on error exit, and from the panic hook.

use std::io::{self, Stdout};
use std::panic;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enters raw mode and the alternate screen.
///
/// Call `install_panic_hook()` first so a panic still restores the terminal.
///
/// # Errors
/// Returns an error if the terminal refuses any of the mode switches.
pub fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    undo_on_error(enter_alternate_screen, restore_terminal)
}

fn enter_alternate_screen() -> Result<Tui> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

/// Runs `step`; if it fails, runs `undo` before returning the step's error.
fn undo_on_error<T>(step: impl FnOnce() -> Result<T>, undo: impl FnOnce() -> Result<()>) -> Result<T> {
    step().inspect_err(|_| {
        let _ = undo();
    })
}

/// Leaves the alternate screen and raw mode. Safe to call more than once.
///
/// # Errors
/// Returns an error if the terminal refuses the mode switches.
pub fn restore_terminal() -> Result<()> {
    execute!(io::stdout(), Show, LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    disable_raw_mode().context("Failed to disable raw mode")?;
    Ok(())
}

/// Chains a terminal restore in front of the current panic hook.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::bail;

    use super::*;

    #[test]
    fn test_failed_setup_step_restores_terminal() {
        let restored = Cell::new(false);
        let result: Result<()> = undo_on_error(
            || bail!("Failed to enter alternate screen"),
            || {
                restored.set(true);
                Ok(())
            },
        );
        assert!(result.is_err());
        assert!(restored.get());
    }

    #[test]
    fn test_successful_setup_leaves_terminal_alone() {
        let restored = Cell::new(false);
        let result = undo_on_error(
            || Ok(7),
            || {
                restored.set(true);
                Ok(())
            },
        );
        assert_eq!(result.unwrap(), 7);
        assert!(!restored.get());
    }
}
