//! Pure view functions for the comparison screen.
//!
//! Functions here read `&AppState` and draw to a ratatui `Frame`. The only
//! write is each panel's `view_top`, recorded so scroll keys start from the
//! line the user is looking at.

use std::mem;

use kgx_core::compose::{Composition, compose};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::state::{AppState, PanelId, PanelState};

/// Status block: query, status and help rows plus borders.
const STATUS_HEIGHT: u16 = 5;

/// Share of the remaining height given to the live analysis panel.
const LIVE_PERCENT: u16 = 35;

const CURSOR: &str = "▌";
const PLACEHOLDER: &str = "Waiting for results…";
const HELP: &str = "q quit · s skip · tab focus · ↑↓ scroll · end follow";

/// Renders the whole screen.
pub fn render(state: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Percentage(LIVE_PERCENT),
            Constraint::Min(0),
        ])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    render_status(state, frame, rows[0]);
    render_panel(state, PanelId::Live, frame, rows[1]);
    render_panel(state, PanelId::Traditional, frame, columns[0]);
    render_panel(state, PanelId::Graph, frame, columns[1]);
}

fn render_status(state: &AppState, frame: &mut Frame, area: Rect) {
    let session = &state.session;
    let status_style = if session.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Yellow)
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("Query: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(session.query.clone()),
        ]),
        Line::from(Span::styled(session.status_line(), status_style)),
        Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" kgx ")
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_panel(state: &AppState, id: PanelId, frame: &mut Frame, area: Rect) {
    let panel = state.panel(id);
    let focused = state.focus == id;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", panel.title))
        .border_style(border_style);
    let inner = block.inner(area);

    let lines = panel_lines(panel, state, usize::from(inner.width));
    let top = visible_top(lines.len(), usize::from(inner.height), panel.scroll);
    panel.view_top.set(top);

    frame.render_widget(Paragraph::new(lines).block(block).scroll((top, 0)), area);
}

/// First visible line: the tail when following, else the manual offset
/// clamped to the last full page.
fn visible_top(total: usize, height: usize, scroll: Option<u16>) -> u16 {
    let max_top = u16::try_from(total.saturating_sub(height)).unwrap_or(u16::MAX);
    scroll.map_or(max_top, |offset| offset.min(max_top))
}

/// Builds the styled lines for one panel at the given content width.
fn panel_lines(panel: &PanelState, state: &AppState, width: usize) -> Vec<Line<'static>> {
    let display = panel.engine.display();
    if display.is_empty() && !panel.is_typing() {
        return vec![Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines = Vec::new();
    match compose(display, panel.raw.as_ref(), panel.format, &state.limits) {
        Composition::Json(pretty) => {
            lines.extend(pretty.lines().map(|line| Line::from(line.to_string())));
        }
        Composition::Sections(sections) => {
            let title_style = Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
            for section in sections {
                if let Some(title) = section.title {
                    lines.push(Line::from(Span::styled(title, title_style)));
                }
                for line in section.lines {
                    if section.kind.is_table_body() {
                        lines.push(Line::from(line));
                    } else {
                        lines.extend(wrap_text(&line, width).into_iter().map(Line::from));
                    }
                }
            }
        }
    }

    if panel.is_typing() {
        let cursor = Span::styled(CURSOR, Style::default().fg(Color::Green));
        match lines.last_mut() {
            Some(last) => last.spans.push(cursor),
            None => lines.push(Line::from(cursor)),
        }
    }
    lines
}

/// Word-wraps `text` to `width` display columns. Words wider than a line are
/// split at character boundaries.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.width() <= width {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for word in text.split(' ') {
        let word_width = word.width();
        let sep = usize::from(!current.is_empty());
        if current_width + sep + word_width <= width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_width += sep + word_width;
            continue;
        }
        if !current.is_empty() {
            out.push(mem::take(&mut current));
            current_width = 0;
        }
        if word_width <= width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }
        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width + ch_width > width && !current.is_empty() {
                out.push(mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += ch_width;
        }
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use kgx_core::format::TableLimits;
    use kgx_core::reveal::RevealConfig;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    fn screen(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| render(state, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn state() -> AppState {
        AppState::new("corn in Iowa", RevealConfig::default(), TableLimits::default())
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        assert_eq!(
            wrap_text("Iowa leads corn production", 10),
            vec!["Iowa leads", "corn", "production"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_counts_wide_chars() {
        // each CJK glyph is two columns
        assert_eq!(wrap_text("玉米玉米", 4), vec!["玉米", "玉米"]);
    }

    #[test]
    fn test_wrap_keeps_short_and_empty_lines() {
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(wrap_text("short", 10), vec!["short"]);
    }

    #[test]
    fn test_visible_top_follows_tail() {
        assert_eq!(visible_top(50, 10, None), 40);
        assert_eq!(visible_top(5, 10, None), 0);
        assert_eq!(visible_top(50, 10, Some(3)), 3);
        assert_eq!(visible_top(50, 10, Some(45)), 40);
    }

    #[test]
    fn test_empty_panels_show_placeholder() {
        let text = screen(&state());
        assert!(text.contains("Query: corn in Iowa"));
        assert!(text.contains("Live analysis"));
        assert!(text.contains("Traditional (SQL)"));
        assert!(text.contains("Knowledge Graph"));
        assert!(text.contains(PLACEHOLDER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_marked_content_renders_titles() {
        let mut state = state();
        state
            .traditional
            .set_content("=== ANALYSIS ===\nIowa leads.\n\n=== DATA TABLE ===\nNo data available");
        let text = screen(&state);
        assert!(text.contains("ANALYSIS"));
        assert!(text.contains("Iowa leads."));
        assert!(!text.contains("=== ANALYSIS ==="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_panel_shows_cursor() {
        let mut state = state();
        state.live.set_content("Iowa");
        state.live.on_tick();
        let text = screen(&state);
        assert!(text.contains(&format!("I{CURSOR}")), "{text}");
    }

    #[test]
    fn test_error_status_rendered() {
        let mut state = state();
        state.session.error = Some("HTTP 503: down".to_string());
        assert!(screen(&state).contains("error: HTTP 503: down"));
    }
}
