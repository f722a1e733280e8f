//! Renderer
//!
//! Draws one full frame from an immutable snapshot of the dashboard state:
//! banner, screen body, footer (wall-clock, tick lag, screen name), command
//! legend, and the side log panel. Pure terminal output, no state mutation.

use crate::state::{DashboardState, Screen};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use serde_json::Value;

/// Banner and footer-time color, the original dashboard's header blue.
const HEADER_COLOR: Color = Color::Rgb(3, 108, 165);

/// Width of the side log panel.
const LOG_PANEL_WIDTH: u16 = 40;

/// Below this terminal width the log panel is dropped instead of clipped.
const MIN_WIDTH_FOR_LOG: u16 = 60;

const BANNER: [&str; 6] = [
    "  ____                           _                           _                  _  _",
    " / ___| _ __    __ _  _ __    __| |  __ _  _   _   ___  ___ | |_           ___ | |(_)",
    "| |  _ | '__|  / _` || '_ \\  / _` | / _` || | | | / _ \\/ __|| __| _____   / __|| || |",
    "| |_| || |    | (_| || | | || (_| || (_| || |_| ||  __/\\__ \\| |_ |_____| | (__ | || |",
    " \\____||_|     \\__,_||_| |_| \\__,_| \\__, | \\__,_| \\___||___/ \\__|         \\___||_||_|",
    "                                       |_|",
];

const LEGEND: &str =
    "[x]: Exit,   [c]: Clear console,    [t]: Toggle Socket connection, [s]: Socket state,   [w]: World state,";

/// Draw a full frame.
///
/// `now_ms` is the current wall clock (unix millis); `lag_ms` is the elapsed
/// time since the previous tick minus the nominal refresh period.
pub fn render(frame: &mut Frame, state: &DashboardState, now_ms: i64, lag_ms: i64) {
    let area = frame.area();

    let (main_area, log_area) = if area.width >= MIN_WIDTH_FOR_LOG {
        let chunks =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(LOG_PANEL_WIDTH)])
                .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let rows = Layout::vertical([
        Constraint::Length(BANNER.len() as u16 + 1),
        Constraint::Min(4),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .split(main_area);

    render_banner(frame, rows[0]);
    match state.current_screen {
        Screen::Home => render_home(frame, rows[1], state),
        Screen::WorldState => render_world_state(frame, rows[1], state),
    }
    render_footer(frame, rows[2], state, now_ms, lag_ms);
    frame.render_widget(Paragraph::new(LEGEND), rows[3]);

    if let Some(log_area) = log_area {
        render_log(frame, log_area, state);
    }
}

fn render_banner(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = BANNER
        .iter()
        .map(|row| Line::from(Span::styled(*row, Style::default().fg(HEADER_COLOR))))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_home(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let conn = &state.connection;
    let socket_line = match (&conn.id, conn.connected) {
        (Some(id), true) => format!("SOCKET #{}", id),
        _ => "SOCKET".to_string(),
    };
    let connected_span = if conn.connected {
        Span::styled("Connected", Style::default().fg(Color::Green))
    } else {
        Span::styled("Not connected", Style::default().fg(Color::Red))
    };
    let reconnect_span = if conn.reconnecting {
        Span::styled("Attempting", Style::default().fg(Color::Blue))
    } else {
        Span::styled("...", Style::default().fg(Color::DarkGray))
    };

    let lines = vec![
        Line::from(socket_line),
        Line::from(" -"),
        Line::from(vec![Span::raw("Connected: "), connected_span]),
        Line::from(vec![Span::raw("Reconnection Status: "), reconnect_span]),
        Line::from(" -"),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_world_state(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let mut lines = vec![Line::from("WORLD STATE"), Line::from(" -")];
    for (field, value) in &state.world_state {
        lines.push(Line::from(format!("{} = {}", field, display_value(value))));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

/// Values print bare, not as JSON literals (`rain`, not `"rain"`).
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_footer(frame: &mut Frame, area: Rect, state: &DashboardState, now_ms: i64, lag_ms: i64) {
    let line = Line::from(vec![
        Span::styled(
            format!("GQ-CLI time = {}", now_ms),
            Style::default().fg(HEADER_COLOR),
        ),
        Span::raw("    "),
        Span::styled(format!("MS Lag = {}", lag_ms), Style::default().fg(Color::Red)),
        Span::raw("  "),
        Span::styled(
            format!("Current screen = {}", state.current_screen.name()),
            Style::default().fg(Color::Yellow),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let lines: Vec<Line> = state
        .log
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::raw("$ ").dark_gray(),
                Span::raw(entry.as_str()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    /// Render into a test backend and flatten the buffer to text.
    fn render_to_text(state: &DashboardState, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| render(frame, state, 1_700_000_000_000, 2))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..height {
            for x in 0..width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_home_screen_disconnected() {
        let state = DashboardState::new();
        let text = render_to_text(&state, 140, 30);
        assert!(text.contains("SOCKET"));
        assert!(text.contains("Not connected"));
        assert!(text.contains("Reconnection Status: ..."));
        assert!(text.contains("Current screen = home"));
        assert!(text.contains("[x]: Exit,"));
    }

    #[test]
    fn test_home_screen_connected_shows_session_id() {
        let mut state = DashboardState::new();
        state.connection.connected = true;
        state.connection.id = Some("abc123".to_string());
        let text = render_to_text(&state, 140, 30);
        assert!(text.contains("SOCKET #abc123"));
        assert!(text.contains("Connected: Connected"));
    }

    #[test]
    fn test_home_screen_reconnecting() {
        let mut state = DashboardState::new();
        state.connection.reconnecting = true;
        let text = render_to_text(&state, 140, 30);
        assert!(text.contains("Reconnection Status: Attempting"));
    }

    #[test]
    fn test_world_state_screen_lists_snapshot_fields() {
        let mut state = DashboardState::new();
        state.current_screen = Screen::WorldState;
        state.world_state.clear();
        state.world_state.insert("weather".into(), json!("rain"));
        let text = render_to_text(&state, 140, 30);
        assert!(text.contains("WORLD STATE"));
        assert!(text.contains("weather = rain"));
        // Replaced wholesale: the seeded field is gone
        assert!(!text.contains("timeOfDay"));
        assert!(text.contains("Current screen = worldState"));
    }

    #[test]
    fn test_log_panel_lists_entries() {
        let mut state = DashboardState::new();
        state.append_log("opened socket");
        state.append_log("closed socket");
        let text = render_to_text(&state, 140, 30);
        assert!(text.contains("$ opened socket"));
        assert!(text.contains("$ closed socket"));
    }

    #[test]
    fn test_log_panel_dropped_on_narrow_terminal() {
        let mut state = DashboardState::new();
        state.append_log("opened socket");
        let text = render_to_text(&state, 50, 30);
        assert!(!text.contains("$ opened socket"));
        // The rest of the dashboard still draws
        assert!(text.contains("Not connected"));
    }
}
