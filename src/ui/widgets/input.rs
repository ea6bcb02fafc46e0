// src/ui/widgets/input.rs
use crate::app::{App, AppState};
use ratatui::{prelude::*, widgets::{Block, Borders, Paragraph}};

/// Renders the input box widget, titled with the plan the scan will run under.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::raw("Target URL "),
        Span::styled(format!("[plan: {}]", app.plan), Style::new().bold().fg(Color::Cyan)),
    ]);
    let input_block = Block::default().borders(Borders::ALL).title(title);
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    // Show the cursor only when in the Idle state.
    if let AppState::Idle = app.state {
        frame.set_cursor_position((area.x + app.input.chars().count() as u16 + 1, area.y + 1));
    }
}
