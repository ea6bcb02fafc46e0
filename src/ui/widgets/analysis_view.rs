// src/ui/widgets/analysis_view.rs

use super::summary::severity_color;
use crate::app::{App, AppState, SPINNER_CHARS};
use bastion_scanner::core::knowledge_base;
use bastion_scanner::core::models::{Check, CheckStatus};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

/// Longest `details` JSON shown in the detail pane.
const DETAILS_PREVIEW: usize = 600;

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Checks (Navigate with ↑ ↓)");

    if !matches!(app.state, AppState::Finished) || app.scan_result.is_none() {
        let content = match app.state {
            AppState::Idle => Paragraph::new("Enter a URL and press Enter. Results will appear here...")
                .alignment(Alignment::Center),
            AppState::Scanning => Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", SPINNER_CHARS[app.spinner_frame]), Style::default().fg(Color::Cyan)),
                Span::raw(format!("Scanning on the {} plan... Please wait.", app.plan)),
            ]))
            .alignment(Alignment::Center),
            AppState::Finished => Paragraph::new("No result.").alignment(Alignment::Center),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = app.grouped_checks().into_iter().map(check_item).collect();
    let checks_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(checks_list, chunks[0], &mut app.analysis_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let detail = match app.selected_check() {
        Some(check) => Paragraph::new(detail_text(check)).wrap(Wrap { trim: true }),
        None => Paragraph::new("Select a check above to see details.").alignment(Alignment::Center),
    };
    frame.render_widget(detail.block(detail_block), chunks[1]);
}

fn status_icon(status: CheckStatus) -> (&'static str, Color) {
    match status {
        CheckStatus::Passed => ("✓", Color::Green),
        CheckStatus::Warning => ("!", Color::Yellow),
        CheckStatus::Failed => ("✗", Color::Red),
        CheckStatus::Info => ("i", Color::Cyan),
        CheckStatus::Error => ("?", Color::DarkGray),
    }
}

fn check_item(check: &Check) -> ListItem<'static> {
    let (icon, color) = status_icon(check.status);
    ListItem::new(Line::from(vec![
        Span::styled(format!("{icon} "), Style::default().fg(color)),
        Span::styled(format!("[{}] ", check.category), Style::default().fg(Color::DarkGray)),
        Span::raw(check.name.clone()),
    ]))
}

fn detail_text(check: &Check) -> Text<'static> {
    let (_, color) = status_icon(check.status);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(check.status.to_string().to_uppercase(), Style::new().bold().fg(color)),
            Span::raw("  severity "),
            Span::styled(check.severity.to_string(), Style::default().fg(severity_color(check.severity))),
            Span::styled(format!("  {} / {}", check.finding_type, check.plan_gate), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(check.message.clone()),
    ];

    if !matches!(check.status, CheckStatus::Passed | CheckStatus::Info) {
        if let Some(definition) = knowledge_base::get_check_definition(&check.id) {
            lines.push(Line::from(""));
            lines.push(Line::from("HOW TO FIX:".yellow().bold()));
            lines.push(Line::from(definition.remediation));
        }
    }

    if let Some(evidence) = &check.evidence {
        lines.push(Line::from(""));
        lines.push(Line::from("EVIDENCE:".yellow().bold()));
        let (request, response) = (evidence.request(), evidence.response());
        lines.push(Line::from(format!(
            "{} {} -> {} ({})",
            request.method,
            request.url,
            response.status,
            evidence.timestamp().format("%H:%M:%S UTC")
        )));
        lines.push(Line::from(evidence.proof_of_impact().to_string()));
        for (n, step) in evidence.reproduction_steps().unwrap_or_default().iter().enumerate() {
            lines.push(Line::from(format!("{}. {step}", n + 1)));
        }
    }

    if let Some(details) = &check.details {
        let mut json = details.to_string();
        if json.len() > DETAILS_PREVIEW {
            let mut end = DETAILS_PREVIEW;
            while !json.is_char_boundary(end) {
                end -= 1;
            }
            json.truncate(end);
            json.push('…');
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(json, Style::default().fg(Color::DarkGray))));
    }

    Text::from(lines)
}
