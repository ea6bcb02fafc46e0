// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use bastion_scanner::core::models::{Grade, ScanResult, Severity};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

/// Renders the summary widget: score and grade, check counts, vulnerabilities
/// by severity and the detected stack. Empty until a scan has finished.
///
/// # Arguments
/// * `frame` - The `Frame` used for rendering the UI.
/// * `app` - A reference to the application's state, containing all scan data.
/// * `area` - The `Rect` defining the drawable area for this widget.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Score & grade
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(6), // Check counts
            Constraint::Length(6), // Vulnerabilities
            Constraint::Min(0),    // Server & technologies
        ])
        .split(area);

    if !matches!(app.state, AppState::Finished) {
        return;
    }
    let Some(result) = &app.scan_result else {
        if let Some(error) = &app.scan_error {
            let text = Text::from(vec![
                Line::from("Scan failed".bold().fg(Color::Red)),
                Line::from(""),
                Line::from(error.as_str()),
            ]);
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), summary_chunks[0].union(summary_chunks[5]));
        }
        return;
    };

    // --- Score & Grade ---
    let grade_color = grade_color(result.grade);
    let score_text = Text::from(vec![
        Line::from("Overall Score".bold()),
        Line::from(format!("{}/100  Grade {}", result.score, result.grade)).style(Style::default().fg(grade_color)),
    ]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);

    let score_gauge = Gauge::default()
        .percent(u16::from(result.score))
        .label("")
        .style(Style::default().fg(grade_color));
    frame.render_widget(score_gauge, summary_chunks[1]);

    // --- Check counts ---
    let s = result.summary;
    let counts = vec![
        count_line("Passed", s.passed, Color::Green),
        count_line("Warnings", s.warnings, Color::Yellow),
        count_line("Failed", s.failed, Color::Red),
        count_line("Errors", s.errors, Color::DarkGray),
    ];
    let counts_block = Block::default().title(format!("CHECKS ({})", s.total).bold());
    frame.render_widget(Paragraph::new(counts).block(counts_block), summary_chunks[3]);

    // --- Vulnerabilities ---
    let vuln_lines: Vec<Line> = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        .into_iter()
        .map(|severity| {
            let n = result.vulnerabilities.iter().filter(|v| v.severity == severity).count();
            count_line(&severity.to_string(), n, severity_color(severity))
        })
        .collect();
    let vuln_block = Block::default().title("VULNERABILITIES".bold());
    frame.render_widget(Paragraph::new(vuln_lines).block(vuln_block), summary_chunks[4]);

    // --- Server & Technologies ---
    let tech_block = Block::default().title("SERVER & TECHNOLOGIES".bold());
    frame.render_widget(
        Paragraph::new(stack_lines(result)).block(tech_block).wrap(Wrap { trim: true }),
        summary_chunks[5],
    );
}

fn count_line(label: &str, n: usize, color: Color) -> Line<'static> {
    Line::from(vec![Span::raw(format!("{label}: ")), Span::styled(n.to_string(), Style::default().fg(color))])
}

fn stack_lines(result: &ScanResult) -> Vec<Line<'static>> {
    let info = &result.server_info;
    let mut lines = Vec::new();
    for (label, value) in [
        ("Server", &info.server),
        ("Powered by", &info.powered_by),
        ("CDN", &info.cdn),
        ("WAF", &info.waf),
    ] {
        if let Some(value) = value {
            lines.push(Line::from(vec![Span::raw(format!("{label}: ")), Span::styled(value.clone(), Style::default().fg(Color::Cyan))]));
        }
    }
    if !info.ip_addresses.is_empty() {
        lines.push(Line::from(format!("IP: {}", info.ip_addresses.join(", "))));
    }
    for tech in &info.technologies {
        let name = match &tech.version {
            Some(version) => format!("{} {version}", tech.name),
            None => tech.name.clone(),
        };
        lines.push(Line::from(vec![
            Span::raw("- "),
            Span::styled(name, Style::default().fg(Color::Cyan)),
            Span::styled(format!(" ({})", tech.category), Style::default().fg(Color::DarkGray)),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("Not identified."));
    }
    lines
}

fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::APlus | Grade::A => Color::Green,
        Grade::B => Color::Cyan,
        Grade::C | Grade::D => Color::Yellow,
        Grade::F => Color::Red,
    }
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::LightRed,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Cyan,
        Severity::Info => Color::DarkGray,
    }
}
