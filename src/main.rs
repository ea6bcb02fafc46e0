// src/main.rs

use bastion_scanner::core::config::ScanConfig;
use bastion_scanner::core::models::{ScanRequest, ScanResult};
use bastion_scanner::core::scanner::run_full_scan;
use bastion_scanner::logging;
use color_eyre::eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

mod app;
mod ui;

use app::{App, AppState};

type ScanOutcome = std::result::Result<ScanResult, String>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = logging::initialize_logging()?;
    let config = ScanConfig::from_env();
    info!(log = %log_path.display(), "Starting bastion-scanner.");

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let outcome = run(&mut terminal, config).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

async fn run(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, config: ScanConfig) -> Result<()> {
    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<ScanOutcome>(1);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, &tx, &config)?;
        }

        if let Ok(outcome) = rx.try_recv() {
            app.finish_scan(outcome);
        }
        app.on_tick();
    }
    Ok(())
}

fn handle_events(app: &mut App, tx: &mpsc::Sender<ScanOutcome>, config: &ScanConfig) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Idle => handle_idle_input(app, key.code, tx, config),
                AppState::Finished => handle_finished_input(app, key.code),
                AppState::Scanning => {
                    if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                        app.cancel_scan();
                    }
                }
            }
        }
    }
    Ok(())
}

/// Typing edits the target; Tab changes the plan the scan runs under.
fn handle_idle_input(app: &mut App, key_code: KeyCode, tx: &mpsc::Sender<ScanOutcome>, config: &ScanConfig) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Tab => app.cycle_plan(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                return;
            }
            let request = ScanRequest::new(app.input.trim(), app.plan);
            let cancel = app.start_scan();
            let tx = tx.clone();
            let config = config.clone();
            tokio::spawn(async move {
                let outcome = run_full_scan(request, &config, cancel).await.map_err(|e| e.to_string());
                let _ = tx.send(outcome).await;
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('e') => app.export_json(&logging::get_data_dir().join("exports")),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        _ => {}
    }
}
