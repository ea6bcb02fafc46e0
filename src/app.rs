// src/app.rs

use bastion_scanner::core::models::{Check, PlanTier, ScanResult};
use color_eyre::eyre::{Result, WrapErr};
use ratatui::widgets::ListState;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub plan: PlanTier,
    pub scan_result: Option<ScanResult>,
    pub scan_error: Option<String>,
    pub analysis_list_state: ListState,
    pub spinner_frame: usize,
    pub export_status: ExportStatus,
    pub cancel: Option<CancellationToken>,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Idle,
            input: String::new(),
            plan: PlanTier::Free,
            scan_result: None,
            scan_error: None,
            analysis_list_state: ListState::default(),
            spinner_frame: 0,
            export_status: ExportStatus::Idle,
            cancel: None,
        }
    }

    /// Free, Pro, Business, Enterprise, then back to Free.
    pub fn cycle_plan(&mut self) {
        let plans: Vec<PlanTier> = PlanTier::iter().collect();
        let current = plans.iter().position(|p| *p == self.plan).unwrap_or(0);
        self.plan = plans[(current + 1) % plans.len()];
    }

    /// Marks the scan as running and hands back the token that cancels it.
    pub fn start_scan(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        self.state = AppState::Scanning;
        self.scan_error = None;
        self.cancel = Some(token.clone());
        token
    }

    pub fn cancel_scan(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }

    pub fn finish_scan(&mut self, outcome: Result<ScanResult, String>) {
        self.cancel = None;
        self.state = AppState::Finished;
        match outcome {
            Ok(result) => {
                let empty = result.checks.is_empty();
                self.scan_result = Some(result);
                self.analysis_list_state.select(if empty { None } else { Some(0) });
            }
            Err(error) => {
                self.scan_result = None;
                self.scan_error = Some(error);
                self.analysis_list_state.select(None);
            }
        }
    }

    /// Checks of the current result, grouped by category.
    pub fn grouped_checks(&self) -> Vec<&Check> {
        self.scan_result.as_ref().map(|r| group_by_category(&r.checks)).unwrap_or_default()
    }

    pub fn selected_check(&self) -> Option<&Check> {
        let index = self.analysis_list_state.selected()?;
        self.grouped_checks().get(index).copied()
    }

    pub fn select_next(&mut self) {
        let len = self.grouped_checks().len();
        if len == 0 {
            return;
        }
        let next = self.analysis_list_state.selected().map_or(0, |i| (i + 1) % len);
        self.analysis_list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        let len = self.grouped_checks().len();
        if len == 0 {
            return;
        }
        let previous = self.analysis_list_state.selected().map_or(0, |i| (i + len - 1) % len);
        self.analysis_list_state.select(Some(previous));
    }

    /// Writes the current result as pretty JSON into `directory`.
    pub fn export_json(&mut self, directory: &Path) {
        self.export_status = match self.scan_result.as_ref().map(|r| write_export(r, directory)) {
            Some(Ok(path)) => ExportStatus::Success(path.display().to_string()),
            Some(Err(e)) => ExportStatus::Error(format!("{e:#}")),
            None => ExportStatus::Error("No scan result to export".to_string()),
        };
    }

    pub fn on_tick(&mut self) {
        if let AppState::Scanning = self.state {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.cancel_scan();
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.scan_result = None;
        self.scan_error = None;
        self.analysis_list_state = ListState::default();
        self.export_status = ExportStatus::Idle;
    }
}

/// Stable sort by category, so the catalog order survives inside each group.
fn group_by_category(checks: &[Check]) -> Vec<&Check> {
    let mut grouped: Vec<&Check> = checks.iter().collect();
    grouped.sort_by_key(|c| c.category);
    grouped
}

fn write_export(result: &ScanResult, directory: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(directory).wrap_err("Failed to create export directory")?;
    let host = url::Url::parse(&result.url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.replace(':', "_")))
        .unwrap_or_else(|| "scan".to_string());
    let path = directory.join(format!("{host}-{}.json", result.timestamp.format("%Y%m%dT%H%M%SZ")));
    let json = serde_json::to_string_pretty(result).wrap_err("Failed to serialize scan result")?;
    std::fs::write(&path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
