// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::{self, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", *PROJECT_NAME);
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "bastion", env!("CARGO_PKG_NAME"))
}

/// Where the log file and JSON exports are written.
pub fn get_data_dir() -> PathBuf {
    match project_directory() {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => PathBuf::from(".").join(".data"),
    }
}

/// `RUST_LOG` wins over `BASTION_SCANNER_LOGLEVEL`; the default logs this crate at info.
fn filter_directive<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("RUST_LOG")
        .or_else(|| lookup(LOG_ENV.as_str()))
        .unwrap_or_else(|| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Initializes file-based logging using the tracing subscriber.
pub fn initialize_logging() -> Result<PathBuf> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.as_str());
    let log_file = std::fs::File::create(&log_path)?;

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_timer(LocalTime::new(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_filter(EnvFilter::new(filter_directive(|key| std::env::var(key).ok())));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_names_derive_from_crate() {
        assert_eq!(LOG_ENV.as_str(), "BASTION_SCANNER_LOGLEVEL");
        assert_eq!(LOG_FILE.as_str(), "bastion-scanner.log");
    }

    #[test]
    fn rust_log_takes_precedence() {
        let both = |key: &str| match key {
            "RUST_LOG" => Some("debug".to_string()),
            _ => Some("warn".to_string()),
        };
        assert_eq!(filter_directive(both), "debug");
        let crate_only = |key: &str| (key == "BASTION_SCANNER_LOGLEVEL").then(|| "trace".to_string());
        assert_eq!(filter_directive(crate_only), "trace");
        assert_eq!(filter_directive(|_| None), "bastion_scanner=info");
    }
}
