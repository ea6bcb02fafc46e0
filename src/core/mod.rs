// src/core/mod.rs

// The engine: everything here is usable without the terminal front-end.

/// Turns scan sub-results into the ordered, plan-gated check list.
pub mod checks;
/// Timeouts, limits and scoring policy, with environment overrides.
pub mod config;
pub mod error;
/// The static catalog of every check: names, gates, weights and remediation.
pub mod knowledge_base;
/// Data structures shared by the scanner, the checks and the UI.
pub mod models;
pub mod sanitizer;
/// Network probes and the orchestrator that sequences them.
pub mod scanner;
pub mod scoring;
pub mod service;
pub mod validation;

#[cfg(test)]
mod test_support;
