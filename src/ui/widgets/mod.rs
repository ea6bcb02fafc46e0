// src/ui/widgets/mod.rs

pub mod analysis_view; // Checks grouped by category, with the selected check's details.
pub mod footer; // Key hints for the current state.
pub mod input; // Target URL and plan selector.
pub mod summary; // Score, grade, counts and detected stack.
