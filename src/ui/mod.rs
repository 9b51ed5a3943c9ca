// src/ui/mod.rs
mod progress;
mod table;

pub use progress::ProgressTracker;
pub use table::{render_json, render_table, DUE_FORMAT};
