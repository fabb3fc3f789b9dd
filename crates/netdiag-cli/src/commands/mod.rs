pub mod completions;
pub mod diagnose;
