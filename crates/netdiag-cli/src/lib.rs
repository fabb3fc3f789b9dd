pub mod cli;
pub mod render;

pub use cli::{build_cli_command, Cli, Commands, DiagnoseArgs, ReportFormat};
