use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netdiag", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diagnose why a network snapshot could be infeasible
    Diagnose(DiagnoseArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct DiagnoseArgs {
    /// Directory holding buses.csv, generators.csv, loads.csv, lines.csv,
    /// links.csv and stores.csv
    #[arg(value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,

    /// Observed per-edge flows (defaults to <DIR>/flows.csv when present)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub flows: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Analyse at most this many timestamps of the flow series
    #[arg(long)]
    pub sample_cap: Option<usize>,

    /// Utilization at which a connection becomes at-risk
    #[arg(long)]
    pub at_risk: Option<f64>,

    /// Utilization above which a connection is an infeasible risk
    #[arg(long)]
    pub infeasible: Option<f64>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_diagnose_flags() {
        let cli = Cli::try_parse_from([
            "netdiag",
            "--log-level",
            "debug",
            "diagnose",
            "data/eu",
            "--sample-cap",
            "24",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Some(Commands::Diagnose(args)) = cli.command else {
            panic!("expected diagnose");
        };
        assert_eq!(args.dir, PathBuf::from("data/eu"));
        assert_eq!(args.sample_cap, Some(24));
        assert_eq!(args.format, ReportFormat::Json);
        assert!(args.flows.is_none());
    }
}
