use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use netdiag_algo::{diagnose, DiagnosisConfig, DiagnosticReport};
use netdiag_cli::cli::{DiagnoseArgs, ReportFormat};
use netdiag_cli::render::{write_json, write_text};
use netdiag_io::{load_network, read_flow_series, read_table_dir, series::FLOWS, LoadResult};
use tracing::{info, warn};

pub fn handle(args: &DiagnoseArgs) -> Result<()> {
    let config = resolve_config(args)?;

    let tables = read_table_dir(&args.dir)
        .with_context(|| format!("reading network tables from {}", args.dir.display()))?;
    let LoadResult {
        network,
        mut diagnostics,
    } = load_network(&tables, &config.loader)
        .with_context(|| format!("loading network from {}", args.dir.display()))?;
    info!("{}", diagnostics.summary());
    info!("{}", network.stats());

    let flows = match flows_path(args) {
        Some(path) => {
            info!("reading observed flows from {}", path.display());
            let series = read_flow_series(&path, &network, &mut diagnostics)
                .with_context(|| format!("reading flows from {}", path.display()))?;
            Some(series)
        }
        None => None,
    };

    let mut report = diagnose(&network, flows.as_ref(), &config)?.report;
    for issue in &diagnostics.issues {
        warn!("{issue}");
        report.add_caveat(format!("input {issue}"));
    }

    match &args.out {
        Some(path) => {
            write_report(&report, args.format, create_output(path)?)?;
            info!("wrote report to {}", path.display());
        }
        None => write_report(&report, args.format, io::stdout().lock())?,
    }
    Ok(())
}

/// File configuration first, then command-line overrides.
fn resolve_config(args: &DiagnoseArgs) -> Result<DiagnosisConfig> {
    let mut config = match &args.config {
        Some(path) => DiagnosisConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DiagnosisConfig::default(),
    };
    if let Some(cap) = args.sample_cap {
        config.flow.sample_cap = Some(cap);
    }
    if let Some(at_risk) = args.at_risk {
        config.flow.at_risk = at_risk;
    }
    if let Some(infeasible) = args.infeasible {
        config.flow.infeasible = infeasible;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn flows_path(args: &DiagnoseArgs) -> Option<PathBuf> {
    if let Some(path) = &args.flows {
        return Some(path.clone());
    }
    let default = args.dir.join(format!("{FLOWS}.csv"));
    default.is_file().then_some(default)
}

fn create_output(path: &Path) -> Result<BufWriter<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_report<W: io::Write>(
    report: &DiagnosticReport,
    format: ReportFormat,
    out: W,
) -> Result<()> {
    match format {
        ReportFormat::Text => write_text(report, out),
        ReportFormat::Json => write_json(report, out),
    }
    .context("writing report")
}
