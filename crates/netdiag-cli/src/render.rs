//! Report rendering for the terminal and for machines.

use netdiag_algo::DiagnosticReport;
use std::io::{self, Write};
use tabwriter::TabWriter;

/// Ranked findings as aligned columns, followed by relaxation hints and
/// caveats when there are any.
pub fn write_text<W: Write>(report: &DiagnosticReport, out: W) -> io::Result<()> {
    let mut writer = TabWriter::new(out).padding(2);
    let s = &report.summary;

    writeln!(
        writer,
        "{} region(s), {} connection(s), {} island(s)",
        s.regions, s.connections, s.islands
    )?;
    writeln!(
        writer,
        "generation {} (slack {}), demand {}, net {}, storage {}",
        s.total_generation, s.slack_generation, s.total_demand, s.net, s.store_energy
    )?;
    writeln!(
        writer,
        "thresholds: at-risk from {:.0}%, infeasible-risk above {:.0}%",
        report.thresholds.at_risk * 100.0,
        report.thresholds.infeasible * 100.0
    )?;
    writeln!(writer)?;

    if report.is_healthy() {
        writeln!(writer, "No findings.")?;
    } else {
        writeln!(writer, "RANK\tCATEGORY\tSUBJECT\tDETAIL")?;
        for (rank, entry) in report.entries.iter().enumerate() {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                rank + 1,
                entry.label(),
                entry.subject(),
                entry.message()
            )?;
        }
    }

    let hints = report.relaxation_hints();
    if !hints.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "CONNECTION\tCARRIER\tCAPACITY\tREQUIRED\tTARGET\tADDITIONAL")?;
        for hint in &hints {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                hint.key,
                hint.carrier.as_ref().map_or("-", |c| c.as_str()),
                hint.capacity,
                hint.required_flow,
                hint.target_capacity,
                hint.additional_capacity
            )?;
        }
    }

    if !report.caveats.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Caveats:")?;
        for caveat in &report.caveats {
            writeln!(writer, "  - {caveat}")?;
        }
    }
    writer.flush()
}

/// Pretty JSON with a trailing newline
pub fn write_json<W: Write>(report: &DiagnosticReport, mut out: W) -> io::Result<()> {
    let json = report.to_json().map_err(io::Error::from)?;
    writeln!(out, "{json}")?;
    out.flush()
}
