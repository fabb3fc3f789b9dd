//! Runs the diagnostic stages in order over one snapshot.

use crate::balance::{aggregate, RegionalBalance};
use crate::config::DiagnosisConfig;
use crate::report::DiagnosticReport;
use crate::transmission::{assess_connections, connections, ConnectionAssessment};
use crate::validate::{validate, Validation};
use netdiag_core::{NetdiagResult, Network};
use netdiag_io::FlowSeries;
use tracing::info;

/// Everything a diagnostic run produces
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub validation: Validation,
    pub balances: Vec<RegionalBalance>,
    pub assessments: Vec<ConnectionAssessment>,
    pub report: DiagnosticReport,
}

/// Validate, aggregate, assess and report.
///
/// Only an invalid configuration is an error. Any snapshot, however broken,
/// yields a complete report.
pub fn diagnose(
    network: &Network,
    flows: Option<&FlowSeries>,
    config: &DiagnosisConfig,
) -> NetdiagResult<Diagnosis> {
    config.validate()?;

    let validation = validate(network);
    info!(
        issues = validation.issues.len(),
        islands = validation.islands,
        clean = validation.is_clean(),
        "validation done"
    );

    let balances = aggregate(network, &config.balance);
    info!(
        pairs = balances.len(),
        deficient = balances.iter().filter(|b| b.deficient).count(),
        "balance done"
    );

    let connections = connections(network);
    let assessments = assess_connections(&connections, &balances, flows, &config.flow);
    info!(
        connections = assessments.len(),
        observed = flows.is_some(),
        "transmission done"
    );

    let report = DiagnosticReport::build(
        &validation,
        &balances,
        &connections,
        &assessments,
        &config.flow,
    );
    info!(entries = report.entries.len(), "report ready");

    Ok(Diagnosis {
        validation,
        balances,
        assessments,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportEntry;
    use netdiag_core::{Bus, Carrier, Generator, Line, Load, RegionCode};

    #[test]
    fn test_empty_network_gives_empty_report() {
        let diagnosis = diagnose(
            &Network::builder().build(),
            None,
            &DiagnosisConfig::default(),
        )
        .unwrap();
        assert!(diagnosis.report.is_healthy());
        assert_eq!(diagnosis.report.summary.net.value(), 0.0);
        assert!(diagnosis.report.caveats.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DiagnosisConfig::default();
        config.flow.infeasible = 0.5;
        assert!(diagnose(&Network::builder().build(), None, &config).is_err());
    }

    #[test]
    fn test_deficiency_reports_import_capacity() {
        let mut b = Network::builder();
        b.add_bus(Bus::new("A 1", Carrier::Electricity, RegionCode::new("A")));
        b.add_bus(Bus::new("B 1", Carrier::Electricity, RegionCode::new("B")));
        b.add_generator(Generator::new("B gen", "B 1").with_p_nom(100.0));
        b.add_load(Load::fixed("A load", "A 1", 30.0));
        b.add_line(Line::new("ab", "A 1", "B 1").with_s_nom(60.0));

        let report = diagnose(&b.build(), None, &DiagnosisConfig::default())
            .unwrap()
            .report;
        let deficiency = report
            .entries
            .iter()
            .find_map(|e| match e {
                ReportEntry::Deficiency(d) => Some(d),
                _ => None,
            })
            .unwrap();
        assert_eq!(deficiency.import_capacity.value(), 60.0);
        assert_eq!(deficiency.deficit.value(), 30.0);
        // 30 of 60 is normal, so the connection itself is not listed
        assert_eq!(report.bottlenecks().count(), 0);
    }
}
