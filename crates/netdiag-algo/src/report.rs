//! Bottleneck report: every finding of the pipeline, ranked.
//!
//! Entry order is total and stable across runs:
//!
//! 1. starved buses, by bus id
//! 2. infeasible-risk connections, by utilization (highest first), then key
//! 3. at-risk connections, same order
//! 4. deficient (region, carrier) pairs
//! 5. dangling references
//! 6. consistency issues (carrier mismatch, efficiency, negative capacity)
//! 7. orphaned buses

use crate::balance::RegionalBalance;
use crate::config::FlowConfig;
use crate::transmission::{
    import_capacity, Caveat, Classification, Connection, ConnectionAssessment, ConnectionKey,
};
use crate::validate::{IssueKind, Validation, ValidationIssue};
use netdiag_core::{Carrier, MegawattHours, Megawatts, RegionCode};
use serde::Serialize;
use std::collections::BTreeSet;

/// A (region, carrier) whose demand exceeds its own generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deficiency {
    pub region: RegionCode,
    pub carrier: Carrier,
    pub deficit: Megawatts,
    pub generation: Megawatts,
    pub slack_generation: Megawatts,
    pub demand: Megawatts,
    /// Cross-region capacity arriving at this region and carrier
    pub import_capacity: Megawatts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", content = "detail", rename_all = "snake_case")]
pub enum ReportEntry {
    StarvedNode(ValidationIssue),
    Bottleneck(ConnectionAssessment),
    Deficiency(Deficiency),
    Referential(ValidationIssue),
    Consistency(ValidationIssue),
    OrphanedNode(ValidationIssue),
}

impl ReportEntry {
    pub fn label(&self) -> &'static str {
        match self {
            ReportEntry::StarvedNode(_) => "starved",
            ReportEntry::Bottleneck(a) => a.classification.as_str(),
            ReportEntry::Deficiency(_) => "deficiency",
            ReportEntry::Referential(_) => "referential",
            ReportEntry::Consistency(_) => "consistency",
            ReportEntry::OrphanedNode(_) => "orphaned",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            ReportEntry::StarvedNode(issue)
            | ReportEntry::Referential(issue)
            | ReportEntry::Consistency(issue)
            | ReportEntry::OrphanedNode(issue) => issue.subject().to_string(),
            ReportEntry::Bottleneck(a) => a.key.to_string(),
            ReportEntry::Deficiency(d) => format!("{} {}", d.region, d.carrier),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ReportEntry::StarvedNode(issue)
            | ReportEntry::Referential(issue)
            | ReportEntry::Consistency(issue)
            | ReportEntry::OrphanedNode(issue) => issue.message(),
            ReportEntry::Bottleneck(a) => {
                let utilization = if a.utilization.is_finite() {
                    format!("{:.1}%", a.utilization * 100.0)
                } else {
                    "unbounded".to_string()
                };
                let capacity = match &a.binding_carrier {
                    Some(carrier) => format!(
                        "{} of {carrier} capacity ({} total, ",
                        a.binding_capacity, a.capacity
                    ),
                    None => format!("{} of capacity (", a.capacity),
                };
                format!(
                    "needs {} against {capacity}{utilization} utilization, {} net flow {})",
                    a.required_flow,
                    a.source.as_str(),
                    a.net_flow
                )
            }
            ReportEntry::Deficiency(d) => format!(
                "short by {} (generation {}, demand {}, import capacity {})",
                d.deficit, d.generation, d.demand, d.import_capacity
            ),
        }
    }
}

/// System-wide totals and counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSummary {
    pub total_generation: Megawatts,
    pub slack_generation: Megawatts,
    pub total_demand: Megawatts,
    pub store_energy: MegawattHours,
    /// Sum of the regional nets
    pub net: Megawatts,
    pub regions: usize,
    pub deficient_pairs: usize,
    pub connections: usize,
    pub infeasible_risk: usize,
    pub at_risk: usize,
    pub starved_nodes: usize,
    pub orphaned_nodes: usize,
    pub referential_issues: usize,
    pub consistency_issues: usize,
    pub islands: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub at_risk: f64,
    pub infeasible: f64,
}

/// Capacity a connection would need before the solver is worth running
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaxationHint {
    pub key: ConnectionKey,
    /// Capacity of the binding carrier side or channel
    pub capacity: Megawatts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<Carrier>,
    pub required_flow: Megawatts,
    /// Capacity at which utilization drops to the at-risk threshold
    pub target_capacity: Megawatts,
    pub additional_capacity: Megawatts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub summary: SystemSummary,
    pub thresholds: Thresholds,
    pub entries: Vec<ReportEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
}

impl DiagnosticReport {
    /// Assemble the ranked report from the stage outputs.
    pub fn build(
        validation: &Validation,
        balances: &[RegionalBalance],
        connections: &[Connection],
        assessments: &[ConnectionAssessment],
        config: &FlowConfig,
    ) -> Self {
        let mut entries = Vec::new();

        entries.extend(
            validation
                .of_kind(IssueKind::StarvedNode)
                .cloned()
                .map(ReportEntry::StarvedNode),
        );

        for band in [Classification::InfeasibleRisk, Classification::AtRisk] {
            let mut ranked: Vec<&ConnectionAssessment> = assessments
                .iter()
                .filter(|a| a.classification == band)
                .collect();
            ranked.sort_by(|a, b| {
                b.utilization
                    .total_cmp(&a.utilization)
                    .then_with(|| a.key.cmp(&b.key))
            });
            entries.extend(ranked.into_iter().cloned().map(ReportEntry::Bottleneck));
        }

        entries.extend(balances.iter().filter(|b| b.deficient).map(|b| {
            ReportEntry::Deficiency(Deficiency {
                region: b.region.clone(),
                carrier: b.carrier.clone(),
                deficit: b.deficit(),
                generation: b.generation,
                slack_generation: b.slack_generation,
                demand: b.demand,
                import_capacity: import_capacity(connections, &b.region, &b.carrier),
            })
        }));

        entries.extend(
            validation
                .of_kind(IssueKind::DanglingReference)
                .cloned()
                .map(ReportEntry::Referential),
        );
        entries.extend(
            validation
                .issues
                .iter()
                .filter(|i| {
                    matches!(
                        i.kind(),
                        IssueKind::CarrierMismatch
                            | IssueKind::InvalidEfficiency
                            | IssueKind::NegativeCapacity
                    )
                })
                .cloned()
                .map(ReportEntry::Consistency),
        );
        entries.extend(
            validation
                .of_kind(IssueKind::OrphanedNode)
                .cloned()
                .map(ReportEntry::OrphanedNode),
        );

        let regions: BTreeSet<&RegionCode> = balances.iter().map(|b| &b.region).collect();
        let summary = SystemSummary {
            total_generation: balances.iter().map(|b| b.generation).sum(),
            slack_generation: balances.iter().map(|b| b.slack_generation).sum(),
            total_demand: balances.iter().map(|b| b.demand).sum(),
            store_energy: balances.iter().map(|b| b.store_energy).sum(),
            net: balances.iter().map(|b| b.net).sum(),
            regions: regions.len(),
            deficient_pairs: balances.iter().filter(|b| b.deficient).count(),
            connections: assessments.len(),
            infeasible_risk: count_band(assessments, Classification::InfeasibleRisk),
            at_risk: count_band(assessments, Classification::AtRisk),
            starved_nodes: validation.count(IssueKind::StarvedNode),
            orphaned_nodes: validation.count(IssueKind::OrphanedNode),
            referential_issues: validation.count(IssueKind::DanglingReference),
            consistency_issues: validation.count(IssueKind::CarrierMismatch)
                + validation.count(IssueKind::InvalidEfficiency)
                + validation.count(IssueKind::NegativeCapacity),
            islands: validation.islands,
        };

        let mut caveats = BTreeSet::new();
        for caveat in assessments.iter().flat_map(|a| &a.caveats) {
            match caveat {
                Caveat::SampleCapped { .. } => {
                    caveats.insert(format!("observed flows {caveat}"));
                }
                Caveat::PartialCoverage { .. } => {
                    caveats.insert(
                        "some connections are only partially covered by observed flows"
                            .to_string(),
                    );
                }
            }
        }
        if summary.regions > 1 && summary.connections == 0 {
            caveats.insert("no cross-region connections found".to_string());
        }

        Self {
            summary,
            thresholds: Thresholds {
                at_risk: config.at_risk,
                infeasible: config.infeasible,
            },
            entries,
            caveats: caveats.into_iter().collect(),
        }
    }

    /// Append a caveat, keeping the list sorted and free of duplicates.
    pub fn add_caveat(&mut self, caveat: impl Into<String>) {
        let caveat = caveat.into();
        if let Err(pos) = self.caveats.binary_search(&caveat) {
            self.caveats.insert(pos, caveat);
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bottlenecks(&self) -> impl Iterator<Item = &ConnectionAssessment> {
        self.entries.iter().filter_map(|e| match e {
            ReportEntry::Bottleneck(a) => Some(a),
            _ => None,
        })
    }

    /// For every infeasible-risk connection, the extra capacity on its
    /// binding carrier that would bring utilization down to the at-risk
    /// threshold.
    pub fn relaxation_hints(&self) -> Vec<RelaxationHint> {
        self.bottlenecks()
            .filter(|a| a.classification == Classification::InfeasibleRisk)
            .map(|a| {
                let target = a.required_flow / self.thresholds.at_risk;
                let additional = if a.binding_capacity.value() > 0.0 {
                    target - a.binding_capacity
                } else {
                    target
                };
                RelaxationHint {
                    key: a.key.clone(),
                    capacity: a.binding_capacity,
                    carrier: a.binding_carrier.clone(),
                    required_flow: a.required_flow,
                    target_capacity: target,
                    additional_capacity: additional,
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn count_band(assessments: &[ConnectionAssessment], band: Classification) -> usize {
    assessments
        .iter()
        .filter(|a| a.classification == band)
        .count()
}
