//! # netdiag-algo: Feasibility diagnosis for multi-carrier networks
//!
//! Answers, before any optimization model is built, whether a network
//! snapshot can possibly be feasible:
//!
//! 1. **Validation** ([`validate`]): dangling references, buses with demand
//!    that no generator or store can reach, orphaned buses, and consistency
//!    checks on carriers, efficiencies and capacities
//! 2. **Balance** ([`balance`]): generation, demand and storage per
//!    (region, carrier), with slack generators kept apart
//! 3. **Transmission** ([`transmission`]): cross-region connections, the flow
//!    each must carry (static worst case or observed peak) and its
//!    utilization band
//! 4. **Report** ([`report`]): every finding ranked in one
//!    [`DiagnosticReport`]
//!
//! ## Example
//!
//! ```rust
//! use netdiag_algo::{diagnose, DiagnosisConfig};
//! use netdiag_core::*;
//!
//! let mut b = Network::builder();
//! b.add_bus(Bus::new("A 1", Carrier::Electricity, RegionCode::new("A")));
//! b.add_bus(Bus::new("B 1", Carrier::Electricity, RegionCode::new("B")));
//! b.add_generator(Generator::new("A gen", "A 1").with_p_nom(100.0));
//! b.add_generator(Generator::new("B gen", "B 1").with_p_nom(200.0));
//! b.add_load(Load::fixed("A load", "A 1", 150.0));
//! b.add_load(Load::fixed("B load", "B 1", 50.0));
//! b.add_line(Line::new("A-B", "A 1", "B 1").with_s_nom(40.0));
//!
//! let diagnosis = diagnose(&b.build(), None, &DiagnosisConfig::default()).unwrap();
//! let hints = diagnosis.report.relaxation_hints();
//! assert_eq!(hints[0].key.to_string(), "A-B");
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): assess connections with rayon

pub mod balance;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod transmission;
pub mod validate;

pub use balance::{aggregate, RegionalBalance};
pub use config::{BalanceConfig, DiagnosisConfig, FlowConfig};
pub use pipeline::{diagnose, Diagnosis};
pub use report::{DiagnosticReport, RelaxationHint, ReportEntry, SystemSummary};
pub use transmission::{
    assess, Caveat, Classification, Connection, ConnectionAssessment, ConnectionKey, FlowSource,
};
pub use validate::{validate, IssueKind, Validation, ValidationIssue};
