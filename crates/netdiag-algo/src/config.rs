//! Diagnosis configuration.
//!
//! Stored as TOML with one section per stage. Every field has a default, so
//! partial files are fine:
//!
//! ```toml
//! [balance]
//! slack_marginal_cost = 5000.0
//!
//! [flow]
//! at_risk = 0.8
//! sample_cap = 168
//! ```

use netdiag_core::{NetdiagError, NetdiagResult};
use netdiag_io::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub loader: LoaderConfig,
    pub balance: BalanceConfig,
    pub flow: FlowConfig,
}

/// How slack (fallback) generators are recognized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Generators at or above this marginal cost are slack
    pub slack_marginal_cost: f64,
    /// Case-insensitive substrings of a generator's name or carrier label
    pub slack_markers: Vec<String>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            slack_marginal_cost: 10_000.0,
            slack_markers: vec![
                "slack".to_string(),
                "load shedding".to_string(),
                "load_shedding".to_string(),
            ],
        }
    }
}

/// Utilization bands and observed-flow sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Utilization from which a connection is at risk
    pub at_risk: f64,
    /// Utilization above which a connection is an infeasibility risk
    pub infeasible: f64,
    /// Analyse at most this many leading timestamps of an observed series
    pub sample_cap: Option<usize>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            at_risk: 0.7,
            infeasible: 1.0,
            sample_cap: None,
        }
    }
}

impl DiagnosisConfig {
    pub fn from_toml_str(contents: &str) -> NetdiagResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| NetdiagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> NetdiagResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> NetdiagResult<()> {
        let flow = &self.flow;
        if !(flow.at_risk > 0.0 && flow.at_risk.is_finite()) {
            return Err(NetdiagError::Config(format!(
                "flow.at_risk must be a positive number, got {}",
                flow.at_risk
            )));
        }
        if !(flow.infeasible >= flow.at_risk && flow.infeasible.is_finite()) {
            return Err(NetdiagError::Config(format!(
                "flow.infeasible ({}) must not be below flow.at_risk ({})",
                flow.infeasible, flow.at_risk
            )));
        }
        if flow.sample_cap == Some(0) {
            return Err(NetdiagError::Config(
                "flow.sample_cap must be at least 1".to_string(),
            ));
        }
        if self.loader.region_separators.is_empty() {
            return Err(NetdiagError::Config(
                "loader.region_separators must not be empty".to_string(),
            ));
        }
        if self.balance.slack_marginal_cost.is_nan() {
            return Err(NetdiagError::Config(
                "balance.slack_marginal_cost must be a number".to_string(),
            ));
        }
        Ok(())
    }
}
