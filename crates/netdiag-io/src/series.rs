//! Observed flow time series.
//!
//! Wide format: the first column is the timestamp, every other column holds
//! the flow of one line or link (positive from `bus0` to `bus1`).

use crate::loader::{read_series_columns, series_headers};
use crate::table::{Table, TableView};
use netdiag_core::{LoadDiagnostics, LoadIssueKind, Megawatts, Network};
use std::collections::BTreeMap;
use tracing::debug;

/// Collection name used in diagnostics for the flow table
pub const FLOWS: &str = "flows";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSeries {
    timestamps: Vec<String>,
    flows: BTreeMap<String, Vec<Megawatts>>,
}

impl FlowSeries {
    pub fn new<S: Into<String>>(timestamps: impl IntoIterator<Item = S>) -> Self {
        Self {
            timestamps: timestamps.into_iter().map(Into::into).collect(),
            flows: BTreeMap::new(),
        }
    }

    /// Add an edge column. Values beyond the timestamp count are dropped,
    /// missing ones are NaN.
    pub fn with_edge(mut self, edge: impl Into<String>, values: &[f64]) -> Self {
        let mut column: Vec<Megawatts> = values.iter().copied().map(Megawatts).collect();
        column.resize(self.timestamps.len(), Megawatts(f64::NAN));
        self.flows.insert(edge.into(), column);
        self
    }

    /// Read a flow table. Columns that name neither a line nor a link of
    /// `network` are kept but reported.
    pub fn from_table(table: &Table, network: &Network, diag: &mut LoadDiagnostics) -> Self {
        let view = TableView::new(FLOWS, table);
        let timestamps = (0..view.len())
            .map(|row| {
                view.columns()
                    .first()
                    .and_then(|ts| view.get(row, ts.trim()))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();

        for edge in series_headers(&view) {
            if network.line(edge).is_none() && network.link(edge).is_none() {
                diag.add_warning_with_entity(
                    LoadIssueKind::UnknownSeriesColumn,
                    FLOWS,
                    "flow column does not match any line or link",
                    edge,
                );
            }
        }

        let flows = read_series_columns(&view, diag);
        debug!(
            timestamps = view.len(),
            edges = flows.len(),
            "observed flows read"
        );
        Self { timestamps, flows }
    }

    /// Number of timestamps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[String] {
        &self.timestamps
    }

    pub fn get(&self, edge: &str) -> Option<&[Megawatts]> {
        self.flows.get(edge).map(Vec::as_slice)
    }

    pub fn contains(&self, edge: &str) -> bool {
        self.flows.contains_key(edge)
    }

    pub fn edges(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }
}
