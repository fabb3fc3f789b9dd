//! Model loader: record collections to a typed [`Network`] snapshot.
//!
//! Missing collections or required columns are fatal schema errors and
//! nothing is built. Everything below that level is recovered: unparseable
//! numbers become NaN, unparseable booleans become `false`, duplicate rows
//! are dropped (first wins), and each recovery is logged to the returned
//! [`LoadDiagnostics`].

use crate::table::{TableSet, TableView};
use netdiag_core::{
    Bus, BusId, Carrier, Demand, Generator, Line, Link, Load, LoadDiagnostics,
    LoadIssueKind, LoadId, MegawattHours, Megawatts, NetdiagResult, Network, NetworkBuilder,
    PerUnit, RegionCode, Store,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

pub const BUSES: &str = "buses";
pub const LINES: &str = "lines";
pub const LINKS: &str = "links";
pub const GENERATORS: &str = "generators";
pub const LOADS: &str = "loads";
pub const STORES: &str = "stores";
/// Optional wide table of load demand per timestamp
pub const LOAD_SERIES: &str = "loads-p_set";

/// Collections that must be present, with their required columns
pub const REQUIRED: [(&str, &[&str]); 6] = [
    (BUSES, &["name", "carrier"]),
    (GENERATORS, &["name", "bus", "p_nom"]),
    (LOADS, &["name", "bus", "p_set"]),
    (LINES, &["name", "bus0", "bus1", "s_nom"]),
    (LINKS, &["name", "bus0", "bus1", "p_nom"]),
    (STORES, &["name", "bus", "e_nom"]),
];

/// Region code assigned when none can be derived from a bus identifier
pub const UNKNOWN_REGION: &str = "?";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Characters that end the region token of a bus identifier
    pub region_separators: Vec<char>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            region_separators: vec![' ', '_'],
        }
    }
}

/// A loaded snapshot together with what was recovered on the way
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub network: Network,
    pub diagnostics: LoadDiagnostics,
}

/// Build a snapshot from record collections.
pub fn load_network(tables: &TableSet, config: &LoaderConfig) -> NetdiagResult<LoadResult> {
    // Validate the whole schema before building anything
    let mut views = HashMap::new();
    for (name, columns) in REQUIRED {
        let view = TableView::new(name, tables.require(name)?);
        view.require_columns(columns)?;
        views.insert(name, view);
    }

    let mut diag = LoadDiagnostics::new();
    let mut builder = Network::builder();

    let series = match tables.get(LOAD_SERIES) {
        Some(table) => read_series_columns(&TableView::new(LOAD_SERIES, table), &mut diag),
        None => BTreeMap::new(),
    };

    load_buses(&views[BUSES], config, &mut builder, &mut diag);
    load_lines(&views[LINES], &mut builder, &mut diag);
    load_links(&views[LINKS], &mut builder, &mut diag);
    load_generators(&views[GENERATORS], &mut builder, &mut diag);
    let unused_series = load_loads(&views[LOADS], series, &mut builder, &mut diag);
    load_stores(&views[STORES], &mut builder, &mut diag);

    for column in unused_series {
        diag.add_warning_with_entity(
            LoadIssueKind::UnknownSeriesColumn,
            LOAD_SERIES,
            "series column does not match any load",
            &column,
        );
    }

    let network = builder.build();
    diag.stats.buses = network.buses().len();
    diag.stats.lines = network.lines().len();
    diag.stats.links = network.links().len();
    diag.stats.generators = network.generators().len();
    diag.stats.loads = network.loads().len();
    diag.stats.stores = network.stores().len();

    if diag.has_issues() {
        warn!(
            warnings = diag.warning_count(),
            errors = diag.error_count(),
            "recovered from problems while loading"
        );
    }
    info!("loaded {}", diag.summary());

    Ok(LoadResult {
        network,
        diagnostics: diag,
    })
}

fn load_buses(
    view: &TableView,
    config: &LoaderConfig,
    builder: &mut NetworkBuilder,
    diag: &mut LoadDiagnostics,
) {
    for row in 0..view.len() {
        let Some(name) = row_id(view, row, diag) else {
            continue;
        };
        let carrier = match view.get(row, "carrier") {
            Some(label) => Carrier::parse(label),
            None => {
                diag.add_coercion_warning(view.name(), row, "carrier", "");
                Carrier::Other(String::new())
            }
        };
        let region = match view.get(row, "region") {
            Some(region) => RegionCode::new(region),
            None => match RegionCode::derive(name, &config.region_separators) {
                Some(region) => region,
                None => {
                    diag.add_warning_with_entity(
                        LoadIssueKind::UnderivableRegion,
                        view.name(),
                        "no region code could be derived from the bus name",
                        name,
                    );
                    RegionCode::new(UNKNOWN_REGION)
                }
            },
        };
        if !builder.add_bus(Bus::new(name, carrier, region)) {
            diag.add_duplicate(view.name(), name);
        }
    }
    debug!(rows = view.len(), "buses read");
}

fn load_lines(view: &TableView, builder: &mut NetworkBuilder, diag: &mut LoadDiagnostics) {
    for row in 0..view.len() {
        let Some(name) = row_id(view, row, diag) else {
            continue;
        };
        let mut line = Line::new(
            name,
            view.get(row, "bus0").unwrap_or_default(),
            view.get(row, "bus1").unwrap_or_default(),
        );
        line.s_nom = Megawatts(required_f64(view, row, "s_nom", diag));
        line.resistance = PerUnit(optional_f64(view, row, "r", 0.0, diag));
        line.reactance = PerUnit(optional_f64(view, row, "x", 0.0, diag));
        line.s_nom_extendable = optional_bool(view, row, "s_nom_extendable", diag);
        if !builder.add_line(line) {
            diag.add_duplicate(view.name(), name);
        }
    }
    debug!(rows = view.len(), "lines read");
}

fn load_links(view: &TableView, builder: &mut NetworkBuilder, diag: &mut LoadDiagnostics) {
    const EXTRA_PORTS: [(&str, &str); 2] = [("bus2", "efficiency2"), ("bus3", "efficiency3")];

    for row in 0..view.len() {
        let Some(name) = row_id(view, row, diag) else {
            continue;
        };
        let mut link = Link::new(
            name,
            view.get(row, "bus0").unwrap_or_default(),
            view.get(row, "bus1").unwrap_or_default(),
        )
        .with_efficiency(optional_f64(view, row, "efficiency", 1.0, diag));
        for (bus_col, eff_col) in EXTRA_PORTS {
            if let Some(bus) = view.get(row, bus_col) {
                link = link.with_port(bus, optional_f64(view, row, eff_col, 1.0, diag));
            }
        }
        link.p_nom = Megawatts(required_f64(view, row, "p_nom", diag));
        link.p_nom_extendable = optional_bool(view, row, "p_nom_extendable", diag);
        link.lossless = optional_bool(view, row, "lossless", diag);
        if !builder.add_link(link) {
            diag.add_duplicate(view.name(), name);
        }
    }
    debug!(rows = view.len(), "links read");
}

fn load_generators(view: &TableView, builder: &mut NetworkBuilder, diag: &mut LoadDiagnostics) {
    for row in 0..view.len() {
        let Some(name) = row_id(view, row, diag) else {
            continue;
        };
        let mut gen = Generator::new(name, view.get(row, "bus").unwrap_or_default())
            .with_carrier(view.get(row, "carrier").unwrap_or_default());
        gen.p_nom = Megawatts(required_f64(view, row, "p_nom", diag));
        gen.marginal_cost = optional_f64(view, row, "marginal_cost", 0.0, diag);
        gen.p_nom_extendable = optional_bool(view, row, "p_nom_extendable", diag);
        gen.p_nom_max = view
            .get(row, "p_nom_max")
            .map(|_| Megawatts(optional_f64(view, row, "p_nom_max", f64::INFINITY, diag)));
        gen.p_min_pu = PerUnit(optional_f64(view, row, "p_min_pu", 0.0, diag));
        gen.p_max_pu = PerUnit(optional_f64(view, row, "p_max_pu", 1.0, diag));
        if !builder.add_generator(gen) {
            diag.add_duplicate(view.name(), name);
        }
    }
    debug!(rows = view.len(), "generators read");
}

/// Returns the series columns that matched no load.
fn load_loads(
    view: &TableView,
    mut series: BTreeMap<String, Vec<Megawatts>>,
    builder: &mut NetworkBuilder,
    diag: &mut LoadDiagnostics,
) -> Vec<String> {
    for row in 0..view.len() {
        let Some(name) = row_id(view, row, diag) else {
            continue;
        };
        let demand = match series.remove(name) {
            Some(values) => Demand::Series(values),
            None => Demand::Static(Megawatts(required_f64(view, row, "p_set", diag))),
        };
        let load = Load {
            id: LoadId::new(name),
            bus: BusId::new(view.get(row, "bus").unwrap_or_default()),
            demand,
        };
        if !builder.add_load(load) {
            diag.add_duplicate(view.name(), name);
        }
    }
    debug!(rows = view.len(), "loads read");
    series.into_keys().collect()
}

fn load_stores(view: &TableView, builder: &mut NetworkBuilder, diag: &mut LoadDiagnostics) {
    for row in 0..view.len() {
        let Some(name) = row_id(view, row, diag) else {
            continue;
        };
        let mut store = Store::new(name, view.get(row, "bus").unwrap_or_default(), 0.0);
        store.e_nom = MegawattHours(required_f64(view, row, "e_nom", diag));
        store.e_cyclic = optional_bool(view, row, "e_cyclic", diag);
        store.efficiency_store = PerUnit(optional_f64(view, row, "efficiency_store", 1.0, diag));
        store.efficiency_dispatch =
            PerUnit(optional_f64(view, row, "efficiency_dispatch", 1.0, diag));
        if !builder.add_store(store) {
            diag.add_duplicate(view.name(), name);
        }
    }
    debug!(rows = view.len(), "stores read");
}

/// Read a wide series table: first column is the timestamp, every other
/// column one entity. Returns values per column header.
pub(crate) fn read_series_columns(
    view: &TableView,
    diag: &mut LoadDiagnostics,
) -> BTreeMap<String, Vec<Megawatts>> {
    let mut columns = BTreeMap::new();
    for header in series_headers(view) {
        let values = (0..view.len())
            .map(|row| Megawatts(required_f64(view, row, header, diag)))
            .collect();
        columns.insert(header.to_string(), values);
    }
    columns
}

pub(crate) fn series_headers<'a>(view: &TableView<'a>) -> impl Iterator<Item = &'a str> {
    view.columns()
        .iter()
        .skip(1)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
}

fn row_id<'a>(view: &TableView<'a>, row: usize, diag: &mut LoadDiagnostics) -> Option<&'a str> {
    let id = view.get(row, "name");
    if id.is_none() {
        diag.add_missing_id(view.name(), row);
    }
    id
}

/// A required numeric cell; empty or unparseable cells become NaN.
fn required_f64(view: &TableView, row: usize, column: &str, diag: &mut LoadDiagnostics) -> f64 {
    match view.get(row, column) {
        Some(raw) => parse_f64(view, row, column, raw, diag),
        None => {
            diag.add_coercion_warning(view.name(), row, column, "");
            f64::NAN
        }
    }
}

/// An optional numeric cell; empty cells take `default` silently.
fn optional_f64(
    view: &TableView,
    row: usize,
    column: &str,
    default: f64,
    diag: &mut LoadDiagnostics,
) -> f64 {
    match view.get(row, column) {
        Some(raw) => parse_f64(view, row, column, raw, diag),
        None => default,
    }
}

fn parse_f64(view: &TableView, row: usize, column: &str, raw: &str, diag: &mut LoadDiagnostics) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            debug!(table = view.name(), row, column, raw, "numeric cell coerced to NaN");
            diag.add_coercion_warning(view.name(), row, column, raw);
            f64::NAN
        }
    }
}

fn optional_bool(view: &TableView, row: usize, column: &str, diag: &mut LoadDiagnostics) -> bool {
    let Some(raw) = view.get(row, column) else {
        return false;
    };
    match parse_bool(raw) {
        Some(value) => value,
        None => {
            diag.add_coercion_warning(view.name(), row, column, raw);
            false
        }
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
