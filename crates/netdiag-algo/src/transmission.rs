//! Cross-region transmission assessment.
//!
//! Lines and links whose primary endpoints sit in different regions are
//! merged into one [`Connection`] per unordered region pair. The pair is
//! canonicalized lexically ([`ConnectionKey`]), and flow from the smaller
//! region code towards the larger one is positive.
//!
//! Each connection gets a required flow, either the static worst case
//! derived from regional deficits or the peak of an observed flow series,
//! and is classified by its utilization. Utilization is measured per carrier:
//! a static need against the capacity ending at its (region, carrier) side,
//! an observed peak against the capacity of its carrier channel. The worst
//! side or channel sets the connection's classification.

use crate::balance::RegionalBalance;
use crate::config::FlowConfig;
use netdiag_core::{BusId, Carrier, Megawatts, Network, RegionCode};
use netdiag_io::FlowSeries;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

/// Unordered region pair with `low < high`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    low: RegionCode,
    high: RegionCode,
}

impl ConnectionKey {
    /// `None` when both regions are the same
    pub fn new(a: &RegionCode, b: &RegionCode) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                low: a.clone(),
                high: b.clone(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                low: b.clone(),
                high: a.clone(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> &RegionCode {
        &self.low
    }

    pub fn high(&self) -> &RegionCode {
        &self.high
    }

    pub fn contains(&self, region: &RegionCode) -> bool {
        &self.low == region || &self.high == region
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

impl Serialize for ConnectionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Utilization band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Normal,
    AtRisk,
    InfeasibleRisk,
}

impl Classification {
    pub fn classify(utilization: f64, config: &FlowConfig) -> Self {
        if utilization > config.infeasible {
            Classification::InfeasibleRisk
        } else if utilization >= config.at_risk {
            Classification::AtRisk
        } else {
            Classification::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Normal => "normal",
            Classification::AtRisk => "at-risk",
            Classification::InfeasibleRisk => "infeasible-risk",
        }
    }
}

/// Where a connection's required flow came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSource {
    Static,
    Observed,
}

impl FlowSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowSource::Static => "static",
            FlowSource::Observed => "observed",
        }
    }
}

/// Limits on how far an assessment can be trusted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Caveat {
    /// Only a prefix of the observed series was analysed
    SampleCapped { analysed: usize, available: usize },
    /// Some of the connection's edges have no observed flow column. When
    /// none has one, the static worst case is used instead.
    PartialCoverage { missing_edges: Vec<String> },
}

impl std::fmt::Display for Caveat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Caveat::SampleCapped {
                analysed,
                available,
            } => write!(f, "sample capped: {analysed} of {available} timestamps analysed"),
            Caveat::PartialCoverage { missing_edges } => write!(
                f,
                "partial coverage: no observed flow for {}",
                missing_edges.join(", ")
            ),
        }
    }
}

/// A line or link crossing between the two regions of a connection
#[derive(Debug, Clone, PartialEq)]
pub struct CrossEdge {
    pub name: String,
    /// Whether the edge's `bus0` lies in the connection's low region
    pub bus0_in_low: bool,
    /// Carriers at the low and the high end
    pub carriers: (Carrier, Carrier),
    pub capacity: Megawatts,
}

/// All edges between one pair of regions
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub key: ConnectionKey,
    /// Sum of finite, non-negative edge capacities
    pub capacity: Megawatts,
    pub edges: Vec<CrossEdge>,
    /// Capacity ending at each (region, carrier) side of the pair
    pub sides: BTreeMap<(RegionCode, Carrier), Megawatts>,
}

impl Connection {
    fn new(key: ConnectionKey) -> Self {
        Self {
            key,
            capacity: Megawatts::default(),
            edges: Vec::new(),
            sides: BTreeMap::new(),
        }
    }

    fn add_edge(
        &mut self,
        name: &str,
        bus0: (&RegionCode, &Carrier),
        bus1: (&RegionCode, &Carrier),
        capacity: Megawatts,
    ) {
        let usable = usable(capacity);
        self.capacity += usable;
        for (region, carrier) in [bus0, bus1] {
            *self
                .sides
                .entry((region.clone(), carrier.clone()))
                .or_default() += usable;
        }
        let bus0_in_low = bus0.0 == &self.key.low;
        let (low_end, high_end) = if bus0_in_low {
            (bus0.1, bus1.1)
        } else {
            (bus1.1, bus0.1)
        };
        self.edges.push(CrossEdge {
            name: name.to_string(),
            bus0_in_low,
            carriers: (low_end.clone(), high_end.clone()),
            capacity,
        });
    }
}

/// Finite capacity, negatives counted as zero
fn usable(capacity: Megawatts) -> Megawatts {
    if capacity.is_finite() {
        Megawatts(capacity.value().max(0.0))
    } else {
        Megawatts::default()
    }
}

/// Group every resolvable cross-region line and link, sorted by key.
pub fn connections(network: &Network) -> Vec<Connection> {
    let mut by_key: BTreeMap<ConnectionKey, Connection> = BTreeMap::new();
    let endpoints = |a: &BusId, b: &BusId| {
        let a = network.bus(a)?;
        let b = network.bus(b)?;
        let key = ConnectionKey::new(&a.region, &b.region)?;
        Some((key, a, b))
    };

    for line in network.lines() {
        if let Some((key, a, b)) = endpoints(&line.bus0, &line.bus1) {
            by_key
                .entry(key.clone())
                .or_insert_with(|| Connection::new(key))
                .add_edge(
                    line.id.as_str(),
                    (&a.region, &a.carrier),
                    (&b.region, &b.carrier),
                    line.s_nom,
                );
        }
    }
    for link in network.links() {
        if let Some((key, a, b)) = endpoints(link.bus0(), link.bus1()) {
            by_key
                .entry(key.clone())
                .or_insert_with(|| Connection::new(key))
                .add_edge(
                    link.id.as_str(),
                    (&a.region, &a.carrier),
                    (&b.region, &b.carrier),
                    link.p_nom,
                );
        }
    }
    by_key.into_values().collect()
}

/// Cross-region capacity arriving at a (region, carrier)
pub fn import_capacity(
    connections: &[Connection],
    region: &RegionCode,
    carrier: &Carrier,
) -> Megawatts {
    let side = (region.clone(), carrier.clone());
    connections
        .iter()
        .filter(|c| c.key.contains(region))
        .filter_map(|c| c.sides.get(&side).copied())
        .sum()
}

/// Assessment of one connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionAssessment {
    pub key: ConnectionKey,
    /// Total over all carriers
    pub capacity: Megawatts,
    /// Capacity of the carrier side or channel the utilization is measured on
    pub binding_capacity: Megawatts,
    /// Carrier at the receiving end of the binding side or channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_carrier: Option<Carrier>,
    /// Worst-case shortfall to carry, or the observed peak magnitude, on the
    /// binding side or channel
    pub required_flow: Megawatts,
    /// Signed flow, positive from the low region to the high region
    pub net_flow: Megawatts,
    #[serde(serialize_with = "serialize_ratio")]
    pub utilization: f64,
    pub classification: Classification,
    pub source: FlowSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_timestamp: Option<String>,
    pub edges: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<Caveat>,
}

impl ConnectionAssessment {
    pub fn is_above_normal(&self) -> bool {
        self.classification != Classification::Normal
    }
}

/// `required / capacity`, where 0/0 is 0 and x/0 is infinite.
/// Non-positive capacity counts as zero.
pub fn utilization(required: Megawatts, capacity: Megawatts) -> f64 {
    if capacity.value() > 0.0 {
        required / capacity
    } else if required.value() > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

fn serialize_ratio<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str("inf")
    }
}

/// Deficit shares landing on each (region, carrier) side of a connection
type SideNeeds = BTreeMap<(RegionCode, Carrier), f64>;

/// Share each deficient (region, carrier)'s shortfall over its import
/// connections in proportion to their capacity at that carrier. When all of
/// those connections have zero capacity the shortfall is split evenly.
fn static_needs(connections: &[Connection], balances: &[RegionalBalance]) -> Vec<SideNeeds> {
    let mut needs = vec![SideNeeds::new(); connections.len()];
    for balance in balances.iter().filter(|b| b.deficient) {
        let deficit = balance.deficit().value();
        let side = (balance.region.clone(), balance.carrier.clone());
        let touching: Vec<(usize, f64)> = connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.key.contains(&balance.region))
            .filter_map(|(i, c)| c.sides.get(&side).map(|cap| (i, cap.value())))
            .collect();
        if touching.is_empty() {
            continue;
        }
        let import: f64 = touching.iter().map(|(_, cap)| cap).sum();
        for (i, cap) in &touching {
            let share = if import > 0.0 {
                deficit * cap / import
            } else {
                deficit / touching.len() as f64
            };
            *needs[*i].entry(side.clone()).or_default() += share;
        }
    }
    needs
}

/// The side or channel that limits a connection
#[derive(Debug, Clone, PartialEq)]
struct Binding {
    required: Megawatts,
    net_flow: Megawatts,
    capacity: Megawatts,
    carrier: Option<Carrier>,
    utilization: f64,
    /// Index of the peak sample, observed flows only
    peak: Option<usize>,
}

impl Binding {
    fn idle(connection: &Connection) -> Self {
        Self {
            required: Megawatts::default(),
            net_flow: Megawatts::default(),
            capacity: connection.capacity,
            carrier: None,
            utilization: 0.0,
            peak: None,
        }
    }
}

/// Keep the first candidate with the highest utilization
fn worst(current: Option<Binding>, candidate: Binding) -> Option<Binding> {
    match current {
        Some(best) if best.utilization >= candidate.utilization => Some(best),
        _ => Some(candidate),
    }
}

fn static_binding(connection: &Connection, needs: &SideNeeds) -> Binding {
    // Import into the high region counts positive
    let net_flow: f64 = needs
        .iter()
        .map(|((region, _), need)| {
            if region == connection.key.high() {
                *need
            } else {
                -need
            }
        })
        .sum();

    let mut binding = None;
    for (side, need) in needs {
        let capacity = connection.sides.get(side).copied().unwrap_or_default();
        let required = Megawatts(*need);
        binding = worst(
            binding,
            Binding {
                required,
                net_flow: Megawatts(net_flow),
                capacity,
                carrier: Some(side.1.clone()),
                utilization: utilization(required, capacity),
                peak: None,
            },
        );
    }
    binding.unwrap_or_else(|| Binding {
        net_flow: Megawatts(net_flow),
        ..Binding::idle(connection)
    })
}

/// Edges of one connection sharing the same carriers at both ends
#[derive(Debug, Default)]
struct Channel {
    capacity: Megawatts,
    /// Signed flow per analysed timestamp, summed over the covered edges
    flows: Vec<f64>,
    covered: bool,
}

fn observed_channels(
    connection: &Connection,
    series: &FlowSeries,
    samples: usize,
) -> BTreeMap<(Carrier, Carrier), Channel> {
    let mut channels: BTreeMap<(Carrier, Carrier), Channel> = BTreeMap::new();
    for edge in &connection.edges {
        let channel = channels.entry(edge.carriers.clone()).or_insert_with(|| Channel {
            flows: vec![0.0; samples],
            ..Channel::default()
        });
        channel.capacity += usable(edge.capacity);
        let Some(values) = series.get(&edge.name) else {
            continue;
        };
        channel.covered = true;
        let sign = if edge.bus0_in_low { 1.0 } else { -1.0 };
        for (flow, value) in channel.flows.iter_mut().zip(values.iter().take(samples)) {
            if value.is_finite() {
                *flow += sign * value.value();
            }
        }
    }
    channels
}

fn observed_binding(connection: &Connection, series: &FlowSeries, samples: usize) -> Binding {
    let mut binding = None;
    for ((low_end, high_end), channel) in observed_channels(connection, series, samples) {
        if !channel.covered {
            continue;
        }
        let mut peak: Option<(usize, f64)> = None;
        for (t, flow) in channel.flows.iter().enumerate() {
            if peak.map_or(true, |(_, best)| flow.abs() > best.abs()) {
                peak = Some((t, *flow));
            }
        }
        let flow = peak.map_or(0.0, |(_, f)| f);
        let required = Megawatts(flow.abs());
        binding = worst(
            binding,
            Binding {
                required,
                net_flow: Megawatts(flow),
                capacity: channel.capacity,
                carrier: Some(if flow < 0.0 { low_end } else { high_end }),
                utilization: utilization(required, channel.capacity),
                peak: peak.map(|(t, _)| t),
            },
        );
    }
    binding.unwrap_or_else(|| Binding::idle(connection))
}

fn assess_one(
    connection: &Connection,
    needs: &SideNeeds,
    flows: Option<&FlowSeries>,
    config: &FlowConfig,
) -> ConnectionAssessment {
    let edges: Vec<String> = connection.edges.iter().map(|e| e.name.clone()).collect();
    let mut caveats = Vec::new();
    let mut source = FlowSource::Static;
    let mut binding = None;
    let mut peak_timestamp = None;

    if let Some(series) = flows {
        let missing: Vec<String> = edges
            .iter()
            .filter(|e| !series.contains(e))
            .cloned()
            .collect();
        let covered = missing.len() < edges.len();
        if !missing.is_empty() {
            caveats.push(Caveat::PartialCoverage {
                missing_edges: missing,
            });
        }

        if covered {
            let available = series.len();
            let samples = config.sample_cap.map_or(available, |cap| cap.min(available));
            if samples < available {
                caveats.push(Caveat::SampleCapped {
                    analysed: samples,
                    available,
                });
            }

            let observed = observed_binding(connection, series, samples);
            source = FlowSource::Observed;
            peak_timestamp = observed
                .peak
                .and_then(|t| series.timestamps().get(t).cloned());
            binding = Some(observed);
        }
    }

    let binding = binding.unwrap_or_else(|| static_binding(connection, needs));
    ConnectionAssessment {
        key: connection.key.clone(),
        capacity: connection.capacity,
        binding_capacity: binding.capacity,
        binding_carrier: binding.carrier,
        required_flow: binding.required,
        net_flow: binding.net_flow,
        utilization: binding.utilization,
        classification: Classification::classify(binding.utilization, config),
        source,
        peak_timestamp,
        edges,
        caveats,
    }
}

/// Assess every cross-region connection, sorted by key.
pub fn assess(
    network: &Network,
    balances: &[RegionalBalance],
    flows: Option<&FlowSeries>,
    config: &FlowConfig,
) -> Vec<ConnectionAssessment> {
    assess_connections(&connections(network), balances, flows, config)
}

/// Assess already grouped connections, sorted by key.
pub fn assess_connections(
    connections: &[Connection],
    balances: &[RegionalBalance],
    flows: Option<&FlowSeries>,
    config: &FlowConfig,
) -> Vec<ConnectionAssessment> {
    let needs = static_needs(connections, balances);
    let work: Vec<(&Connection, &SideNeeds)> = connections.iter().zip(needs.iter()).collect();

    #[cfg(feature = "parallel")]
    let mut assessments: Vec<ConnectionAssessment> = work
        .par_iter()
        .map(|(connection, need)| assess_one(connection, need, flows, config))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let mut assessments: Vec<ConnectionAssessment> = work
        .iter()
        .map(|(connection, need)| assess_one(connection, need, flows, config))
        .collect();

    assessments.sort_by(|a, b| a.key.cmp(&b.key));
    debug!(
        connections = assessments.len(),
        above_normal = assessments.iter().filter(|a| a.is_above_normal()).count(),
        "transmission assessed"
    );
    assessments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::aggregate;
    use crate::config::BalanceConfig;
    use netdiag_core::{Bus, Generator, Line, Link, Load};

    fn elec(id: &str, region: &str) -> Bus {
        Bus::new(id, Carrier::Electricity, RegionCode::new(region))
    }

    /// A: generation 100, demand 150. B: generation 200, demand 50.
    fn two_regions(line_capacity: f64) -> Network {
        let mut b = Network::builder();
        b.add_bus(elec("A 1", "A"));
        b.add_bus(elec("B 1", "B"));
        b.add_generator(Generator::new("A gen", "A 1").with_p_nom(100.0));
        b.add_generator(Generator::new("B gen", "B 1").with_p_nom(200.0));
        b.add_load(Load::fixed("A load", "A 1", 150.0));
        b.add_load(Load::fixed("B load", "B 1", 50.0));
        b.add_line(Line::new("A-B line", "A 1", "B 1").with_s_nom(line_capacity));
        b.build()
    }

    fn run(
        network: &Network,
        flows: Option<&FlowSeries>,
        config: &FlowConfig,
    ) -> Vec<ConnectionAssessment> {
        let balances = aggregate(network, &BalanceConfig::default());
        assess(network, &balances, flows, config)
    }

    #[test]
    fn test_key_is_canonical() {
        let a = RegionCode::new("A");
        let b = RegionCode::new("B");
        assert_eq!(ConnectionKey::new(&b, &a), ConnectionKey::new(&a, &b));
        assert_eq!(ConnectionKey::new(&b, &a).unwrap().to_string(), "A-B");
        assert!(ConnectionKey::new(&a, &a).is_none());
    }

    #[test]
    fn test_static_shortfall_over_capacity() {
        let assessments = run(&two_regions(40.0), None, &FlowConfig::default());
        assert_eq!(assessments.len(), 1);
        let ab = &assessments[0];
        assert_eq!(ab.key.to_string(), "A-B");
        assert_eq!(ab.required_flow.value(), 50.0);
        assert!((ab.utilization - 1.25).abs() < 1e-12);
        assert_eq!(ab.classification, Classification::InfeasibleRisk);
        // Deficient low region imports, so the flow is negative
        assert_eq!(ab.net_flow.value(), -50.0);
        assert_eq!(ab.source, FlowSource::Static);
    }

    #[test]
    fn test_bands() {
        let config = FlowConfig::default();
        assert_eq!(Classification::classify(0.69, &config), Classification::Normal);
        assert_eq!(Classification::classify(0.7, &config), Classification::AtRisk);
        assert_eq!(Classification::classify(1.0, &config), Classification::AtRisk);
        assert_eq!(Classification::classify(1.01, &config), Classification::InfeasibleRisk);
        assert_eq!(
            Classification::classify(f64::INFINITY, &config),
            Classification::InfeasibleRisk
        );

        let at_risk = run(&two_regions(60.0), None, &config);
        assert_eq!(at_risk[0].classification, Classification::AtRisk);
        let normal = run(&two_regions(100.0), None, &config);
        assert_eq!(normal[0].classification, Classification::Normal);
    }

    #[test]
    fn test_utilization_edge_cases() {
        assert_eq!(utilization(Megawatts(0.0), Megawatts(0.0)), 0.0);
        assert!(utilization(Megawatts(5.0), Megawatts(0.0)).is_infinite());
        assert_eq!(utilization(Megawatts(5.0), Megawatts(10.0)), 0.5);

        let zero = run(&two_regions(0.0), None, &FlowConfig::default());
        assert!(zero[0].utilization.is_infinite());
        let json = serde_json::to_string(&zero[0]).unwrap();
        assert!(json.contains(r#""utilization":"inf""#));
    }

    #[test]
    fn test_parallel_edges_merge_into_one_connection() {
        let mut b = two_regions(40.0).to_builder();
        b.add_line(Line::new("B-A line", "B 1", "A 1").with_s_nom(20.0));
        b.add_link(Link::new("B-A dc", "B 1", "A 1").with_p_nom(20.0));
        let assessments = run(&b.build(), None, &FlowConfig::default());

        assert_eq!(assessments.len(), 1);
        assert_eq!(assessments[0].capacity.value(), 80.0);
        assert_eq!(assessments[0].edges, vec!["A-B line", "B-A line", "B-A dc"]);
        assert!((assessments[0].utilization - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_deficit_shared_by_capacity() {
        let mut b = Network::builder();
        b.add_bus(elec("A 1", "A"));
        b.add_bus(elec("B 1", "B"));
        b.add_bus(elec("C 1", "C"));
        b.add_load(Load::fixed("C load", "C 1", 90.0));
        b.add_generator(Generator::new("A gen", "A 1").with_p_nom(500.0));
        b.add_generator(Generator::new("B gen", "B 1").with_p_nom(500.0));
        b.add_line(Line::new("AC", "A 1", "C 1").with_s_nom(100.0));
        b.add_line(Line::new("BC", "B 1", "C 1").with_s_nom(50.0));

        let assessments = run(&b.build(), None, &FlowConfig::default());
        let keys: Vec<_> = assessments.iter().map(|a| a.key.to_string()).collect();
        assert_eq!(keys, vec!["A-C", "B-C"]);
        assert!((assessments[0].required_flow.value() - 60.0).abs() < 1e-9);
        assert!((assessments[1].required_flow.value() - 30.0).abs() < 1e-9);
        // C is the high region importing, so positive
        assert!(assessments[0].net_flow.value() > 0.0);
        assert!((assessments[0].utilization - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_other_carrier_capacity_not_counted() {
        let mut b = Network::builder();
        b.add_bus(elec("A 1", "A"));
        b.add_bus(Bus::new("A h2", Carrier::Hydrogen, RegionCode::new("A")));
        b.add_bus(Bus::new("B h2", Carrier::Hydrogen, RegionCode::new("B")));
        b.add_load(Load::fixed("A load", "A 1", 10.0));
        b.add_link(Link::new("h2 pipe", "B h2", "A h2").with_p_nom(100.0));
        let network = b.build();

        let conns = connections(&network);
        assert_eq!(
            import_capacity(&conns, &RegionCode::new("A"), &Carrier::Electricity).value(),
            0.0
        );
        assert_eq!(
            import_capacity(&conns, &RegionCode::new("A"), &Carrier::Hydrogen).value(),
            100.0
        );
        // The electricity deficit in A cannot use the hydrogen pipe
        let assessments = run(&network, None, &FlowConfig::default());
        assert_eq!(assessments[0].required_flow.value(), 0.0);
        assert_eq!(assessments[0].classification, Classification::Normal);
    }

    #[test]
    fn test_observed_flows_normalized_direction() {
        let mut b = two_regions(40.0).to_builder();
        b.add_line(Line::new("B-A line", "B 1", "A 1").with_s_nom(40.0));
        let network = b.build();
        // Both lines carry power from B to A at t1
        let series = FlowSeries::new(["t0", "t1", "t2"])
            .with_edge("A-B line", &[10.0, -30.0, 5.0])
            .with_edge("B-A line", &[-5.0, 25.0, 0.0]);

        let assessments = run(&network, Some(&series), &FlowConfig::default());
        let ab = &assessments[0];
        assert_eq!(ab.source, FlowSource::Observed);
        assert_eq!(ab.required_flow.value(), 55.0);
        assert_eq!(ab.net_flow.value(), -55.0);
        assert_eq!(ab.peak_timestamp.as_deref(), Some("t1"));
        assert!((ab.utilization - 55.0 / 80.0).abs() < 1e-12);
        assert!(ab.caveats.is_empty());
    }

    #[test]
    fn test_sample_cap_and_partial_coverage() {
        let mut b = two_regions(40.0).to_builder();
        b.add_line(Line::new("unobserved", "A 1", "B 1").with_s_nom(10.0));
        let network = b.build();
        let series = FlowSeries::new(["t0", "t1", "t2"]).with_edge("A-B line", &[1.0, 2.0, 90.0]);
        let config = FlowConfig {
            sample_cap: Some(2),
            ..FlowConfig::default()
        };

        let ab = &run(&network, Some(&series), &config)[0];
        assert_eq!(ab.required_flow.value(), 2.0);
        assert_eq!(
            ab.caveats,
            vec![
                Caveat::PartialCoverage {
                    missing_edges: vec!["unobserved".to_string()]
                },
                Caveat::SampleCapped {
                    analysed: 2,
                    available: 3
                },
            ]
        );
    }

    #[test]
    fn test_uncovered_connection_falls_back_to_static() {
        let network = two_regions(40.0);
        let series = FlowSeries::new(["t0"]).with_edge("elsewhere", &[1.0]);
        let ab = &run(&network, Some(&series), &FlowConfig::default())[0];
        assert_eq!(ab.source, FlowSource::Static);
        assert_eq!(ab.required_flow.value(), 50.0);
        assert_eq!(ab.caveats.len(), 1);
    }

    /// `two_regions` plus a wide heat link from B into A
    fn with_heat_link(line_capacity: f64) -> Network {
        let mut b = two_regions(line_capacity).to_builder();
        b.add_bus(Bus::new("A heat", Carrier::Heat, RegionCode::new("A")));
        b.add_bus(Bus::new("B heat", Carrier::Heat, RegionCode::new("B")));
        b.add_link(Link::new("B-A heat", "B heat", "A heat").with_p_nom(1000.0));
        b.build()
    }

    #[test]
    fn test_other_carrier_capacity_does_not_dilute_static_need() {
        let assessments = run(&with_heat_link(40.0), None, &FlowConfig::default());
        assert_eq!(assessments.len(), 1);
        let ab = &assessments[0];
        assert_eq!(ab.capacity.value(), 1040.0);
        assert_eq!(ab.binding_capacity.value(), 40.0);
        assert_eq!(ab.binding_carrier, Some(Carrier::Electricity));
        assert_eq!(ab.required_flow.value(), 50.0);
        assert!((ab.utilization - 1.25).abs() < 1e-12);
        assert_eq!(ab.classification, Classification::InfeasibleRisk);
        assert_eq!(ab.net_flow.value(), -50.0);
    }

    #[test]
    fn test_worst_side_sets_classification() {
        // A short of heat by 30 over 1000 MW, short of electricity by 50 over 100 MW
        let mut b = with_heat_link(100.0).to_builder();
        b.add_load(Load::fixed("A heat load", "A heat", 30.0));
        let ab = &run(&b.build(), None, &FlowConfig::default())[0];
        assert_eq!(ab.binding_carrier, Some(Carrier::Electricity));
        assert_eq!(ab.binding_capacity.value(), 100.0);
        assert!((ab.utilization - 0.5).abs() < 1e-12);
        assert_eq!(ab.classification, Classification::Normal);
        assert_eq!(ab.net_flow.value(), -80.0);
    }

    #[test]
    fn test_observed_flow_measured_per_carrier_channel() {
        let series = FlowSeries::new(["t0", "t1"])
            .with_edge("A-B line", &[-10.0, -50.0])
            .with_edge("B-A heat", &[400.0, 0.0]);
        let ab = &run(&with_heat_link(40.0), Some(&series), &FlowConfig::default())[0];

        assert_eq!(ab.source, FlowSource::Observed);
        assert_eq!(ab.capacity.value(), 1040.0);
        assert_eq!(ab.binding_capacity.value(), 40.0);
        assert_eq!(ab.binding_carrier, Some(Carrier::Electricity));
        assert_eq!(ab.required_flow.value(), 50.0);
        assert_eq!(ab.net_flow.value(), -50.0);
        assert_eq!(ab.peak_timestamp.as_deref(), Some("t1"));
        assert_eq!(ab.classification, Classification::InfeasibleRisk);
    }

    #[test]
    fn test_negative_capacity_adds_nothing() {
        let mut b = two_regions(40.0).to_builder();
        b.add_line(Line::new("broken", "A 1", "B 1").with_s_nom(-30.0));
        let network = b.build();

        let conns = connections(&network);
        assert_eq!(conns[0].capacity.value(), 40.0);
        assert_eq!(
            import_capacity(&conns, &RegionCode::new("A"), &Carrier::Electricity).value(),
            40.0
        );
        let ab = &run(&network, None, &FlowConfig::default())[0];
        assert!((ab.utilization - 1.25).abs() < 1e-12);
        assert_eq!(ab.edges, vec!["A-B line", "broken"]);
    }

    #[test]
    fn test_intra_region_and_dangling_edges_ignored() {
        let mut b = Network::builder();
        b.add_bus(elec("A 1", "A"));
        b.add_bus(elec("A 2", "A"));
        b.add_line(Line::new("inner", "A 1", "A 2").with_s_nom(10.0));
        b.add_line(Line::new("out", "A 1", "Z 9").with_s_nom(10.0));
        assert!(connections(&b.build()).is_empty());
    }
}
