//! Topology validation: dangling references, starved and orphaned buses,
//! plus a few consistency checks on capacities, efficiencies and carriers.
//!
//! Checks never stop early. Every problem becomes one [`ValidationIssue`],
//! and the issue list is sorted by kind, then subject, then detail.

use netdiag_core::{BusId, Carrier, Network, Topology};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Issue kinds in the order the checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DanglingReference,
    StarvedNode,
    OrphanedNode,
    CarrierMismatch,
    InvalidEfficiency,
    NegativeCapacity,
}

/// Entity collection an issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Line,
    Link,
    Generator,
    Load,
    Store,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Line => "line",
            Component::Link => "link",
            Component::Generator => "generator",
            Component::Load => "load",
            Component::Store => "store",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A bus reference that names no bus
    DanglingReference {
        component: Component,
        entity: String,
        field: String,
        missing_bus: String,
    },
    /// A bus with demand that no generator or store can reach
    StarvedNode {
        bus: String,
        region: String,
        carrier: Carrier,
        loads: Vec<String>,
        /// Buses in the starved bus's connected component
        island_size: usize,
    },
    /// A bus with no edge and nothing attached
    OrphanedNode {
        bus: String,
        region: String,
        carrier: Carrier,
    },
    CarrierMismatch {
        line: String,
        bus0: String,
        carrier0: Carrier,
        bus1: String,
        carrier1: Carrier,
    },
    InvalidEfficiency {
        link: String,
        port: usize,
        efficiency: f64,
    },
    NegativeCapacity {
        component: Component,
        entity: String,
        field: String,
        value: f64,
    },
}

impl ValidationIssue {
    pub fn kind(&self) -> IssueKind {
        match self {
            ValidationIssue::DanglingReference { .. } => IssueKind::DanglingReference,
            ValidationIssue::StarvedNode { .. } => IssueKind::StarvedNode,
            ValidationIssue::OrphanedNode { .. } => IssueKind::OrphanedNode,
            ValidationIssue::CarrierMismatch { .. } => IssueKind::CarrierMismatch,
            ValidationIssue::InvalidEfficiency { .. } => IssueKind::InvalidEfficiency,
            ValidationIssue::NegativeCapacity { .. } => IssueKind::NegativeCapacity,
        }
    }

    /// The bus or entity the issue is about
    pub fn subject(&self) -> &str {
        match self {
            ValidationIssue::DanglingReference { entity, .. }
            | ValidationIssue::NegativeCapacity { entity, .. } => entity,
            ValidationIssue::StarvedNode { bus, .. } | ValidationIssue::OrphanedNode { bus, .. } => {
                bus
            }
            ValidationIssue::CarrierMismatch { line, .. } => line,
            ValidationIssue::InvalidEfficiency { link, .. } => link,
        }
    }

    fn detail(&self) -> String {
        match self {
            ValidationIssue::DanglingReference {
                component, field, ..
            }
            | ValidationIssue::NegativeCapacity {
                component, field, ..
            } => format!("{}.{}", component.as_str(), field),
            ValidationIssue::InvalidEfficiency { port, .. } => port.to_string(),
            _ => String::new(),
        }
    }

    /// One-line human description
    pub fn message(&self) -> String {
        match self {
            ValidationIssue::DanglingReference {
                component,
                entity,
                field,
                missing_bus,
            } => format!(
                "{} '{}' references unknown bus '{}' in '{}'",
                component.as_str(),
                entity,
                missing_bus,
                field
            ),
            ValidationIssue::StarvedNode {
                bus,
                region,
                carrier,
                loads,
                island_size,
            } => format!(
                "{carrier} bus '{bus}' in region {region} serves {} load(s) ({}) but no generator or store can reach it (island of {island_size} bus(es))",
                loads.len(),
                loads.join(", ")
            ),
            ValidationIssue::OrphanedNode {
                bus,
                region,
                carrier,
            } => format!("{carrier} bus '{bus}' in region {region} has no edges and nothing attached"),
            ValidationIssue::CarrierMismatch {
                line,
                bus0,
                carrier0,
                bus1,
                carrier1,
            } => format!(
                "line '{line}' joins {carrier0} bus '{bus0}' to {carrier1} bus '{bus1}'"
            ),
            ValidationIssue::InvalidEfficiency {
                link,
                port,
                efficiency,
            } => format!("link '{link}' declares efficiency {efficiency} on port {port}, outside (0, 1]"),
            ValidationIssue::NegativeCapacity {
                component,
                entity,
                field,
                value,
            } => format!(
                "{} '{}' has negative {} = {}",
                component.as_str(),
                entity,
                field,
                value
            ),
        }
    }

    fn order(&self, other: &Self) -> Ordering {
        self.kind()
            .cmp(&other.kind())
            .then_with(|| self.subject().cmp(other.subject()))
            .then_with(|| self.detail().cmp(&other.detail()))
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Validation outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    pub issues: Vec<ValidationIssue>,
    /// Connected components of the resolved topology
    pub islands: usize,
}

impl Validation {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind() == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }
}

/// Run every structural check against a snapshot.
pub fn validate(network: &Network) -> Validation {
    let mut issues = Vec::new();
    check_dangling(network, &mut issues);

    let topology = Topology::build(network);
    check_reachability(network, &topology, &mut issues);
    check_isolation(network, &topology, &mut issues);
    check_consistency(network, &mut issues);

    issues.sort_by(|a, b| a.order(b));
    debug!(
        issues = issues.len(),
        islands = topology.island_count(),
        "topology validated"
    );
    Validation {
        issues,
        islands: topology.island_count(),
    }
}

fn check_dangling(network: &Network, issues: &mut Vec<ValidationIssue>) {
    let mut check = |component: Component, entity: &str, field: &str, bus: &BusId| {
        if !network.contains_bus(bus) {
            issues.push(ValidationIssue::DanglingReference {
                component,
                entity: entity.to_string(),
                field: field.to_string(),
                missing_bus: bus.to_string(),
            });
        }
    };

    for line in network.lines() {
        check(Component::Line, line.id.as_str(), "bus0", &line.bus0);
        check(Component::Line, line.id.as_str(), "bus1", &line.bus1);
    }
    for link in network.links() {
        for (port, p) in link.ports().iter().enumerate() {
            check(Component::Link, link.id.as_str(), &format!("bus{port}"), &p.bus);
        }
    }
    for gen in network.generators() {
        check(Component::Generator, gen.id.as_str(), "bus", &gen.bus);
    }
    for load in network.loads() {
        check(Component::Load, load.id.as_str(), "bus", &load.bus);
    }
    for store in network.stores() {
        check(Component::Store, store.id.as_str(), "bus", &store.bus);
    }
}

fn check_reachability(network: &Network, topology: &Topology, issues: &mut Vec<ValidationIssue>) {
    let supplied: HashSet<&BusId> = network
        .generators()
        .iter()
        .map(|g| &g.bus)
        .chain(network.stores().iter().map(|s| &s.bus))
        .collect();

    // NodeIndex order is bus id order, so sorting seeds sorts them by id
    let mut seeds: Vec<_> = supplied.iter().filter_map(|bus| topology.node(bus)).collect();
    seeds.sort();
    let reached = topology.reachable_from(seeds);

    let mut loads_by_bus: BTreeMap<&BusId, Vec<String>> = BTreeMap::new();
    for load in network.loads() {
        loads_by_bus
            .entry(&load.bus)
            .or_default()
            .push(load.id.to_string());
    }

    let islands = topology.islands();
    for (bus_id, loads) in loads_by_bus {
        let (Some(node), Some(bus)) = (topology.node(bus_id), network.bus(bus_id)) else {
            continue;
        };
        if reached[node.index()] || supplied.contains(bus_id) {
            continue;
        }
        issues.push(ValidationIssue::StarvedNode {
            bus: bus_id.to_string(),
            region: bus.region.to_string(),
            carrier: bus.carrier.clone(),
            loads,
            island_size: islands.size_of(islands.island_of(node)),
        });
    }
}

fn check_isolation(network: &Network, topology: &Topology, issues: &mut Vec<ValidationIssue>) {
    let attached: HashSet<&BusId> = network
        .generators()
        .iter()
        .map(|g| &g.bus)
        .chain(network.loads().iter().map(|l| &l.bus))
        .chain(network.stores().iter().map(|s| &s.bus))
        .collect();

    for bus in network.buses() {
        let Some(node) = topology.node(&bus.id) else {
            continue;
        };
        if topology.degree(node) == 0 && !attached.contains(&bus.id) {
            issues.push(ValidationIssue::OrphanedNode {
                bus: bus.id.to_string(),
                region: bus.region.to_string(),
                carrier: bus.carrier.clone(),
            });
        }
    }
}

fn check_consistency(network: &Network, issues: &mut Vec<ValidationIssue>) {
    for line in network.lines() {
        if let (Some(b0), Some(b1)) = (network.bus(&line.bus0), network.bus(&line.bus1)) {
            if b0.carrier != b1.carrier {
                issues.push(ValidationIssue::CarrierMismatch {
                    line: line.id.to_string(),
                    bus0: b0.id.to_string(),
                    carrier0: b0.carrier.clone(),
                    bus1: b1.id.to_string(),
                    carrier1: b1.carrier.clone(),
                });
            }
        }
        negative(issues, Component::Line, line.id.as_str(), "s_nom", line.s_nom.value());
    }

    for link in network.links() {
        if !link.lossless {
            for (port, out) in link.ports().iter().enumerate().skip(1) {
                if !out.efficiency.is_unit_fraction() {
                    issues.push(ValidationIssue::InvalidEfficiency {
                        link: link.id.to_string(),
                        port,
                        efficiency: out.efficiency.value(),
                    });
                }
            }
        }
        negative(issues, Component::Link, link.id.as_str(), "p_nom", link.p_nom.value());
    }

    for gen in network.generators() {
        negative(issues, Component::Generator, gen.id.as_str(), "p_nom", gen.p_nom.value());
    }
    for store in network.stores() {
        negative(issues, Component::Store, store.id.as_str(), "e_nom", store.e_nom.value());
    }
}

fn negative(
    issues: &mut Vec<ValidationIssue>,
    component: Component,
    entity: &str,
    field: &str,
    value: f64,
) {
    if value < 0.0 {
        issues.push(ValidationIssue::NegativeCapacity {
            component,
            entity: entity.to_string(),
            field: field.to_string(),
            value,
        });
    }
}
