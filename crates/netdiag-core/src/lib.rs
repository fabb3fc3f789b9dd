//! # netdiag-core: Multi-carrier network snapshot
//!
//! Provides the typed, immutable description of a regional multi-carrier
//! energy network (electricity, heat, hydrogen) that the diagnostic pipeline
//! works on.
//!
//! ## Design Philosophy
//!
//! A network is loaded once from tabular records, held as an immutable
//! [`Network`] snapshot for the whole diagnostic run, and discarded after the
//! report is produced. Correcting the data means building a new snapshot
//! (see [`Network::to_builder`]); nothing mutates a snapshot in place.
//!
//! - **Buses** are the nodes, each bound to one [`Carrier`] and one derived
//!   [`RegionCode`].
//! - **Lines** are undirected same-carrier edges, **Links** are directed
//!   multi-port converters that may span carriers.
//! - **Generators**, **Loads** and **Stores** are attached to exactly one bus.
//!
//! References between entities are plain identifiers. A snapshot may contain
//! references to buses that do not exist; finding those is the validator's
//! job, so construction never rejects them.
//!
//! ## Quick Start
//!
//! ```rust
//! use netdiag_core::*;
//!
//! let mut builder = Network::builder();
//! builder.add_bus(Bus::new("A 1", Carrier::Electricity, RegionCode::new("A")));
//! builder.add_bus(Bus::new("B 1", Carrier::Electricity, RegionCode::new("B")));
//! builder.add_generator(Generator::new("A 1 gas", "A 1").with_p_nom(100.0));
//! builder.add_load(Load::fixed("B 1 load", "B 1", 50.0));
//! builder.add_line(Line::new("A-B", "A 1", "B 1").with_s_nom(40.0));
//!
//! let network = builder.build();
//! assert_eq!(network.stats().num_buses, 2);
//! assert!(network.bus(&BusId::new("A 1")).is_some());
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - Issues recovered while loading tabular records
//! - [`error`] - Fatal error taxonomy ([`NetdiagError`])
//! - [`graph_utils`] - Undirected topology view, reachability and islands
//! - [`units`] - Unit newtypes for power, energy and per-unit factors

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod units;

pub use diagnostics::{LoadDiagnostics, LoadIssue, LoadIssueKind, LoadStats, Severity};
pub use error::{NetdiagError, NetdiagResult};
pub use graph_utils::{Edge, IslandAnalysis, Topology};
pub use petgraph::graph::NodeIndex;
pub use units::{MegawattHours, Megawatts, PerUnit};

/// String-backed identifier newtypes, one per entity kind so that a bus
/// reference cannot be confused with a line or generator reference.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

string_id!(
    /// Globally unique bus identifier
    BusId
);
string_id!(LineId);
string_id!(LinkId);
string_id!(GeneratorId);
string_id!(LoadId);
string_id!(StoreId);
string_id!(
    /// Region grouping key, derived once at load time
    RegionCode
);

impl RegionCode {
    /// Derive a region code from a bus identifier: the token before the
    /// earliest occurrence of any separator, or the whole identifier when it
    /// contains none. Returns `None` when that token is empty.
    pub fn derive(bus_id: &str, separators: &[char]) -> Option<RegionCode> {
        let token = match bus_id.find(|c: char| separators.contains(&c)) {
            Some(pos) => &bus_id[..pos],
            None => bus_id,
        };
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(RegionCode::new(token))
        }
    }
}

/// Energy carrier a bus operates in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Carrier {
    Electricity,
    Heat,
    Hydrogen,
    Other(String),
}

impl Carrier {
    /// Parse a carrier label. Unknown labels are kept verbatim as `Other`.
    pub fn parse(label: &str) -> Carrier {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "ac" | "dc" | "electricity" | "elec" | "power" => Carrier::Electricity,
            "heat" | "urban heat" | "rural heat" | "urban central heat" | "district heat" => {
                Carrier::Heat
            }
            "h2" | "hydrogen" => Carrier::Hydrogen,
            _ => Carrier::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Carrier::Electricity => "electricity",
            Carrier::Heat => "heat",
            Carrier::Hydrogen => "hydrogen",
            Carrier::Other(label) => label,
        }
    }
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Carrier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Carrier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Carrier::parse(&label))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: BusId,
    pub carrier: Carrier,
    pub region: RegionCode,
}

impl Bus {
    pub fn new(id: impl Into<String>, carrier: Carrier, region: RegionCode) -> Self {
        Self {
            id: BusId::new(id),
            carrier,
            region,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: LineId,
    pub bus0: BusId,
    pub bus1: BusId,
    /// Thermal transfer capacity
    pub s_nom: Megawatts,
    /// Series resistance (per-unit)
    pub resistance: PerUnit,
    /// Series reactance (per-unit)
    pub reactance: PerUnit,
    pub s_nom_extendable: bool,
}

impl Line {
    pub fn new(id: impl Into<String>, bus0: impl Into<String>, bus1: impl Into<String>) -> Self {
        Self {
            id: LineId::new(id),
            bus0: BusId::new(bus0),
            bus1: BusId::new(bus1),
            s_nom: Megawatts(0.0),
            resistance: PerUnit(0.0),
            reactance: PerUnit(0.0),
            s_nom_extendable: false,
        }
    }

    pub fn with_s_nom(mut self, s_nom_mw: f64) -> Self {
        self.s_nom = Megawatts(s_nom_mw);
        self
    }
}

/// One port of a link. Port 0 is the input side.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPort {
    pub bus: BusId,
    /// Conversion efficiency from port 0 to this port (1 for port 0 itself)
    pub efficiency: PerUnit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    /// Two to four ports; ports 0 and 1 are the primary pair
    ports: Vec<LinkPort>,
    /// Capacity on the primary (input) port
    pub p_nom: Megawatts,
    pub p_nom_extendable: bool,
    /// Explicit pass-through link, exempt from efficiency checks
    pub lossless: bool,
}

impl Link {
    /// Two-port link from `bus0` to `bus1` with unit efficiency.
    pub fn new(id: impl Into<String>, bus0: impl Into<String>, bus1: impl Into<String>) -> Self {
        Self {
            id: LinkId::new(id),
            ports: vec![
                LinkPort {
                    bus: BusId::new(bus0),
                    efficiency: PerUnit(1.0),
                },
                LinkPort {
                    bus: BusId::new(bus1),
                    efficiency: PerUnit(1.0),
                },
            ],
            p_nom: Megawatts(0.0),
            p_nom_extendable: false,
            lossless: false,
        }
    }

    pub fn with_p_nom(mut self, p_nom_mw: f64) -> Self {
        self.p_nom = Megawatts(p_nom_mw);
        self
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.ports[1].efficiency = PerUnit(efficiency);
        self
    }

    /// Append an extra output port (bus2, bus3). Ignored beyond four ports.
    pub fn with_port(mut self, bus: impl Into<String>, efficiency: f64) -> Self {
        if self.ports.len() < 4 {
            self.ports.push(LinkPort {
                bus: BusId::new(bus),
                efficiency: PerUnit(efficiency),
            });
        }
        self
    }

    pub fn as_lossless(mut self) -> Self {
        self.lossless = true;
        self
    }

    /// All ports, input first
    pub fn ports(&self) -> &[LinkPort] {
        &self.ports
    }

    pub fn bus0(&self) -> &BusId {
        &self.ports[0].bus
    }

    pub fn bus1(&self) -> &BusId {
        &self.ports[1].bus
    }

}

#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub id: GeneratorId,
    pub bus: BusId,
    /// Free-form technology label (e.g. "onwind", "load shedding")
    pub carrier: String,
    /// Installed capacity
    pub p_nom: Megawatts,
    /// Marginal cost per MWh
    pub marginal_cost: f64,
    pub p_nom_extendable: bool,
    /// Upper bound on capacity expansion when extendable
    pub p_nom_max: Option<Megawatts>,
    /// Minimum output fraction
    pub p_min_pu: PerUnit,
    /// Static availability factor
    pub p_max_pu: PerUnit,
}

impl Generator {
    /// Create a generator with zero capacity and full availability.
    pub fn new(id: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            id: GeneratorId::new(id),
            bus: BusId::new(bus),
            carrier: String::new(),
            p_nom: Megawatts(0.0),
            marginal_cost: 0.0,
            p_nom_extendable: false,
            p_nom_max: None,
            p_min_pu: PerUnit(0.0),
            p_max_pu: PerUnit(1.0),
        }
    }

    pub fn with_p_nom(mut self, p_nom_mw: f64) -> Self {
        self.p_nom = Megawatts(p_nom_mw);
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self
    }

    pub fn with_availability(mut self, p_max_pu: f64) -> Self {
        self.p_max_pu = PerUnit(p_max_pu);
        self
    }

    /// Capacity actually available for dispatch: `p_nom × p_max_pu`
    pub fn available_capacity(&self) -> Megawatts {
        self.p_nom * self.p_max_pu
    }
}

/// Demand of a load: a fixed magnitude or a time series
#[derive(Debug, Clone, PartialEq)]
pub enum Demand {
    Static(Megawatts),
    Series(Vec<Megawatts>),
}

impl Demand {
    /// Worst-case demand: the static value or the peak of the series.
    /// NaN samples are ignored; an all-NaN series yields NaN.
    pub fn peak(&self) -> Megawatts {
        match self {
            Demand::Static(p) => *p,
            Demand::Series(values) => values
                .iter()
                .filter(|v| !v.is_nan())
                .copied()
                .reduce(Megawatts::max)
                .unwrap_or(Megawatts(f64::NAN)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub id: LoadId,
    pub bus: BusId,
    pub demand: Demand,
}

impl Load {
    pub fn fixed(id: impl Into<String>, bus: impl Into<String>, p_set_mw: f64) -> Self {
        Self {
            id: LoadId::new(id),
            bus: BusId::new(bus),
            demand: Demand::Static(Megawatts(p_set_mw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub id: StoreId,
    pub bus: BusId,
    pub e_nom: MegawattHours,
    pub e_cyclic: bool,
    pub efficiency_store: PerUnit,
    pub efficiency_dispatch: PerUnit,
}

impl Store {
    pub fn new(id: impl Into<String>, bus: impl Into<String>, e_nom_mwh: f64) -> Self {
        Self {
            id: StoreId::new(id),
            bus: BusId::new(bus),
            e_nom: MegawattHours(e_nom_mwh),
            e_cyclic: false,
            efficiency_store: PerUnit(1.0),
            efficiency_dispatch: PerUnit(1.0),
        }
    }
}

/// The immutable network snapshot.
///
/// Entity collections are sorted by identifier, which makes every iteration
/// over a snapshot deterministic.
#[derive(Debug, Clone, Default)]
pub struct Network {
    buses: Vec<Bus>,
    lines: Vec<Line>,
    links: Vec<Link>,
    generators: Vec<Generator>,
    loads: Vec<Load>,
    stores: Vec<Store>,
    bus_index: HashMap<BusId, usize>,
}

impl Network {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::default()
    }

    /// Start a new snapshot from this one's contents.
    pub fn to_builder(&self) -> NetworkBuilder {
        let mut builder = NetworkBuilder::default();
        for bus in &self.buses {
            builder.add_bus(bus.clone());
        }
        for line in &self.lines {
            builder.add_line(line.clone());
        }
        for link in &self.links {
            builder.add_link(link.clone());
        }
        for gen in &self.generators {
            builder.add_generator(gen.clone());
        }
        for load in &self.loads {
            builder.add_load(load.clone());
        }
        for store in &self.stores {
            builder.add_store(store.clone());
        }
        builder
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn bus(&self, id: &BusId) -> Option<&Bus> {
        self.bus_index.get(id).map(|&i| &self.buses[i])
    }

    pub fn contains_bus(&self, id: &BusId) -> bool {
        self.bus_index.contains_key(id)
    }

    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines
            .binary_search_by(|l| l.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.lines[i])
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links
            .binary_search_by(|l| l.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.links[i])
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
            && self.lines.is_empty()
            && self.links.is_empty()
            && self.generators.is_empty()
            && self.loads.is_empty()
            && self.stores.is_empty()
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let regions: HashSet<&RegionCode> = self.buses.iter().map(|b| &b.region).collect();
        NetworkStats {
            num_buses: self.buses.len(),
            num_lines: self.lines.len(),
            num_links: self.links.len(),
            num_generators: self.generators.len(),
            num_loads: self.loads.len(),
            num_stores: self.stores.len(),
            num_regions: regions.len(),
            total_capacity_mw: self
                .generators
                .iter()
                .map(|g| g.available_capacity().finite_or_zero())
                .sum(),
            total_demand_mw: self
                .loads
                .iter()
                .map(|l| l.demand.peak().finite_or_zero())
                .sum(),
        }
    }
}

/// Mutable staging area that produces a [`Network`] snapshot.
///
/// `add_*` methods return `false` and ignore the entity when its identifier
/// was already added, so the first occurrence wins.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    buses: Vec<Bus>,
    lines: Vec<Line>,
    links: Vec<Link>,
    generators: Vec<Generator>,
    loads: Vec<Load>,
    stores: Vec<Store>,
    seen: HashSet<(EntityKind, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EntityKind {
    Bus,
    Line,
    Link,
    Generator,
    Load,
    Store,
}

impl NetworkBuilder {
    fn first_seen(&mut self, kind: EntityKind, id: &str) -> bool {
        self.seen.insert((kind, id.to_string()))
    }

    pub fn add_bus(&mut self, bus: Bus) -> bool {
        let fresh = self.first_seen(EntityKind::Bus, bus.id.as_str());
        if fresh {
            self.buses.push(bus);
        }
        fresh
    }

    pub fn add_line(&mut self, line: Line) -> bool {
        let fresh = self.first_seen(EntityKind::Line, line.id.as_str());
        if fresh {
            self.lines.push(line);
        }
        fresh
    }

    pub fn add_link(&mut self, link: Link) -> bool {
        let fresh = self.first_seen(EntityKind::Link, link.id.as_str());
        if fresh {
            self.links.push(link);
        }
        fresh
    }

    pub fn add_generator(&mut self, gen: Generator) -> bool {
        let fresh = self.first_seen(EntityKind::Generator, gen.id.as_str());
        if fresh {
            self.generators.push(gen);
        }
        fresh
    }

    pub fn add_load(&mut self, load: Load) -> bool {
        let fresh = self.first_seen(EntityKind::Load, load.id.as_str());
        if fresh {
            self.loads.push(load);
        }
        fresh
    }

    pub fn add_store(&mut self, store: Store) -> bool {
        let fresh = self.first_seen(EntityKind::Store, store.id.as_str());
        if fresh {
            self.stores.push(store);
        }
        fresh
    }

    /// Remove a bus together with everything attached to it.
    ///
    /// Generators, loads and stores exist only while their bus does. Edges
    /// touching the bus are kept, since a dangling edge is something the
    /// validator should report rather than silently drop.
    pub fn remove_bus(&mut self, id: &BusId) -> bool {
        let before = self.buses.len();
        self.buses.retain(|b| &b.id != id);
        if self.buses.len() == before {
            return false;
        }
        self.seen.remove(&(EntityKind::Bus, id.as_str().to_string()));

        let mut dropped = Vec::new();
        self.generators.retain(|g| {
            let keep = &g.bus != id;
            if !keep {
                dropped.push((EntityKind::Generator, g.id.as_str().to_string()));
            }
            keep
        });
        self.loads.retain(|l| {
            let keep = &l.bus != id;
            if !keep {
                dropped.push((EntityKind::Load, l.id.as_str().to_string()));
            }
            keep
        });
        self.stores.retain(|s| {
            let keep = &s.bus != id;
            if !keep {
                dropped.push((EntityKind::Store, s.id.as_str().to_string()));
            }
            keep
        });
        for key in &dropped {
            self.seen.remove(key);
        }
        true
    }

    /// Freeze into an immutable snapshot sorted by identifier.
    pub fn build(mut self) -> Network {
        self.buses.sort_by(|a, b| a.id.cmp(&b.id));
        self.lines.sort_by(|a, b| a.id.cmp(&b.id));
        self.links.sort_by(|a, b| a.id.cmp(&b.id));
        self.generators.sort_by(|a, b| a.id.cmp(&b.id));
        self.loads.sort_by(|a, b| a.id.cmp(&b.id));
        self.stores.sort_by(|a, b| a.id.cmp(&b.id));

        let bus_index = self
            .buses
            .iter()
            .enumerate()
            .map(|(i, bus)| (bus.id.clone(), i))
            .collect();

        Network {
            buses: self.buses,
            lines: self.lines,
            links: self.links,
            generators: self.generators,
            loads: self.loads,
            stores: self.stores,
            bus_index,
        }
    }
}

/// Statistics about a network's size and capacity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_lines: usize,
    pub num_links: usize,
    pub num_generators: usize,
    pub num_loads: usize,
    pub num_stores: usize,
    pub num_regions: usize,
    pub total_capacity_mw: f64,
    pub total_demand_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses in {} regions, {} lines, {} links, {} generators ({:.0} MW), {} loads ({:.0} MW), {} stores",
            self.num_buses,
            self.num_regions,
            self.num_lines,
            self.num_links,
            self.num_generators,
            self.total_capacity_mw,
            self.num_loads,
            self.total_demand_mw,
            self.num_stores
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_region_network() -> Network {
        let mut builder = Network::builder();
        builder.add_bus(Bus::new("B 1", Carrier::Electricity, RegionCode::new("B")));
        builder.add_bus(Bus::new("A 1", Carrier::Electricity, RegionCode::new("A")));
        builder.add_generator(Generator::new("A 1 gas", "A 1").with_p_nom(100.0));
        builder.add_load(Load::fixed("B 1 load", "B 1", 50.0));
        builder.add_line(Line::new("L1", "A 1", "B 1").with_s_nom(40.0));
        builder.build()
    }

    #[test]
    fn test_build_sorts_by_id() {
        let network = two_region_network();
        let ids: Vec<_> = network.buses().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["A 1", "B 1"]);
        assert_eq!(
            network.bus(&BusId::new("B 1")).map(|b| &b.region),
            Some(&RegionCode::new("B"))
        );
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut builder = Network::builder();
        assert!(builder.add_bus(Bus::new("X 1", Carrier::Heat, RegionCode::new("X"))));
        assert!(!builder.add_bus(Bus::new("X 1", Carrier::Hydrogen, RegionCode::new("X"))));
        // Same identifier in a different collection is fine
        assert!(builder.add_line(Line::new("X 1", "X 1", "X 1")));

        let network = builder.build();
        assert_eq!(network.buses().len(), 1);
        assert_eq!(network.buses()[0].carrier, Carrier::Heat);
    }

    #[test]
    fn test_region_derivation() {
        let seps = [' ', '_'];
        assert_eq!(
            RegionCode::derive("DE0 0 H2", &seps),
            Some(RegionCode::new("DE0"))
        );
        assert_eq!(
            RegionCode::derive("GB_north heat", &seps),
            Some(RegionCode::new("GB"))
        );
        assert_eq!(RegionCode::derive("FR", &seps), Some(RegionCode::new("FR")));
        assert_eq!(RegionCode::derive(" leading", &seps), None);
        assert_eq!(RegionCode::derive("", &seps), None);
    }

    #[test]
    fn test_carrier_parsing() {
        assert_eq!(Carrier::parse("AC"), Carrier::Electricity);
        assert_eq!(Carrier::parse("DC"), Carrier::Electricity);
        assert_eq!(Carrier::parse("urban heat"), Carrier::Heat);
        assert_eq!(Carrier::parse("H2"), Carrier::Hydrogen);
        assert_eq!(
            Carrier::parse("gas"),
            Carrier::Other("gas".to_string())
        );
        assert_eq!(Carrier::Hydrogen.to_string(), "hydrogen");
    }

    #[test]
    fn test_link_ports() {
        let chp = Link::new("chp", "A gas", "A 1")
            .with_efficiency(0.4)
            .with_port("A heat", 0.45)
            .with_p_nom(10.0);
        assert_eq!(chp.ports().len(), 3);
        assert_eq!(chp.bus0().as_str(), "A gas");
        assert_eq!(chp.bus1().as_str(), "A 1");
        assert!((chp.ports()[2].efficiency.value() - 0.45).abs() < 1e-12);

        let capped = chp
            .clone()
            .with_port("A h2", 0.1)
            .with_port("A extra", 0.1);
        assert_eq!(capped.ports().len(), 4);
    }

    #[test]
    fn test_demand_peak() {
        let series = Demand::Series(vec![Megawatts(10.0), Megawatts(f64::NAN), Megawatts(30.0)]);
        assert_eq!(series.peak().value(), 30.0);
        assert!(Demand::Series(vec![]).peak().is_nan());
        assert_eq!(Demand::Static(Megawatts(5.0)).peak().value(), 5.0);
    }

    #[test]
    fn test_available_capacity() {
        let gen = Generator::new("wind", "A 1")
            .with_p_nom(200.0)
            .with_availability(0.3);
        assert!((gen.available_capacity().value() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_network_stats() {
        let stats = two_region_network().stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_regions, 2);
        assert_eq!(stats.num_lines, 1);
        assert!((stats.total_capacity_mw - 100.0).abs() < 1e-9);
        assert!((stats.total_demand_mw - 50.0).abs() < 1e-9);
        assert!(stats.to_string().contains("2 buses in 2 regions"));
    }

    #[test]
    fn test_to_builder_produces_new_snapshot() {
        let original = two_region_network();
        let mut builder = original.to_builder();
        assert!(builder.remove_bus(&BusId::new("A 1")));
        let patched = builder.build();

        assert_eq!(original.buses().len(), 2);
        assert_eq!(patched.buses().len(), 1);
        // Attached generator goes with its bus, the line stays (now dangling)
        assert!(patched.generators().is_empty());
        assert_eq!(patched.lines().len(), 1);
        assert!(!patched.contains_bus(&BusId::new("A 1")));
    }

    #[test]
    fn test_removed_attachments_can_be_added_again() {
        let mut builder = two_region_network().to_builder();
        assert!(builder.remove_bus(&BusId::new("A 1")));
        assert!(builder.add_bus(Bus::new("A 1", Carrier::Electricity, RegionCode::new("A"))));
        assert!(builder.add_generator(Generator::new("A 1 gas", "A 1").with_p_nom(120.0)));
        // Attachments of other buses keep their ids reserved
        assert!(!builder.add_load(Load::fixed("B 1 load", "B 1", 1.0)));

        let patched = builder.build();
        assert_eq!(patched.generators().len(), 1);
        assert_eq!(patched.generators()[0].p_nom.value(), 120.0);
        assert_eq!(patched.loads()[0].demand.peak().value(), 50.0);
    }

    #[test]
    fn test_empty_network() {
        let network = Network::builder().build();
        assert!(network.is_empty());
        assert_eq!(network.stats(), NetworkStats::default());
    }
}
