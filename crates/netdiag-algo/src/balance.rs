//! Regional supply/demand balance per (region, carrier).

use crate::config::BalanceConfig;
use netdiag_core::{BusId, Carrier, Generator, MegawattHours, Megawatts, Network, RegionCode};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalBalance {
    pub region: RegionCode,
    pub carrier: Carrier,
    /// Available capacity of non-slack generators
    pub generation: Megawatts,
    /// Available capacity of slack generators, kept out of `generation`
    pub slack_generation: Megawatts,
    /// Static demand, or the peak of a demand series
    pub demand: Megawatts,
    pub store_energy: MegawattHours,
    /// `generation - demand`
    pub net: Megawatts,
    pub deficient: bool,
    /// Non-finite values left out of the sums
    pub skipped_values: usize,
}

impl RegionalBalance {
    fn empty(region: RegionCode, carrier: Carrier) -> Self {
        Self {
            region,
            carrier,
            generation: Megawatts::default(),
            slack_generation: Megawatts::default(),
            demand: Megawatts::default(),
            store_energy: MegawattHours::default(),
            net: Megawatts::default(),
            deficient: false,
            skipped_values: 0,
        }
    }

    /// Shortfall as a positive number, zero when not deficient
    pub fn deficit(&self) -> Megawatts {
        if self.deficient {
            -self.net
        } else {
            Megawatts::default()
        }
    }
}

/// True for fallback generators that only exist to keep a model solvable.
pub fn is_slack(gen: &Generator, config: &BalanceConfig) -> bool {
    if gen.marginal_cost >= config.slack_marginal_cost {
        return true;
    }
    let name = gen.id.as_str().to_lowercase();
    let label = gen.carrier.to_lowercase();
    config.slack_markers.iter().any(|marker| {
        let marker = marker.to_lowercase();
        !marker.is_empty() && (name.contains(&marker) || label.contains(&marker))
    })
}

/// Aggregate every (region, carrier) that has at least one bus, sorted by
/// region then carrier. Entities on unknown buses are left out.
pub fn aggregate(network: &Network, config: &BalanceConfig) -> Vec<RegionalBalance> {
    let mut balances: BTreeMap<(RegionCode, Carrier), RegionalBalance> = BTreeMap::new();
    for bus in network.buses() {
        let key = (bus.region.clone(), bus.carrier.clone());
        balances
            .entry(key)
            .or_insert_with(|| RegionalBalance::empty(bus.region.clone(), bus.carrier.clone()));
    }

    let slot = |bus_id: &BusId| {
        network
            .bus(bus_id)
            .map(|bus| (bus.region.clone(), bus.carrier.clone()))
    };

    let mut updates: Vec<((RegionCode, Carrier), Contribution)> = Vec::new();
    for gen in network.generators() {
        if let Some(key) = slot(&gen.bus) {
            let capacity = gen.available_capacity();
            let contribution = if is_slack(gen, config) {
                Contribution::Slack(capacity)
            } else {
                Contribution::Generation(capacity)
            };
            updates.push((key, contribution));
        }
    }
    for load in network.loads() {
        if let Some(key) = slot(&load.bus) {
            updates.push((key, Contribution::Demand(load.demand.peak())));
        }
    }
    for store in network.stores() {
        if let Some(key) = slot(&store.bus) {
            updates.push((key, Contribution::Store(store.e_nom)));
        }
    }

    for (key, contribution) in updates {
        if let Some(balance) = balances.get_mut(&key) {
            contribution.apply(balance);
        }
    }

    let balances: Vec<RegionalBalance> = balances
        .into_values()
        .map(|mut b| {
            b.net = b.generation - b.demand;
            b.deficient = b.net.value() < 0.0;
            b
        })
        .collect();
    debug!(
        pairs = balances.len(),
        deficient = balances.iter().filter(|b| b.deficient).count(),
        "regional balances aggregated"
    );
    balances
}

enum Contribution {
    Generation(Megawatts),
    Slack(Megawatts),
    Demand(Megawatts),
    Store(MegawattHours),
}

impl Contribution {
    fn apply(self, balance: &mut RegionalBalance) {
        let finite = match self {
            Contribution::Generation(p) | Contribution::Slack(p) | Contribution::Demand(p) => {
                p.is_finite()
            }
            Contribution::Store(e) => e.is_finite(),
        };
        if !finite {
            balance.skipped_values += 1;
            return;
        }
        match self {
            Contribution::Generation(p) => balance.generation += p,
            Contribution::Slack(p) => balance.slack_generation += p,
            Contribution::Demand(p) => balance.demand += p,
            Contribution::Store(e) => balance.store_energy += e,
        }
    }
}
