//! Undirected topology view over a [`Network`] snapshot.
//!
//! Nodes are the snapshot's buses, inserted in ascending identifier order so
//! that `NodeIndex` order equals identifier order. Edges are lines and links;
//! a multi-port link contributes one edge from its input port to each of its
//! resolvable output ports. Edges whose endpoints do not resolve to a known
//! bus are left out of the graph (the validator reports them separately).

use crate::{BusId, LineId, LinkId, Network};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, VecDeque};

/// Edge weight: which line or link port pair the edge came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    Line(LineId),
    /// Link edge from port 0 to port `port`
    Link { id: LinkId, port: usize },
}

#[derive(Debug, Clone)]
pub struct Topology {
    pub graph: UnGraph<BusId, Edge>,
    index: HashMap<BusId, NodeIndex>,
}

impl Topology {
    pub fn build(network: &Network) -> Self {
        let mut graph = UnGraph::with_capacity(network.buses().len(), network.lines().len());
        let mut index = HashMap::with_capacity(network.buses().len());
        for bus in network.buses() {
            let node = graph.add_node(bus.id.clone());
            index.insert(bus.id.clone(), node);
        }

        for line in network.lines() {
            if let (Some(&a), Some(&b)) = (index.get(&line.bus0), index.get(&line.bus1)) {
                graph.add_edge(a, b, Edge::Line(line.id.clone()));
            }
        }

        for link in network.links() {
            let Some(&input) = index.get(link.bus0()) else {
                continue;
            };
            if !index.contains_key(link.bus1()) {
                continue;
            }
            for (port, out) in link.ports().iter().enumerate().skip(1) {
                if let Some(&output) = index.get(&out.bus) {
                    graph.add_edge(
                        input,
                        output,
                        Edge::Link {
                            id: link.id.clone(),
                            port,
                        },
                    );
                }
            }
        }

        Self { graph, index }
    }

    pub fn node(&self, id: &BusId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of incident edges, counting parallel edges separately
    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    /// Distinct neighbours in ascending identifier order
    pub fn sorted_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    /// Multi-source breadth-first search. Returns a visited flag per node
    /// index; seeds are expanded in the order given.
    pub fn reachable_from<I>(&self, seeds: I) -> Vec<bool>
    where
        I: IntoIterator<Item = NodeIndex>,
    {
        let mut visited = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::new();
        for seed in seeds {
            if !visited[seed.index()] {
                visited[seed.index()] = true;
                queue.push_back(seed);
            }
        }
        while let Some(node) = queue.pop_front() {
            for neighbor in self.sorted_neighbors(node) {
                if !visited[neighbor.index()] {
                    visited[neighbor.index()] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        visited
    }

    pub fn island_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Labels connected components by breadth-first search. Islands are
    /// numbered in order of their smallest bus identifier.
    pub fn islands(&self) -> IslandAnalysis {
        let mut island_of = vec![usize::MAX; self.graph.node_count()];
        let mut sizes = Vec::new();
        for start in self.graph.node_indices() {
            if island_of[start.index()] != usize::MAX {
                continue;
            }
            let island_id = sizes.len();
            let mut queue = VecDeque::from([start]);
            island_of[start.index()] = island_id;
            let mut members = 0;
            while let Some(node) = queue.pop_front() {
                members += 1;
                for neighbor in self.graph.neighbors(node) {
                    if island_of[neighbor.index()] == usize::MAX {
                        island_of[neighbor.index()] = island_id;
                        queue.push_back(neighbor);
                    }
                }
            }
            sizes.push(members);
        }
        IslandAnalysis { island_of, sizes }
    }
}

/// Component membership of every bus
#[derive(Debug, Clone, Default)]
pub struct IslandAnalysis {
    island_of: Vec<usize>,
    sizes: Vec<usize>,
}

impl IslandAnalysis {
    pub fn island_of(&self, node: NodeIndex) -> usize {
        self.island_of[node.index()]
    }

    pub fn size_of(&self, island: usize) -> usize {
        self.sizes.get(island).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bus, Carrier, Line, Link, RegionCode};

    fn bus(id: &str) -> Bus {
        let region = RegionCode::derive(id, &[' ']).unwrap_or_else(|| RegionCode::new("?"));
        Bus::new(id, Carrier::Electricity, region)
    }

    fn sample() -> Network {
        let mut b = Network::builder();
        for id in ["A 1", "A 2", "B 1", "C 1", "C heat"] {
            b.add_bus(bus(id));
        }
        b.add_line(Line::new("l1", "A 1", "A 2"));
        b.add_line(Line::new("l2", "A 2", "B 1"));
        b.add_line(Line::new("l3", "A 2", "B 1"));
        b.add_line(Line::new("dangling", "A 1", "Z 9"));
        b.add_link(Link::new("hp", "C 1", "C heat"));
        b.build()
    }

    #[test]
    fn test_nodes_follow_id_order() {
        let topo = Topology::build(&sample());
        let ids: Vec<_> = topo
            .graph
            .node_indices()
            .map(|n| topo.graph[n].as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["A 1", "A 2", "B 1", "C 1", "C heat"]);
    }

    #[test]
    fn test_dangling_edges_are_skipped() {
        let topo = Topology::build(&sample());
        // l1, l2, l3 and the link; "dangling" has no graph edge
        assert_eq!(topo.graph.edge_count(), 4);
        let a1 = topo.node(&BusId::new("A 1")).unwrap();
        assert_eq!(topo.degree(a1), 1);
    }

    #[test]
    fn test_parallel_edges_and_sorted_neighbors() {
        let topo = Topology::build(&sample());
        let a2 = topo.node(&BusId::new("A 2")).unwrap();
        assert_eq!(topo.degree(a2), 3);
        let neighbors: Vec<_> = topo
            .sorted_neighbors(a2)
            .into_iter()
            .map(|n| topo.graph[n].as_str())
            .collect();
        assert_eq!(neighbors, vec!["A 1", "B 1"]);
    }

    #[test]
    fn test_reachability_from_seed() {
        let topo = Topology::build(&sample());
        let seed = topo.node(&BusId::new("B 1")).unwrap();
        let visited = topo.reachable_from([seed]);
        assert_eq!(visited, vec![true, true, true, false, false]);
        assert!(topo.reachable_from(std::iter::empty()).iter().all(|v| !v));
    }

    #[test]
    fn test_islands() {
        let topo = Topology::build(&sample());
        let islands = topo.islands();
        assert_eq!(topo.island_count(), 2);
        let c1 = topo.node(&BusId::new("C 1")).unwrap();
        assert_eq!(islands.island_of(c1), 1);
        assert_eq!(islands.size_of(0), 3);
        assert_eq!(islands.size_of(1), 2);
    }

    #[test]
    fn test_link_with_dangling_primary_output_is_skipped() {
        let mut b = Network::builder();
        b.add_bus(bus("A 1"));
        b.add_bus(bus("A heat"));
        b.add_link(Link::new("chp", "A 1", "missing").with_port("A heat", 0.5));
        let topo = Topology::build(&b.build());
        assert_eq!(topo.graph.edge_count(), 0);
    }
}
