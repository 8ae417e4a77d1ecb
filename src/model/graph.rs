use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::error::{Result, RouteLabError};

/// Undirected, unit-weight adjacency graph: node id -> set of neighbor ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    adj: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an undirected unit-weight graph from a `{id: [neighbor_ids]}`
    /// mapping: every key becomes a vertex even with an empty neighbor
    /// list, the reverse edge is inserted if missing, and no vertex
    /// appears twice in an adjacency list.
    pub fn from_topology(cfg: &BTreeMap<String, Vec<String>>) -> Self {
        let mut graph = Self::new();
        for node in cfg.keys() {
            graph.adj.entry(node.clone()).or_default();
        }
        for (node, neighbors) in cfg {
            for neighbor in neighbors {
                graph.add_edge(node, neighbor);
            }
        }
        graph
    }

    fn add_edge(&mut self, u: &str, v: &str) {
        self.adj
            .entry(u.to_string())
            .or_default()
            .insert(v.to_string());
        self.adj
            .entry(v.to_string())
            .or_default()
            .insert(u.to_string());
    }

    pub fn contains(&self, node: &str) -> bool {
        self.adj.contains_key(node)
    }

    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.adj
            .get(node)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adj.keys().map(String::as_str)
    }

    /// True when the adjacency relation is symmetric: `v in adj[u]` implies
    /// `u in adj[v]` for every edge. `from_topology` always produces a
    /// symmetric graph; this is exercised directly by tests.
    pub fn is_symmetric(&self) -> bool {
        self.adj.iter().all(|(u, neighbors)| {
            neighbors
                .iter()
                .all(|v| self.adj.get(v).is_some_and(|back| back.contains(u)))
        })
    }
}

#[derive(Debug, Clone)]
pub struct DijkstraResult {
    pub dist: BTreeMap<String, f64>,
    pub prev: BTreeMap<String, Option<String>>,
}

#[derive(PartialEq)]
struct HeapEntry {
    cost: f64,
    node: String,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse by cost (min-heap via std's max-heap BinaryHeap), then
        // break ties deterministically by node id.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Standard binary-heap Dijkstra over a unit-weight graph. Unreachable
/// vertices retain distance `+inf` and `prev = None`.
pub fn dijkstra(graph: &Graph, source: &str) -> Result<DijkstraResult> {
    if !graph.contains(source) {
        return Err(RouteLabError::UnknownSource(source.to_string()));
    }

    let mut dist: BTreeMap<String, f64> = graph
        .nodes()
        .map(|node| (node.to_string(), f64::INFINITY))
        .collect();
    let mut prev: BTreeMap<String, Option<String>> =
        graph.nodes().map(|node| (node.to_string(), None)).collect();
    dist.insert(source.to_string(), 0.0);

    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry {
        cost: 0.0,
        node: source.to_string(),
    });

    while let Some(HeapEntry { cost, node: u }) = heap.pop() {
        if !visited.insert(u.clone()) {
            continue;
        }
        if cost > dist[&u] {
            continue;
        }

        for v in graph.neighbors(&u) {
            let candidate = cost + 1.0;
            if candidate < dist[v] {
                dist.insert(v.to_string(), candidate);
                prev.insert(v.to_string(), Some(u.clone()));
                heap.push(HeapEntry {
                    cost: candidate,
                    node: v.to_string(),
                });
            }
        }
    }

    Ok(DijkstraResult { dist, prev })
}

/// Walks `prev` from each reachable `dest` back toward `source`; the node
/// whose `prev` is `source` is the first hop. Destinations whose `prev`
/// chain doesn't terminate at `source` are omitted.
pub fn build_next_hop(
    prev: &BTreeMap<String, Option<String>>,
    source: &str,
) -> BTreeMap<String, String> {
    let mut next_hop = BTreeMap::new();
    for dest in prev.keys() {
        if dest == source || prev.get(dest).cloned().flatten().is_none() {
            continue;
        }

        let mut cur = dest.clone();
        loop {
            let Some(p) = prev.get(&cur).cloned().flatten() else {
                break;
            };
            if p == source {
                next_hop.insert(dest.clone(), cur);
                break;
            }
            cur = p;
        }
    }
    next_hop
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(node, neighbors)| {
                (
                    node.to_string(),
                    neighbors.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect()
    }

    fn chain_topology() -> BTreeMap<String, Vec<String>> {
        topo(&[
            ("A", &["B"]),
            ("B", &["A", "C"]),
            ("C", &["B", "D"]),
            ("D", &["C", "E"]),
            ("E", &["D"]),
        ])
    }

    #[test]
    fn from_topology_symmetrizes_and_dedupes() {
        let mut cfg = BTreeMap::new();
        cfg.insert("A".to_string(), vec!["B".to_string(), "B".to_string()]);
        cfg.insert("B".to_string(), vec![]);
        cfg.insert("C".to_string(), vec![]);

        let graph = Graph::from_topology(&cfg);
        assert!(graph.contains("C"));
        assert_eq!(graph.neighbors("A").count(), 1);
        assert!(graph.neighbors("B").any(|n| n == "A"));
        assert!(graph.is_symmetric());
    }

    #[test]
    fn dijkstra_unknown_source_fails() {
        let graph = Graph::from_topology(&chain_topology());
        let err = dijkstra(&graph, "Z").unwrap_err();
        assert!(matches!(err, RouteLabError::UnknownSource(_)));
    }

    #[test]
    fn dijkstra_finds_shortest_chain_distance() {
        let graph = Graph::from_topology(&chain_topology());
        let result = dijkstra(&graph, "A").expect("source is in graph");
        assert_eq!(result.dist["E"], 4.0);
        assert_eq!(result.dist["A"], 0.0);
    }

    #[test]
    fn dijkstra_leaves_unreachable_nodes_at_infinity() {
        let mut cfg = chain_topology();
        cfg.insert("Z".to_string(), vec![]);
        let graph = Graph::from_topology(&cfg);
        let result = dijkstra(&graph, "A").expect("source is in graph");
        assert_eq!(result.dist["Z"], f64::INFINITY);
        assert_eq!(result.prev["Z"], None);
    }

    #[test]
    fn build_next_hop_points_to_first_hop_neighbor() {
        let graph = Graph::from_topology(&chain_topology());
        let result = dijkstra(&graph, "A").expect("source is in graph");
        let next_hop = build_next_hop(&result.prev, "A");
        assert_eq!(next_hop["E"], "B");
        assert_eq!(next_hop["B"], "B");
        assert!(graph.neighbors("A").any(|n| n == next_hop["E"]));
    }
}
