//! Module for analysing the transmission network
use crate::id::NodeID;
use crate::model::sets::Sets;
use itertools::Itertools;
use log::warn;
use petgraph::Undirected;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::Graph;

/// An undirected graph with a vertex per node and an edge per transmission arc
type NetworkGraph = Graph<NodeID, (), Undirected>;

/// Create the transmission network graph for the given sets
fn create_network_graph(sets: &Sets) -> NetworkGraph {
    let mut graph = NetworkGraph::default();
    let vertices: Vec<_> = sets
        .nodes
        .iter()
        .map(|node| graph.add_node(node.clone()))
        .collect();
    for (a, b) in &sets.arcs {
        // Arcs only ever join nodes of the model
        if let (Some(a), Some(b)) = (sets.nodes.get_index_of(a), sets.nodes.get_index_of(b)) {
            graph.add_edge(vertices[a], vertices[b], ());
        }
    }

    graph
}

/// Groups of nodes which are connected to each other but not to the rest of the network.
///
/// Each group is sorted by node position and groups are ordered by their first node.
pub fn network_islands(sets: &Sets) -> Vec<Vec<NodeID>> {
    let graph = create_network_graph(sets);
    let mut islands: Vec<Vec<_>> = kosaraju_scc(&graph)
        .into_iter()
        .map(|component| component.into_iter().sorted().collect())
        .collect();
    islands.sort_by_key(|island| island[0]);

    islands
        .into_iter()
        .map(|island| island.into_iter().map(|idx| graph[idx].clone()).collect())
        .collect()
}

/// Check the network for disconnected parts and nodes which cannot meet any load themselves.
///
/// Neither condition makes the model invalid, so only warnings are raised.
pub fn check_network(sets: &Sets) {
    let islands = network_islands(sets);
    if islands.len() > 1 {
        warn!(
            "The transmission network has {} disconnected parts: {}",
            islands.len(),
            islands
                .iter()
                .map(|island| format!("[{}]", island.iter().join(", ")))
                .join(", ")
        );
    }

    for (n, node) in sets.nodes.iter().enumerate() {
        if sets.ng_of_node(n).is_empty() && sets.nb_of_node(n).is_empty() {
            let isolated = sets.links_into(n).is_empty();
            if isolated {
                warn!("Node {node} has no generators, storage or imports; its load will be shed");
            }
        }
    }
}
