//! # Shortest paths
//!
//! Dijkstra's algorithm over a small directed graph with dense node indices
//! and non-negative edge weights.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An outgoing edge: its id, the node it leads to, and its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub id: usize,
    pub to: usize,
    pub weight: f64,
}

/// A path found by [`dijkstra`].
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Nodes visited, starting with the start node.
    pub nodes: Vec<usize>,

    /// Ids of the edges taken; one fewer than `nodes`.
    pub edges: Vec<usize>,

    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    cost: f64,
    node: usize,
}

impl Eq for State {}

impl Ord for State {
    // Reversed, so the max-heap pops the cheapest state; ties go to the
    // lowest node index.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The cheapest path from `start` to any node other than `start` that
/// satisfies `is_target`, if one is reachable.
pub fn dijkstra(
    out: &[Vec<Arc>],
    start: usize,
    is_target: impl Fn(usize) -> bool,
) -> Option<Route> {
    let n = out.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut via: Vec<Option<(usize, usize)>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[start] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: start,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        if node != start && is_target(node) {
            let mut nodes = vec![node];
            let mut edges = vec![];
            let mut cur = node;
            while let Some((prev, edge)) = via[cur] {
                nodes.push(prev);
                edges.push(edge);
                cur = prev;
            }
            nodes.reverse();
            edges.reverse();
            return Some(Route { nodes, edges, cost });
        }
        for arc in &out[node] {
            let next = cost + arc.weight;
            if next < dist[arc.to] {
                dist[arc.to] = next;
                via[arc.to] = Some((node, arc.id));
                heap.push(State {
                    cost: next,
                    node: arc.to,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(n: usize, arcs: &[(usize, usize, f64)]) -> Vec<Vec<Arc>> {
        let mut out = vec![vec![]; n];
        for (id, &(from, to, weight)) in arcs.iter().enumerate() {
            out[from].push(Arc { id, to, weight });
        }
        out
    }

    #[test]
    fn cheapest_not_shortest() {
        // 0 -> 3 directly costs 1.5; 0 -> 1 -> 2 -> 3 costs 0.75
        let out = graph(
            4,
            &[(0, 3, 1.5), (0, 1, 0.25), (1, 2, 0.25), (2, 3, 0.25)],
        );
        let route = dijkstra(&out, 0, |n| n == 3).unwrap();
        assert_eq!(route.nodes, vec![0, 1, 2, 3]);
        assert_eq!(route.edges, vec![1, 2, 3]);
        assert_eq!(route.cost, 0.75);
    }

    #[test]
    fn nearest_target_wins() {
        let out = graph(4, &[(0, 1, 1.0), (0, 2, 0.5), (1, 3, 0.1)]);
        let route = dijkstra(&out, 0, |n| n == 2 || n == 3).unwrap();
        assert_eq!(route.nodes, vec![0, 2]);
    }

    #[test]
    fn start_is_never_a_target() {
        let out = graph(2, &[(1, 0, 1.0)]);
        assert_eq!(dijkstra(&out, 0, |_| true), None);
    }

    #[test]
    fn unreachable() {
        let out = graph(3, &[(1, 2, 1.0)]);
        assert_eq!(dijkstra(&out, 0, |n| n == 2), None);
    }
}
