//! Read-only measurements of a finished layout.

use crate::algo::crossings;
use crate::algo::model::SimGraph;
use crate::graph::{Graph, LayoutResult};
use crate::options::LayoutOptions;

/// Summary of how well a layout meets the engine's goals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutQuality {
    /// Pairs of non-adjacent edges that properly intersect.
    pub crossings: usize,
    /// Smallest `distance / (r_a + r_b)` over all node pairs; `1.0` means two footprints touch.
    pub min_separation_ratio: f64,
    /// Pairs of nodes with disjoint group memberships closer than
    /// [`LayoutOptions::group_separation_floor`].
    pub group_violations: usize,
}

impl LayoutQuality {
    pub fn measure(graph: &Graph, result: &LayoutResult, opts: &LayoutOptions) -> Self {
        let sim = positioned(graph, result, opts);
        Self {
            crossings: crossings::count_crossings(&sim),
            min_separation_ratio: separation_ratio(&sim),
            group_violations: violations(&sim, opts),
        }
    }
}

pub fn count_crossings(graph: &Graph, result: &LayoutResult) -> usize {
    crossings::count_crossings(&positioned(graph, result, &LayoutOptions::default()))
}

/// Returns `f64::INFINITY` for graphs with fewer than two nodes.
pub fn min_separation_ratio(graph: &Graph, result: &LayoutResult, opts: &LayoutOptions) -> f64 {
    separation_ratio(&positioned(graph, result, opts))
}

pub fn group_violations(graph: &Graph, result: &LayoutResult, opts: &LayoutOptions) -> usize {
    violations(&positioned(graph, result, opts), opts)
}

/// Nodes missing from `result` keep the origin.
fn positioned(graph: &Graph, result: &LayoutResult, opts: &LayoutOptions) -> SimGraph {
    let mut sim = SimGraph::from_graph(graph, opts);
    for n in &mut sim.nodes {
        if let Some(p) = result.get(&n.id) {
            n.x = p.x;
            n.y = p.y;
        }
    }
    sim
}

fn separation_ratio(sim: &SimGraph) -> f64 {
    let mut best = f64::INFINITY;
    for i in 0..sim.len() {
        for j in (i + 1)..sim.len() {
            let (a, b) = (&sim.nodes[i], &sim.nodes[j]);
            let d = (a.x - b.x).hypot(a.y - b.y);
            best = best.min(d / (a.radius + b.radius));
        }
    }
    best
}

fn violations(sim: &SimGraph, opts: &LayoutOptions) -> usize {
    let floor = opts.group_separation_floor();
    let mut count = 0;
    for i in 0..sim.len() {
        for j in (i + 1)..sim.len() {
            if !sim.disjoint(i, j) {
                continue;
            }
            let (a, b) = (&sim.nodes[i], &sim.nodes[j]);
            if (a.x - b.x).hypot(a.y - b.y) < floor {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Group, Node, Point};

    fn result(points: &[(&str, f64, f64)]) -> LayoutResult {
        LayoutResult {
            positions: points
                .iter()
                .map(|(id, x, y)| (id.to_string(), Point { x: *x, y: *y }))
                .collect(),
        }
    }

    #[test]
    fn measures_a_hand_placed_layout() {
        let g = Graph::new(
            ["a", "b", "c", "d"]
                .iter()
                .map(|id| Node::new(*id, 40.0, 20.0))
                .collect(),
            vec![Edge::new("a", "b"), Edge::new("c", "d")],
        )
        .with_groups(vec![Group::new("g1", ["a"]), Group::new("g2", ["c"])]);
        let r = result(&[
            ("a", 500.0, 500.0),
            ("b", 600.0, 600.0),
            ("c", 500.0, 600.0),
            ("d", 600.0, 500.0),
        ]);
        let opts = LayoutOptions::default();
        let q = LayoutQuality::measure(&g, &r, &opts);
        assert_eq!(q.crossings, 1);
        assert_eq!(q.group_violations, 1);
        assert!((q.min_separation_ratio - 100.0 / 48.0).abs() < 1e-9);
    }

    #[test]
    fn single_node_has_infinite_separation() {
        let g = Graph::new(vec![Node::new("a", 40.0, 20.0)], Vec::new());
        let r = result(&[("a", 800.0, 600.0)]);
        assert_eq!(
            min_separation_ratio(&g, &r, &LayoutOptions::default()),
            f64::INFINITY
        );
        assert_eq!(count_crossings(&g, &r), 0);
    }
}
