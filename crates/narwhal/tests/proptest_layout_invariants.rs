//! Property-based invariant tests for the layout engine.
//!
//! 1. Every distinct node id gets exactly one finite, in-bounds position.
//! 2. Nodes with fully disjoint group memberships respect the separation floor.
//! 3. Small ungrouped graphs have no severe footprint overlap.
//! 4. Layouts are reproducible for a fixed seed.

use narwhal::{Edge, Graph, Group, LayoutOptions, Node, quality};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn id(i: usize) -> String {
    format!("n{i}")
}

fn graph_strategy(max_nodes: usize) -> impl Strategy<Value = Graph> {
    (2..=max_nodes).prop_flat_map(|n| {
        (
            prop::collection::vec((20.0f64..80.0, 16.0f64..60.0), n),
            prop::collection::vec((0..n, 0..n), 0..(2 * n)),
        )
            .prop_map(|(sizes, pairs)| {
                let nodes = sizes
                    .into_iter()
                    .enumerate()
                    .map(|(i, (w, h))| Node::new(id(i), w, h))
                    .collect();
                let edges = pairs
                    .into_iter()
                    .map(|(a, b)| Edge::new(id(a), id(b)))
                    .collect();
                Graph::new(nodes, edges)
            })
    })
}

/// Small graphs with two or three groups; each node joins any subset of them.
fn grouped_graph_strategy() -> impl Strategy<Value = Graph> {
    (4usize..=10, 2usize..=3).prop_flat_map(|(n, groups)| {
        (
            prop::collection::vec(0u8..(1 << groups), n),
            prop::collection::vec((0..n, 0..n), 0..n),
        )
            .prop_map(move |(masks, pairs)| {
                let nodes = (0..n).map(|i| Node::new(id(i), 40.0, 24.0)).collect();
                let edges = pairs
                    .into_iter()
                    .map(|(a, b)| Edge::new(id(a), id(b)))
                    .collect();
                let groups = (0..groups)
                    .map(|g| {
                        let members = masks
                            .iter()
                            .enumerate()
                            .filter(|(_, m)| **m & (1 << g) != 0)
                            .map(|(i, _)| id(i));
                        Group::new(format!("g{g}"), members)
                    })
                    .collect();
                Graph::new(nodes, edges).with_groups(groups)
            })
    })
}

fn memberships(graph: &Graph, node: &str) -> Vec<usize> {
    graph
        .groups
        .iter()
        .enumerate()
        .filter(|(_, g)| g.members.contains(node))
        .map(|(i, _)| i)
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Coverage and bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_node_is_placed_inside_the_canvas(g in graph_strategy(20)) {
        let opts = LayoutOptions::default();
        let out = narwhal::layout(&g, &opts);
        prop_assert_eq!(out.len(), g.nodes.len());
        for n in &g.nodes {
            let p = out.get(&n.id);
            prop_assert!(p.is_some(), "missing {}", n.id);
            let p = p.unwrap();
            prop_assert!(p.x.is_finite() && p.y.is_finite());
            prop_assert!(p.x >= opts.padding && p.x <= opts.width - opts.padding);
            prop_assert!(p.y >= opts.padding && p.y <= opts.height - opts.padding);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Disjoint-group separation floor
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn disjoint_memberships_respect_the_floor(g in grouped_graph_strategy()) {
        let opts = LayoutOptions::default();
        let out = narwhal::layout(&g, &opts);
        let floor = opts.group_separation_floor();
        for (i, a) in g.nodes.iter().enumerate() {
            let ga = memberships(&g, &a.id);
            for b in &g.nodes[i + 1..] {
                let gb = memberships(&g, &b.id);
                if ga.is_empty() || gb.is_empty() || ga.iter().any(|x| gb.contains(x)) {
                    continue;
                }
                let d = out.positions[&a.id].distance(&out.positions[&b.id]);
                prop_assert!(d >= floor - 1.0, "{}-{}: {} < {}", a.id, b.id, d, floor);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. No severe overlap
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn footprints_do_not_overlap(g in graph_strategy(30)) {
        let opts = LayoutOptions::default();
        let out = narwhal::layout(&g, &opts);
        let ratio = quality::min_separation_ratio(&g, &out, &opts);
        prop_assert!(ratio >= 1.4 - 0.05, "min separation ratio {}", ratio);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn fixed_seed_is_reproducible(g in graph_strategy(12), seed in any::<u64>()) {
        let opts = LayoutOptions { random_seed: seed, ..Default::default() };
        prop_assert_eq!(narwhal::layout(&g, &opts), narwhal::layout(&g, &opts));
    }
}
