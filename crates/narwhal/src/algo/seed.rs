//! Deterministic starting positions.

use super::clusters::Clusters;
use super::model::SimGraph;
use super::rng::XorShift64Star;
use crate::options::LayoutOptions;
use std::f64::consts::TAU;

/// Arc length reserved per slot when sizing a ring.
const SLOT_ARC: f64 = 100.0;
/// Two seeds closer than this trigger the stack-breaking jitter.
const STACK_DISTANCE: f64 = 50.0;
const STACK_JITTER: f64 = 100.0;
const MULTI_GROUP_JITTER: f64 = 10.0;
/// Orbit factor for the common "one big cluster plus one small one" case.
const PAIR_ORBIT: f64 = 0.6;
const ORBIT_GROWTH: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeedStrategy {
    Rings,
    Groups,
}

pub(crate) fn seed_positions(
    sim: &mut SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    strategy: SeedStrategy,
    rng: &mut XorShift64Star,
) {
    if sim.is_empty() {
        return;
    }
    match strategy {
        SeedStrategy::Groups if sim.has_groups() => seed_grouped(sim, opts, rng),
        _ => seed_rings(sim, clusters, opts),
    }

    if opts.use_existing_positions {
        for n in &mut sim.nodes {
            if let Some((x, y)) = n.prior {
                n.x = x;
                n.y = y;
            }
        }
    }

    break_stacks(sim, rng);
    sim.clamp_all(opts);
}

/// Ring spacing large enough for the configured link length and the biggest footprint.
fn ring_spacing(sim: &SimGraph, opts: &LayoutOptions) -> f64 {
    let max_radius = sim.nodes.iter().map(|n| n.radius).fold(0.0, f64::max);
    opts.target_link_distance.max(2.2 * max_radius)
}

fn ring_capacity(ring: usize, spacing: f64) -> usize {
    let circumference = TAU * ring as f64 * spacing;
    (6 * ring).max((circumference / SLOT_ARC).floor() as usize)
}

/// Places `order` on concentric rings around the origin, innermost first, and returns the radius
/// of the outermost ring used.
fn place_rings(sim: &mut SimGraph, order: &[usize], spacing: f64) -> f64 {
    let mut ring = 0usize;
    let mut slot = 0usize;
    let mut capacity = 1usize;
    let mut outer = 0.0f64;
    for &v in order {
        if slot == capacity {
            ring += 1;
            slot = 0;
            capacity = ring_capacity(ring, spacing);
        }
        let (x, y) = if ring == 0 {
            (0.0, 0.0)
        } else {
            let r = ring as f64 * spacing;
            let a = TAU * slot as f64 / capacity as f64;
            outer = r;
            (r * a.cos(), r * a.sin())
        };
        sim.nodes[v].x = x;
        sim.nodes[v].y = y;
        slot += 1;
    }
    outer
}

/// Moves `members` so their centroid lands on `(cx, cy)`; returns the largest member distance
/// from that point.
fn center_on(sim: &mut SimGraph, members: &[usize], cx: f64, cy: f64) -> f64 {
    let Some((mx, my)) = sim.centroid(members) else {
        return 0.0;
    };
    sim.translate(members, cx - mx, cy - my);
    members
        .iter()
        .map(|&i| (sim.nodes[i].x - cx).hypot(sim.nodes[i].y - cy))
        .fold(0.0, f64::max)
}

fn seed_rings(sim: &mut SimGraph, clusters: &Clusters, opts: &LayoutOptions) {
    let spacing = ring_spacing(sim, opts);
    let (cx, cy) = opts.center();

    let Some((main, rest)) = clusters.components.split_first() else {
        return;
    };
    let order = clusters.ring_order(sim, main);
    place_rings(sim, &order, spacing);
    let main_radius = center_on(sim, main, cx, cy);

    let m = rest.len();
    if m == 0 {
        return;
    }
    let orbit = if m == 1 {
        PAIR_ORBIT
    } else {
        1.0 + ORBIT_GROWTH * (m as f64).ln()
    };
    for (i, comp) in rest.iter().enumerate() {
        let order = clusters.ring_order(sim, comp);
        place_rings(sim, &order, spacing);
        let local_radius = center_on(sim, comp, 0.0, 0.0);
        let angle = TAU * i as f64 / m as f64;
        let distance =
            main_radius + local_radius + spacing * (comp.len() as f64).sqrt() * orbit;
        sim.translate(comp, cx + distance * angle.cos(), cy + distance * angle.sin());
    }
}

fn seed_grouped(sim: &mut SimGraph, opts: &LayoutOptions, rng: &mut XorShift64Star) {
    let (cx, cy) = opts.center();
    let group_count = sim.groups.len();
    let circle = 0.3 * opts.width.min(opts.height);
    let anchors: Vec<(f64, f64)> = (0..group_count)
        .map(|g| {
            if group_count == 1 {
                (cx, cy)
            } else {
                let a = TAU * g as f64 / group_count as f64;
                (cx + circle * a.cos(), cy + circle * a.sin())
            }
        })
        .collect();

    for i in 0..sim.len() {
        let memberships = &sim.node_groups[i];
        let (x, y) = match memberships.as_slice() {
            [] => {
                let (jx, jy) = rng.in_disk(opts.target_link_distance);
                (cx + jx, cy + jy)
            }
            [g] => {
                let count = sim.groups[*g].members.len() as f64;
                let (jx, jy) = rng.in_disk(0.5 * opts.target_link_distance * count.sqrt());
                (anchors[*g].0 + jx, anchors[*g].1 + jy)
            }
            many => {
                let n = many.len() as f64;
                let ax = many.iter().map(|&g| anchors[g].0).sum::<f64>() / n;
                let ay = many.iter().map(|&g| anchors[g].1).sum::<f64>() / n;
                let (jx, jy) = rng.in_disk(MULTI_GROUP_JITTER);
                (ax + jx, ay + jy)
            }
        };
        sim.nodes[i].x = x;
        sim.nodes[i].y = y;
    }
}

/// Coincident or near-coincident seeds make the inverse-square forces blow up; if any pair is
/// stacked, every node gets a small uniform nudge.
fn break_stacks(sim: &mut SimGraph, rng: &mut XorShift64Star) -> bool {
    if !has_stack(sim) {
        return false;
    }
    tracing::trace!(nodes = sim.len(), "stacked seeds, applying jitter");
    for n in &mut sim.nodes {
        let (jx, jy) = rng.in_disk(STACK_JITTER);
        n.x += jx;
        n.y += jy;
    }
    true
}

fn has_stack(sim: &SimGraph) -> bool {
    let nodes = &sim.nodes;
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if (nodes[i].x - nodes[j].x).hypot(nodes[i].y - nodes[j].y) < STACK_DISTANCE {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph, Group, Node};

    fn build(graph: &Graph, opts: &LayoutOptions) -> (SimGraph, Clusters) {
        let sim = SimGraph::from_graph(graph, opts);
        let clusters = Clusters::analyze(&sim);
        (sim, clusters)
    }

    #[test]
    fn ring_capacity_grows_with_ring_index() {
        assert_eq!(ring_capacity(1, 10.0), 6);
        assert_eq!(ring_capacity(2, 10.0), 12);
        assert_eq!(ring_capacity(1, 180.0), 11);
    }

    #[test]
    fn main_cluster_is_centered() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0),
                Node::new("c", 40.0, 20.0),
            ],
            vec![Edge::new("a", "b"), Edge::new("b", "c")],
        );
        let (mut sim, clusters) = build(&g, &opts);
        let mut rng = XorShift64Star::new(opts.random_seed);
        seed_positions(&mut sim, &clusters, &opts, SeedStrategy::Rings, &mut rng);
        let (mx, my) = sim.centroid(&[0, 1, 2]).unwrap();
        assert!((mx - 800.0).abs() < 1e-6 && (my - 600.0).abs() < 1e-6);
    }

    #[test]
    fn secondary_cluster_orbits_outside_main() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0),
                Node::new("c", 40.0, 20.0),
                Node::new("d", 40.0, 20.0),
            ],
            vec![Edge::new("a", "b"), Edge::new("b", "c")],
        );
        let (mut sim, clusters) = build(&g, &opts);
        let mut rng = XorShift64Star::new(opts.random_seed);
        seed_positions(&mut sim, &clusters, &opts, SeedStrategy::Rings, &mut rng);
        let d = &sim.nodes[3];
        let dist = (d.x - 800.0).hypot(d.y - 600.0);
        assert!(dist > opts.target_link_distance, "dist={dist}");
    }

    #[test]
    fn existing_positions_are_copied_not_generated() {
        let opts = LayoutOptions {
            use_existing_positions: true,
            ..Default::default()
        };
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0).at(300.0, 400.0),
                Node::new("b", 40.0, 20.0).at(700.0, 400.0),
            ],
            vec![Edge::new("a", "b")],
        );
        let (mut sim, clusters) = build(&g, &opts);
        let mut rng = XorShift64Star::new(opts.random_seed);
        seed_positions(&mut sim, &clusters, &opts, SeedStrategy::Rings, &mut rng);
        assert_eq!((sim.nodes[0].x, sim.nodes[0].y), (300.0, 400.0));
        assert_eq!((sim.nodes[1].x, sim.nodes[1].y), (700.0, 400.0));
    }

    #[test]
    fn stacked_seeds_are_jittered_apart() {
        let opts = LayoutOptions {
            use_existing_positions: true,
            ..Default::default()
        };
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0).at(500.0, 500.0),
                Node::new("b", 40.0, 20.0).at(500.0, 500.0),
            ],
            Vec::new(),
        );
        let (mut sim, clusters) = build(&g, &opts);
        let mut rng = XorShift64Star::new(opts.random_seed);
        seed_positions(&mut sim, &clusters, &opts, SeedStrategy::Rings, &mut rng);
        assert_ne!(
            (sim.nodes[0].x, sim.nodes[0].y),
            (sim.nodes[1].x, sim.nodes[1].y)
        );
    }

    #[test]
    fn grouped_seeds_start_near_their_group_anchor() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            ["a", "b", "c", "d"]
                .iter()
                .map(|id| Node::new(*id, 40.0, 20.0))
                .collect(),
            Vec::new(),
        )
        .with_groups(vec![Group::new("left", ["a", "b"]), Group::new("right", ["c", "d"])]);
        let (mut sim, clusters) = build(&g, &opts);
        let mut rng = XorShift64Star::new(opts.random_seed);
        seed_positions(&mut sim, &clusters, &opts, SeedStrategy::Groups, &mut rng);
        let left = sim.centroid(&[0, 1]).unwrap();
        let right = sim.centroid(&[2, 3]).unwrap();
        assert!((left.0 - right.0).abs() > 300.0, "left={left:?} right={right:?}");
    }
}
