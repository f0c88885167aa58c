//! Deterministic corrective passes run after the simulation.

use super::clusters::Clusters;
use super::crossings::{self, CrossingStats};
use super::model::SimGraph;
use super::rng::XorShift64Star;
use crate::options::LayoutOptions;

const EDGE_CONSTRAINT_PASSES: usize = 8;
/// Edges within this many units of their target are left alone.
const EDGE_TOLERANCE: f64 = 0.5;
const DEFAULT_EDGE_STIFFNESS: f64 = 0.8;
const CROSS_GROUP_STIFFNESS: f64 = 0.3;
/// Two nodes overlap when closer than `OVERLAP_FACTOR * (r1 + r2)`.
const OVERLAP_FACTOR: f64 = 1.4;
const OVERLAP_MARGIN: f64 = 1.1;
const OVERLAP_PASSES: usize = 10;
const SEPARATION_OVERSHOOT: f64 = 1.05;
/// Fraction of a component's excess distance kept after condensation.
const CONDENSE_RETAIN: f64 = 0.1;
const CONDENSE_RETAIN_GROUPED: f64 = 0.97;
const FINAL_SWEEP_ROUNDS: usize = 100;
/// In-group edges longer than this multiple of their target mean the layout is not at rest.
const REST_STRETCH: f64 = 2.0;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PostStats {
    pub(crate) overlaps_fixed: usize,
    pub(crate) separations_fixed: usize,
    pub(crate) crossings: CrossingStats,
    pub(crate) sweep_rounds: usize,
}

pub(crate) fn post_process(
    sim: &mut SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    rng: &mut XorShift64Star,
) -> PostStats {
    let mut stats = PostStats::default();
    if sim.is_empty() {
        return stats;
    }

    let stiffness = if opts.stiffness > 0.0 {
        opts.stiffness
    } else {
        DEFAULT_EDGE_STIFFNESS
    };
    enforce_edge_constraints(sim, opts, stiffness, EDGE_CONSTRAINT_PASSES);
    stats.overlaps_fixed += resolve_overlaps(sim, opts, OVERLAP_PASSES, rng);
    if sim.has_groups() {
        stats.separations_fixed += enforce_group_separation(sim, opts, rng);
    }
    condense_clusters(sim, clusters, opts, rng);
    stats.crossings = crossings::reduce_crossings(sim, opts);
    stats.sweep_rounds = final_sweep(sim, opts, rng);
    sanitize(sim, opts);
    stats
}

/// Nudges both endpoints of every edge toward its rest length. Edges already within
/// `EDGE_TOLERANCE` of it are skipped.
pub(crate) fn enforce_edge_constraints(
    sim: &mut SimGraph,
    opts: &LayoutOptions,
    stiffness: f64,
    passes: usize,
) {
    for _ in 0..passes {
        for k in 0..sim.edges.len() {
            let e = sim.edges[k];
            let (ax, ay) = (sim.nodes[e.a].x, sim.nodes[e.a].y);
            let (bx, by) = (sim.nodes[e.b].x, sim.nodes[e.b].y);
            let dx = bx - ax;
            let dy = by - ay;
            let dist = dx.hypot(dy);
            if dist < 1e-9 || (dist - e.target).abs() <= EDGE_TOLERANCE {
                continue;
            }
            let s = if e.cross_group {
                stiffness * CROSS_GROUP_STIFFNESS
            } else {
                stiffness
            };
            let delta = (dist - e.target) / dist * 0.5 * s;
            sim.nodes[e.a].x += dx * delta;
            sim.nodes[e.a].y += dy * delta;
            sim.nodes[e.b].x -= dx * delta;
            sim.nodes[e.b].y -= dy * delta;
        }
        sim.clamp_all(opts);
    }
}

/// Pushes apart every pair closer than `OVERLAP_FACTOR * (r1 + r2)`. Returns the number of
/// corrections made; stops early after a clean pass.
pub(crate) fn resolve_overlaps(
    sim: &mut SimGraph,
    opts: &LayoutOptions,
    passes: usize,
    rng: &mut XorShift64Star,
) -> usize {
    let mut total = 0usize;
    for _ in 0..passes {
        let mut moved = 0usize;
        for i in 0..sim.len() {
            for j in (i + 1)..sim.len() {
                let min = OVERLAP_FACTOR * (sim.nodes[i].radius + sim.nodes[j].radius);
                if push_apart(sim, i, j, min, OVERLAP_MARGIN, rng) {
                    moved += 1;
                }
            }
        }
        sim.clamp_all(opts);
        total += moved;
        if moved == 0 {
            break;
        }
    }
    total
}

/// Splits the deficit between `i` and `j` when they are closer than `min`. Coincident nodes are
/// separated along a random direction.
fn push_apart(
    sim: &mut SimGraph,
    i: usize,
    j: usize,
    min: f64,
    margin: f64,
    rng: &mut XorShift64Star,
) -> bool {
    let dx = sim.nodes[j].x - sim.nodes[i].x;
    let dy = sim.nodes[j].y - sim.nodes[i].y;
    let dist = dx.hypot(dy);
    if dist >= min {
        return false;
    }
    let (ux, uy, half) = if dist < 1e-9 {
        let (ux, uy) = rng.unit_vector();
        (ux, uy, min * margin / 2.0)
    } else {
        (dx / dist, dy / dist, (min - dist) * margin / 2.0)
    };
    sim.nodes[i].x -= ux * half;
    sim.nodes[i].y -= uy * half;
    sim.nodes[j].x += ux * half;
    sim.nodes[j].y += uy * half;
    true
}

/// Hard separation between groups that share no member: first whole groups are moved apart
/// until their centroids respect `min_group_distance`, then every pair of nodes with disjoint
/// memberships is held to [`LayoutOptions::group_separation_floor`].
pub(crate) fn enforce_group_separation(
    sim: &mut SimGraph,
    opts: &LayoutOptions,
    rng: &mut XorShift64Star,
) -> usize {
    let mut moved = separate_group_centroids(sim, opts, rng);

    let floor = opts.group_separation_floor();
    for i in 0..sim.len() {
        for j in (i + 1)..sim.len() {
            if !sim.disjoint(i, j) {
                continue;
            }
            if push_apart(sim, i, j, floor, SEPARATION_OVERSHOOT, rng) {
                moved += 1;
            }
        }
    }
    sim.clamp_all(opts);
    moved
}

fn separate_group_centroids(
    sim: &mut SimGraph,
    opts: &LayoutOptions,
    rng: &mut XorShift64Star,
) -> usize {
    let min = opts.min_group_distance;
    if min <= 0.0 || sim.groups.len() < 2 {
        return 0;
    }
    // Only single-group members move.
    let exclusive = exclusive_members(sim);
    let mut moved = 0usize;
    for g in 0..sim.groups.len() {
        for h in (g + 1)..sim.groups.len() {
            if !sim.groups_disjoint(g, h) {
                continue;
            }
            let (Some((gx, gy)), Some((hx, hy))) =
                (sim.centroid(&exclusive[g]), sim.centroid(&exclusive[h]))
            else {
                continue;
            };
            let dx = hx - gx;
            let dy = hy - gy;
            let dist = dx.hypot(dy);
            if dist >= min {
                continue;
            }
            let (ux, uy) = if dist < 1e-9 {
                rng.unit_vector()
            } else {
                (dx / dist, dy / dist)
            };
            let shift = (min - dist) * SEPARATION_OVERSHOOT / 2.0;
            sim.translate(&exclusive[g], -ux * shift, -uy * shift);
            sim.translate(&exclusive[h], ux * shift, uy * shift);
            moved += 1;
        }
    }
    moved
}

/// Members of each group that belong to no other group.
fn exclusive_members(sim: &SimGraph) -> Vec<Vec<usize>> {
    sim.groups
        .iter()
        .map(|g| {
            g.members
                .iter()
                .copied()
                .filter(|&m| sim.node_groups[m].len() == 1)
                .collect()
        })
        .collect()
}

/// Pulls each component's centroid toward the canvas center. The largest component may sit on
/// the center; every other one is then kept at least `r_main + r_i + min_node_distance` from the
/// largest component's centroid.
pub(crate) fn condense_clusters(
    sim: &mut SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    rng: &mut XorShift64Star,
) {
    let Some(main) = clusters.components.first() else {
        return;
    };
    let grouped = sim.has_groups();
    let retain = if grouped {
        CONDENSE_RETAIN_GROUPED
    } else {
        CONDENSE_RETAIN
    };
    let (cx, cy) = opts.center();
    let main_radius = component_radius(sim, main);

    for (ci, comp) in clusters.components.iter().enumerate() {
        if grouped && spans_multiple_groups(sim, comp) {
            continue;
        }
        let Some((mx, my)) = sim.centroid(comp) else {
            continue;
        };
        let dist = (mx - cx).hypot(my - cy);
        let allowed = if ci == 0 {
            0.0
        } else {
            main_radius + component_radius(sim, comp) + opts.min_node_distance
        };
        let excess = dist - allowed;
        if excess > 0.0 && dist >= 1e-9 {
            let pull = excess * (1.0 - retain);
            sim.translate(comp, (cx - mx) / dist * pull, (cy - my) / dist * pull);
        }
        if ci > 0 {
            keep_clear(sim, main, comp, allowed, rng);
        }
    }
    sim.clamp_all(opts);
}

/// Translates `comp` straight away from the centroid of `anchor` until the centroids are at least
/// `clearance` apart.
fn keep_clear(
    sim: &mut SimGraph,
    anchor: &[usize],
    comp: &[usize],
    clearance: f64,
    rng: &mut XorShift64Star,
) {
    let (Some((ax, ay)), Some((mx, my))) = (sim.centroid(anchor), sim.centroid(comp)) else {
        return;
    };
    let (dx, dy) = (mx - ax, my - ay);
    let dist = dx.hypot(dy);
    if dist >= clearance {
        return;
    }
    let (ux, uy) = if dist < 1e-9 {
        rng.unit_vector()
    } else {
        (dx / dist, dy / dist)
    };
    let push = clearance - dist;
    sim.translate(comp, ux * push, uy * push);
}

/// Largest distance from the component centroid to a node footprint edge.
pub(crate) fn component_radius(sim: &SimGraph, comp: &[usize]) -> f64 {
    let Some((mx, my)) = sim.centroid(comp) else {
        return 0.0;
    };
    comp.iter()
        .map(|&i| {
            let n = &sim.nodes[i];
            (n.x - mx).hypot(n.y - my) + n.radius
        })
        .fold(0.0, f64::max)
}

fn spans_multiple_groups(sim: &SimGraph, comp: &[usize]) -> bool {
    let mut seen: Option<usize> = None;
    for &i in comp {
        for &g in &sim.node_groups[i] {
            match seen {
                None => seen = Some(g),
                Some(s) if s != g => return true,
                Some(_) => {}
            }
        }
    }
    false
}

/// True when the corrective passes have nothing left to do: every node sits inside the canvas, no
/// pair overlaps, groups sharing no member keep their centroid distance and node floor, and no
/// in-group edge is stretched past `REST_STRETCH` times its target.
pub(crate) fn at_rest(sim: &SimGraph, opts: &LayoutOptions) -> bool {
    let inside = sim
        .nodes
        .iter()
        .all(|n| opts.clamp_point(n.x, n.y) == (n.x, n.y));
    if !inside {
        return false;
    }

    let stretched = sim.edges.iter().any(|e| {
        let (a, b) = (&sim.nodes[e.a], &sim.nodes[e.b]);
        !e.cross_group && (b.x - a.x).hypot(b.y - a.y) > REST_STRETCH * e.target
    });
    if stretched {
        return false;
    }

    let grouped = sim.has_groups();
    let floor = opts.group_separation_floor();
    for i in 0..sim.len() {
        for j in (i + 1)..sim.len() {
            let (a, b) = (&sim.nodes[i], &sim.nodes[j]);
            let dist = (b.x - a.x).hypot(b.y - a.y);
            if dist < OVERLAP_FACTOR * (a.radius + b.radius) {
                return false;
            }
            if grouped && sim.disjoint(i, j) && dist < floor {
                return false;
            }
        }
    }

    if !grouped || opts.min_group_distance <= 0.0 {
        return true;
    }
    let exclusive = exclusive_members(sim);
    for g in 0..sim.groups.len() {
        for h in (g + 1)..sim.groups.len() {
            if !sim.groups_disjoint(g, h) {
                continue;
            }
            if let (Some((gx, gy)), Some((hx, hy))) =
                (sim.centroid(&exclusive[g]), sim.centroid(&exclusive[h]))
            {
                if (hx - gx).hypot(hy - gy) < opts.min_group_distance {
                    return false;
                }
            }
        }
    }
    true
}

/// Alternates overlap and group-separation passes until neither moves anything.
fn final_sweep(sim: &mut SimGraph, opts: &LayoutOptions, rng: &mut XorShift64Star) -> usize {
    for round in 0..FINAL_SWEEP_ROUNDS {
        let mut moved = resolve_overlaps(sim, opts, 1, rng);
        if sim.has_groups() {
            moved += enforce_group_separation(sim, opts, rng);
        }
        if moved == 0 {
            return round;
        }
    }
    tracing::debug!(
        rounds = FINAL_SWEEP_ROUNDS,
        "separation sweep hit its round limit"
    );
    FINAL_SWEEP_ROUNDS
}

fn sanitize(sim: &mut SimGraph, opts: &LayoutOptions) {
    let (cx, cy) = opts.center();
    for n in &mut sim.nodes {
        if !(n.x.is_finite() && n.y.is_finite()) {
            n.x = cx;
            n.y = cy;
        }
    }
    sim.clamp_all(opts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph, Group, Node};

    fn build(graph: &Graph, opts: &LayoutOptions, points: &[(f64, f64)]) -> SimGraph {
        let mut sim = SimGraph::from_graph(graph, opts);
        for (n, &(x, y)) in sim.nodes.iter_mut().zip(points) {
            n.x = x;
            n.y = y;
        }
        sim
    }

    fn dist(sim: &SimGraph, i: usize, j: usize) -> f64 {
        (sim.nodes[i].x - sim.nodes[j].x).hypot(sim.nodes[i].y - sim.nodes[j].y)
    }

    #[test]
    fn edge_constraints_converge_to_target() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![Node::new("a", 40.0, 20.0), Node::new("b", 40.0, 20.0)],
            vec![Edge::new("a", "b")],
        );
        let mut sim = build(&g, &opts, &[(500.0, 600.0), (1000.0, 600.0)]);
        enforce_edge_constraints(&mut sim, &opts, 0.8, EDGE_CONSTRAINT_PASSES);
        assert!((dist(&sim, 0, 1) - opts.target_link_distance).abs() <= EDGE_TOLERANCE);
    }

    #[test]
    fn edges_within_tolerance_are_left_alone() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![Node::new("a", 40.0, 20.0), Node::new("b", 40.0, 20.0)],
            vec![Edge::new("a", "b")],
        );
        let x1 = 700.0 + opts.target_link_distance + 0.25;
        let mut sim = build(&g, &opts, &[(700.0, 600.0), (x1, 600.0)]);
        enforce_edge_constraints(&mut sim, &opts, 0.8, EDGE_CONSTRAINT_PASSES);
        assert_eq!(sim.nodes[0].x, 700.0);
        assert_eq!(sim.nodes[1].x, x1);
    }

    #[test]
    fn overlapping_and_coincident_nodes_are_separated() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0),
                Node::new("c", 40.0, 20.0),
            ],
            Vec::new(),
        );
        let mut sim = build(&g, &opts, &[(800.0, 600.0), (800.0, 600.0), (810.0, 600.0)]);
        let mut rng = XorShift64Star::new(9);
        let fixed = resolve_overlaps(&mut sim, &opts, 50, &mut rng);
        assert!(fixed > 0);
        let min = OVERLAP_FACTOR * 2.0 * opts.collision_radius;
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            assert!(dist(&sim, i, j) >= min - 1e-6, "{i}-{j}: {}", dist(&sim, i, j));
        }
    }

    #[test]
    fn disjoint_groups_respect_the_floor() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![Node::new("a", 40.0, 20.0), Node::new("b", 40.0, 20.0)],
            Vec::new(),
        )
        .with_groups(vec![Group::new("x", ["a"]), Group::new("y", ["b"])]);
        let mut sim = build(&g, &opts, &[(780.0, 600.0), (820.0, 600.0)]);
        let mut rng = XorShift64Star::new(9);
        enforce_group_separation(&mut sim, &opts, &mut rng);
        assert!(dist(&sim, 0, 1) >= opts.min_group_distance - 1e-6);
    }

    #[test]
    fn secondary_component_is_pulled_in_but_kept_clear() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0),
                Node::new("c", 40.0, 20.0),
            ],
            vec![Edge::new("a", "b")],
        );
        let mut sim = build(&g, &opts, &[(710.0, 600.0), (890.0, 600.0), (1500.0, 600.0)]);
        let clusters = Clusters::analyze(&sim);
        let mut rng = XorShift64Star::new(9);
        condense_clusters(&mut sim, &clusters, &opts, &mut rng);
        let c = &sim.nodes[2];
        let from_center = (c.x - 800.0).hypot(c.y - 600.0);
        let allowed = component_radius(&sim, &clusters.components[0])
            + component_radius(&sim, &clusters.components[1])
            + opts.min_node_distance;
        assert!(from_center < 700.0);
        assert!(from_center >= allowed - 1e-6, "{from_center} < {allowed}");
    }

    #[test]
    fn coincident_components_are_pushed_clear() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0),
                Node::new("c", 40.0, 20.0),
                Node::new("d", 40.0, 20.0),
            ],
            vec![Edge::new("a", "b"), Edge::new("c", "d")],
        );
        let mut sim = build(
            &g,
            &opts,
            &[(710.0, 600.0), (890.0, 600.0), (800.0, 510.0), (800.0, 690.0)],
        );
        assert_eq!(crossings::count_crossings(&sim), 1);
        let clusters = Clusters::analyze(&sim);
        let mut rng = XorShift64Star::new(9);
        condense_clusters(&mut sim, &clusters, &opts, &mut rng);

        let required = 2.0 * (90.0 + opts.collision_radius) + opts.min_node_distance;
        let (ax, ay) = sim.centroid(&[0, 1]).unwrap();
        let (cx, cy) = sim.centroid(&[2, 3]).unwrap();
        assert!((cx - ax).hypot(cy - ay) >= required - 1e-6);
        assert_eq!(crossings::count_crossings(&sim), 0);
    }

    #[test]
    fn rest_requires_spacing_and_unstretched_edges() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0),
                Node::new("c", 40.0, 20.0),
            ],
            vec![Edge::new("a", "b")],
        );
        let settled = build(&g, &opts, &[(700.0, 600.0), (880.0, 600.0), (800.0, 800.0)]);
        assert!(at_rest(&settled, &opts));

        let stretched = build(&g, &opts, &[(200.0, 600.0), (880.0, 600.0), (800.0, 800.0)]);
        assert!(!at_rest(&stretched, &opts));

        let crowded = build(&g, &opts, &[(700.0, 600.0), (880.0, 600.0), (880.0, 630.0)]);
        assert!(!at_rest(&crowded, &opts));

        let outside = build(&g, &opts, &[(700.0, 600.0), (880.0, 600.0), (800.0, 1190.0)]);
        assert!(!at_rest(&outside, &opts));
    }

    #[test]
    fn rest_requires_group_floors() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![Node::new("a", 40.0, 20.0), Node::new("b", 40.0, 20.0)],
            Vec::new(),
        )
        .with_groups(vec![Group::new("x", ["a"]), Group::new("y", ["b"])]);
        let near = build(&g, &opts, &[(700.0, 600.0), (900.0, 600.0)]);
        assert!(!at_rest(&near, &opts));
        let far = build(&g, &opts, &[(600.0, 600.0), (1000.0, 600.0)]);
        assert!(at_rest(&far, &opts));
    }
}
