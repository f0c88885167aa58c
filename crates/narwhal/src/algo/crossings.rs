//! Best-effort edge-crossing reduction.

use super::model::SimGraph;
use crate::options::LayoutOptions;

/// Intersection parameters closer than this to an endpoint do not count as a crossing.
const PARAM_EPS: f64 = 0.01;
const NUDGE: f64 = 20.0;
const MAX_PASSES: usize = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CrossingStats {
    pub(crate) passes: usize,
    pub(crate) fixed: usize,
    pub(crate) remaining: usize,
}

/// Proper intersection of segments `p1p2` and `p3p4`, excluding touches near the endpoints.
pub(crate) fn segments_cross(
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    p4: (f64, f64),
) -> bool {
    let d1 = (p2.0 - p1.0, p2.1 - p1.1);
    let d2 = (p4.0 - p3.0, p4.1 - p3.1);
    let denom = d1.0 * d2.1 - d1.1 * d2.0;
    if denom.abs() < 1e-12 {
        return false;
    }
    let w = (p3.0 - p1.0, p3.1 - p1.1);
    let t = (w.0 * d2.1 - w.1 * d2.0) / denom;
    let u = (w.0 * d1.1 - w.1 * d1.0) / denom;
    let inside = |v: f64| v > PARAM_EPS && v < 1.0 - PARAM_EPS;
    inside(t) && inside(u)
}

fn crossing_pairs(sim: &SimGraph) -> Vec<(usize, usize)> {
    let pos = |i: usize| (sim.nodes[i].x, sim.nodes[i].y);
    let mut out = Vec::new();
    for i in 0..sim.edges.len() {
        let e1 = sim.edges[i];
        for j in (i + 1)..sim.edges.len() {
            let e2 = sim.edges[j];
            if e1.a == e2.a || e1.a == e2.b || e1.b == e2.a || e1.b == e2.b {
                continue;
            }
            if segments_cross(pos(e1.a), pos(e1.b), pos(e2.a), pos(e2.b)) {
                out.push((i, j));
            }
        }
    }
    out
}

pub(crate) fn count_crossings(sim: &SimGraph) -> usize {
    crossing_pairs(sim).len()
}

fn positions(sim: &SimGraph) -> Vec<(f64, f64)> {
    sim.nodes.iter().map(|n| (n.x, n.y)).collect()
}

/// Moves both edges of a crossing pair `NUDGE` units in opposite directions. Returns `false` when
/// no direction can be derived.
fn nudge_pair(sim: &mut SimGraph, i: usize, j: usize) -> bool {
    let (e1, e2) = (sim.edges[i], sim.edges[j]);
    let (a1, b1) = (&sim.nodes[e1.a], &sim.nodes[e1.b]);
    let (a2, b2) = (&sim.nodes[e2.a], &sim.nodes[e2.b]);
    let m1 = ((a1.x + b1.x) / 2.0, (a1.y + b1.y) / 2.0);
    let m2 = ((a2.x + b2.x) / 2.0, (a2.y + b2.y) / 2.0);
    let (dx, dy) = (m2.0 - m1.0, m2.1 - m1.1);
    let len = dx.hypot(dy);
    let (px, py) = if len > 1e-6 {
        (-dy / len, dx / len)
    } else {
        let (ex, ey) = (b1.x - a1.x, b1.y - a1.y);
        let el = ex.hypot(ey);
        if el < 1e-9 {
            return false;
        }
        (-ey / el, ex / el)
    };
    sim.translate(&[e1.a, e1.b], -px * NUDGE, -py * NUDGE);
    sim.translate(&[e2.a, e2.b], px * NUDGE, py * NUDGE);
    true
}

/// Nudges each crossing pair of edges along the perpendicular to the line joining their
/// midpoints, the first edge toward `-p` and the second toward `+p`. Coincident midpoints fall
/// back to the first edge's normal. The positions with the fewest crossings seen across the passes
/// are kept, so the count never grows and a run that removes nothing leaves every node in place.
pub(crate) fn reduce_crossings(sim: &mut SimGraph, opts: &LayoutOptions) -> CrossingStats {
    let initial = count_crossings(sim);
    let mut stats = CrossingStats {
        remaining: initial,
        ..Default::default()
    };
    if initial == 0 {
        return stats;
    }

    let mut best = positions(sim);
    let mut best_count = initial;
    for _ in 0..MAX_PASSES {
        let pairs = crossing_pairs(sim);
        if pairs.is_empty() {
            break;
        }
        stats.passes += 1;
        let mut nudged = 0usize;
        for &(i, j) in &pairs {
            if nudge_pair(sim, i, j) {
                nudged += 1;
            }
        }
        if nudged == 0 {
            break;
        }
        sim.clamp_all(opts);
        let count = count_crossings(sim);
        if count < best_count {
            best_count = count;
            best = positions(sim);
        }
    }
    for (n, (x, y)) in sim.nodes.iter_mut().zip(best) {
        n.x = x;
        n.y = y;
    }

    stats.fixed = initial - best_count;
    stats.remaining = best_count;
    tracing::debug!(
        passes = stats.passes,
        fixed = stats.fixed,
        remaining = stats.remaining,
        "crossing reduction"
    );
    stats
}
