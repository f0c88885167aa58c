//! Alpha-cooled force simulation.
//!
//! One call runs the whole iteration budget: every iteration accumulates repulsion, edge-segment
//! repulsion, springs, centering and (when groups exist) group forces into a per-node force
//! buffer, then integrates velocities. Velocities never outlive the call.

use super::clusters::Clusters;
use super::model::SimGraph;
use super::post;
use super::rng::XorShift64Star;
use crate::options::LayoutOptions;

/// Extra clearance added to `r_i + r_j` when deciding that two nodes are too close.
const NODE_PADDING: f64 = 10.0;
/// Repulsion bonus for pairs in different components, scaled by `sqrt(componentCount)`.
const CROSS_COMPONENT_BONUS: f64 = 0.5;
const CLOSE_COMPONENT_BOOST: f64 = 1.5;
const OVERLAP_PUSH: f64 = 3.0;
const EDGE_PUSH: f64 = 4.0;
const CROSS_GROUP_SPRING: f64 = 0.3;
const GROUP_NODE_PUSH: f64 = 2.0;
const EXCLUSION_PUSH: f64 = 4.0;
const CENTROID_PUSH: f64 = 0.05;
const SPEED_PER_ALPHA: f64 = 50.0;

const EARLY_PHASE_END: f64 = 0.3;
const LATE_PHASE_START: f64 = 0.7;
const CENTERING_START: f64 = 0.5;

/// Starting alpha when the simulation resumes from caller-supplied or stitched positions.
pub(crate) const WARM_START_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulationParams {
    pub(crate) iterations: usize,
    pub(crate) initial_alpha: f64,
    pub(crate) group_attraction_scale: f64,
    pub(crate) group_repulsion_scale: f64,
    pub(crate) group_exclusion_scale: f64,
}

impl SimulationParams {
    pub(crate) fn fresh(opts: &LayoutOptions) -> Self {
        Self {
            iterations: opts.iterations,
            initial_alpha: 1.0,
            group_attraction_scale: 1.0,
            group_repulsion_scale: 1.0,
            group_exclusion_scale: 1.0,
        }
    }

    pub(crate) fn warm(opts: &LayoutOptions) -> Self {
        Self {
            initial_alpha: WARM_START_ALPHA,
            ..Self::fresh(opts)
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SimulationStats {
    pub(crate) iterations: usize,
    pub(crate) final_alpha: f64,
}

/// `(repulsion, spring)` multipliers: anneal early, settle late.
fn phase_multipliers(progress: f64) -> (f64, f64) {
    if progress < EARLY_PHASE_END {
        (1.4, 0.7)
    } else if progress > LATE_PHASE_START {
        (0.8, 1.2)
    } else {
        (1.0, 1.0)
    }
}

pub(crate) fn simulate(
    sim: &mut SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    params: &SimulationParams,
    rng: &mut XorShift64Star,
) -> SimulationStats {
    let n = sim.len();
    if n <= 1 || params.iterations == 0 {
        return SimulationStats::default();
    }

    let mut alpha = params.initial_alpha.clamp(opts.alpha_min, 1.0);
    let mut velocity: Vec<(f64, f64)> = vec![(0.0, 0.0); n];
    let mut force: Vec<(f64, f64)> = vec![(0.0, 0.0); n];

    let density = sim.edges.len() as f64 / n as f64;
    let center_boost = if density < 1.0 { 2.0 - density } else { 1.0 };
    let component_bonus = 1.0 + CROSS_COMPONENT_BONUS * (clusters.len() as f64).sqrt();
    let (cx, cy) = opts.center();

    for iter in 0..params.iterations {
        let progress = iter as f64 / params.iterations as f64;
        let (repulsion_mult, spring_mult) = phase_multipliers(progress);
        force.fill((0.0, 0.0));

        apply_repulsion(
            sim,
            clusters,
            opts,
            alpha * repulsion_mult,
            component_bonus,
            rng,
            &mut force,
        );
        if opts.enable_edge_repulsion && opts.edge_avoidance > 0.0 {
            apply_edge_repulsion(sim, opts, alpha, &mut force);
        }
        apply_springs(sim, opts, alpha, spring_mult, progress, &mut force);

        if progress >= CENTERING_START && opts.center_strength > 0.0 {
            let ramp = ((progress - CENTERING_START) / (1.0 - CENTERING_START)).min(1.0);
            let k = opts.center_strength * center_boost * ramp * alpha;
            for (f, node) in force.iter_mut().zip(&sim.nodes) {
                f.0 += k * (cx - node.x);
                f.1 += k * (cy - node.y);
            }
        }

        if sim.has_groups() {
            apply_group_forces(sim, opts, params, alpha, rng, &mut force);
        }

        integrate(sim, opts, alpha, &mut velocity, &force);

        if opts.stiffness > 0.0 {
            post::enforce_edge_constraints(sim, opts, opts.stiffness, 1);
            if iter % 2 == 0 {
                post::resolve_overlaps(sim, opts, 1, rng);
            }
        }

        alpha = (alpha * (1.0 - opts.alpha_decay)).max(opts.alpha_min);
    }

    SimulationStats {
        iterations: params.iterations,
        final_alpha: alpha,
    }
}

/// Unit vector from `(ax, ay)` to `(bx, by)` plus the distance; coincident points get a random
/// direction and distance zero.
fn direction(ax: f64, ay: f64, bx: f64, by: f64, rng: &mut XorShift64Star) -> (f64, f64, f64) {
    let dx = bx - ax;
    let dy = by - ay;
    let dist = dx.hypot(dy);
    if dist < 1e-6 {
        let (ux, uy) = rng.unit_vector();
        (ux, uy, 0.0)
    } else {
        (dx / dist, dy / dist, dist)
    }
}

fn apply_repulsion(
    sim: &SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    scale: f64,
    component_bonus: f64,
    rng: &mut XorShift64Star,
    force: &mut [(f64, f64)],
) {
    let strength = opts.repulsion_strength * scale;
    if strength <= 0.0 {
        return;
    }
    let cutoff = opts.max_repulsion_distance;
    let nodes = &sim.nodes;
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let (a, b) = (&nodes[i], &nodes[j]);
            if (b.x - a.x).abs() > cutoff || (b.y - a.y).abs() > cutoff {
                continue;
            }
            let (ux, uy, dist) = direction(a.x, a.y, b.x, b.y, rng);
            if dist > cutoff {
                continue;
            }

            let min_dist = a.radius + b.radius + NODE_PADDING;
            let mut k = strength;
            if clusters.component_of(i) != clusters.component_of(j) {
                k *= component_bonus;
                if dist < 2.0 * min_dist {
                    k *= CLOSE_COMPONENT_BOOST;
                }
            }
            let d = dist.max(1.0);
            let mut f = k / (d * d);
            if dist < min_dist {
                f += k / (min_dist * min_dist) * OVERLAP_PUSH * (min_dist - dist) / min_dist;
            }

            force[i].0 -= ux * f;
            force[i].1 -= uy * f;
            force[j].0 += ux * f;
            force[j].1 += uy * f;
        }
    }
}

/// Pushes nodes off edges they are not part of; the reaction is shared by the edge endpoints in
/// proportion to the projection parameter.
fn apply_edge_repulsion(
    sim: &SimGraph,
    opts: &LayoutOptions,
    alpha: f64,
    force: &mut [(f64, f64)],
) {
    let k = opts.edge_avoidance * EDGE_PUSH * alpha;
    for e in &sim.edges {
        let (a, b) = (&sim.nodes[e.a], &sim.nodes[e.b]);
        let ex = b.x - a.x;
        let ey = b.y - a.y;
        let len2 = ex * ex + ey * ey;
        if len2 < 1e-9 {
            continue;
        }
        for (v, node) in sim.nodes.iter().enumerate() {
            if v == e.a || v == e.b {
                continue;
            }
            let t = (((node.x - a.x) * ex + (node.y - a.y) * ey) / len2).clamp(0.0, 1.0);
            let px = a.x + t * ex;
            let py = a.y + t * ey;
            let dx = node.x - px;
            let dy = node.y - py;
            let d = dx.hypot(dy);
            let threshold = node.radius + 0.5 * opts.min_node_distance;
            if d >= threshold || d < 1e-6 {
                continue;
            }
            let f = k * (threshold - d) / threshold;
            let (ux, uy) = (dx / d, dy / d);
            force[v].0 += ux * f;
            force[v].1 += uy * f;
            force[e.a].0 -= ux * f * (1.0 - t);
            force[e.a].1 -= uy * f * (1.0 - t);
            force[e.b].0 -= ux * f * t;
            force[e.b].1 -= uy * f * t;
        }
    }
}

fn apply_springs(
    sim: &SimGraph,
    opts: &LayoutOptions,
    alpha: f64,
    spring_mult: f64,
    progress: f64,
    force: &mut [(f64, f64)],
) {
    for e in &sim.edges {
        let (a, b) = (&sim.nodes[e.a], &sim.nodes[e.b]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dist = dx.hypot(dy);
        if dist < 1e-9 {
            continue;
        }
        let mut k = opts.attraction_strength * e.weight;
        let mut mult = spring_mult;
        if e.cross_group {
            k *= CROSS_GROUP_SPRING;
            // No late-phase boost for cross-group springs.
            if progress > LATE_PHASE_START {
                mult = 1.0;
            }
        }
        let f = k * mult * alpha * (dist - e.target);
        let (ux, uy) = (dx / dist, dy / dist);
        force[e.a].0 += ux * f;
        force[e.a].1 += uy * f;
        force[e.b].0 -= ux * f;
        force[e.b].1 -= uy * f;
    }
}

fn apply_group_forces(
    sim: &SimGraph,
    opts: &LayoutOptions,
    params: &SimulationParams,
    alpha: f64,
    rng: &mut XorShift64Star,
    force: &mut [(f64, f64)],
) {
    let center = opts.center();
    let centroids: Vec<(f64, f64)> = sim
        .groups
        .iter()
        .map(|g| sim.centroid(&g.members).unwrap_or(center))
        .collect();

    // A single group's centroid pull would just duplicate centering.
    let attraction =
        opts.group_attraction_strength * params.group_attraction_scale * alpha;
    if sim.groups.len() > 1 && attraction > 0.0 {
        for (i, node) in sim.nodes.iter().enumerate() {
            let memberships = &sim.node_groups[i];
            if memberships.is_empty() {
                continue;
            }
            let share = 1.0 / memberships.len() as f64;
            for &g in memberships {
                force[i].0 += attraction * share * (centroids[g].0 - node.x);
                force[i].1 += attraction * share * (centroids[g].1 - node.y);
            }
        }
    }

    let range = 1.5 * opts.min_group_distance;
    let repulsion =
        opts.group_repulsion_strength * params.group_repulsion_scale * alpha * GROUP_NODE_PUSH;
    if range > 0.0 && repulsion > 0.0 {
        for i in 0..sim.len() {
            for j in (i + 1)..sim.len() {
                if !sim.disjoint(i, j) {
                    continue;
                }
                let (a, b) = (&sim.nodes[i], &sim.nodes[j]);
                let (ux, uy, dist) = direction(a.x, a.y, b.x, b.y, rng);
                if dist >= range {
                    continue;
                }
                let f = repulsion * (range - dist) / range;
                force[i].0 -= ux * f;
                force[i].1 -= uy * f;
                force[j].0 += ux * f;
                force[j].1 += uy * f;
            }
        }
    }

    let exclusion =
        opts.group_exclusion_strength * params.group_exclusion_scale * alpha * EXCLUSION_PUSH;
    if exclusion > 0.0 {
        let boxes: Vec<_> = sim
            .groups
            .iter()
            .map(|g| {
                sim.bounds(&g.members)
                    .map(|r| r.expanded(opts.group_boundary_padding))
            })
            .collect();
        for i in 0..sim.len() {
            for (g, rect) in boxes.iter().enumerate() {
                let Some(rect) = rect else {
                    continue;
                };
                let (x, y) = (sim.nodes[i].x, sim.nodes[i].y);
                if sim.in_group(i, g) || !rect.contains(x, y) {
                    continue;
                }
                let half = (rect.width().min(rect.height()) / 2.0).max(1.0);
                let f = exclusion * (1.0 + 2.0 * rect.depth(x, y) / half);
                let (ux, uy, _) = direction(centroids[g].0, centroids[g].1, x, y, rng);
                force[i].0 += ux * f;
                force[i].1 += uy * f;
            }
        }
    }

    let centroid_push =
        opts.group_repulsion_strength * params.group_repulsion_scale * alpha * CENTROID_PUSH;
    if centroid_push > 0.0 && opts.min_group_distance > 0.0 {
        for g in 0..sim.groups.len() {
            for h in (g + 1)..sim.groups.len() {
                let (gx, gy) = centroids[g];
                let (hx, hy) = centroids[h];
                let (ux, uy, dist) = direction(gx, gy, hx, hy, rng);
                if dist >= opts.min_group_distance {
                    continue;
                }
                let push = centroid_push * (opts.min_group_distance - dist);
                let per_g = push / sim.groups[g].members.len() as f64;
                for &m in &sim.groups[g].members {
                    force[m].0 -= ux * per_g;
                    force[m].1 -= uy * per_g;
                }
                let per_h = push / sim.groups[h].members.len() as f64;
                for &m in &sim.groups[h].members {
                    force[m].0 += ux * per_h;
                    force[m].1 += uy * per_h;
                }
            }
        }
    }
}

fn integrate(
    sim: &mut SimGraph,
    opts: &LayoutOptions,
    alpha: f64,
    velocity: &mut [(f64, f64)],
    force: &[(f64, f64)],
) {
    let max_speed = SPEED_PER_ALPHA * alpha;
    for ((node, v), f) in sim.nodes.iter_mut().zip(velocity.iter_mut()).zip(force) {
        let mut vx = (v.0 + f.0) * opts.damping;
        let mut vy = (v.1 + f.1) * opts.damping;
        if !(vx.is_finite() && vy.is_finite()) {
            vx = 0.0;
            vy = 0.0;
        }
        let speed = vx.hypot(vy);
        if speed > max_speed {
            vx *= max_speed / speed;
            vy *= max_speed / speed;
        }
        *v = (vx, vy);
        (node.x, node.y) = opts.clamp_point(node.x + vx, node.y + vy);
    }
}
