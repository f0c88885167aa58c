pub(crate) mod clusters;
pub(crate) mod crossings;
pub(crate) mod force;
pub(crate) mod groups;
pub(crate) mod model;
pub(crate) mod post;
pub(crate) mod rng;
pub(crate) mod seed;

use crate::graph::{Graph, LayoutResult, Point};
use crate::options::LayoutOptions;
use clusters::Clusters;
use force::SimulationParams;
use model::SimGraph;
use rng::XorShift64Star;
use seed::SeedStrategy;

/// Nesting depth below which the two-phase group engine may run. Sub-layouts and the meta layout
/// run one level deeper and therefore never re-enter it.
pub(crate) const MAX_GROUP_DEPTH: usize = 1;

/// How group membership is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Two-phase group separation (per-group sub-layouts stitched onto a meta layout) whenever the
    /// graph has resolvable groups.
    #[default]
    FreshWithGroups,
    /// A single simulation with grouped seeding and group forces only.
    Refinement,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct LayoutTimings {
    total: std::time::Duration,
    build: std::time::Duration,
    seed: std::time::Duration,
    groups: std::time::Duration,
    simulate: std::time::Duration,
    post: std::time::Duration,
}

pub(crate) fn run(graph: &Graph, opts: &LayoutOptions, mode: LayoutMode) -> LayoutResult {
    let timing_enabled = tracing::enabled!(tracing::Level::DEBUG);
    let mut timings = LayoutTimings::default();
    let total_start = timing_enabled.then(std::time::Instant::now);

    let build_start = timing_enabled.then(std::time::Instant::now);
    let mut sim = SimGraph::from_graph(graph, opts);
    let clusters = Clusters::analyze(&sim);
    if let Some(s) = build_start {
        timings.build = s.elapsed();
    }
    tracing::debug!(
        nodes = sim.len(),
        edges = sim.edges.len(),
        groups = sim.groups.len(),
        clusters = clusters.len(),
        ?mode,
        "layout"
    );

    let mut rng = XorShift64Star::new(opts.random_seed);
    arrange(
        &mut sim,
        &clusters,
        opts,
        mode,
        0,
        &mut rng,
        timing_enabled.then_some(&mut timings),
    );

    let positions = sim
        .nodes
        .iter()
        .map(|n| (n.id.clone(), Point { x: n.x, y: n.y }))
        .collect();

    if let Some(s) = total_start {
        timings.total = s.elapsed();
        tracing::debug!(
            total = ?timings.total,
            build = ?timings.build,
            seed = ?timings.seed,
            groups = ?timings.groups,
            simulate = ?timings.simulate,
            post = ?timings.post,
            "layout timings"
        );
    }

    LayoutResult { positions }
}

/// Places every node of `sim`: seeding plus simulation (or the group engine), then post-processing.
/// Also used for group sub-layouts and the meta layout.
pub(crate) fn arrange(
    sim: &mut SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    mode: LayoutMode,
    depth: usize,
    rng: &mut XorShift64Star,
    mut timings: Option<&mut LayoutTimings>,
) {
    match sim.len() {
        0 => return,
        1 => {
            let (cx, cy) = opts.center();
            sim.nodes[0].x = cx;
            sim.nodes[0].y = cy;
            return;
        }
        _ => {}
    }

    let warm = opts.use_existing_positions && sim.nodes.iter().any(|n| n.prior.is_some());
    if warm && sim.adopt_priors() && post::at_rest(sim, opts) {
        tracing::debug!(nodes = sim.len(), "existing positions already at rest");
        return;
    }
    let two_phase =
        mode == LayoutMode::FreshWithGroups && depth < MAX_GROUP_DEPTH && sim.has_groups() && !warm;

    if two_phase {
        let start = timings.is_some().then(std::time::Instant::now);
        let stats = groups::layout_groups(sim, clusters, opts, depth, rng);
        tracing::debug!(
            meta_nodes = stats.meta_nodes,
            meta_edges = stats.meta_edges,
            shared = stats.shared_nodes,
            ungrouped = stats.ungrouped_nodes,
            "group layout"
        );
        if let (Some(t), Some(s)) = (timings.as_deref_mut(), start) {
            t.groups = s.elapsed();
        }
    } else {
        let start = timings.is_some().then(std::time::Instant::now);
        let strategy = if sim.has_groups() {
            SeedStrategy::Groups
        } else {
            SeedStrategy::Rings
        };
        seed::seed_positions(sim, clusters, opts, strategy, rng);
        if let (Some(t), Some(s)) = (timings.as_deref_mut(), start) {
            t.seed = s.elapsed();
        }

        let start = timings.is_some().then(std::time::Instant::now);
        let params = if warm {
            SimulationParams::warm(opts)
        } else {
            SimulationParams::fresh(opts)
        };
        let stats = force::simulate(sim, clusters, opts, &params, rng);
        tracing::trace!(
            iterations = stats.iterations,
            final_alpha = stats.final_alpha,
            "simulation finished"
        );
        if let (Some(t), Some(s)) = (timings.as_deref_mut(), start) {
            t.simulate = s.elapsed();
        }
    }

    let start = timings.is_some().then(std::time::Instant::now);
    let stats = post::post_process(sim, clusters, opts, rng);
    tracing::trace!(
        overlaps = stats.overlaps_fixed,
        separations = stats.separations_fixed,
        crossings_fixed = stats.crossings.fixed,
        sweep_rounds = stats.sweep_rounds,
        "post-processing finished"
    );
    if let (Some(t), Some(s)) = (timings.as_deref_mut(), start) {
        t.post = s.elapsed();
    }
}
