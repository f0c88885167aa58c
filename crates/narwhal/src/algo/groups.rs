//! Two-phase group layout.
//!
//! Phase one lays out each group's exclusive members in isolation and collapses every group into
//! a meta-node sized by its bounding box. The meta-graph (plus one meta-node for ungrouped nodes)
//! is laid out with the same simulator. Phase two stitches the sub-layouts onto the meta positions,
//! places shared and ungrouped nodes, and runs a short group-weighted refinement.

use super::clusters::Clusters;
use super::force::{self, SimulationParams, WARM_START_ALPHA};
use super::model::{Rect, SimGraph, SimNode};
use super::rng::XorShift64Star;
use super::{LayoutMode, LayoutTimings};
use crate::options::LayoutOptions;
use std::collections::BTreeMap;

const SUB_CANVAS_SCALE: f64 = 3.0;
const META_STIFFNESS: f64 = 0.6;
const META_REPULSION_SCALE: f64 = 4.0;
const META_EDGE_CAP: usize = 5;
const META_EDGE_SCALE: f64 = 0.25;
const SHARED_NODE_WEIGHT: f64 = 1.5;
const MULTI_GROUP_JITTER: f64 = 30.0;
const NEIGHBOR_JITTER: f64 = 20.0;
const REFINE_ITERATIONS: usize = 20;
const REFINE_ATTRACTION_SCALE: f64 = 2.0;
const REFINE_REPULSION_SCALE: f64 = 1.5;
const REFINE_EXCLUSION_SCALE: f64 = 2.0;

const UNGROUPED_META_ID: &str = "<ungrouped>";

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct GroupLayoutStats {
    pub(crate) meta_nodes: usize,
    pub(crate) meta_edges: usize,
    pub(crate) shared_nodes: usize,
    pub(crate) ungrouped_nodes: usize,
}

/// A group's exclusive members laid out around their own centroid.
struct SubLayout {
    members: Vec<usize>,
    offsets: Vec<(f64, f64)>,
    bounds: Option<Rect>,
}

#[derive(Default, Clone, Copy)]
struct MetaLink {
    cross_edges: usize,
    shared_nodes: usize,
}

impl MetaLink {
    fn weight(&self) -> f64 {
        META_EDGE_SCALE
            * (self.cross_edges.min(META_EDGE_CAP) as f64
                + SHARED_NODE_WEIGHT * self.shared_nodes.min(META_EDGE_CAP) as f64)
    }
}

fn sub_canvas(count: usize, opts: &LayoutOptions) -> LayoutOptions {
    let side =
        2.0 * opts.padding + SUB_CANVAS_SCALE * opts.target_link_distance * (count as f64).sqrt();
    LayoutOptions {
        width: side,
        height: side,
        use_existing_positions: false,
        ..opts.clone()
    }
}

fn meta_options(opts: &LayoutOptions) -> LayoutOptions {
    LayoutOptions {
        target_link_distance: opts.min_group_distance,
        stiffness: META_STIFFNESS,
        enable_edge_repulsion: false,
        repulsion_strength: opts.repulsion_strength * META_REPULSION_SCALE,
        use_existing_positions: false,
        ..opts.clone()
    }
}

pub(crate) fn layout_groups(
    sim: &mut SimGraph,
    clusters: &Clusters,
    opts: &LayoutOptions,
    depth: usize,
    rng: &mut XorShift64Star,
) -> GroupLayoutStats {
    let group_count = sim.groups.len();
    let subs: Vec<SubLayout> = (0..group_count)
        .map(|g| layout_group(sim, g, opts, depth, rng))
        .collect();

    let ungrouped: Vec<usize> = (0..sim.len()).filter(|&i| !sim.is_grouped(i)).collect();
    let shared: Vec<usize> = (0..sim.len())
        .filter(|&i| sim.node_groups[i].len() > 1)
        .collect();

    let mut meta_nodes: Vec<SimNode> = Vec::with_capacity(group_count + 1);
    for (g, sub) in subs.iter().enumerate() {
        let (w, h) = sub
            .bounds
            .map(|r| (r.width(), r.height()))
            .unwrap_or((2.0 * opts.collision_radius, 2.0 * opts.collision_radius));
        let pad = 2.0 * opts.group_boundary_padding;
        meta_nodes.push(SimNode::synthetic(
            sim.groups[g].id.clone(),
            w + pad,
            h + pad,
            opts.collision_radius,
        ));
    }
    let ungrouped_meta = (!ungrouped.is_empty()).then(|| {
        let side = opts.target_link_distance * (ungrouped.len() as f64).sqrt();
        meta_nodes.push(SimNode::synthetic(
            UNGROUPED_META_ID,
            side,
            side,
            opts.collision_radius,
        ));
        meta_nodes.len() - 1
    });

    let links = meta_links(sim, ungrouped_meta);
    let meta_edges: Vec<(usize, usize, f64)> = links
        .iter()
        .map(|(&(a, b), link)| (a, b, link.weight()))
        .collect();

    let meta_opts = meta_options(opts);
    let mut meta = SimGraph::from_parts(meta_nodes, &meta_edges, Vec::new(), &meta_opts);
    let meta_clusters = Clusters::analyze(&meta);
    super::arrange(
        &mut meta,
        &meta_clusters,
        &meta_opts,
        LayoutMode::Refinement,
        depth + 1,
        rng,
        None::<&mut LayoutTimings>,
    );
    tracing::debug!(
        meta_nodes = meta.len(),
        meta_edges = meta.edges.len(),
        "meta layout"
    );

    for (g, sub) in subs.iter().enumerate() {
        let (mx, my) = (meta.nodes[g].x, meta.nodes[g].y);
        for (&m, &(ox, oy)) in sub.members.iter().zip(&sub.offsets) {
            sim.nodes[m].x = mx + ox;
            sim.nodes[m].y = my + oy;
        }
    }

    for &i in &shared {
        let groups = &sim.node_groups[i];
        let n = groups.len() as f64;
        let ax = groups.iter().map(|&g| meta.nodes[g].x).sum::<f64>() / n;
        let ay = groups.iter().map(|&g| meta.nodes[g].y).sum::<f64>() / n;
        let (jx, jy) = rng.in_disk(MULTI_GROUP_JITTER);
        sim.nodes[i].x = ax + jx;
        sim.nodes[i].y = ay + jy;
    }

    let (fallback, fallback_radius) = match ungrouped_meta {
        Some(u) => {
            let n = &meta.nodes[u];
            ((n.x, n.y), n.width.min(n.height) / 2.0)
        }
        None => (opts.center(), opts.target_link_distance),
    };
    let mut placed = vec![true; sim.len()];
    for &i in &ungrouped {
        placed[i] = false;
    }
    for &i in &ungrouped {
        let anchors: Vec<usize> = clusters
            .neighbors(i)
            .iter()
            .copied()
            .filter(|&j| placed[j])
            .collect();
        let (x, y) = match sim.centroid(&anchors) {
            Some((ax, ay)) => {
                let (jx, jy) = rng.in_disk(NEIGHBOR_JITTER);
                (ax + jx, ay + jy)
            }
            None => {
                let (jx, jy) = rng.in_disk(fallback_radius);
                (fallback.0 + jx, fallback.1 + jy)
            }
        };
        sim.nodes[i].x = x;
        sim.nodes[i].y = y;
        placed[i] = true;
    }
    sim.clamp_all(opts);

    let refine = SimulationParams {
        iterations: REFINE_ITERATIONS,
        initial_alpha: WARM_START_ALPHA,
        group_attraction_scale: REFINE_ATTRACTION_SCALE,
        group_repulsion_scale: REFINE_REPULSION_SCALE,
        group_exclusion_scale: REFINE_EXCLUSION_SCALE,
    };
    force::simulate(sim, clusters, opts, &refine, rng);

    GroupLayoutStats {
        meta_nodes: meta.len(),
        meta_edges: meta.edges.len(),
        shared_nodes: shared.len(),
        ungrouped_nodes: ungrouped.len(),
    }
}

/// Lays out the members of group `g` that belong to no other group.
fn layout_group(
    sim: &SimGraph,
    g: usize,
    opts: &LayoutOptions,
    depth: usize,
    rng: &mut XorShift64Star,
) -> SubLayout {
    let members: Vec<usize> = sim.groups[g]
        .members
        .iter()
        .copied()
        .filter(|&m| sim.node_groups[m].len() == 1)
        .collect();
    if members.is_empty() {
        return SubLayout {
            members,
            offsets: Vec::new(),
            bounds: None,
        };
    }

    let sub_opts = sub_canvas(members.len(), opts);
    let mut sub = sim.subgraph(&members, &sub_opts);
    let sub_clusters = Clusters::analyze(&sub);
    super::arrange(
        &mut sub,
        &sub_clusters,
        &sub_opts,
        LayoutMode::Refinement,
        depth + 1,
        rng,
        None::<&mut LayoutTimings>,
    );

    let all: Vec<usize> = (0..sub.len()).collect();
    let (cx, cy) = sub.centroid(&all).unwrap_or_else(|| sub_opts.center());
    let offsets = sub.nodes.iter().map(|n| (n.x - cx, n.y - cy)).collect();
    let bounds = sub.bounds(&all);
    tracing::debug!(
        group = %sim.groups[g].id,
        members = members.len(),
        edges = sub.edges.len(),
        "group sub-layout"
    );
    SubLayout {
        members,
        offsets,
        bounds,
    }
}

/// Meta-node handle(s) a node counts toward: its groups, or the ungrouped meta-node.
fn meta_of(sim: &SimGraph, i: usize, ungrouped_meta: Option<usize>) -> Vec<usize> {
    if sim.is_grouped(i) {
        sim.node_groups[i].clone()
    } else {
        ungrouped_meta.into_iter().collect()
    }
}

fn meta_links(sim: &SimGraph, ungrouped_meta: Option<usize>) -> BTreeMap<(usize, usize), MetaLink> {
    let mut links: BTreeMap<(usize, usize), MetaLink> = BTreeMap::new();
    for e in &sim.edges {
        let from = meta_of(sim, e.a, ungrouped_meta);
        let to = meta_of(sim, e.b, ungrouped_meta);
        for &ga in &from {
            for &gb in &to {
                if ga == gb || to.contains(&ga) || from.contains(&gb) {
                    continue;
                }
                links.entry((ga.min(gb), ga.max(gb))).or_default().cross_edges += 1;
            }
        }
    }
    for groups in &sim.node_groups {
        for (k, &ga) in groups.iter().enumerate() {
            for &gb in &groups[k + 1..] {
                links.entry((ga, gb)).or_default().shared_nodes += 1;
            }
        }
    }
    links
}
