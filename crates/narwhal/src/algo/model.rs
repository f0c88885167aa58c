//! Arena representation shared by every layout pass.
//!
//! Nodes live in a flat `Vec` addressed by `usize` handles; ids are only consulted when building
//! the arena and when writing the result back.

use crate::graph::Graph;
use crate::options::LayoutOptions;
use rustc_hash::{FxHashMap, FxHashSet};

/// Extra room (on top of the mean label width) reserved for label-aware edge lengths.
const LABEL_CLEARANCE: f64 = 40.0;
/// Weight of the label-aware length when it exceeds the configured target.
const LABEL_BLEND: f64 = 0.6;
/// Cross-group edges never shrink below this fraction of `min_group_distance`.
const CROSS_GROUP_FLOOR: f64 = 0.7;

#[derive(Debug, Clone)]
pub(crate) struct SimNode {
    pub(crate) id: String,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) label_width: f64,
    /// Collision radius: the largest of body, label and image extents.
    pub(crate) radius: f64,
    /// Caller-supplied center, if finite.
    pub(crate) prior: Option<(f64, f64)>,
}

impl SimNode {
    pub(crate) fn synthetic(id: impl Into<String>, width: f64, height: f64, collision: f64) -> Self {
        let width = sanitize_extent(width, collision);
        let height = sanitize_extent(height, collision);
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            width,
            height,
            label_width: 0.0,
            radius: (width.max(height) / 2.0).max(collision),
            prior: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimEdge {
    pub(crate) a: usize,
    pub(crate) b: usize,
    /// Spring strength multiplier (1.0 for real edges, aggregated weights for meta-edges).
    pub(crate) weight: f64,
    /// Rest length, already floored by node radii and the cross-group minimum.
    pub(crate) target: f64,
    /// Both endpoints are grouped and share no group.
    pub(crate) cross_group: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SimGroup {
    pub(crate) id: String,
    pub(crate) members: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub(crate) min_x: f64,
    pub(crate) min_y: f64,
    pub(crate) max_x: f64,
    pub(crate) max_y: f64,
}

impl Rect {
    pub(crate) fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub(crate) fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub(crate) fn expanded(&self, pad: f64) -> Rect {
        Rect {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    pub(crate) fn contains(&self, x: f64, y: f64) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }

    /// Distance from an interior point to the nearest edge of the rectangle.
    pub(crate) fn depth(&self, x: f64, y: f64) -> f64 {
        (x - self.min_x)
            .min(self.max_x - x)
            .min(y - self.min_y)
            .min(self.max_y - y)
            .max(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SimGraph {
    pub(crate) nodes: Vec<SimNode>,
    pub(crate) edges: Vec<SimEdge>,
    pub(crate) groups: Vec<SimGroup>,
    /// Sorted group handles per node.
    pub(crate) node_groups: Vec<Vec<usize>>,
    pub(crate) id_to_idx: FxHashMap<String, usize>,
}

impl SimGraph {
    pub(crate) fn from_graph(graph: &Graph, opts: &LayoutOptions) -> Self {
        let mut nodes: Vec<SimNode> = Vec::with_capacity(graph.nodes.len());
        let mut id_to_idx: FxHashMap<String, usize> = FxHashMap::default();
        id_to_idx.reserve(graph.nodes.len());

        for n in &graph.nodes {
            if id_to_idx.contains_key(n.id.as_str()) {
                tracing::trace!(id = %n.id, "duplicate node id ignored");
                continue;
            }
            let collision = opts.collision_radius;
            let width = sanitize_extent(n.width, collision);
            let height = sanitize_extent(n.height, collision);
            let label_width = n.label_width.filter(|v| v.is_finite() && *v > 0.0);
            let image_height = n.image_height.filter(|v| v.is_finite() && *v > 0.0);
            let body = width.max(height) / 2.0;
            let label = label_width.unwrap_or(0.0) / 2.0;
            let image = image_height.map(|ih| (height + ih) / 2.0).unwrap_or(0.0);
            let prior = match (n.x, n.y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
                _ => None,
            };

            id_to_idx.insert(n.id.clone(), nodes.len());
            nodes.push(SimNode {
                id: n.id.clone(),
                x: 0.0,
                y: 0.0,
                width,
                height,
                label_width: label_width.unwrap_or(0.0),
                radius: body.max(label).max(image).max(collision),
                prior,
            });
        }

        let mut groups: Vec<SimGroup> = Vec::new();
        for g in &graph.groups {
            let mut members: Vec<usize> = Vec::with_capacity(g.members.len());
            for m in &g.members {
                match id_to_idx.get(m.as_str()) {
                    Some(&idx) => members.push(idx),
                    None => tracing::trace!(group = %g.id, member = %m, "unresolved group member"),
                }
            }
            members.sort_unstable();
            members.dedup();
            if members.is_empty() {
                continue;
            }
            groups.push(SimGroup {
                id: g.id.clone(),
                members,
            });
        }

        let mut edges: Vec<(usize, usize, f64)> = Vec::with_capacity(graph.edges.len());
        for e in &graph.edges {
            let (Some(&a), Some(&b)) = (
                id_to_idx.get(e.source.as_str()),
                id_to_idx.get(e.target.as_str()),
            ) else {
                tracing::trace!(source = %e.source, target = %e.target, "edge with missing endpoint dropped");
                continue;
            };
            edges.push((a, b, 1.0));
        }

        Self::from_parts(nodes, &edges, groups, opts)
    }

    /// Builds an arena from already-resolved parts. Self loops and duplicate unordered pairs are
    /// dropped.
    pub(crate) fn from_parts(
        nodes: Vec<SimNode>,
        edges: &[(usize, usize, f64)],
        groups: Vec<SimGroup>,
        opts: &LayoutOptions,
    ) -> Self {
        let mut node_groups: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (gi, g) in groups.iter().enumerate() {
            for &m in &g.members {
                node_groups[m].push(gi);
            }
        }

        let mut id_to_idx: FxHashMap<String, usize> = FxHashMap::default();
        for (idx, n) in nodes.iter().enumerate() {
            id_to_idx.entry(n.id.clone()).or_insert(idx);
        }

        let mut sim = Self {
            nodes,
            edges: Vec::with_capacity(edges.len()),
            groups,
            node_groups,
            id_to_idx,
        };

        let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
        for &(a, b, weight) in edges {
            if a == b || a >= sim.nodes.len() || b >= sim.nodes.len() {
                continue;
            }
            if !seen.insert((a.min(b), a.max(b))) {
                continue;
            }
            let cross_group = sim.disjoint(a, b);
            let target = sim.edge_target(a, b, cross_group, opts);
            sim.edges.push(SimEdge {
                a,
                b,
                weight,
                target,
                cross_group,
            });
        }
        sim
    }

    fn edge_target(&self, a: usize, b: usize, cross_group: bool, opts: &LayoutOptions) -> f64 {
        let (na, nb) = (&self.nodes[a], &self.nodes[b]);
        let base = opts.target_link_distance;
        let label_aware = (na.label_width + nb.label_width) / 2.0 + LABEL_CLEARANCE;
        let blended = if label_aware > base {
            LABEL_BLEND * label_aware + (1.0 - LABEL_BLEND) * base
        } else {
            base
        };
        let mut target = blended.max(1.1 * (na.radius + nb.radius));
        if cross_group {
            target = target.max(CROSS_GROUP_FLOOR * opts.min_group_distance);
        }
        target
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }

    pub(crate) fn is_grouped(&self, i: usize) -> bool {
        !self.node_groups[i].is_empty()
    }

    pub(crate) fn in_group(&self, i: usize, g: usize) -> bool {
        self.node_groups[i].binary_search(&g).is_ok()
    }

    pub(crate) fn shares_group(&self, i: usize, j: usize) -> bool {
        let (a, b) = (&self.node_groups[i], &self.node_groups[j]);
        let (mut p, mut q) = (0, 0);
        while p < a.len() && q < b.len() {
            match a[p].cmp(&b[q]) {
                std::cmp::Ordering::Less => p += 1,
                std::cmp::Ordering::Greater => q += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Both nodes belong to at least one group and have no group in common.
    pub(crate) fn disjoint(&self, i: usize, j: usize) -> bool {
        self.is_grouped(i) && self.is_grouped(j) && !self.shares_group(i, j)
    }

    /// Groups `g` and `h` have no member in common.
    pub(crate) fn groups_disjoint(&self, g: usize, h: usize) -> bool {
        !self.groups[g].members.iter().any(|&m| self.in_group(m, h))
    }

    pub(crate) fn centroid(&self, indices: &[usize]) -> Option<(f64, f64)> {
        if indices.is_empty() {
            return None;
        }
        let (mut sx, mut sy) = (0.0, 0.0);
        for &i in indices {
            sx += self.nodes[i].x;
            sy += self.nodes[i].y;
        }
        let n = indices.len() as f64;
        Some((sx / n, sy / n))
    }

    /// Bounding box of the node footprints (center ± radius).
    pub(crate) fn bounds(&self, indices: &[usize]) -> Option<Rect> {
        let mut it = indices.iter();
        let first = &self.nodes[*it.next()?];
        let mut r = Rect {
            min_x: first.x - first.radius,
            min_y: first.y - first.radius,
            max_x: first.x + first.radius,
            max_y: first.y + first.radius,
        };
        for &i in it {
            let n = &self.nodes[i];
            r.min_x = r.min_x.min(n.x - n.radius);
            r.min_y = r.min_y.min(n.y - n.radius);
            r.max_x = r.max_x.max(n.x + n.radius);
            r.max_y = r.max_y.max(n.y + n.radius);
        }
        Some(r)
    }

    pub(crate) fn translate(&mut self, indices: &[usize], dx: f64, dy: f64) {
        for &i in indices {
            self.nodes[i].x += dx;
            self.nodes[i].y += dy;
        }
    }

    /// Moves every node onto its prior position. Does nothing unless every node has one.
    pub(crate) fn adopt_priors(&mut self) -> bool {
        if self.nodes.iter().any(|n| n.prior.is_none()) {
            return false;
        }
        for n in &mut self.nodes {
            if let Some((x, y)) = n.prior {
                n.x = x;
                n.y = y;
            }
        }
        true
    }

    pub(crate) fn clamp_all(&mut self, opts: &LayoutOptions) {
        for n in &mut self.nodes {
            (n.x, n.y) = opts.clamp_point(n.x, n.y);
        }
    }

    /// Isolated copy of `members` and the edges running between them; groups are not carried.
    pub(crate) fn subgraph(&self, members: &[usize], opts: &LayoutOptions) -> SimGraph {
        let mut local: FxHashMap<usize, usize> = FxHashMap::default();
        let mut nodes: Vec<SimNode> = Vec::with_capacity(members.len());
        for &m in members {
            local.insert(m, nodes.len());
            nodes.push(self.nodes[m].clone());
        }
        let edges: Vec<(usize, usize, f64)> = self
            .edges
            .iter()
            .filter_map(|e| Some((*local.get(&e.a)?, *local.get(&e.b)?, e.weight)))
            .collect();
        SimGraph::from_parts(nodes, &edges, Vec::new(), opts)
    }
}

fn sanitize_extent(v: f64, collision: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        2.0 * collision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Group, Node};

    fn graph() -> Graph {
        Graph::new(
            vec![
                Node::new("a", 40.0, 20.0),
                Node::new("b", 40.0, 20.0).with_label(300.0, 16.0),
                Node::new("c", f64::NAN, 20.0),
                Node::new("a", 999.0, 999.0),
            ],
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "a"),
                Edge::new("a", "missing"),
                Edge::new("c", "c"),
                Edge::new("b", "c"),
            ],
        )
        .with_groups(vec![
            Group::new("g1", ["a", "ghost"]),
            Group::new("g2", ["c"]),
            Group::new("empty", ["nobody"]),
        ])
    }

    #[test]
    fn from_graph_drops_invalid_edges_and_empty_groups() {
        let opts = LayoutOptions::default();
        let sim = SimGraph::from_graph(&graph(), &opts);
        assert_eq!(sim.len(), 3);
        assert_eq!(sim.edges.len(), 2);
        assert_eq!(sim.groups.len(), 2);
        assert_eq!(sim.groups[0].members, vec![0]);
        assert_eq!(sim.nodes[2].width, 2.0 * opts.collision_radius);
    }

    #[test]
    fn label_width_stretches_edge_target() {
        let opts = LayoutOptions::default();
        let sim = SimGraph::from_graph(&graph(), &opts);
        let ab = sim.edges[0];
        assert!(ab.target > opts.target_link_distance);
        assert!(!ab.cross_group);
    }

    #[test]
    fn image_height_extends_the_radius() {
        let opts = LayoutOptions::default();
        let g = Graph::new(
            vec![
                Node::new("plain", 40.0, 20.0),
                Node::new("pictured", 40.0, 20.0).with_image_height(100.0),
                Node::new("broken", 40.0, 20.0).with_image_height(f64::INFINITY),
            ],
            Vec::new(),
        );
        let sim = SimGraph::from_graph(&g, &opts);
        assert_eq!(sim.nodes[0].radius, opts.collision_radius);
        assert_eq!(sim.nodes[1].radius, 60.0);
        assert_eq!(sim.nodes[2].radius, opts.collision_radius);
    }

    #[test]
    fn priors_are_adopted_only_when_complete() {
        let opts = LayoutOptions::default();
        let partial = Graph::new(
            vec![Node::new("a", 40.0, 20.0).at(100.0, 200.0), Node::new("b", 40.0, 20.0)],
            Vec::new(),
        );
        let mut sim = SimGraph::from_graph(&partial, &opts);
        assert!(!sim.adopt_priors());
        assert_eq!((sim.nodes[0].x, sim.nodes[0].y), (0.0, 0.0));

        let full = Graph::new(
            vec![
                Node::new("a", 40.0, 20.0).at(100.0, 200.0),
                Node::new("b", 40.0, 20.0).at(300.0, 400.0),
            ],
            Vec::new(),
        );
        let mut sim = SimGraph::from_graph(&full, &opts);
        assert!(sim.adopt_priors());
        assert_eq!((sim.nodes[1].x, sim.nodes[1].y), (300.0, 400.0));
    }

    #[test]
    fn disjoint_requires_both_nodes_grouped() {
        let opts = LayoutOptions::default();
        let sim = SimGraph::from_graph(&graph(), &opts);
        assert!(sim.disjoint(0, 2));
        assert!(!sim.disjoint(0, 1));
        assert!(sim.groups_disjoint(0, 1));
    }
}
