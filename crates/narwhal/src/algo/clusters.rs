//! Connected components and degree bookkeeping.

use super::model::SimGraph;

#[derive(Debug, Clone)]
pub(crate) struct Clusters {
    /// Components sorted by descending size (ties: smallest handle first).
    pub(crate) components: Vec<Vec<usize>>,
    adjacency: Vec<Vec<usize>>,
    component_of: Vec<usize>,
}

impl Clusters {
    pub(crate) fn analyze(sim: &SimGraph) -> Self {
        let n = sim.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for e in &sim.edges {
            adjacency[e.a].push(e.b);
            adjacency[e.b].push(e.a);
        }

        let mut visited = vec![false; n];
        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push(start);
            let mut comp: Vec<usize> = Vec::new();
            while let Some(v) = stack.pop() {
                comp.push(v);
                for &w in &adjacency[v] {
                    if !visited[w] {
                        visited[w] = true;
                        stack.push(w);
                    }
                }
            }
            comp.sort_unstable();
            components.push(comp);
        }
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

        let mut component_of = vec![0usize; n];
        for (ci, comp) in components.iter().enumerate() {
            for &v in comp {
                component_of[v] = ci;
            }
        }

        Self {
            components,
            adjacency,
            component_of,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn degree(&self, v: usize) -> usize {
        self.adjacency[v].len()
    }

    pub(crate) fn neighbors(&self, v: usize) -> &[usize] {
        &self.adjacency[v]
    }

    pub(crate) fn component_of(&self, v: usize) -> usize {
        self.component_of[v]
    }

    /// Placement order inside a cluster: degree descending, then id.
    pub(crate) fn ring_order(&self, sim: &SimGraph, cluster: &[usize]) -> Vec<usize> {
        let mut out = cluster.to_vec();
        out.sort_by(|&a, &b| {
            self.degree(b)
                .cmp(&self.degree(a))
                .then_with(|| sim.nodes[a].id.cmp(&sim.nodes[b].id))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Clusters;
    use crate::algo::model::SimGraph;
    use crate::graph::{Edge, Graph, Node};
    use crate::options::LayoutOptions;

    fn sim(nodes: &[&str], edges: &[(&str, &str)]) -> SimGraph {
        let g = Graph::new(
            nodes.iter().map(|id| Node::new(*id, 40.0, 20.0)).collect(),
            edges.iter().map(|(a, b)| Edge::new(*a, *b)).collect(),
        );
        SimGraph::from_graph(&g, &LayoutOptions::default())
    }

    #[test]
    fn components_are_sorted_by_size() {
        let s = sim(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("c", "d"), ("d", "e"), ("e", "c")],
        );
        let c = Clusters::analyze(&s);
        assert_eq!(c.components, vec![vec![2, 3, 4], vec![0, 1], vec![5]]);
        assert_eq!(c.component_of(5), 2);
        assert_eq!(c.degree(2), 2);
        assert_eq!(c.degree(5), 0);
    }

    #[test]
    fn ring_order_prefers_degree_then_id() {
        let s = sim(&["z", "y", "hub", "x"], &[("hub", "x"), ("hub", "y"), ("hub", "z")]);
        let c = Clusters::analyze(&s);
        let order: Vec<&str> = c
            .ring_order(&s, &c.components[0])
            .into_iter()
            .map(|i| s.nodes[i].id.as_str())
            .collect();
        assert_eq!(order, vec!["hub", "x", "y", "z"]);
    }

    #[test]
    fn empty_graph_has_no_components() {
        let c = Clusters::analyze(&sim(&[], &[]));
        assert_eq!(c.len(), 0);
    }
}
