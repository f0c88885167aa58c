#![forbid(unsafe_code)]

//! Headless force/constraint layout for graphs with overlapping groups.
//!
//! `narwhal` computes 2D centers for the nodes of a [`Graph`]: connected nodes settle near a target
//! distance, disconnected clusters stay visibly apart, nodes do not overlap, groups that share no
//! member occupy separate regions, and obvious edge crossings are nudged away. Output is
//! deterministic for a given input and [`LayoutOptions::random_seed`].

pub(crate) mod algo;
pub mod error;
pub mod graph;
pub mod options;
pub mod quality;

pub use algo::LayoutMode;
pub use error::{Error, Result};
pub use graph::{Edge, Graph, Group, LayoutResult, Node, Point};
pub use options::{IterationPreset, LayoutOptions, LayoutOverrides, LayoutScale};
pub use quality::LayoutQuality;

/// Headless layout entry point.
pub fn layout(graph: &Graph, opts: &LayoutOptions) -> LayoutResult {
    algo::run(graph, opts, LayoutMode::default())
}

/// Like [`layout`], with an explicit [`LayoutMode`]. `Refinement` skips the two-phase group engine
/// and refines the whole graph in one simulation.
pub fn layout_with_mode(graph: &Graph, opts: &LayoutOptions, mode: LayoutMode) -> LayoutResult {
    algo::run(graph, opts, mode)
}
