//! Layout configuration.
//!
//! Callers describe what they want through [`LayoutOverrides`] (a sparse, alias-friendly surface
//! that mirrors the JSON keys used by host applications). It is resolved exactly once into an
//! immutable [`LayoutOptions`] by layering defaults, the scale preset, the iteration preset and
//! finally the explicit overrides.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutScale {
    Compact,
    #[default]
    Balanced,
    Spacious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationPreset {
    Fast,
    #[default]
    Balanced,
    Deep,
}

/// Distance-related parameters controlled by [`LayoutScale`].
#[derive(Debug, Clone, Copy)]
struct ScaleProfile {
    target_link_distance: f64,
    min_node_distance: f64,
    repulsion_strength: f64,
    min_group_distance: f64,
    max_repulsion_distance: f64,
}

impl LayoutScale {
    fn profile(self) -> ScaleProfile {
        match self {
            LayoutScale::Compact => ScaleProfile {
                target_link_distance: 120.0,
                min_node_distance: 60.0,
                repulsion_strength: 4500.0,
                min_group_distance: 220.0,
                max_repulsion_distance: 480.0,
            },
            LayoutScale::Balanced => ScaleProfile {
                target_link_distance: 180.0,
                min_node_distance: 90.0,
                repulsion_strength: 8000.0,
                min_group_distance: 300.0,
                max_repulsion_distance: 720.0,
            },
            LayoutScale::Spacious => ScaleProfile {
                target_link_distance: 260.0,
                min_node_distance: 130.0,
                repulsion_strength: 14000.0,
                min_group_distance: 420.0,
                max_repulsion_distance: 1040.0,
            },
        }
    }
}

impl IterationPreset {
    /// `(iterations, alpha_decay)`; the decay brings alpha from 1.0 to ~0.001 over the budget.
    fn schedule(self) -> (usize, f64) {
        match self {
            IterationPreset::Fast => (120, 0.0559),
            IterationPreset::Balanced => (300, 0.0228),
            IterationPreset::Deep => (600, 0.0114),
        }
    }
}

pub const MIN_SCALE_MULTIPLIER: f64 = 0.5;
pub const MAX_SCALE_MULTIPLIER: f64 = 1.6;

/// Fully resolved, immutable layout parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub width: f64,
    pub height: f64,
    /// Margin kept between every node center and the canvas border.
    pub padding: f64,
    pub layout_scale: LayoutScale,
    pub layout_scale_multiplier: f64,
    pub iteration_preset: IterationPreset,
    pub iterations: usize,
    pub alpha_decay: f64,
    pub alpha_min: f64,
    pub repulsion_strength: f64,
    pub attraction_strength: f64,
    pub target_link_distance: f64,
    pub min_node_distance: f64,
    pub center_strength: f64,
    /// Minimum node radius, also used as the footprint for nodes without usable dimensions.
    pub collision_radius: f64,
    pub edge_avoidance: f64,
    /// Velocity retention per iteration (`v = (v + f) * damping`).
    pub damping: f64,
    /// `0.0` disables the in-loop constraint pass.
    pub stiffness: f64,
    pub group_attraction_strength: f64,
    pub group_repulsion_strength: f64,
    pub group_exclusion_strength: f64,
    pub min_group_distance: f64,
    pub group_boundary_padding: f64,
    pub max_repulsion_distance: f64,
    pub use_existing_positions: bool,
    pub enable_edge_repulsion: bool,
    pub random_seed: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        let profile = LayoutScale::Balanced.profile();
        let (iterations, alpha_decay) = IterationPreset::Balanced.schedule();
        Self {
            width: 1600.0,
            height: 1200.0,
            padding: 50.0,
            layout_scale: LayoutScale::Balanced,
            layout_scale_multiplier: 1.0,
            iteration_preset: IterationPreset::Balanced,
            iterations,
            alpha_decay,
            alpha_min: 0.001,
            repulsion_strength: profile.repulsion_strength,
            attraction_strength: 0.08,
            target_link_distance: profile.target_link_distance,
            min_node_distance: profile.min_node_distance,
            center_strength: 0.02,
            collision_radius: 24.0,
            edge_avoidance: 0.5,
            damping: 0.6,
            stiffness: 0.0,
            group_attraction_strength: 0.04,
            group_repulsion_strength: 0.8,
            group_exclusion_strength: 0.6,
            min_group_distance: profile.min_group_distance,
            group_boundary_padding: 40.0,
            max_repulsion_distance: profile.max_repulsion_distance,
            use_existing_positions: false,
            enable_edge_repulsion: true,
            random_seed: 0x5EED,
        }
    }
}

impl LayoutOptions {
    /// Layers defaults → scale preset → iteration preset → explicit overrides.
    pub fn resolve(overrides: &LayoutOverrides) -> Self {
        let mut out = Self::default();

        let scale = overrides.layout_scale.unwrap_or_default();
        let multiplier = overrides
            .layout_scale_multiplier
            .filter(|v| v.is_finite())
            .unwrap_or(1.0)
            .clamp(MIN_SCALE_MULTIPLIER, MAX_SCALE_MULTIPLIER);
        out.apply_scale(scale, multiplier);
        out.apply_iteration_preset(overrides.iteration_preset.unwrap_or_default());
        out.apply_overrides(overrides);
        out
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::resolve(&LayoutOverrides::from_value(value)?))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let overrides: LayoutOverrides = serde_json::from_str(text)?;
        Ok(Self::resolve(&overrides))
    }

    fn apply_scale(&mut self, scale: LayoutScale, multiplier: f64) {
        let p = scale.profile();
        self.layout_scale = scale;
        self.layout_scale_multiplier = multiplier;
        self.target_link_distance = p.target_link_distance * multiplier;
        self.min_node_distance = p.min_node_distance * multiplier;
        self.min_group_distance = p.min_group_distance * multiplier;
        self.max_repulsion_distance = p.max_repulsion_distance * multiplier;
        self.repulsion_strength = p.repulsion_strength * multiplier * multiplier;
    }

    fn apply_iteration_preset(&mut self, preset: IterationPreset) {
        let (iterations, alpha_decay) = preset.schedule();
        self.iteration_preset = preset;
        self.iterations = iterations;
        self.alpha_decay = alpha_decay;
    }

    fn apply_overrides(&mut self, o: &LayoutOverrides) {
        set_positive(&mut self.width, o.width);
        set_positive(&mut self.height, o.height);
        set_non_negative(&mut self.padding, o.padding);
        if let Some(v) = o.iterations {
            self.iterations = v;
        }
        set_fraction(&mut self.alpha_decay, o.alpha_decay);
        set_fraction(&mut self.alpha_min, o.alpha_min);
        set_non_negative(&mut self.repulsion_strength, o.repulsion_strength);
        set_non_negative(&mut self.attraction_strength, o.attraction_strength);
        set_positive(&mut self.target_link_distance, o.target_link_distance);
        set_non_negative(&mut self.min_node_distance, o.min_node_distance);
        set_non_negative(&mut self.center_strength, o.center_strength);
        set_positive(&mut self.collision_radius, o.collision_radius);
        set_non_negative(&mut self.edge_avoidance, o.edge_avoidance);
        set_fraction(&mut self.damping, o.damping);
        set_fraction(&mut self.stiffness, o.stiffness);
        set_non_negative(
            &mut self.group_attraction_strength,
            o.group_attraction_strength,
        );
        set_non_negative(&mut self.group_repulsion_strength, o.group_repulsion_strength);
        set_non_negative(&mut self.group_exclusion_strength, o.group_exclusion_strength);
        set_non_negative(&mut self.min_group_distance, o.min_group_distance);
        set_non_negative(&mut self.group_boundary_padding, o.group_boundary_padding);
        set_positive(&mut self.max_repulsion_distance, o.max_repulsion_distance);
        if let Some(v) = o.use_existing_positions {
            self.use_existing_positions = v;
        }
        if let Some(v) = o.enable_edge_repulsion {
            self.enable_edge_repulsion = v;
        }
        if let Some(v) = o.random_seed {
            self.random_seed = v;
        }
    }

    /// Node centers are clamped into `[lo, hi]` on each axis; a canvas thinner than twice the
    /// padding collapses to its midline.
    pub(crate) fn x_bounds(&self) -> (f64, f64) {
        axis_bounds(self.width, self.padding)
    }

    pub(crate) fn y_bounds(&self) -> (f64, f64) {
        axis_bounds(self.height, self.padding)
    }

    pub(crate) fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub(crate) fn clamp_point(&self, x: f64, y: f64) -> (f64, f64) {
        let (x0, x1) = self.x_bounds();
        let (y0, y1) = self.y_bounds();
        (x.clamp(x0, x1), y.clamp(y0, y1))
    }

    /// Hard floor between two nodes whose group memberships are fully disjoint.
    pub fn group_separation_floor(&self) -> f64 {
        (1.5 * self.min_node_distance).max(0.8 * self.min_group_distance)
    }
}

fn axis_bounds(extent: f64, padding: f64) -> (f64, f64) {
    if extent <= 2.0 * padding {
        let mid = extent / 2.0;
        (mid, mid)
    } else {
        (padding, extent - padding)
    }
}

fn set_positive(slot: &mut f64, v: Option<f64>) {
    if let Some(v) = v.filter(|v| v.is_finite() && *v > 0.0) {
        *slot = v;
    }
}

fn set_non_negative(slot: &mut f64, v: Option<f64>) {
    if let Some(v) = v.filter(|v| v.is_finite() && *v >= 0.0) {
        *slot = v;
    }
}

fn set_fraction(slot: &mut f64, v: Option<f64>) {
    if let Some(v) = v.filter(|v| v.is_finite() && (0.0..=1.0).contains(v)) {
        *slot = v;
    }
}

/// Sparse caller overrides, deserialised from the host application's camelCase option bag.
///
/// Unknown keys are rejected rather than silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LayoutOverrides {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub padding: Option<f64>,
    pub layout_scale: Option<LayoutScale>,
    pub layout_scale_multiplier: Option<f64>,
    pub iteration_preset: Option<IterationPreset>,
    pub iterations: Option<usize>,
    pub alpha_decay: Option<f64>,
    pub alpha_min: Option<f64>,
    pub repulsion_strength: Option<f64>,
    pub attraction_strength: Option<f64>,
    #[serde(alias = "linkDistance")]
    pub target_link_distance: Option<f64>,
    #[serde(alias = "minLinkDistance")]
    pub min_node_distance: Option<f64>,
    pub center_strength: Option<f64>,
    #[serde(alias = "minNodeRadius")]
    pub collision_radius: Option<f64>,
    pub edge_avoidance: Option<f64>,
    #[serde(alias = "velocityDecay")]
    pub damping: Option<f64>,
    pub stiffness: Option<f64>,
    pub group_attraction_strength: Option<f64>,
    pub group_repulsion_strength: Option<f64>,
    pub group_exclusion_strength: Option<f64>,
    pub min_group_distance: Option<f64>,
    pub group_boundary_padding: Option<f64>,
    pub max_repulsion_distance: Option<f64>,
    pub use_existing_positions: Option<bool>,
    pub enable_edge_repulsion: Option<bool>,
    pub random_seed: Option<u64>,
}

impl LayoutOverrides {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }
}
