use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Caller-owned layout input. The engine reads it and never writes back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = groups;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Optional prior center, only read when `use_existing_positions` is set.
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    /// Missing or non-finite extents fall back to the `collision_radius` footprint.
    #[serde(default = "missing_extent")]
    pub width: f64,
    #[serde(default = "missing_extent")]
    pub height: f64,
    #[serde(default)]
    pub label_width: Option<f64>,
    #[serde(default)]
    pub label_height: Option<f64>,
    /// Extra vertical extent for nodes rendering an image above their body.
    #[serde(default)]
    pub image_height: Option<f64>,
}

fn missing_extent() -> f64 {
    f64::NAN
}

impl Node {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x: None,
            y: None,
            width,
            height,
            label_width: None,
            label_height: None,
            image_height: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_label(mut self, width: f64, height: f64) -> Self {
        self.label_width = Some(width);
        self.label_height = Some(height);
        self
    }

    pub fn with_image_height(mut self, height: f64) -> Self {
        self.image_height = Some(height);
        self
    }
}

/// Undirected connection between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "sourceId")]
    pub source: String,
    #[serde(rename = "destinationId")]
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A named set of node ids. A node may belong to any number of groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(rename = "memberInstanceIds")]
    pub members: IndexSet<String>,
}

impl Group {
    pub fn new<I, S>(id: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub positions: std::collections::BTreeMap<String, Point>,
}

impl LayoutResult {
    pub fn get(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
