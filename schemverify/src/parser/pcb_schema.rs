use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// The parts of a `.kicad_pcb` the structure checks look at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcbDesign {
    pub filename: String,
    pub version: Option<String>,
    pub layers: Vec<PcbLayer>,
    pub footprints: Vec<Footprint>,
    pub graphics: Vec<GraphicItem>,
    pub zones: Vec<Zone>,
}

impl PcbDesign {
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.canonical_name.as_str())
    }

    /// Graphics drawn on the board outline layer.
    pub fn edge_cuts(&self) -> impl Iterator<Item = &GraphicItem> {
        self.graphics.iter().filter(|g| g.layer == "Edge.Cuts")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcbLayer {
    pub ordinal: u32,
    pub canonical_name: String,
    pub layer_type: LayerType,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerType {
    Signal,
    Power,
    Mixed,
    Jumper,
    User,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub reference: String,
    pub footprint_lib: String,
    pub layer: String,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphicType {
    Line,
    Arc,
    Circle,
    Rect,
    Polygon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicItem {
    pub item_type: GraphicType,
    pub layer: String,
    /// Defining points: start/mid/end/center or polygon vertices.
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub net_name: String,
    pub layers: Vec<String>,
}
