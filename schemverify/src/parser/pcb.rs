//! KiCad PCB reader (`.kicad_pcb`).
//!
//! Key format details:
//! - All values are in millimeters
//! - Layers are identified by ordinal number and canonical name
//! - Board outline is drawn with `gr_*` items on `Edge.Cuts`
//! - Zones name their net with `net_name` and their layers with
//!   `layer` or `layers`

use std::path::Path;

use thiserror::Error;

use crate::geometry::Point;
use crate::parser::pcb_schema::*;
use crate::parser::sexp::{ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum PcbParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub struct PcbParser;

impl PcbParser {
    pub fn parse_pcb(path: &Path) -> Result<PcbDesign, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::parse_pcb_str(&content, filename)
    }

    pub fn parse_pcb_str(content: &str, filename: &str) -> Result<PcbDesign, PcbParseError> {
        let root = SExpParser::new(content).parse()?;

        match root.head() {
            Some("kicad_pcb") => {}
            Some(other) => {
                return Err(PcbParseError::InvalidFormat(format!(
                    "Expected kicad_pcb, found {}",
                    other
                )))
            }
            None => {
                return Err(PcbParseError::InvalidFormat(
                    "Expected kicad_pcb root".to_string(),
                ))
            }
        }

        let mut pcb = PcbDesign {
            filename: filename.to_string(),
            version: root.value("version").map(str::to_string),
            ..Default::default()
        };

        for item in root.args() {
            let Some(tag) = item.head() else { continue };
            match tag {
                "layers" => pcb.layers = Self::parse_layers(item),
                "footprint" | "module" => match Self::parse_footprint(item) {
                    Ok(fp) => pcb.footprints.push(fp),
                    Err(e) => tracing::warn!("{}: skipping footprint: {}", filename, e),
                },
                "zone" => pcb.zones.push(Self::parse_zone(item)),
                "gr_line" | "gr_arc" | "gr_circle" | "gr_rect" | "gr_poly" => {
                    pcb.graphics.push(Self::parse_graphic(item, tag));
                }
                _ => {}
            }
        }

        tracing::debug!(
            "{}: {} layers, {} footprints, {} graphics, {} zones",
            filename,
            pcb.layers.len(),
            pcb.footprints.len(),
            pcb.graphics.len(),
            pcb.zones.len()
        );

        Ok(pcb)
    }

    /// `(layers (0 "F.Cu" signal) (1 "In1.Cu" power "GND") ...)`
    fn parse_layers(sexp: &SExp) -> Vec<PcbLayer> {
        let Some(list) = sexp.as_list() else {
            return Vec::new();
        };
        list.iter()
            .skip(1)
            .filter_map(|layer| {
                let ordinal = layer.atom_at(0)?.parse().ok()?;
                let canonical_name = layer.atom_at(1)?.to_string();
                let layer_type = match layer.atom_at(2).unwrap_or("signal") {
                    "signal" => LayerType::Signal,
                    "power" => LayerType::Power,
                    "mixed" => LayerType::Mixed,
                    "jumper" => LayerType::Jumper,
                    "user" => LayerType::User,
                    _ => LayerType::Unknown,
                };
                Some(PcbLayer {
                    ordinal,
                    canonical_name,
                    layer_type,
                    user_name: layer.atom_at(3).map(str::to_string),
                })
            })
            .collect()
    }

    fn parse_footprint(sexp: &SExp) -> Result<Footprint, PcbParseError> {
        let footprint_lib = sexp.atom_at(1).unwrap_or_default().to_string();
        let at = sexp
            .find("at")
            .ok_or_else(|| PcbParseError::MissingField("footprint at".to_string()))?;
        let position = match (at.f64_at(1), at.f64_at(2)) {
            (Some(x), Some(y)) => Point::new(x, y),
            _ => return Err(PcbParseError::InvalidFormat("Invalid 'at' format".to_string())),
        };

        // KiCad 8+ uses (property "Reference" ..), older boards (fp_text reference ..)
        let reference = sexp
            .find_all("property")
            .find(|p| p.atom_at(1) == Some("Reference"))
            .and_then(|p| p.atom_at(2))
            .or_else(|| {
                sexp.find_all("fp_text")
                    .find(|t| t.atom_at(1) == Some("reference"))
                    .and_then(|t| t.atom_at(2))
            })
            .unwrap_or("?")
            .to_string();

        Ok(Footprint {
            reference,
            footprint_lib,
            layer: sexp.value("layer").unwrap_or("F.Cu").to_string(),
            position,
        })
    }

    fn parse_zone(sexp: &SExp) -> Zone {
        let mut layers: Vec<String> = sexp
            .find("layers")
            .map(|l| {
                l.args()
                    .iter()
                    .filter_map(SExp::as_atom)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(layer) = sexp.value("layer") {
            layers.push(layer.to_string());
        }
        Zone {
            net_name: sexp.value("net_name").unwrap_or_default().to_string(),
            layers,
        }
    }

    fn parse_graphic(sexp: &SExp, tag: &str) -> GraphicItem {
        let item_type = match tag {
            "gr_arc" => GraphicType::Arc,
            "gr_circle" => GraphicType::Circle,
            "gr_rect" => GraphicType::Rect,
            "gr_poly" => GraphicType::Polygon,
            _ => GraphicType::Line,
        };

        let mut points: Vec<Point> = ["start", "mid", "end", "center"]
            .iter()
            .filter_map(|key| {
                let node = sexp.find(key)?;
                Some(Point::new(node.f64_at(1)?, node.f64_at(2)?))
            })
            .collect();
        if let Some(pts) = sexp.find("pts") {
            points.extend(
                pts.find_all("xy")
                    .filter_map(|xy| Some(Point::new(xy.f64_at(1)?, xy.f64_at(2)?))),
            );
        }

        GraphicItem {
            item_type,
            layer: sexp.value("layer").unwrap_or_default().to_string(),
            points,
        }
    }
}
