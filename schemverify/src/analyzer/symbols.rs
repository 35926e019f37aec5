//! Library symbol geometry.
//!
//! A [`SymbolLibrary`] is built once per schematic from its embedded
//! `lib_symbols` section and handed by reference to whatever needs pin
//! offsets or bounding boxes.

use std::collections::HashMap;

use crate::geometry::BBox;
use crate::parser::schema::{short_lib_name, LibPin, LibSymbol, Primitive};

/// Pins and bounding boxes of one library symbol, in library space (Y-up).
#[derive(Debug, Clone)]
pub struct SymbolGeometry {
    pub pins: Vec<LibPin>,
    /// Primitives plus pin tips and pin body ends.
    pub full_bbox: Option<BBox>,
    /// Primitives only.
    pub body_bbox: Option<BBox>,
}

impl SymbolGeometry {
    pub fn from_lib_symbol(symbol: &LibSymbol) -> Self {
        let body: Vec<(f64, f64)> = symbol.primitives.iter().flat_map(primitive_coords).collect();
        let pin_coords = symbol.pins.iter().flat_map(|pin| {
            let (px, py) = pin.position;
            let rad = pin.angle.to_radians();
            [(px, py), (px + rad.cos() * pin.length, py + rad.sin() * pin.length)]
        });

        Self {
            pins: symbol.pins.clone(),
            full_bbox: BBox::from_coords(body.iter().copied().chain(pin_coords)),
            body_bbox: BBox::from_coords(body.iter().copied()),
        }
    }
}

fn primitive_coords(primitive: &Primitive) -> Vec<(f64, f64)> {
    match primitive {
        Primitive::Polyline(points) => points.clone(),
        Primitive::Rect { start, end } => vec![*start, *end],
        Primitive::Circle { center, radius } => vec![
            (center.0 - radius, center.1 - radius),
            (center.0 + radius, center.1 + radius),
        ],
        Primitive::Arc { start, mid, end } => vec![*start, *mid, *end],
    }
}

/// Symbol geometry keyed by full lib_id and by short name.
#[derive(Debug, Clone, Default)]
pub struct SymbolLibrary {
    by_id: HashMap<String, SymbolGeometry>,
    by_name: HashMap<String, SymbolGeometry>,
}

impl SymbolLibrary {
    pub fn new(symbols: &[LibSymbol]) -> Self {
        let mut library = Self::default();
        for symbol in symbols {
            let geometry = SymbolGeometry::from_lib_symbol(symbol);
            library
                .by_name
                .insert(short_lib_name(&symbol.lib_id).to_string(), geometry.clone());
            library.by_id.insert(symbol.lib_id.clone(), geometry);
        }
        library
    }

    /// Exact lib_id lookup; pin placement only trusts this one.
    pub fn get(&self, lib_id: &str) -> Option<&SymbolGeometry> {
        self.by_id.get(lib_id)
    }

    /// Lookup by lib_id, falling back to the name without the `Lib:` prefix.
    pub fn get_by_name(&self, name: &str) -> Option<&SymbolGeometry> {
        self.by_id
            .get(name)
            .or_else(|| self.by_name.get(short_lib_name(name)))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn resistor() -> LibSymbol {
        LibSymbol {
            lib_id: "Device:R".to_string(),
            primitives: vec![Primitive::Rect {
                start: (-1.016, -2.54),
                end: (1.016, 2.54),
            }],
            pins: vec![
                LibPin {
                    number: "1".to_string(),
                    name: "~".to_string(),
                    position: (0.0, 3.81),
                    angle: 270.0,
                    length: 1.27,
                },
                LibPin {
                    number: "2".to_string(),
                    name: "~".to_string(),
                    position: (0.0, -3.81),
                    angle: 90.0,
                    length: 1.27,
                },
            ],
        }
    }

    #[test]
    fn test_full_and_body_bbox() {
        let geometry = SymbolGeometry::from_lib_symbol(&resistor());
        let body = geometry.body_bbox.unwrap();
        assert_eq!(body, BBox::new(-1.016, -2.54, 1.016, 2.54));
        let full = geometry.full_bbox.unwrap();
        assert!((full.min_y + 3.81).abs() < 1e-9);
        assert!((full.max_y - 3.81).abs() < 1e-9);
        assert!((full.min_x + 1.016).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric_bbox_matches_under_half_turn() {
        let geometry = SymbolGeometry::from_lib_symbol(&resistor());
        let full = geometry.full_bbox.unwrap();
        let a = full.to_schematic(Point::new(100.0, 50.0), 0.0);
        let b = full.to_schematic(Point::new(100.0, 50.0), 180.0);
        assert!((a.min_x - b.min_x).abs() < 1e-6);
        assert!((a.max_y - b.max_y).abs() < 1e-6);
    }

    #[test]
    fn test_lookup_by_short_name() {
        let library = SymbolLibrary::new(&[resistor()]);
        assert_eq!(library.len(), 1);
        assert!(library.get("Device:R").is_some());
        assert!(library.get("R").is_none());
        assert!(library.get_by_name("R").is_some());
        assert!(library.get_by_name("Other:R").is_some());
    }

    #[test]
    fn test_empty_symbol_has_no_bbox() {
        let geometry = SymbolGeometry::from_lib_symbol(&LibSymbol {
            lib_id: "power:PWR_FLAG".to_string(),
            primitives: vec![],
            pins: vec![],
        });
        assert!(geometry.full_bbox.is_none());
        assert!(geometry.body_bbox.is_none());
    }
}
