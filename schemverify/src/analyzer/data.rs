//! Flattened, schematic-space view of one sheet.
//!
//! All checks and the net builder read from [`SchematicData`]; nothing
//! downstream touches library coordinates again.

use std::collections::HashSet;

use crate::analyzer::symbols::SymbolLibrary;
use crate::geometry::{rotate_direction, rotate_offset, BBox, Point, Segment};
use crate::parser::schema::{short_lib_name, Label, Paper, Schematic};

/// Pin of a placed symbol, in schematic space.
#[derive(Debug, Clone)]
pub struct PlacedPin {
    pub position: Point,
    pub reference: String,
    pub number: String,
    pub lib_name: String,
    /// Unit direction of the pin line in schematic space.
    pub stub: (f64, f64),
    pub stub_length: f64,
}

impl PlacedPin {
    pub fn id(&self) -> String {
        format!("{}:{}", self.reference, self.number)
    }
}

/// Placed symbol with its schematic-space bounding boxes.
#[derive(Debug, Clone)]
pub struct Component {
    pub reference: String,
    pub lib_name: String,
    pub center: Point,
    pub rotation: f64,
    pub full_bbox: Option<BBox>,
    pub body_bbox: Option<BBox>,
}

impl Component {
    pub fn is_power(&self) -> bool {
        self.reference.starts_with('#')
    }

    pub fn is_connector(&self) -> bool {
        self.lib_name.starts_with("Conn")
    }
}

/// Sheet pin with its `"<Sheet>:<Pin>"` identifier.
#[derive(Debug, Clone)]
pub struct PlacedSheetPin {
    pub id: String,
    pub position: Point,
}

#[derive(Debug, Clone)]
pub struct SheetBlock {
    pub name: String,
    pub bbox: BBox,
}

impl SheetBlock {
    pub fn describe(&self) -> String {
        format!(
            "\"{}\" [{},{} {}x{}]",
            self.name,
            self.bbox.min_x,
            self.bbox.min_y,
            self.bbox.width(),
            self.bbox.height()
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchematicData {
    pub filename: String,
    pub wires: Vec<Segment>,
    pub pins: Vec<PlacedPin>,
    pub junctions: HashSet<Point>,
    pub labels: Vec<Label>,
    pub no_connects: HashSet<Point>,
    pub sheet_pins: Vec<PlacedSheetPin>,
    pub sheet_blocks: Vec<SheetBlock>,
    pub page: Paper,
    pub components: Vec<Component>,
}

impl SchematicData {
    pub fn new(schematic: &Schematic, library: &SymbolLibrary) -> Self {
        let mut data = SchematicData {
            filename: schematic.filename.clone(),
            wires: schematic.wires.clone(),
            junctions: schematic.junctions.iter().copied().collect(),
            labels: schematic.labels.clone(),
            no_connects: schematic.no_connects.iter().copied().collect(),
            page: schematic.paper,
            ..Default::default()
        };

        for symbol in &schematic.symbols {
            let lib_name = short_lib_name(&symbol.lib_id).to_string();
            let center = symbol.position;

            if let Some(geometry) = library.get(&symbol.lib_id) {
                for pin in &geometry.pins {
                    let (dx, dy) = rotate_offset(pin.position.0, pin.position.1, symbol.rotation);
                    data.pins.push(PlacedPin {
                        position: Point::new(center.x + dx, center.y + dy),
                        reference: symbol.reference.clone(),
                        number: pin.number.clone(),
                        lib_name: lib_name.clone(),
                        stub: rotate_direction(pin.angle, symbol.rotation),
                        stub_length: pin.length,
                    });
                }
            }

            let geometry = library.get_by_name(&symbol.lib_id);
            data.components.push(Component {
                reference: symbol.reference.clone(),
                lib_name,
                center,
                rotation: symbol.rotation,
                full_bbox: geometry
                    .and_then(|g| g.full_bbox)
                    .map(|b| b.to_schematic(center, symbol.rotation)),
                body_bbox: geometry
                    .and_then(|g| g.body_bbox)
                    .map(|b| b.to_schematic(center, symbol.rotation)),
            });
        }

        for sheet in &schematic.sheets {
            for pin in &sheet.pins {
                data.sheet_pins.push(PlacedSheetPin {
                    id: format!("{}:{}", sheet.name, pin.name),
                    position: pin.position,
                });
            }
            data.sheet_blocks.push(SheetBlock {
                name: sheet.name.clone(),
                bbox: BBox::from_origin_size(sheet.position, sheet.width, sheet.height),
            });
        }

        tracing::debug!(
            "{}: {} placed pins, {} components, {} sheet pins",
            data.filename,
            data.pins.len(),
            data.components.len(),
            data.sheet_pins.len()
        );

        data
    }

    /// Uses a library built from the schematic's own `lib_symbols`.
    pub fn from_schematic(schematic: &Schematic) -> Self {
        Self::new(schematic, &SymbolLibrary::new(&schematic.lib_symbols))
    }

    pub fn pin_positions(&self) -> HashSet<Point> {
        self.pins.iter().map(|p| p.position).collect()
    }

    pub fn label_positions(&self) -> HashSet<Point> {
        self.labels.iter().map(|l| l.position).collect()
    }

    pub fn sheet_pin_positions(&self) -> HashSet<Point> {
        self.sheet_pins.iter().map(|p| p.position).collect()
    }

    /// Every wire endpoint, duplicates included.
    pub fn wire_endpoints(&self) -> impl Iterator<Item = Point> + '_ {
        self.wires.iter().flat_map(|w| w.endpoints())
    }
}
