use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Segment};

/// Everything read from one `.kicad_sch` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schematic {
    pub filename: String,
    pub version: Option<String>,
    pub paper: Paper,
    pub lib_symbols: Vec<LibSymbol>,
    pub symbols: Vec<SymbolInstance>,
    pub wires: Vec<Segment>,
    pub junctions: Vec<Point>,
    pub no_connects: Vec<Point>,
    pub labels: Vec<Label>,
    pub sheets: Vec<Sheet>,
}

/// Library symbol definition embedded in the schematic's `lib_symbols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibSymbol {
    pub lib_id: String,
    /// Drawing primitives of the symbol and all of its unit sub-symbols.
    pub primitives: Vec<Primitive>,
    pub pins: Vec<LibPin>,
}

/// Closed set of graphical items a library symbol can draw, in library
/// (Y-up) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Polyline(Vec<(f64, f64)>),
    Rect { start: (f64, f64), end: (f64, f64) },
    Circle { center: (f64, f64), radius: f64 },
    Arc { start: (f64, f64), mid: (f64, f64), end: (f64, f64) },
}

pub const DEFAULT_PIN_LENGTH: f64 = 2.54;

/// Pin definition in library space. `position` is the connection tip and
/// `angle` points from the tip toward the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibPin {
    pub number: String,
    pub name: String,
    pub position: (f64, f64),
    pub angle: f64,
    pub length: f64,
}

/// Placed symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInstance {
    pub reference: String,
    pub lib_id: String,
    pub position: Point,
    pub rotation: f64,
}

impl SymbolInstance {
    /// Library name without the `Lib:` prefix.
    pub fn lib_name(&self) -> &str {
        short_lib_name(&self.lib_id)
    }

    /// Power flags and power symbols use `#`-prefixed references.
    pub fn is_power(&self) -> bool {
        self.reference.starts_with('#')
    }
}

pub fn short_lib_name(lib_id: &str) -> &str {
    lib_id.rsplit(':').next().unwrap_or(lib_id)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Local,
    Global,
    Hierarchical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub position: Point,
    pub kind: LabelKind,
}

/// Hierarchical sheet block drawn on a parent sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub file: Option<String>,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub pins: Vec<SheetPin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetPin {
    pub name: String,
    pub position: Point,
}

/// Page size in millimetres, landscape unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub width: f64,
    pub height: f64,
}

impl Default for Paper {
    /// A2 landscape, used when a file carries no `paper` entry.
    fn default() -> Self {
        Self {
            width: 594.0,
            height: 420.0,
        }
    }
}

impl Paper {
    /// Landscape dimensions for a named KiCad paper size.
    pub fn from_name(name: &str) -> Option<Self> {
        let (width, height) = match name {
            "A5" => (210.0, 148.0),
            "A4" => (297.0, 210.0),
            "A3" => (420.0, 297.0),
            "A2" => (594.0, 420.0),
            "A1" => (841.0, 594.0),
            "A0" => (1189.0, 841.0),
            "A" | "USLetter" => (279.4, 215.9),
            "B" => (431.8, 279.4),
            "C" => (558.8, 431.8),
            "D" => (863.6, 558.8),
            "E" => (1117.6, 863.6),
            "USLegal" => (355.6, 215.9),
            "USLedger" => (431.8, 279.4),
            _ => return None,
        };
        Some(Self { width, height })
    }

    pub fn portrait(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}
