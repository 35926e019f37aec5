//! KiCad schematic reader (`.kicad_sch`, KiCad 6 and later).
//!
//! Format reference:
//! https://dev-docs.kicad.org/en/file-formats/sexpr-schematic/
//!
//! - All values are in millimetres
//! - Position: (at X Y [ANGLE])
//! - Points: (pts (xy X Y) ...)
//! - Properties: (property "KEY" "VALUE" ...)
//!
//! Only the geometry needed for verification is extracted. Items that fail
//! to parse are skipped with a warning rather than failing the whole file.

use std::path::Path;

use thiserror::Error;

use crate::geometry::{Point, Segment};
use crate::parser::schema::*;
use crate::parser::sexp::{ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum KicadParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid schematic format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub struct KicadParser;

impl KicadParser {
    pub fn parse_schematic(path: &Path) -> Result<Schematic, KicadParseError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::parse_schematic_str(&content, filename)
    }

    pub fn parse_schematic_str(content: &str, filename: &str) -> Result<Schematic, KicadParseError> {
        let root = SExpParser::new(content).parse()?;

        match root.head() {
            Some("kicad_sch") => {}
            Some(other) => {
                return Err(KicadParseError::InvalidFormat(format!(
                    "Expected kicad_sch, found {}",
                    other
                )))
            }
            None => {
                return Err(KicadParseError::InvalidFormat(
                    "Expected kicad_sch root".to_string(),
                ))
            }
        }

        let mut schematic = Schematic {
            filename: filename.to_string(),
            version: root.value("version").map(str::to_string),
            ..Default::default()
        };

        for item in root.args() {
            let Some(tag) = item.head() else { continue };
            let parsed = match tag {
                "paper" => Self::parse_paper(item).map(|p| schematic.paper = p),
                "lib_symbols" => {
                    for def in item.find_all("symbol") {
                        match Self::parse_lib_symbol(def) {
                            Ok(sym) => schematic.lib_symbols.push(sym),
                            Err(e) => tracing::warn!("{}: skipping library symbol: {}", filename, e),
                        }
                    }
                    Ok(())
                }
                "symbol" => Self::parse_symbol(item).map(|s| schematic.symbols.push(s)),
                "wire" => Self::parse_wire(item).map(|w| {
                    if let Some(w) = w {
                        schematic.wires.push(w);
                    }
                }),
                "junction" => Self::parse_at_point(item).map(|p| schematic.junctions.push(p)),
                "no_connect" => Self::parse_at_point(item).map(|p| schematic.no_connects.push(p)),
                "label" => Self::parse_label(item, LabelKind::Local).map(|l| schematic.labels.push(l)),
                "global_label" => {
                    Self::parse_label(item, LabelKind::Global).map(|l| schematic.labels.push(l))
                }
                "hierarchical_label" => Self::parse_label(item, LabelKind::Hierarchical)
                    .map(|l| schematic.labels.push(l)),
                "sheet" => Self::parse_sheet(item).map(|s| schematic.sheets.push(s)),
                _ => Ok(()),
            };
            if let Err(e) = parsed {
                tracing::warn!("{}: skipping {}: {}", filename, tag, e);
            }
        }

        tracing::debug!(
            "{}: {} wires, {} symbols, {} lib symbols, {} labels, {} sheets",
            filename,
            schematic.wires.len(),
            schematic.symbols.len(),
            schematic.lib_symbols.len(),
            schematic.labels.len(),
            schematic.sheets.len()
        );

        Ok(schematic)
    }

    /// `(paper "A3")`, `(paper "A4" portrait)` or `(paper "User" W H)`.
    fn parse_paper(sexp: &SExp) -> Result<Paper, KicadParseError> {
        let name = sexp
            .atom_at(1)
            .ok_or_else(|| KicadParseError::MissingField("paper size".to_string()))?;
        let paper = if name == "User" {
            match (sexp.f64_at(2), sexp.f64_at(3)) {
                (Some(width), Some(height)) => Paper { width, height },
                _ => {
                    return Err(KicadParseError::InvalidFormat(
                        "User paper requires width and height".to_string(),
                    ))
                }
            }
        } else {
            Paper::from_name(name)
                .ok_or_else(|| KicadParseError::InvalidFormat(format!("unknown paper size {}", name)))?
        };
        Ok(if sexp.has_flag("portrait") {
            paper.portrait()
        } else {
            paper
        })
    }

    fn parse_lib_symbol(sexp: &SExp) -> Result<LibSymbol, KicadParseError> {
        let lib_id = sexp
            .atom_at(1)
            .ok_or_else(|| KicadParseError::MissingField("lib symbol name".to_string()))?
            .to_string();

        let mut primitives = Vec::new();
        let mut pins = Vec::new();
        Self::collect_symbol_body(sexp, &mut primitives, &mut pins);
        // unit sub-symbols, e.g. "74LVC1G04_0_1" (body) and "74LVC1G04_1_1" (pins)
        for unit in sexp.find_all("symbol") {
            Self::collect_symbol_body(unit, &mut primitives, &mut pins);
        }

        Ok(LibSymbol {
            lib_id,
            primitives,
            pins,
        })
    }

    fn collect_symbol_body(sexp: &SExp, primitives: &mut Vec<Primitive>, pins: &mut Vec<LibPin>) {
        for item in sexp.args() {
            let primitive = match item.head() {
                Some("polyline") => item
                    .find("pts")
                    .map(|pts| Primitive::Polyline(Self::parse_pts(pts))),
                Some("rectangle") => match (Self::xy(item, "start"), Self::xy(item, "end")) {
                    (Some(start), Some(end)) => Some(Primitive::Rect { start, end }),
                    _ => None,
                },
                Some("circle") => Self::xy(item, "center").map(|center| Primitive::Circle {
                    center,
                    radius: item.f64_value("radius").unwrap_or(0.0),
                }),
                Some("arc") => match (
                    Self::xy(item, "start"),
                    Self::xy(item, "mid"),
                    Self::xy(item, "end"),
                ) {
                    (Some(start), Some(mid), Some(end)) => Some(Primitive::Arc { start, mid, end }),
                    _ => None,
                },
                Some("pin") => {
                    if let Some(pin) = Self::parse_lib_pin(item) {
                        pins.push(pin);
                    }
                    None
                }
                _ => None,
            };
            if let Some(primitive) = primitive {
                primitives.push(primitive);
            }
        }
    }

    /// `(pin TYPE SHAPE (at X Y ANGLE) (length L) (name "N") (number "1"))`
    fn parse_lib_pin(sexp: &SExp) -> Option<LibPin> {
        let at = sexp.find("at")?;
        let length = sexp
            .f64_value("length")
            .filter(|l| *l != 0.0)
            .unwrap_or(DEFAULT_PIN_LENGTH);
        Some(LibPin {
            number: sexp.value("number").unwrap_or_default().to_string(),
            name: sexp.value("name").unwrap_or_default().to_string(),
            position: (at.f64_at(1)?, at.f64_at(2)?),
            angle: at.f64_at(3).unwrap_or(0.0),
            length,
        })
    }

    fn parse_symbol(sexp: &SExp) -> Result<SymbolInstance, KicadParseError> {
        let lib_id = sexp
            .value("lib_id")
            .ok_or_else(|| KicadParseError::MissingField("lib_id".to_string()))?
            .to_string();
        let (position, rotation) = Self::parse_at(sexp)?;
        let reference = Self::property(sexp, "Reference").unwrap_or("?").to_string();

        Ok(SymbolInstance {
            reference,
            lib_id,
            position,
            rotation,
        })
    }

    /// Two-point wires only; extra points are ignored and short lists dropped.
    fn parse_wire(sexp: &SExp) -> Result<Option<Segment>, KicadParseError> {
        let pts = sexp
            .find("pts")
            .ok_or_else(|| KicadParseError::MissingField("wire pts".to_string()))?;
        let points = Self::parse_pts(pts);
        if points.len() < 2 {
            return Ok(None);
        }
        Ok(Some(Segment::new(
            Point::new(points[0].0, points[0].1),
            Point::new(points[1].0, points[1].1),
        )))
    }

    /// Label text is the first argument: (label "TEXT" (at ...) ...)
    fn parse_label(sexp: &SExp, kind: LabelKind) -> Result<Label, KicadParseError> {
        let text = sexp
            .atom_at(1)
            .ok_or_else(|| KicadParseError::MissingField("label text".to_string()))?
            .to_string();
        let (position, _) = Self::parse_at(sexp)?;
        Ok(Label {
            text,
            position,
            kind,
        })
    }

    fn parse_sheet(sexp: &SExp) -> Result<Sheet, KicadParseError> {
        let (position, _) = Self::parse_at(sexp)?;
        let size = sexp
            .find("size")
            .ok_or_else(|| KicadParseError::MissingField("sheet size".to_string()))?;
        let width = size
            .f64_at(1)
            .ok_or_else(|| KicadParseError::InvalidFormat("sheet width".to_string()))?;
        let height = size
            .f64_at(2)
            .ok_or_else(|| KicadParseError::InvalidFormat("sheet height".to_string()))?;

        // KiCad 6 wrote "Sheet name"/"Sheet file", later versions "Sheetname"/"Sheetfile"
        let name = Self::property(sexp, "Sheetname")
            .or_else(|| Self::property(sexp, "Sheet name"))
            .unwrap_or("?")
            .to_string();
        let file = Self::property(sexp, "Sheetfile")
            .or_else(|| Self::property(sexp, "Sheet file"))
            .map(str::to_string);

        let mut pins = Vec::new();
        for pin in sexp.find_all("pin") {
            let Some(pin_name) = pin.atom_at(1) else { continue };
            match Self::parse_at(pin) {
                Ok((pin_pos, _)) => pins.push(SheetPin {
                    name: pin_name.to_string(),
                    position: pin_pos,
                }),
                Err(e) => tracing::warn!("sheet {}: skipping pin {}: {}", name, pin_name, e),
            }
        }

        Ok(Sheet {
            name,
            file,
            position,
            width: crate::geometry::snap(width),
            height: crate::geometry::snap(height),
            pins,
        })
    }

    fn property<'a>(sexp: &'a SExp, key: &str) -> Option<&'a str> {
        sexp.find_all("property")
            .find(|p| p.atom_at(1) == Some(key))
            .and_then(|p| p.atom_at(2))
    }

    fn parse_at_point(sexp: &SExp) -> Result<Point, KicadParseError> {
        Self::parse_at(sexp).map(|(p, _)| p)
    }

    /// (at X Y [ANGLE])
    fn parse_at(sexp: &SExp) -> Result<(Point, f64), KicadParseError> {
        let at = sexp
            .find("at")
            .ok_or_else(|| KicadParseError::MissingField("at".to_string()))?;
        match (at.f64_at(1), at.f64_at(2)) {
            (Some(x), Some(y)) => Ok((Point::new(x, y), at.f64_at(3).unwrap_or(0.0))),
            _ => Err(KicadParseError::InvalidFormat(
                "Invalid 'at' format - requires X and Y".to_string(),
            )),
        }
    }

    fn xy(sexp: &SExp, key: &str) -> Option<(f64, f64)> {
        let node = sexp.find(key)?;
        Some((node.f64_at(1)?, node.f64_at(2)?))
    }

    fn parse_pts(pts: &SExp) -> Vec<(f64, f64)> {
        pts.find_all("xy")
            .filter_map(|xy| Some((xy.f64_at(1)?, xy.f64_at(2)?)))
            .collect()
    }
}
