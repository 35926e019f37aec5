//! schemverify - geometry and netlist verification for KiCad designs
//!
//! Generated schematics go wrong in ways ERC does not catch: wires that run
//! over pins, collinear wires that silently merge nets, symbols stacked on
//! each other. This library rebuilds the drawn geometry of a `.kicad_sch`
//! file, runs a battery of geometric checks over it, reconstructs the
//! netlist from raw coordinates, and drives `kicad-cli` for ERC, DRC and
//! SVG export.
//!
//! # Quick Start
//!
//! ```no_run
//! use schemverify::Verifier;
//! use std::path::Path;
//!
//! let report = Verifier::new()
//!     .verify_schematic(Path::new("design.kicad_sch"))
//!     .unwrap();
//!
//! for result in &report.results {
//!     println!("[{}] {}: {}", result.severity, result.category, result.issues.len());
//! }
//! ```
//!
//! # Features
//!
//! - **Schematic checks**: wire overlaps, dangling ends, wires through pins
//!   and bodies, overlapping components, page bounds, power symbol rotation
//! - **Netlist assertions**: expected, required and isolated connections
//! - **PCB structure**: stackup, outline, placement, power planes
//! - **kicad-cli**: ERC/DRC with artifact filtering, SVG export

pub mod analyzer;
pub mod board;
pub mod config;
pub mod core;
pub mod geometry;
pub mod kicad_cli;
pub mod netlist;
pub mod parser;
pub mod report;

// Re-export main types
pub use analyzer::{Check, CheckEngine, CheckResult, SchematicData, Severity};
pub use config::{BoardConfig, ConfigError};
pub use self::core::{
    discover_schematics, BoardReport, FailOn, FileReport, PcbReport, Verifier, VerifyError,
    VerifyOptions,
};
pub use kicad_cli::{KicadCli, ToolError, ToolReport};
pub use netlist::{ConnectionTable, NetBuilder, Netlist};
pub use parser::kicad::KicadParser;
pub use parser::pcb::PcbParser;
pub use parser::pcb_schema::PcbDesign;
pub use parser::schema::Schematic;

/// Parse a schematic file (convenience wrapper).
pub fn parse_schematic(path: &std::path::Path) -> Result<Schematic, VerifyError> {
    Ok(KicadParser::parse_schematic(path)?)
}

/// Parse a PCB file (convenience wrapper).
pub fn parse_pcb(path: &std::path::Path) -> Result<PcbDesign, VerifyError> {
    Ok(PcbParser::parse_pcb(path)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BoardConfig, BoardReport, CheckEngine, CheckResult, FailOn, FileReport, PcbReport,
        Severity, Verifier, VerifyError, VerifyOptions,
    };
}
