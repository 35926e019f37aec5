pub mod checks;
pub mod components;
pub mod data;
pub mod pins;
pub mod symbols;
pub mod wires;

pub use checks::{Check, CheckEngine, CheckResult, Severity};
pub use data::{Component, PlacedPin, PlacedSheetPin, SchematicData, SheetBlock};
pub use symbols::{SymbolGeometry, SymbolLibrary};
