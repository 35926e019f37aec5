pub mod kicad;
pub mod pcb;
pub mod pcb_schema;
pub mod schema;
pub mod sexp;

// Re-export for convenience
pub use kicad::{KicadParseError, KicadParser};
pub use pcb::{PcbParseError, PcbParser};
pub use pcb_schema::*;
pub use schema::*;
pub use sexp::{ParseError, SExp, SExpParser};
