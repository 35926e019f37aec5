//! Verify one schematic and print the findings.

use schemverify::prelude::*;
use std::path::Path;

fn main() -> Result<(), VerifyError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/broken.kicad_sch".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example verify_file [path/to/file.kicad_sch]");
        std::process::exit(1);
    }

    let report = Verifier::new().verify_schematic(path)?;

    println!(
        "{}: {} components, {} wires",
        report.name(),
        report.components,
        report.wires
    );
    println!();
    for result in &report.results {
        println!("[{}] {} ({})", result.severity, result.category, result.issues.len());
        for issue in &result.issues {
            println!("  - {}", issue);
        }
    }
    println!();
    println!(
        "{} error(s), {} warning(s)",
        report.errors(),
        report.warnings()
    );

    Ok(())
}
