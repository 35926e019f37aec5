//! Tests for KiCad file parsing

use schemverify::analyzer::SchematicData;
use schemverify::geometry::Point;
use schemverify::{parse_pcb, parse_schematic};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_parse_clean_schematic() {
    let schematic = parse_schematic(&fixture_path("clean.kicad_sch")).expect("Should parse");

    assert_eq!(schematic.filename, "clean.kicad_sch");
    assert_eq!(schematic.lib_symbols.len(), 2);
    assert_eq!(schematic.symbols.len(), 3);
    assert_eq!(schematic.wires.len(), 4);
    assert_eq!(schematic.labels.len(), 3);
}

#[test]
fn test_parse_invalid_file() {
    let result = parse_schematic(&PathBuf::from("not_a_real_file.kicad_sch"));
    assert!(result.is_err(), "Should fail on nonexistent file");
}

#[test]
fn test_rotated_pins_land_on_wires() {
    let schematic = parse_schematic(&fixture_path("clean.kicad_sch")).expect("Should parse");
    let data = SchematicData::from_schematic(&schematic);

    let pin = |reference: &str, number: &str| {
        data.pins
            .iter()
            .find(|p| p.reference == reference && p.number == number)
            .map(|p| p.position)
    };
    // R1 upright: pin 1 above the center
    assert_eq!(pin("R1", "1"), Some(Point::new(100.0, 96.19)));
    assert_eq!(pin("R1", "2"), Some(Point::new(100.0, 103.81)));
    // R2 at 90 degrees: pin 1 to the left
    assert_eq!(pin("R2", "1"), Some(Point::new(146.19, 100.0)));
    assert_eq!(pin("R2", "2"), Some(Point::new(153.81, 100.0)));

    let r2 = data
        .components
        .iter()
        .find(|c| c.reference == "R2")
        .expect("R2 placed");
    let body = r2.body_bbox.expect("R2 has a body");
    assert_eq!((body.min_x, body.max_x), (147.46, 152.54));
    assert_eq!((body.min_y, body.max_y), (98.98, 101.02));
}

#[test]
fn test_parse_hierarchical_sheets() {
    let schematic = parse_schematic(&fixture_path("board/root.kicad_sch")).expect("Should parse");

    let names: Vec<_> = schematic.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Producer", "Consumer"]);
    assert_eq!(schematic.sheets[0].file.as_deref(), Some("producer.kicad_sch"));
    assert_eq!(schematic.sheets[1].pins.len(), 3);
}

#[test]
fn test_parse_pcb() {
    let pcb = parse_pcb(&fixture_path("board/demo.kicad_pcb")).expect("Should parse");

    assert_eq!(pcb.layers.len(), 7);
    assert_eq!(pcb.footprints.len(), 3);
    assert_eq!(pcb.footprints[2].reference, "D1");
    assert_eq!(pcb.edge_cuts().count(), 4);
    assert_eq!(pcb.zones.len(), 2);
    assert_eq!(pcb.zones[1].net_name, "VCC");
}

#[test]
fn test_schematic_is_not_a_board() {
    assert!(parse_pcb(&fixture_path("clean.kicad_sch")).is_err());
}
