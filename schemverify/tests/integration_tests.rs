//! Integration tests for board and PCB verification sessions

use schemverify::analyzer::SchematicData;
use schemverify::board::run_board_checks;
use schemverify::config::PcbConfig;
use schemverify::netlist::check_netlist;
use schemverify::prelude::*;
use schemverify::{parse_pcb, parse_schematic, ConnectionTable, NetBuilder};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn demo_config() -> BoardConfig {
    BoardConfig::load(fixture_path("board/schemverify.yaml")).expect("Should load config")
}

#[test]
fn test_root_netlist() {
    let schematic = parse_schematic(&fixture_path("board/root.kicad_sch")).expect("Should parse");
    let netlist = NetBuilder::build(&SchematicData::from_schematic(&schematic));

    assert_eq!(netlist.len(), 4);
    assert!(netlist.on_same_net("Producer:OUT", "Consumer:IN"));
    assert!(netlist.on_same_net("Producer:D0", "Consumer:D0"));
    assert!(netlist.on_same_net("label:D0", "Consumer:D0"));
    assert!(!netlist.on_same_net("Producer:EN", "Consumer:EN"));
    assert!(netlist.id_exists("Consumer:EN"));
}

#[test]
fn test_netlist_assertions_report_each_kind() {
    let schematic = parse_schematic(&fixture_path("board/root.kicad_sch")).expect("Should parse");
    let netlist = NetBuilder::build(&SchematicData::from_schematic(&schematic));

    let table = ConnectionTable {
        expected: vec![("Producer:EN".to_string(), "Consumer:EN".to_string())],
        required: vec!["Producer:CLK".to_string()],
        isolated: vec![("Producer:D0".to_string(), "Consumer:D0".to_string())],
    };
    assert_eq!(
        check_netlist(&netlist, &table),
        vec![
            "Producer:EN not connected to Consumer:EN",
            "Producer:CLK not found in any net",
            "NET MERGE: Producer:D0 and Consumer:D0 on same net!",
        ]
    );
}

#[test]
fn test_verify_board_offline() {
    let config = demo_config();
    let report = Verifier::new()
        .verify_board(&config, &VerifyOptions::offline())
        .expect("Should verify board");

    assert_eq!(report.name, "Demo Board");
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.skipped, vec!["consumer.kicad_sch"]);
    assert_eq!(report.nets, 4);
    assert!(report.netlist_issues.is_empty(), "{:?}", report.netlist_issues);
    assert!(report.erc.is_empty());
    assert!(report.report_path.is_none());
    assert!(report.passed(FailOn::Warning));
}

#[test]
fn test_verify_board_writes_report_without_kicad_cli() {
    let out = tempfile::tempdir().unwrap();
    let mut config = demo_config();
    config.output_dir = out.path().to_path_buf();

    let options = VerifyOptions {
        run_drc: false,
        ..Default::default()
    };
    let report = Verifier::new()
        .verify_board(&config, &options)
        .expect("Should verify board");

    // the configured kicad-cli does not exist
    assert!(report.erc.is_empty());
    assert!(report.svg_count.is_none());
    assert_eq!(report.notes.len(), 1);
    assert!(report.notes[0].starts_with("ERC and SVG export skipped (kicad-cli not found"));

    let path = report.report_path.clone().expect("report written");
    assert_eq!(path, out.path().join("verify_report.txt"));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("root.kicad_sch:\n  All checks passed"));
    assert!(text.contains("Netlist (root.kicad_sch):\n  All expected connections verified"));
}

#[test]
fn test_verify_pcb_structure() {
    let config = demo_config();
    let report = Verifier::new()
        .verify_pcb(&config, &VerifyOptions::offline())
        .expect("Should verify PCB");

    assert_eq!(report.footprints, 3);
    assert!(report.results.is_empty(), "{:?}", report.results);
    assert!(report.passed(FailOn::Error));
}

#[test]
fn test_verify_pcb_without_kicad_cli_notes_skip() {
    let report = Verifier::new()
        .verify_pcb(&demo_config(), &VerifyOptions::default())
        .expect("Should verify PCB");

    assert!(report.drc.is_empty());
    assert_eq!(report.notes.len(), 1);
    assert!(report.notes[0].starts_with("DRC skipped"));
}

#[test]
fn test_unplaced_board_findings() {
    let pcb = parse_pcb(&fixture_path("unplaced.kicad_pcb")).expect("Should parse");
    let config = PcbConfig {
        expected_components: Some(5),
        ..Default::default()
    };

    let results = run_board_checks(&pcb, &config);
    let by_id = |id: &str| {
        results
            .iter()
            .find(|r| r.check_id == id)
            .map(|r| r.issues.clone())
            .unwrap_or_default()
    };

    assert_eq!(by_id("stackup"), vec!["Missing copper layers: In1.Cu, In2.Cu"]);
    assert_eq!(by_id("board_outline"), vec!["No Edge.Cuts outline found"]);
    assert_eq!(
        by_id("components_placed"),
        vec![
            "Only 3/5 components placed",
            "2 components at origin (likely unplaced)",
        ]
    );
    assert!(by_id("components_inside_outline").is_empty());
    assert_eq!(
        by_id("power_planes"),
        vec!["No GND zone found on In1.Cu", "No VCC zone found on In2.Cu"]
    );
    assert!(results.iter().all(|r| r.is_error()));
}

#[test]
fn test_config_round_trip_keeps_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.yaml");
    let config = demo_config();
    config.save(&path).expect("Should save");

    let reloaded = BoardConfig::load(&path).expect("Should reload");
    assert_eq!(reloaded.connections, config.connections);
    assert_eq!(reloaded.pcb.expected_components, Some(3));
    assert!(reloaded.pcb.rule_sets.is_empty());
}
