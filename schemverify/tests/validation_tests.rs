//! Check battery against schematic fixtures

use schemverify::analyzer::{Check, CheckEngine, SchematicData, Severity};
use schemverify::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn issues_for<'a>(report: &'a FileReport, check_id: &str) -> &'a [String] {
    report
        .results
        .iter()
        .find(|r| r.check_id == check_id)
        .map(|r| r.issues.as_slice())
        .unwrap_or(&[])
}

#[test]
fn test_clean_schematic_passes() {
    let report = Verifier::new()
        .verify_schematic(&fixture_path("clean.kicad_sch"))
        .expect("Should verify");

    assert!(
        report.results.is_empty(),
        "Clean schematic should have no findings: {:?}",
        report.results
    );
    assert_eq!(report.components, 3);
    assert!(report.passed(FailOn::Warning));
}

#[test]
fn test_broken_schematic_trips_every_check() {
    let report = Verifier::new()
        .verify_schematic(&fixture_path("broken.kicad_sch"))
        .expect("Should verify");

    let ids: Vec<_> = report.results.iter().map(|r| r.check_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "diagonal_wires",
            "wire_overlaps",
            "dangling_endpoints",
            "wire_through_pin",
            "wire_through_body",
            "tjunction_without_dot",
            "wire_overlaps_pin_stub",
            "component_overlap",
            "content_on_sheet_block",
            "page_boundary",
            "power_orientation",
        ]
    );
    assert_eq!(report.warnings(), 2);
    assert!(!report.passed(FailOn::Error));
}

#[test]
fn test_broken_schematic_messages() {
    let report = Verifier::new()
        .verify_schematic(&fixture_path("broken.kicad_sch"))
        .expect("Should verify");

    assert_eq!(
        issues_for(&report, "diagonal_wires"),
        ["Wire #0: (200, 150) -> (210, 160) is diagonal"]
    );
    assert_eq!(
        issues_for(&report, "wire_overlaps"),
        ["H overlap Y=60: wire#1 X=[40,50] & wire#2 X=[45,55] share [45,50]"]
    );
    assert_eq!(issues_for(&report, "dangling_endpoints"), ["Dangling at (80, 100)"]);
    assert_eq!(
        issues_for(&report, "wire_through_pin"),
        ["Wire #4 H(90,96.19)->(110,96.19) passes through R1 pin 1 at (100,96.19)"]
    );
    assert_eq!(
        issues_for(&report, "wire_overlaps_pin_stub"),
        ["Wire #6 overlaps stub of R3 pin 1 at (200,96.19)"]
    );
    assert_eq!(
        issues_for(&report, "power_orientation"),
        ["#PWR01 (GND) at (30,150) has angle=90 -- should be 0 (pointing down)"]
    );

    let body = issues_for(&report, "wire_through_body");
    assert_eq!(body.len(), 1);
    assert!(body[0].contains("passes through body of R2 (R)"));

    let overlap = issues_for(&report, "component_overlap");
    assert_eq!(overlap.len(), 1);
    assert!(overlap[0].starts_with("R4 (R) bbox"));
    assert!(overlap[0].contains("overlaps R5 (R)"));

    let block = issues_for(&report, "content_on_sheet_block");
    assert_eq!(block.len(), 1);
    assert!(block[0].contains("R7 (R)"));
    assert!(block[0].contains("\"Sub\" [220,140 30x30]"));

    let page = issues_for(&report, "page_boundary");
    assert_eq!(page.len(), 1);
    assert!(page[0].contains("R6 (R) bbox [3.98,176.19]-[6.02,183.81]"));
    assert!(page[0].ends_with("outside page border [12,12]-[285,198]"));
}

#[test]
fn test_tjunction_findings_are_warnings() {
    let report = Verifier::new()
        .verify_schematic(&fixture_path("broken.kicad_sch"))
        .expect("Should verify");

    let tjunctions = report
        .results
        .iter()
        .find(|r| r.check_id == "tjunction_without_dot")
        .expect("T-junctions reported");
    assert_eq!(tjunctions.severity, Severity::Warning);
    assert_eq!(tjunctions.issues.len(), 2);
    assert!(tjunctions
        .issues
        .iter()
        .any(|i| i.starts_with("T-junction at (45, 60) on H wire")));
}

struct NoResistors;

impl Check for NoResistors {
    fn id(&self) -> &str {
        "no_resistors"
    }

    fn category(&self) -> &str {
        "Resistors Present"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &str {
        "Flags every resistor"
    }

    fn run(&self, data: &SchematicData) -> Vec<String> {
        data.components
            .iter()
            .filter(|c| c.lib_name == "R")
            .map(|c| c.reference.clone())
            .collect()
    }
}

#[test]
fn test_custom_check_runs_after_defaults() {
    let mut engine = CheckEngine::with_default_checks();
    engine.add_check(Arc::new(NoResistors));
    let verifier = Verifier::with_engine(engine);

    let report = verifier
        .verify_schematic(&fixture_path("clean.kicad_sch"))
        .expect("Should verify");
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].check_id, "no_resistors");
    assert_eq!(report.results[0].issues, vec!["R1", "R2"]);
    assert!(report.passed(FailOn::Error));
    assert!(!report.passed(FailOn::Warning));
}
