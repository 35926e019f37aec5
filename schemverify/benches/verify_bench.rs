use criterion::{black_box, criterion_group, criterion_main, Criterion};
use schemverify::analyzer::SchematicData;
use schemverify::prelude::*;
use schemverify::NetBuilder;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_verify_schematic(c: &mut Criterion) {
    let verifier = Verifier::new();
    let path = fixture_path("broken.kicad_sch");

    c.bench_function("verify_schematic", |b| {
        b.iter(|| verifier.verify_schematic(black_box(&path)));
    });
}

fn bench_parse_schematic(c: &mut Criterion) {
    let path = fixture_path("broken.kicad_sch");

    c.bench_function("parse_schematic", |b| {
        b.iter(|| schemverify::parse_schematic(black_box(&path)));
    });
}

fn bench_check_battery(c: &mut Criterion) {
    let schematic =
        schemverify::parse_schematic(&fixture_path("broken.kicad_sch")).expect("fixture parses");
    let data = SchematicData::from_schematic(&schematic);
    let engine = CheckEngine::with_default_checks();

    c.bench_function("check_battery", |b| {
        b.iter(|| engine.run(black_box(&data)));
    });
}

fn bench_build_netlist(c: &mut Criterion) {
    let schematic = schemverify::parse_schematic(&fixture_path("board/root.kicad_sch"))
        .expect("fixture parses");
    let data = SchematicData::from_schematic(&schematic);

    c.bench_function("build_netlist", |b| {
        b.iter(|| NetBuilder::build(black_box(&data)));
    });
}

criterion_group!(
    benches,
    bench_verify_schematic,
    bench_parse_schematic,
    bench_check_battery,
    bench_build_netlist
);
criterion_main!(benches);
