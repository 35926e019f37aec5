//! Wire topology checks: diagonals, same-axis overlaps, dangling ends and
//! T-junctions without a dot.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::analyzer::data::SchematicData;
use crate::geometry::{snap, Axis, Point, TOLERANCE};

pub fn check_diagonal_wires(data: &SchematicData) -> Vec<String> {
    data.wires
        .iter()
        .enumerate()
        .filter(|(_, w)| w.axis() == Axis::Diagonal)
        .map(|(i, w)| format!("Wire #{}: {} -> {} is diagonal", i, w.start, w.end))
        .collect()
}

/// Same-direction wires sharing a stretch of copper merge their nets
/// silently, so every overlapping pair is reported once.
pub fn check_wire_overlaps(data: &SchematicData) -> Vec<String> {
    // snapped cross-axis coordinate (hundredths) -> (min, max, wire index)
    let mut horizontal: BTreeMap<i64, Vec<(f64, f64, usize)>> = BTreeMap::new();
    let mut vertical: BTreeMap<i64, Vec<(f64, f64, usize)>> = BTreeMap::new();

    for (idx, wire) in data.wires.iter().enumerate() {
        let (lo, hi) = wire.range();
        match wire.axis() {
            Axis::Horizontal => horizontal
                .entry(grid_key(wire.start.y))
                .or_default()
                .push((lo, hi, idx)),
            Axis::Vertical => vertical
                .entry(grid_key(wire.start.x))
                .or_default()
                .push((lo, hi, idx)),
            Axis::Diagonal => {}
        }
    }

    let mut issues = Vec::new();
    collect_overlaps(&horizontal, "H", "Y", "X", &mut issues);
    collect_overlaps(&vertical, "V", "X", "Y", &mut issues);
    issues
}

fn grid_key(v: f64) -> i64 {
    (snap(v) * 100.0).round() as i64
}

fn collect_overlaps(
    groups: &BTreeMap<i64, Vec<(f64, f64, usize)>>,
    dir: &str,
    fixed: &str,
    running: &str,
    issues: &mut Vec<String>,
) {
    for (key, segs) in groups {
        let coord = *key as f64 / 100.0;
        let mut segs = segs.clone();
        segs.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        for (i, &(a_min, a_max, a_idx)) in segs.iter().enumerate() {
            for &(b_min, b_max, b_idx) in &segs[i + 1..] {
                let start = a_min.max(b_min);
                let end = a_max.min(b_max);
                if end - start > TOLERANCE {
                    issues.push(format!(
                        "{} overlap {}={}: wire#{} {}=[{},{}] & wire#{} {}=[{},{}] share [{},{}]",
                        dir, fixed, coord, a_idx, running, a_min, a_max, b_idx, running, b_min,
                        b_max, start, end
                    ));
                }
            }
        }
    }
}

/// An endpoint is connected when it lands on a pin, junction, label,
/// no-connect, sheet pin, another wire's endpoint, or another wire's span.
pub fn check_dangling_endpoints(data: &SchematicData) -> Vec<String> {
    let mut connected: HashSet<Point> = data.pin_positions();
    connected.extend(data.junctions.iter().copied());
    connected.extend(data.label_positions());
    connected.extend(data.no_connects.iter().copied());
    connected.extend(data.sheet_pin_positions());

    let mut counts: HashMap<Point, usize> = HashMap::new();
    for p in data.wire_endpoints() {
        *counts.entry(p).or_default() += 1;
    }
    connected.extend(counts.iter().filter(|(_, n)| **n >= 2).map(|(p, _)| *p));

    let mut dangling = BTreeSet::new();
    for (idx, wire) in data.wires.iter().enumerate() {
        for p in wire.endpoints() {
            if connected.contains(&p) {
                continue;
            }
            let on_other_wire = data
                .wires
                .iter()
                .enumerate()
                .any(|(j, other)| j != idx && other.touches(&p));
            if !on_other_wire {
                dangling.insert(p);
            }
        }
    }

    dangling
        .into_iter()
        .map(|p| format!("Dangling at {}", p))
        .collect()
}

/// Endpoint landing strictly inside another wire with no junction dot.
/// Connectivity is still made, so this is a warning.
pub fn check_tjunctions_without_dots(data: &SchematicData) -> Vec<String> {
    let endpoints: BTreeSet<Point> = data.wire_endpoints().collect();
    let mut seen = HashSet::new();
    let mut issues = Vec::new();

    for p in endpoints {
        if data.junctions.contains(&p) {
            continue;
        }
        for wire in &data.wires {
            if !wire.interior_contains(&p) {
                continue;
            }
            let (lo, hi) = wire.range();
            let axis = if wire.axis() == Axis::Horizontal { "H" } else { "V" };
            if seen.insert((p, axis, grid_key(lo), grid_key(hi))) {
                issues.push(format!(
                    "T-junction at {} on {} wire {} -- no junction dot",
                    p, axis, wire
                ));
            }
        }
    }

    issues
}
