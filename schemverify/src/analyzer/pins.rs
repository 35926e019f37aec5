//! Pin-level checks: wires passing over pins and wires drawn along a pin's
//! own stub line.

use std::collections::HashSet;

use crate::analyzer::data::SchematicData;
use crate::geometry::{Axis, Point, TOLERANCE};

/// Minimum cosine between a wire leaving a pin and the pin's stub
/// direction for the wire to count as lying on the stub (about 16 degrees).
const STUB_COS_THRESHOLD: f64 = 0.96;

/// A pin that is not a wire endpoint but sits in a wire's interior gets
/// connected by KiCad anyway.
pub fn check_wire_through_pins(data: &SchematicData) -> Vec<String> {
    let endpoints: HashSet<Point> = data.wire_endpoints().collect();
    let mut issues = Vec::new();

    for pin in &data.pins {
        if pin.reference.starts_with('#') || endpoints.contains(&pin.position) {
            continue;
        }
        for (idx, wire) in data.wires.iter().enumerate() {
            if !wire.interior_contains(&pin.position) {
                continue;
            }
            let dir = if wire.axis() == Axis::Horizontal { "H" } else { "V" };
            issues.push(format!(
                "Wire #{} {}{} passes through {} pin {} at ({},{})",
                idx, dir, wire, pin.reference, pin.number, pin.position.x, pin.position.y
            ));
        }
    }

    issues
}

pub fn check_wire_overlaps_pin_stub(data: &SchematicData) -> Vec<String> {
    let mut issues = Vec::new();

    for pin in &data.pins {
        if pin.reference.starts_with('#') || pin.lib_name.starts_with("Conn") {
            continue;
        }
        let (sdx, sdy) = pin.stub;
        if sdx.abs() < 0.01 && sdy.abs() < 0.01 {
            continue;
        }

        for (idx, wire) in data.wires.iter().enumerate() {
            let other = if wire.start == pin.position {
                wire.end
            } else if wire.end == pin.position {
                wire.start
            } else {
                continue;
            };

            let (wx, wy) = (other.x - pin.position.x, other.y - pin.position.y);
            let len = (wx * wx + wy * wy).sqrt();
            if len < TOLERANCE {
                continue;
            }
            if (wx * sdx + wy * sdy) / len > STUB_COS_THRESHOLD {
                issues.push(format!(
                    "Wire #{} overlaps stub of {} pin {} at ({},{})",
                    idx, pin.reference, pin.number, pin.position.x, pin.position.y
                ));
                break;
            }
        }
    }

    issues
}
