//! Placement checks driven by component bounding boxes.

use std::collections::{HashMap, HashSet};

use crate::analyzer::data::{Component, SchematicData};
use crate::geometry::{bboxes_overlap, BBox, Point, TOLERANCE};

/// Centers closer than this are overlapping when no bbox is known.
const MIN_CENTER_DISTANCE: f64 = 1.5;
/// Distance of the KiCad drawing border from the paper edge.
const PAGE_MARGIN: f64 = 12.5;
const BORDER_TOLERANCE: f64 = 0.5;

pub fn check_wire_through_body(data: &SchematicData) -> Vec<String> {
    let mut ref_pins: HashMap<&str, HashSet<Point>> = HashMap::new();
    for pin in &data.pins {
        ref_pins
            .entry(pin.reference.as_str())
            .or_default()
            .insert(pin.position);
    }

    let mut issues = Vec::new();
    for (idx, wire) in data.wires.iter().enumerate() {
        for comp in &data.components {
            if comp.is_power() {
                continue;
            }
            let Some(bbox) = comp.body_bbox else { continue };
            if !wire.crosses_bbox(&bbox) {
                continue;
            }
            let connects = ref_pins
                .get(comp.reference.as_str())
                .is_some_and(|pins| wire.endpoints().iter().any(|p| pins.contains(p)));
            if connects {
                continue;
            }
            issues.push(format!(
                "Wire #{} {} passes through body of {} ({}) bbox {}",
                idx, wire, comp.reference, comp.lib_name, bbox
            ));
        }
    }
    issues
}

pub fn check_component_overlap(data: &SchematicData) -> Vec<String> {
    let comps: Vec<&Component> = data
        .components
        .iter()
        .filter(|c| !c.is_power() && !c.is_connector())
        .collect();

    let mut issues = Vec::new();
    for (i, a) in comps.iter().enumerate() {
        for b in &comps[i + 1..] {
            match (a.full_bbox, b.full_bbox) {
                (Some(bbox_a), Some(bbox_b)) => {
                    if bboxes_overlap(&bbox_a, &bbox_b) {
                        issues.push(format!(
                            "{} ({}) bbox {} overlaps {} ({}) bbox {}",
                            a.reference, a.lib_name, bbox_a, b.reference, b.lib_name, bbox_b
                        ));
                    }
                }
                _ => {
                    let dist = a.center.distance(&b.center);
                    if dist < MIN_CENTER_DISTANCE {
                        issues.push(format!(
                            "{} ({}) and {} ({}) overlap: centers ({},{}) and ({},{}) dist={:.2}mm",
                            a.reference,
                            a.lib_name,
                            b.reference,
                            b.lib_name,
                            a.center.x,
                            a.center.y,
                            b.center.x,
                            b.center.y,
                            dist
                        ));
                    }
                }
            }
        }
    }
    issues
}

pub fn check_content_on_sheet_blocks(data: &SchematicData) -> Vec<String> {
    let mut issues = Vec::new();
    if data.sheet_blocks.is_empty() {
        return issues;
    }

    for comp in data.components.iter().filter(|c| !c.is_power()) {
        for block in &data.sheet_blocks {
            match comp.full_bbox {
                Some(bbox) if bboxes_overlap(&bbox, &block.bbox) => issues.push(format!(
                    "{} ({}) bbox {} intrudes into sheet block {}",
                    comp.reference,
                    comp.lib_name,
                    bbox,
                    block.describe()
                )),
                None if block.bbox.contains_strict(&comp.center) => issues.push(format!(
                    "{} ({}) at ({},{}) inside sheet block {}",
                    comp.reference,
                    comp.lib_name,
                    comp.center.x,
                    comp.center.y,
                    block.describe()
                )),
                _ => {}
            }
        }
    }

    for (idx, wire) in data.wires.iter().enumerate() {
        for block in &data.sheet_blocks {
            if wire.endpoints().iter().any(|p| block.bbox.contains_strict(p)) {
                issues.push(format!(
                    "Wire #{} {} enters sheet block {}",
                    idx,
                    wire,
                    block.describe()
                ));
            }
        }
    }
    issues
}

/// Drawable area of the page: paper inset by the border margin, with a
/// little slack for items drawn on the border line.
pub fn drawable_area(data: &SchematicData) -> BBox {
    BBox::new(
        PAGE_MARGIN - BORDER_TOLERANCE,
        PAGE_MARGIN - BORDER_TOLERANCE,
        data.page.width - PAGE_MARGIN + BORDER_TOLERANCE,
        data.page.height - PAGE_MARGIN + BORDER_TOLERANCE,
    )
}

pub fn check_page_boundary(data: &SchematicData) -> Vec<String> {
    let area = drawable_area(data);
    let border = format!("[{},{}]-[{},{}]", area.min_x, area.min_y, area.max_x, area.max_y);
    let mut issues = Vec::new();

    for (idx, wire) in data.wires.iter().enumerate() {
        if wire.endpoints().iter().any(|p| !area.contains(p)) {
            issues.push(format!(
                "Wire #{} {} outside page border {}",
                idx, wire, border
            ));
        }
    }

    for comp in data.components.iter().filter(|c| !c.is_power()) {
        match comp.full_bbox {
            Some(bbox) => {
                if bbox.min_x < area.min_x
                    || bbox.max_x > area.max_x
                    || bbox.min_y < area.min_y
                    || bbox.max_y > area.max_y
                {
                    issues.push(format!(
                        "{} ({}) bbox {} extends outside page border {}",
                        comp.reference, comp.lib_name, bbox, border
                    ));
                }
            }
            None => {
                if !area.contains(&comp.center) {
                    issues.push(format!(
                        "{} ({}) at ({},{}) outside page border {}",
                        comp.reference, comp.lib_name, comp.center.x, comp.center.y, border
                    ));
                }
            }
        }
    }
    issues
}

/// VCC symbols must point up and GND symbols down, both at angle 0.
pub fn check_power_orientation(data: &SchematicData) -> Vec<String> {
    data.components
        .iter()
        .filter(|c| c.rotation.abs() > TOLERANCE)
        .filter_map(|c| {
            let expected = match c.lib_name.as_str() {
                "VCC" => "pointing up",
                "GND" => "pointing down",
                _ => return None,
            };
            Some(format!(
                "{} ({}) at ({},{}) has angle={} -- should be 0 ({})",
                c.reference, c.lib_name, c.center.x, c.center.y, c.rotation, expected
            ))
        })
        .collect()
}
