//! Structure checks on a placed `.kicad_pcb`.
//!
//! These run before routing: they look at the stackup, the Edge.Cuts
//! outline, footprint placement and the power plane zones. DRC proper is
//! left to `kicad-cli`.

use crate::analyzer::{CheckResult, Severity};
use crate::config::PcbConfig;
use crate::geometry::BBox;
use crate::parser::pcb_schema::PcbDesign;

/// Footprints closer than this to (0, 0) on both axes count as unplaced.
const ORIGIN_TOLERANCE: f64 = 0.01;

pub fn check_stackup(pcb: &PcbDesign, config: &PcbConfig) -> Vec<String> {
    let mut missing: Vec<&str> = config
        .required_layers
        .iter()
        .map(String::as_str)
        .filter(|name| !pcb.layer_names().any(|l| l == *name))
        .collect();
    if missing.is_empty() {
        return Vec::new();
    }
    missing.sort_unstable();
    vec![format!("Missing copper layers: {}", missing.join(", "))]
}

/// Extent of every Edge.Cuts item's defining points.
pub fn outline_extent(pcb: &PcbDesign) -> Option<BBox> {
    BBox::from_coords(
        pcb.edge_cuts()
            .flat_map(|g| g.points.iter())
            .map(|p| (p.x, p.y)),
    )
}

pub fn check_board_outline(pcb: &PcbDesign, config: &PcbConfig) -> Vec<String> {
    let Some(outline) = outline_extent(pcb) else {
        return vec!["No Edge.Cuts outline found".to_string()];
    };

    let (w, h) = (outline.width(), outline.height());
    if w < config.outline_min_mm || h < config.outline_min_mm {
        vec![format!("Board outline too small: {:.1} x {:.1} mm", w, h)]
    } else if w > config.outline_max_mm || h > config.outline_max_mm {
        vec![format!("Board outline too large: {:.1} x {:.1} mm", w, h)]
    } else {
        tracing::info!("board size: {:.1} x {:.1} mm", w, h);
        Vec::new()
    }
}

pub fn check_components_placed(pcb: &PcbDesign, config: &PcbConfig) -> Vec<String> {
    let mut issues = Vec::new();
    let placed = pcb.footprints.len();

    if placed == 0 {
        issues.push("No components placed on board".to_string());
    } else if let Some(expected) = config.expected_components {
        if placed < expected {
            issues.push(format!("Only {}/{} components placed", placed, expected));
        }
    }

    let at_origin = pcb
        .footprints
        .iter()
        .filter(|fp| fp.position.x.abs() < ORIGIN_TOLERANCE && fp.position.y.abs() < ORIGIN_TOLERANCE)
        .count();
    if at_origin > 1 {
        issues.push(format!("{} components at origin (likely unplaced)", at_origin));
    }

    issues
}

/// Footprint anchors outside the outline extent. Silent without an outline;
/// [`check_board_outline`] reports that case.
pub fn check_components_inside_outline(pcb: &PcbDesign, _config: &PcbConfig) -> Vec<String> {
    let Some(outline) = outline_extent(pcb) else {
        return Vec::new();
    };

    pcb.footprints
        .iter()
        .filter(|fp| !outline.contains(&fp.position))
        .map(|fp| {
            let reference = if fp.reference.is_empty() { "?" } else { &fp.reference };
            format!(
                "Component outside board outline: {} at ({:.1}, {:.1})",
                reference, fp.position.x, fp.position.y
            )
        })
        .collect()
}

pub fn check_power_planes(pcb: &PcbDesign, config: &PcbConfig) -> Vec<String> {
    config
        .power_planes
        .iter()
        .filter(|plane| {
            !pcb.zones.iter().any(|zone| {
                zone.net_name.contains(&plane.net)
                    && zone.layers.iter().any(|l| l.contains(&plane.layer))
            })
        })
        .map(|plane| format!("No {} zone found on {}", plane.net, plane.layer))
        .collect()
}

type BoardCheckFn = fn(&PcbDesign, &PcbConfig) -> Vec<String>;

/// `(id, category, check)` in reporting order.
pub const BOARD_CHECKS: &[(&str, &str, BoardCheckFn)] = &[
    ("stackup", "Copper Stackup", check_stackup),
    ("board_outline", "Board Outline", check_board_outline),
    ("components_placed", "Component Placement", check_components_placed),
    ("components_inside_outline", "Components Inside Outline", check_components_inside_outline),
    ("power_planes", "Power Planes", check_power_planes),
];

/// Run every structure check. All findings are errors; only non-empty
/// results are returned.
pub fn run_board_checks(pcb: &PcbDesign, config: &PcbConfig) -> Vec<CheckResult> {
    BOARD_CHECKS
        .iter()
        .filter_map(|(id, category, check)| {
            let issues = check(pcb, config);
            if issues.is_empty() {
                return None;
            }
            tracing::debug!("{}: {} issue(s) in {}", pcb.filename, issues.len(), id);
            Some(CheckResult {
                check_id: id.to_string(),
                category: category.to_string(),
                severity: Severity::Error,
                issues,
            })
        })
        .collect()
}
