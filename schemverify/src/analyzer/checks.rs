use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analyzer::components::*;
use crate::analyzer::data::SchematicData;
use crate::analyzer::pins::*;
use crate::analyzer::wires::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Tag used in console and text reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Findings of one check on one sheet. Only non-empty results are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_id: String,
    pub category: String,
    pub severity: Severity,
    pub issues: Vec<String>,
}

impl CheckResult {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

pub trait Check: Send + Sync {
    fn id(&self) -> &str;
    fn category(&self) -> &str;
    fn severity(&self) -> Severity;
    fn description(&self) -> &str;
    fn run(&self, data: &SchematicData) -> Vec<String>;
}

/// A check backed by one of the `check_*` free functions.
#[derive(Clone, Copy)]
struct FnCheck {
    id: &'static str,
    category: &'static str,
    severity: Severity,
    description: &'static str,
    func: fn(&SchematicData) -> Vec<String>,
}

impl Check for FnCheck {
    fn id(&self) -> &str {
        self.id
    }

    fn category(&self) -> &str {
        self.category
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn description(&self) -> &str {
        self.description
    }

    fn run(&self, data: &SchematicData) -> Vec<String> {
        (self.func)(data)
    }
}

const DEFAULT_CHECKS: &[FnCheck] = &[
    FnCheck {
        id: "diagonal_wires",
        category: "Diagonal Wires",
        severity: Severity::Error,
        description: "Wires that are neither horizontal nor vertical",
        func: check_diagonal_wires,
    },
    FnCheck {
        id: "wire_overlaps",
        category: "Wire Overlaps (NET MERGE)",
        severity: Severity::Error,
        description: "Collinear wires sharing a stretch, which silently merges nets",
        func: check_wire_overlaps,
    },
    FnCheck {
        id: "dangling_endpoints",
        category: "Dangling Endpoints",
        severity: Severity::Error,
        description: "Wire ends not landing on a pin, label, junction, sheet pin or wire",
        func: check_dangling_endpoints,
    },
    FnCheck {
        id: "wire_through_pin",
        category: "Wire Through Pin",
        severity: Severity::Error,
        description: "Wires running over a component pin without ending there",
        func: check_wire_through_pins,
    },
    FnCheck {
        id: "wire_through_body",
        category: "Wire Through Body",
        severity: Severity::Error,
        description: "Wires crossing a component's graphical body",
        func: check_wire_through_body,
    },
    FnCheck {
        id: "tjunction_without_dot",
        category: "T-junction (no dot)",
        severity: Severity::Warning,
        description: "Wire ends landing mid-wire without a junction dot",
        func: check_tjunctions_without_dots,
    },
    FnCheck {
        id: "wire_overlaps_pin_stub",
        category: "Wire Overlaps Pin Stub",
        severity: Severity::Error,
        description: "Wires drawn back along a pin's own stub line",
        func: check_wire_overlaps_pin_stub,
    },
    FnCheck {
        id: "component_overlap",
        category: "Component Overlap",
        severity: Severity::Error,
        description: "Components whose bounding boxes overlap",
        func: check_component_overlap,
    },
    FnCheck {
        id: "content_on_sheet_block",
        category: "Content on Sheet Block",
        severity: Severity::Error,
        description: "Components or wires drawn over a hierarchical sheet block",
        func: check_content_on_sheet_blocks,
    },
    FnCheck {
        id: "page_boundary",
        category: "Outside Page Border",
        severity: Severity::Error,
        description: "Wires or components outside the page drawing border",
        func: check_page_boundary,
    },
    FnCheck {
        id: "power_orientation",
        category: "Power Orientation",
        severity: Severity::Error,
        description: "VCC or GND symbols that are rotated",
        func: check_power_orientation,
    },
];

pub struct CheckEngine {
    checks: Vec<Arc<dyn Check>>,
}

impl CheckEngine {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// The eleven geometric checks in their fixed reporting order.
    pub fn with_default_checks() -> Self {
        let mut engine = Self::new();
        for check in DEFAULT_CHECKS {
            engine.add_check(Arc::new(*check));
        }
        engine
    }

    pub fn add_check(&mut self, check: Arc<dyn Check>) {
        self.checks.push(check);
    }

    pub fn checks(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(|c| c.as_ref())
    }

    /// Run every check; one check's findings never stop the others.
    pub fn run(&self, data: &SchematicData) -> Vec<CheckResult> {
        self.checks
            .iter()
            .filter_map(|check| {
                let issues = check.run(data);
                tracing::debug!("{}: {} -> {} issue(s)", data.filename, check.id(), issues.len());
                if issues.is_empty() {
                    return None;
                }
                Some(CheckResult {
                    check_id: check.id().to_string(),
                    category: check.category().to_string(),
                    severity: check.severity(),
                    issues,
                })
            })
            .collect()
    }
}

impl Default for CheckEngine {
    fn default() -> Self {
        Self::with_default_checks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Segment};

    #[test]
    fn test_default_order_and_severities() {
        let engine = CheckEngine::with_default_checks();
        let ids: Vec<&str> = engine.checks().map(|c| c.id()).collect();
        assert_eq!(ids.len(), 11);
        assert_eq!(ids[0], "diagonal_wires");
        assert_eq!(ids[10], "power_orientation");
        let warnings: Vec<&str> = engine
            .checks()
            .filter(|c| c.severity() == Severity::Warning)
            .map(|c| c.id())
            .collect();
        assert_eq!(warnings, vec!["tjunction_without_dot"]);
    }

    #[test]
    fn test_only_non_empty_results() {
        let data = SchematicData {
            wires: vec![Segment::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0))],
            ..Default::default()
        };
        let results = CheckEngine::with_default_checks().run(&data);
        let ids: Vec<&str> = results.iter().map(|r| r.check_id.as_str()).collect();
        assert_eq!(ids, vec!["diagonal_wires", "dangling_endpoints"]);
        assert!(results.iter().all(|r| r.is_error()));
    }

    struct NoLabels;

    impl Check for NoLabels {
        fn id(&self) -> &str {
            "no_labels"
        }
        fn category(&self) -> &str {
            "No Labels"
        }
        fn severity(&self) -> Severity {
            Severity::Warning
        }
        fn description(&self) -> &str {
            "Sheet has no labels"
        }
        fn run(&self, data: &SchematicData) -> Vec<String> {
            if data.labels.is_empty() {
                vec!["no labels on sheet".to_string()]
            } else {
                vec![]
            }
        }
    }

    #[test]
    fn test_custom_check() {
        let mut engine = CheckEngine::new();
        engine.add_check(Arc::new(NoLabels));
        let results = engine.run(&SchematicData::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Warning);
    }
}
