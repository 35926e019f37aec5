//! Console and text report rendering.

use std::fmt;
use std::path::Path;

use chrono::Local;

use crate::analyzer::CheckResult;
use crate::core::{BoardReport, FileReport, PcbReport};
use crate::kicad_cli::ToolReport;

pub const REPORT_FILE: &str = "verify_report.txt";

const RULE_WIDTH: usize = 60;

fn write_results(f: &mut fmt::Formatter<'_>, results: &[CheckResult]) -> fmt::Result {
    if results.is_empty() {
        return writeln!(f, "  All checks passed");
    }
    for result in results {
        writeln!(
            f,
            "  [{}] {}: {}",
            result.severity.tag(),
            result.category,
            result.issues.len()
        )?;
        for issue in &result.issues {
            writeln!(f, "    {}", issue)?;
        }
    }
    Ok(())
}

fn write_tool(f: &mut fmt::Formatter<'_>, kind: &str, report: &ToolReport) -> fmt::Result {
    for issue in &report.issues {
        writeln!(f, "  {}", issue)?;
    }
    writeln!(
        f,
        "  {}: {} error(s), {} warning(s)",
        kind, report.errors, report.warnings
    )
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.name())?;
        write_results(f, &self.results)
    }
}

impl fmt::Display for BoardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f, "{} Schematic Verification", self.name)?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;

        for file in &self.files {
            writeln!(f)?;
            write!(f, "{}", file)?;
        }
        for skipped in &self.skipped {
            writeln!(f)?;
            writeln!(f, "  SKIP {} (not found)", skipped)?;
        }

        writeln!(f)?;
        writeln!(f, "--- Netlist: {} ({} nets) ---", self.root_schematic, self.nets)?;
        if self.netlist_issues.is_empty() {
            writeln!(f, "  All expected connections verified")?;
        } else {
            writeln!(f, "  [ERROR] Netlist Connectivity: {}", self.netlist_issues.len())?;
            for issue in &self.netlist_issues {
                writeln!(f, "    {}", issue)?;
            }
        }

        for erc in &self.erc {
            writeln!(f)?;
            writeln!(f, "--- ERC: {} ---", erc.label)?;
            write_tool(f, "ERC", erc)?;
        }
        if let Some(count) = self.svg_count {
            writeln!(f)?;
            writeln!(f, "--- SVG export ---")?;
            writeln!(f, "  Exported {} SVG(s)", count)?;
        }
        for note in &self.notes {
            writeln!(f)?;
            writeln!(f, "--- {} ---", note)?;
        }
        Ok(())
    }
}

impl fmt::Display for PcbReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f, "PCB Verification: {}", name)?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f)?;
        writeln!(f, "--- Board Structure Checks ({} footprints) ---", self.footprints)?;
        write_results(f, &self.results)?;

        for drc in &self.drc {
            writeln!(f)?;
            writeln!(f, "--- DRC: {} ---", drc.label)?;
            write_tool(f, "DRC", drc)?;
        }
        for note in &self.notes {
            writeln!(f)?;
            writeln!(f, "--- {} ---", note)?;
        }
        Ok(())
    }
}

/// Closing banner with the PASSED/FAILED verdict.
pub fn summary(errors: usize, warnings: usize, passed: bool) -> String {
    let verdict = if passed { "PASSED" } else { "FAILED" };
    format!(
        "{rule}\n{}: {} error(s), {} warning(s)\n{rule}",
        verdict,
        errors,
        warnings,
        rule = "=".repeat(RULE_WIDTH)
    )
}

/// Render the persisted text report.
pub fn render_text_report(report: &BoardReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} Schematic Verification Report\n", report.name));
    out.push_str(&format!("Generated: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");

    for file in &report.files {
        out.push_str(&format!("{}:\n", file.name()));
        if file.results.is_empty() {
            out.push_str("  All checks passed\n");
        }
        for result in &file.results {
            out.push_str(&format!(
                "  [{}] {} ({}):\n",
                result.severity.tag(),
                result.category,
                result.issues.len()
            ));
            for issue in &result.issues {
                out.push_str(&format!("    {}\n", issue));
            }
        }
        out.push('\n');
    }

    out.push_str(&format!("Netlist ({}):\n", report.root_schematic));
    if report.netlist_issues.is_empty() {
        out.push_str("  All expected connections verified\n");
    }
    for issue in &report.netlist_issues {
        out.push_str(&format!("    {}\n", issue));
    }
    out.push('\n');

    for erc in &report.erc {
        out.push_str(&format!(
            "ERC {}: {} error(s), {} warning(s)\n",
            erc.label, erc.errors, erc.warnings
        ));
        for issue in &erc.issues {
            out.push_str(&format!("    {}\n", issue));
        }
    }

    out.push_str(&format!(
        "\nTotal: {} error(s), {} warning(s)\n",
        report.errors(),
        report.warnings()
    ));
    out
}

pub fn write_text_report(report: &BoardReport, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_text_report(report))?;
    tracing::info!("report written to {}", path.display());
    Ok(())
}
