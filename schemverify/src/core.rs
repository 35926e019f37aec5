//! Verification sessions shared by the CLI and library users.
//! Ties parsing, the check battery, netlist assertions and kicad-cli runs
//! together into per-file, per-board and per-PCB reports.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyzer::{CheckEngine, CheckResult, SchematicData, Severity};
use crate::board::run_board_checks;
use crate::config::{BoardConfig, ConfigError};
use crate::kicad_cli::{ToolError, ToolReport};
use crate::netlist::{check_netlist, NetBuilder};
use crate::parser::kicad::{KicadParseError, KicadParser};
use crate::parser::pcb::{PcbParseError, PcbParser};
use crate::report;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Parse error: {0}")]
    Parse(#[from] KicadParseError),
    #[error("PCB parse error: {0}")]
    Pcb(#[from] PcbParseError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("kicad-cli error: {0}")]
    Tool(#[from] ToolError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Options for board and PCB runs.
#[derive(Clone, Debug)]
pub struct VerifyOptions {
    pub run_erc: bool,
    pub run_drc: bool,
    pub export_svg: bool,
    /// Persist `verify_report.txt` under the board's output directory.
    pub write_report: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            run_erc: true,
            run_drc: true,
            export_svg: true,
            write_report: true,
        }
    }
}

impl VerifyOptions {
    /// Geometry and netlist only; nothing touches kicad-cli or the disk.
    pub fn offline() -> Self {
        Self {
            run_erc: false,
            run_drc: false,
            export_svg: false,
            write_report: false,
        }
    }
}

/// Lowest severity that makes a run fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    #[default]
    Error,
    Warning,
}

impl FailOn {
    pub fn fails(&self, errors: usize, warnings: usize) -> bool {
        match self {
            FailOn::Error => errors > 0,
            FailOn::Warning => errors + warnings > 0,
        }
    }
}

fn count_issues(results: &[CheckResult], severity: Severity) -> usize {
    results
        .iter()
        .filter(|r| r.severity == severity)
        .map(|r| r.issues.len())
        .sum()
}

/// Check battery results for one schematic file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub components: usize,
    pub wires: usize,
    pub results: Vec<CheckResult>,
}

impl FileReport {
    pub fn name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file.display().to_string())
    }

    pub fn errors(&self) -> usize {
        count_issues(&self.results, Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        count_issues(&self.results, Severity::Warning)
    }

    pub fn passed(&self, fail_on: FailOn) -> bool {
        !fail_on.fails(self.errors(), self.warnings())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardReport {
    pub name: String,
    pub files: Vec<FileReport>,
    /// Configured schematics that were not on disk.
    pub skipped: Vec<String>,
    pub root_schematic: String,
    pub nets: usize,
    pub netlist_issues: Vec<String>,
    pub erc: Vec<ToolReport>,
    pub svg_count: Option<usize>,
    /// Why an optional stage did not run.
    pub notes: Vec<String>,
    pub report_path: Option<PathBuf>,
}

impl BoardReport {
    /// Netlist findings count as errors.
    pub fn errors(&self) -> usize {
        self.files.iter().map(FileReport::errors).sum::<usize>()
            + self.netlist_issues.len()
            + self.erc.iter().map(|r| r.errors).sum::<usize>()
    }

    pub fn warnings(&self) -> usize {
        self.files.iter().map(FileReport::warnings).sum::<usize>()
            + self.erc.iter().map(|r| r.warnings).sum::<usize>()
    }

    pub fn passed(&self, fail_on: FailOn) -> bool {
        !fail_on.fails(self.errors(), self.warnings())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PcbReport {
    pub file: PathBuf,
    pub footprints: usize,
    pub results: Vec<CheckResult>,
    pub drc: Vec<ToolReport>,
    pub notes: Vec<String>,
}

impl PcbReport {
    pub fn errors(&self) -> usize {
        count_issues(&self.results, Severity::Error) + self.drc.iter().map(|r| r.errors).sum::<usize>()
    }

    pub fn warnings(&self) -> usize {
        count_issues(&self.results, Severity::Warning)
            + self.drc.iter().map(|r| r.warnings).sum::<usize>()
    }

    pub fn passed(&self, fail_on: FailOn) -> bool {
        !fail_on.fails(self.errors(), self.warnings())
    }
}

/// Recursively discover schematic files in a directory.
pub fn discover_schematics(dir: &Path) -> Result<Vec<PathBuf>, VerifyError> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<(), VerifyError> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "target" || name == "verify_output" {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("kicad_sch") {
            files.push(path);
        }
    }
    Ok(())
}

/// Runs the check battery and the board-level passes.
pub struct Verifier {
    engine: CheckEngine,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    pub fn new() -> Self {
        Self::with_engine(CheckEngine::with_default_checks())
    }

    pub fn with_engine(engine: CheckEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &CheckEngine {
        &self.engine
    }

    pub fn verify_schematic(&self, path: &Path) -> Result<FileReport, VerifyError> {
        let (_, report) = self.analyze(path)?;
        Ok(report)
    }

    fn analyze(&self, path: &Path) -> Result<(SchematicData, FileReport), VerifyError> {
        let schematic = KicadParser::parse_schematic(path)?;
        let data = SchematicData::from_schematic(&schematic);
        let results = self.engine.run(&data);
        let report = FileReport {
            file: path.to_path_buf(),
            components: data.components.len(),
            wires: data.wires.len(),
            results,
        };
        Ok((data, report))
    }

    pub fn verify_board(
        &self,
        config: &BoardConfig,
        options: &VerifyOptions,
    ) -> Result<BoardReport, VerifyError> {
        let mut report = BoardReport {
            name: config.name.clone(),
            root_schematic: config.root_schematic.clone(),
            ..Default::default()
        };
        let mut root_data = None;

        for file in &config.schematics {
            let path = config.resolve(file);
            if !path.exists() {
                tracing::warn!("skipping {} (not found)", path.display());
                report.skipped.push(file.clone());
                continue;
            }
            let (data, file_report) = self.analyze(&path)?;
            tracing::info!(
                "{}: {} error(s), {} warning(s)",
                file,
                file_report.errors(),
                file_report.warnings()
            );
            if *file == config.root_schematic {
                root_data = Some(data);
            }
            report.files.push(file_report);
        }

        let root = config.root_path();
        if root_data.is_none() && root.exists() {
            root_data = Some(self.analyze(&root)?.0);
        }
        match root_data {
            Some(data) => {
                let netlist = NetBuilder::build(&data);
                report.nets = netlist.len();
                report.netlist_issues = check_netlist(&netlist, &config.connections);
            }
            None => report
                .netlist_issues
                .push(format!("{} not found", config.root_schematic)),
        }

        let cli = config.kicad_cli();
        let output_dir = config.output_path();
        let tools_wanted = options.run_erc || options.export_svg;
        let tools_ready = tools_wanted && cli.is_available();
        if tools_wanted && !tools_ready {
            let skipped = match (options.run_erc, options.export_svg) {
                (true, true) => "ERC and SVG export",
                (true, false) => "ERC",
                _ => "SVG export",
            };
            report.notes.push(format!(
                "{} skipped (kicad-cli not found at {})",
                skipped,
                cli.program.display()
            ));
        }

        if options.run_erc && tools_ready {
            if root.exists() {
                report.erc.push(cli.run_erc(&root, &output_dir, "root", false)?);
            }
            for file in config.schematics.iter().filter(|f| **f != config.root_schematic) {
                let path = config.resolve(file);
                if !path.exists() {
                    continue;
                }
                let label = Path::new(file)
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.clone());
                report.erc.push(cli.run_erc(&path, &output_dir, &label, true)?);
            }
        }

        if options.export_svg && tools_ready && root.exists() {
            let svg_dir = output_dir.join("svg");
            match cli.export_svg(&root, &svg_dir) {
                Ok(count) => report.svg_count = Some(count),
                Err(e) => {
                    tracing::warn!("SVG export failed: {}", e);
                    report.notes.push(format!("SVG export failed: {}", e));
                }
            }
        }

        if options.write_report {
            let path = output_dir.join(report::REPORT_FILE);
            report::write_text_report(&report, &path)?;
            report.report_path = Some(path);
        }

        Ok(report)
    }

    pub fn verify_pcb(
        &self,
        config: &BoardConfig,
        options: &VerifyOptions,
    ) -> Result<PcbReport, VerifyError> {
        let path = config.pcb_path();
        if !path.exists() {
            return Err(VerifyError::NotFound(path));
        }
        let pcb = PcbParser::parse_pcb(&path)?;
        let mut report = PcbReport {
            file: path.clone(),
            footprints: pcb.footprints.len(),
            results: run_board_checks(&pcb, &config.pcb),
            ..Default::default()
        };

        if !options.run_drc {
            return Ok(report);
        }
        let cli = config.kicad_cli();
        if !cli.is_available() {
            report
                .notes
                .push(format!("DRC skipped (kicad-cli not found at {})", cli.program.display()));
            return Ok(report);
        }

        let output_dir = config.output_path();
        let skip = &config.pcb.skip_types;
        report
            .drc
            .push(cli.run_drc(&path, &output_dir, "default", None, skip)?);
        for rule_set in &config.pcb.rule_sets {
            let rules = config.resolve(&rule_set.path);
            if !rules.exists() {
                report
                    .notes
                    .push(format!("SKIP {} DRC (rules file not found)", rule_set.label));
                continue;
            }
            report
                .drc
                .push(cli.run_drc(&path, &output_dir, &rule_set.label, Some(rules.as_path()), skip)?);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(severity: Severity, n: usize) -> CheckResult {
        CheckResult {
            check_id: "x".to_string(),
            category: "X".to_string(),
            severity,
            issues: (0..n).map(|i| format!("issue {}", i)).collect(),
        }
    }

    #[test]
    fn test_warnings_fail_only_when_asked() {
        let report = FileReport {
            file: PathBuf::from("a.kicad_sch"),
            components: 0,
            wires: 0,
            results: vec![result(Severity::Warning, 2)],
        };
        assert_eq!(report.errors(), 0);
        assert_eq!(report.warnings(), 2);
        assert!(report.passed(FailOn::Error));
        assert!(!report.passed(FailOn::Warning));
    }

    #[test]
    fn test_board_totals_include_netlist_and_erc() {
        let report = BoardReport {
            files: vec![FileReport {
                file: PathBuf::from("a.kicad_sch"),
                components: 0,
                wires: 0,
                results: vec![result(Severity::Error, 1), result(Severity::Warning, 1)],
            }],
            netlist_issues: vec!["A:X not connected to B:X".to_string()],
            erc: vec![ToolReport {
                label: "root".to_string(),
                errors: 2,
                warnings: 3,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(report.errors(), 4);
        assert_eq!(report.warnings(), 4);
        assert!(!report.passed(FailOn::Error));
    }

    #[test]
    fn test_missing_schematics_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = BoardConfig {
            schematics: vec!["gone.kicad_sch".to_string()],
            root_schematic: "gone.kicad_sch".to_string(),
            ..BoardConfig::ram_prototype()
        }
        .with_board_dir(dir.path());

        let report = Verifier::new()
            .verify_board(&config, &VerifyOptions::offline())
            .unwrap();
        assert_eq!(report.skipped, vec!["gone.kicad_sch"]);
        assert_eq!(report.netlist_issues, vec!["gone.kicad_sch not found"]);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_missing_kicad_cli_note_names_requested_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BoardConfig {
            schematics: Vec::new(),
            ..BoardConfig::ram_prototype()
        }
        .with_board_dir(dir.path());
        config.kicad_cli.program = dir.path().join("no-kicad-cli");

        let note = |run_erc: bool, export_svg: bool| {
            let options = VerifyOptions {
                run_erc,
                export_svg,
                ..VerifyOptions::offline()
            };
            let report = Verifier::new().verify_board(&config, &options).unwrap();
            report.notes
        };
        let missing = format!("(kicad-cli not found at {})", dir.path().join("no-kicad-cli").display());

        assert_eq!(note(true, true), vec![format!("ERC and SVG export skipped {}", missing)]);
        assert_eq!(note(true, false), vec![format!("ERC skipped {}", missing)]);
        assert_eq!(note(false, true), vec![format!("SVG export skipped {}", missing)]);
        assert!(note(false, false).is_empty());
    }

    #[test]
    fn test_missing_pcb_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BoardConfig::ram_prototype().with_board_dir(dir.path());
        let err = Verifier::new()
            .verify_pcb(&config, &VerifyOptions::offline())
            .unwrap_err();
        assert!(matches!(err, VerifyError::NotFound(_)));
    }

    #[test]
    fn test_discover_skips_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::create_dir_all(dir.path().join("verify_output")).unwrap();
        std::fs::write(dir.path().join("top.kicad_sch"), "").unwrap();
        std::fs::write(dir.path().join("sub/leaf.kicad_sch"), "").unwrap();
        std::fs::write(dir.path().join("verify_output/copy.kicad_sch"), "").unwrap();
        std::fs::write(dir.path().join("board.kicad_pcb"), "").unwrap();

        let files = discover_schematics(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.starts_with(dir.path().join("verify_output"))));
    }
}
