//! `kicad-cli` integration: ERC, DRC and SVG export.
//!
//! kicad-cli must be installed; it ships with KiCad 7 and later. A missing
//! binary is reported as a single issue instead of an error so that the
//! geometric checks still produce a useful report.
//!
//! Sub-sheets checked on their own always raise a known set of violations
//! (hierarchical labels with no parent, undriven inputs fed from the parent
//! sheet, ...). Those are filtered when `standalone` is set.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PROGRAM: &str = "kicad-cli";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("kicad-cli failed: {0}")]
    ExecutionFailed(String),
    #[error("Failed to parse kicad-cli JSON report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// JSON reports

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErcReport {
    #[serde(default)]
    pub sheets: Vec<ErcSheet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErcSheet {
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

fn root_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrcReport {
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub unconnected_items: Vec<Violation>,
    #[serde(default)]
    pub schematic_parity: Vec<Violation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Violation {
    pub severity: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<ViolationItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViolationItem {
    #[serde(default)]
    pub description: String,
}

impl Violation {
    fn items_summary(&self) -> String {
        self.items
            .iter()
            .map(|it| it.description.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Violations every sub-sheet raises when checked without its parent.
pub fn is_standalone_artifact(v: &Violation) -> bool {
    if v.description.contains("cannot be connected to non-existent parent sheet") {
        return true;
    }
    match v.kind.as_str() {
        "label_dangling" => v
            .items
            .iter()
            .any(|it| it.description.contains("Hierarchical Label")),
        "wire_dangling" | "power_pin_not_driven" => true,
        "pin_not_driven" => v.description.contains("Input pin not driven"),
        _ => false,
    }
}

/// Summarized outcome of one ERC or DRC run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolReport {
    pub label: String,
    pub issues: Vec<String>,
    pub errors: usize,
    pub warnings: usize,
    pub filtered: usize,
}

impl ToolReport {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, path: &str, v: &Violation) {
        match v.severity.as_str() {
            "error" => {
                self.errors += 1;
                self.issues.push(format!(
                    "ERROR [{}] {}: {} ({})",
                    path,
                    v.kind,
                    v.description,
                    v.items_summary()
                ));
            }
            "warning" => {
                self.warnings += 1;
                self.issues
                    .push(format!("WARN [{}] {}: {}", path, v.kind, v.description));
            }
            _ => {}
        }
    }
}

pub fn summarize_erc(label: &str, report: &ErcReport, standalone: bool) -> ToolReport {
    let mut summary = ToolReport::new(label);
    for sheet in &report.sheets {
        for v in &sheet.violations {
            if standalone && is_standalone_artifact(v) {
                summary.filtered += 1;
                continue;
            }
            summary.record(&sheet.path, v);
        }
    }
    if summary.filtered > 0 {
        summary.issues.push(format!(
            "(filtered {} standalone artifact(s))",
            summary.filtered
        ));
    }
    summary
}

pub fn summarize_drc(label: &str, report: &DrcReport, skip_types: &[String]) -> ToolReport {
    let mut summary = ToolReport::new(label);
    let sections = [
        ("violations", &report.violations),
        ("unconnected_items", &report.unconnected_items),
        ("schematic_parity", &report.schematic_parity),
    ];
    for (section, violations) in sections {
        for v in violations.iter() {
            if skip_types.iter().any(|t| *t == v.kind) {
                summary.filtered += 1;
                continue;
            }
            summary.record(section, v);
        }
    }
    if summary.filtered > 0 {
        summary.issues.push(format!(
            "(skipped {} violation(s) by type)",
            summary.filtered
        ));
    }
    summary
}

/// Sequential kicad-cli runner with one blanket timeout per invocation.
#[derive(Debug, Clone)]
pub struct KicadCli {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for KicadCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl KicadCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Check if kicad-cli is available and return its version line.
    pub fn version(&self) -> Result<String, ToolError> {
        let stdout = self.run(&["version"])?;
        Ok(stdout.lines().next().unwrap_or("unknown").trim().to_string())
    }

    pub fn is_available(&self) -> bool {
        self.version().is_ok()
    }

    /// ERC on one schematic, JSON written to `<output_dir>/erc_<label>.json`.
    pub fn run_erc(
        &self,
        schematic: &Path,
        output_dir: &Path,
        label: &str,
        standalone: bool,
    ) -> Result<ToolReport, ToolError> {
        std::fs::create_dir_all(output_dir)?;
        let json_path = output_dir.join(format!("erc_{}.json", label));
        if json_path.exists() {
            std::fs::remove_file(&json_path)?;
        }

        let output_arg = json_path.to_string_lossy().to_string();
        let schematic_arg = schematic.to_string_lossy().to_string();
        let args = [
            "sch",
            "erc",
            "--format",
            "json",
            "--severity-all",
            "--output",
            output_arg.as_str(),
            schematic_arg.as_str(),
        ];
        match self.run(&args) {
            Ok(_) => {}
            Err(ToolError::NotFound(program)) => return Ok(self.not_found(label, &program)),
            // ERC exits non-zero when it finds violations; the JSON is what counts
            Err(ToolError::ExecutionFailed(msg)) => tracing::debug!("erc {}: {}", label, msg),
            Err(e) => return Err(e),
        }

        if !json_path.exists() {
            let mut report = ToolReport::new(label);
            report.issues.push("ERC JSON output not generated".to_string());
            return Ok(report);
        }
        let report: ErcReport = serde_json::from_str(&std::fs::read_to_string(&json_path)?)?;
        let summary = summarize_erc(label, &report, standalone);
        tracing::info!(
            "ERC {}: {} error(s), {} warning(s), {} filtered",
            label,
            summary.errors,
            summary.warnings,
            summary.filtered
        );
        Ok(summary)
    }

    /// DRC on a board, optionally with a custom rule set installed for the
    /// duration of the run.
    pub fn run_drc(
        &self,
        board: &Path,
        output_dir: &Path,
        label: &str,
        rule_set: Option<&Path>,
        skip_types: &[String],
    ) -> Result<ToolReport, ToolError> {
        std::fs::create_dir_all(output_dir)?;
        let json_path = output_dir.join(format!("drc_{}.json", label));
        if json_path.exists() {
            std::fs::remove_file(&json_path)?;
        }

        let _rules = match rule_set {
            Some(rules) => Some(InstalledRules::install(board, rules)?),
            None => None,
        };

        let output_arg = json_path.to_string_lossy().to_string();
        let board_arg = board.to_string_lossy().to_string();
        let args = [
            "pcb",
            "drc",
            "--format",
            "json",
            "--severity-all",
            "--output",
            output_arg.as_str(),
            board_arg.as_str(),
        ];
        match self.run(&args) {
            Ok(_) => {}
            Err(ToolError::NotFound(program)) => return Ok(self.not_found(label, &program)),
            Err(ToolError::ExecutionFailed(msg)) => tracing::debug!("drc {}: {}", label, msg),
            Err(e) => return Err(e),
        }

        if !json_path.exists() {
            let mut report = ToolReport::new(label);
            report.issues.push("DRC JSON output not generated".to_string());
            return Ok(report);
        }
        let report: DrcReport = serde_json::from_str(&std::fs::read_to_string(&json_path)?)?;
        Ok(summarize_drc(label, &report, skip_types))
    }

    /// Export every sheet of a schematic hierarchy as SVG; returns the
    /// number of SVG files in `output_dir` afterwards.
    pub fn export_svg(&self, schematic: &Path, output_dir: &Path) -> Result<usize, ToolError> {
        std::fs::create_dir_all(output_dir)?;
        let output_arg = output_dir.to_string_lossy().to_string();
        let schematic_arg = schematic.to_string_lossy().to_string();
        self.run(&[
            "sch",
            "export",
            "svg",
            "--output",
            output_arg.as_str(),
            schematic_arg.as_str(),
        ])?;

        let mut count = 0;
        for entry in std::fs::read_dir(output_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("svg") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn not_found(&self, label: &str, program: &str) -> ToolReport {
        tracing::warn!("{} not found, skipping {}", program, label);
        let mut report = ToolReport::new(label);
        report.issues.push(format!("kicad-cli not found at {}", program));
        report
    }

    /// Run the program to completion, killing it after `self.timeout`.
    /// Returns stdout; a non-zero exit becomes `ExecutionFailed` with stderr.
    fn run(&self, args: &[&str]) -> Result<String, ToolError> {
        let program = self.program.display().to_string();
        tracing::debug!("running {} {}", program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::NotFound(program.clone()),
                _ => ToolError::Io(e),
            })?;

        // pipes are drained concurrently with the wait below
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                // readers are left detached: a grandchild may still hold the pipes open
                return Err(ToolError::Timeout {
                    program,
                    secs: self.timeout.as_secs(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_output(stdout)?;
        if !status.success() {
            let stderr = join_output(stderr)?;
            return Err(ToolError::ExecutionFailed(format!(
                "exit {}: {}",
                status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

type Drain = JoinHandle<std::io::Result<String>>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn join_output(reader: Option<Drain>) -> Result<String, ToolError> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| ToolError::ExecutionFailed("output reader panicked".to_string()))?
            .map_err(ToolError::Io),
        None => Ok(String::new()),
    }
}

/// Rule set copied next to the board as `<stem>.kicad_dru`, which is where
/// KiCad looks for custom rules. The previous file, if any, comes back on
/// drop.
struct InstalledRules {
    target: PathBuf,
    previous: Option<Vec<u8>>,
}

impl InstalledRules {
    fn install(board: &Path, rules: &Path) -> Result<Self, ToolError> {
        let target = board.with_extension("kicad_dru");
        let previous = if target.exists() {
            Some(std::fs::read(&target)?)
        } else {
            None
        };
        std::fs::copy(rules, &target)?;
        tracing::debug!("installed {} as {}", rules.display(), target.display());
        Ok(Self { target, previous })
    }
}

impl Drop for InstalledRules {
    fn drop(&mut self) {
        let restored = match &self.previous {
            Some(bytes) => std::fs::write(&self.target, bytes),
            None => std::fs::remove_file(&self.target),
        };
        if let Err(e) = restored {
            tracing::warn!("could not restore {}: {}", self.target.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC_JSON: &str = r#"{
      "$schema": "https://schemas.kicad.org/erc.v1.json",
      "source": "byte.kicad_sch",
      "sheets": [
        {
          "path": "/",
          "uuid_path": "/abc",
          "violations": [
            {
              "severity": "error",
              "type": "label_dangling",
              "description": "Label not connected to anything",
              "items": [{"description": "Hierarchical Label 'D0'", "uuid": "1"}]
            },
            {
              "severity": "error",
              "type": "pin_not_connected",
              "description": "Pin not connected",
              "items": [{"description": "Symbol U3 Pin 2 [A, Input, Line]"}, {"description": "U3"}]
            },
            {
              "severity": "warning",
              "type": "pin_not_driven",
              "description": "Input pin not driven by any Output pins",
              "items": []
            },
            {
              "severity": "warning",
              "type": "lib_symbol_issues",
              "description": "Symbol not found in library"
            }
          ]
        }
      ]
    }"#;

    #[test]
    fn test_standalone_filtering() {
        let report: ErcReport = serde_json::from_str(ERC_JSON).unwrap();
        let summary = summarize_erc("byte", &report, true);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.filtered, 2);
        assert_eq!(
            summary.issues[0],
            "ERROR [/] pin_not_connected: Pin not connected (Symbol U3 Pin 2 [A, Input, Line]; U3)"
        );
        assert_eq!(summary.issues[1], "WARN [/] lib_symbol_issues: Symbol not found in library");
        assert_eq!(summary.issues[2], "(filtered 2 standalone artifact(s))");
    }

    #[test]
    fn test_root_run_keeps_everything() {
        let report: ErcReport = serde_json::from_str(ERC_JSON).unwrap();
        let summary = summarize_erc("root", &report, false);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.filtered, 0);
        assert_eq!(summary.issues.len(), 4);
    }

    #[test]
    fn test_artifact_rules() {
        let v = |kind: &str, desc: &str| Violation {
            severity: "error".to_string(),
            kind: kind.to_string(),
            description: desc.to_string(),
            items: vec![],
        };
        assert!(is_standalone_artifact(&v("wire_dangling", "Wire not connected")));
        assert!(is_standalone_artifact(&v("power_pin_not_driven", "")));
        assert!(is_standalone_artifact(&v(
            "hier_label_mismatch",
            "Pin D0 cannot be connected to non-existent parent sheet"
        )));
        assert!(!is_standalone_artifact(&v("pin_not_driven", "Power input pin not driven")));
        assert!(!is_standalone_artifact(&v("label_dangling", "Label not connected")));
    }

    #[test]
    fn test_drc_skip_types() {
        let json = r#"{
          "violations": [
            {"severity": "error", "type": "clearance", "description": "Clearance violation", "items": []},
            {"severity": "warning", "type": "silk_overlap", "description": "Silkscreen overlap", "items": []}
          ],
          "unconnected_items": [
            {"severity": "error", "type": "unconnected_items", "description": "Missing connection", "items": []}
          ],
          "schematic_parity": []
        }"#;
        let report: DrcReport = serde_json::from_str(json).unwrap();
        let skip = vec!["unconnected_items".to_string(), "silk_overlap".to_string()];
        let summary = summarize_drc("default", &report, &skip);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 0);
        assert_eq!(summary.filtered, 2);
        assert_eq!(summary.issues.last().unwrap(), "(skipped 2 violation(s) by type)");
    }

    #[test]
    fn test_missing_binary_is_a_single_issue() {
        let dir = tempfile::tempdir().unwrap();
        let cli = KicadCli::new("/nonexistent/kicad-cli-missing", Duration::from_secs(5));
        let report = cli
            .run_erc(&dir.path().join("x.kicad_sch"), dir.path(), "root", false)
            .unwrap();
        assert_eq!(report.errors, 0);
        assert_eq!(report.warnings, 0);
        assert_eq!(
            report.issues,
            vec!["kicad-cli not found at /nonexistent/kicad-cli-missing"]
        );
        assert!(!cli.is_available());
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_large_output_does_not_stall() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(
            dir.path(),
            "chatty.sh",
            "echo 'kicad-cli 9.0.0'\n\
             head -c 300000 /dev/zero | tr '\\0' x\n\
             head -c 300000 /dev/zero | tr '\\0' y >&2",
        );
        let cli = KicadCli::new(program, Duration::from_secs(20));

        let started = Instant::now();
        assert_eq!(cli.version().unwrap(), "kicad-cli 9.0.0");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_program_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "hung.sh", "sleep 30");
        let cli = KicadCli::new(program, Duration::from_secs(1));

        let started = Instant::now();
        let err = cli.version().unwrap_err();
        assert!(matches!(err, ToolError::Timeout { secs: 1, .. }), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!cli.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "fail.sh", "echo 'no such board' >&2\nexit 3");
        let cli = KicadCli::new(program, Duration::from_secs(20));

        match cli.version() {
            Err(ToolError::ExecutionFailed(msg)) => assert_eq!(msg, "exit 3: no such board"),
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_rule_set_restored_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let board = dir.path().join("ram.kicad_pcb");
        let rules = dir.path().join("pcbway.kicad_dru");
        std::fs::write(&board, "(kicad_pcb)").unwrap();
        std::fs::write(&rules, "(version 1)\n(rule pcbway)").unwrap();
        std::fs::write(dir.path().join("ram.kicad_dru"), "(version 1)").unwrap();

        {
            let _installed = InstalledRules::install(&board, &rules).unwrap();
            let active = std::fs::read_to_string(dir.path().join("ram.kicad_dru")).unwrap();
            assert!(active.contains("pcbway"));
        }
        let restored = std::fs::read_to_string(dir.path().join("ram.kicad_dru")).unwrap();
        assert_eq!(restored, "(version 1)");
    }
}
