//! schemverify CLI - KiCad schematic and PCB verification from the command line.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use schemverify::board::BOARD_CHECKS;
use schemverify::config::DEFAULT_CONFIG_FILE;
use schemverify::report;
use schemverify::{
    discover_schematics, BoardConfig, CheckEngine, FailOn, FileReport, Verifier, VerifyOptions,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "schemverify")]
#[command(about = "KiCad schematic and PCB verification tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log progress to stderr (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the geometric checks on a schematic file or every schematic in a directory
    Check {
        /// Path to a .kicad_sch file or a directory
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Lowest severity that fails the run
        #[arg(long, value_enum, default_value = "error")]
        fail_on: FailOnSeverity,
    },

    /// Verify a whole board: per-file checks, netlist, ERC and SVG export
    Board {
        /// Board configuration (YAML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Board directory (overrides the configuration)
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Skip kicad-cli ERC and SVG export
        #[arg(long)]
        no_erc: bool,

        /// Do not write verify_report.txt
        #[arg(long)]
        no_report: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Lowest severity that fails the run
        #[arg(long, value_enum, default_value = "error")]
        fail_on: FailOnSeverity,
    },

    /// Verify the board layout: structure checks and DRC passes
    Pcb {
        /// Board configuration (YAML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Board directory (overrides the configuration)
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Skip kicad-cli DRC
        #[arg(long)]
        no_drc: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Lowest severity that fails the run
        #[arg(long, value_enum, default_value = "error")]
        fail_on: FailOnSeverity,
    },

    /// Write the default board configuration
    Init {
        /// Where to write it
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List the available checks (descriptions with --verbose)
    Checks,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailOnSeverity {
    Error,
    Warning,
}

impl From<FailOnSeverity> for FailOn {
    fn from(severity: FailOnSeverity) -> Self {
        match severity {
            FailOnSeverity::Error => FailOn::Error,
            FailOnSeverity::Warning => FailOn::Warning,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli.command, cli.verbose) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Returns whether the run passed.
fn run(command: Commands, verbose: bool) -> anyhow::Result<bool> {
    match command {
        Commands::Check {
            path,
            format,
            fail_on,
        } => handle_check(&path, format, fail_on.into()),
        Commands::Board {
            config,
            dir,
            no_erc,
            no_report,
            format,
            fail_on,
        } => {
            let config = load_config(config.as_deref(), dir)?;
            let options = VerifyOptions {
                run_erc: !no_erc,
                run_drc: false,
                export_svg: !no_erc,
                write_report: !no_report,
            };
            handle_board(&config, &options, format, fail_on.into())
        }
        Commands::Pcb {
            config,
            dir,
            no_drc,
            format,
            fail_on,
        } => {
            let config = load_config(config.as_deref(), dir)?;
            let options = VerifyOptions {
                run_erc: false,
                run_drc: !no_drc,
                export_svg: false,
                write_report: false,
            };
            handle_pcb(&config, &options, format, fail_on.into())
        }
        Commands::Init { config, force } => {
            handle_init(&config, force)?;
            Ok(true)
        }
        Commands::Checks => {
            handle_checks(verbose);
            Ok(true)
        }
    }
}

/// Explicit `--config`, else `schemverify.yaml` in the board directory if
/// present, else the built-in defaults.
fn load_config(path: Option<&Path>, dir: Option<PathBuf>) -> anyhow::Result<BoardConfig> {
    let board_dir = dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = match path {
        Some(path) => BoardConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let candidate = board_dir.join(DEFAULT_CONFIG_FILE);
            if candidate.exists() {
                BoardConfig::load(&candidate)
                    .with_context(|| format!("loading {}", candidate.display()))?
            } else {
                tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                BoardConfig::default().with_board_dir(board_dir)
            }
        }
    };
    Ok(match dir {
        Some(dir) => config.with_board_dir(dir),
        None => config,
    })
}

fn handle_check(path: &Path, format: OutputFormat, fail_on: FailOn) -> anyhow::Result<bool> {
    let files = if path.is_dir() {
        discover_schematics(path)?
    } else if path.extension().and_then(|s| s.to_str()) == Some("kicad_sch") {
        vec![path.to_path_buf()]
    } else {
        bail!("{} must be a .kicad_sch file or a directory", path.display());
    };

    let verifier = Verifier::new();
    let mut reports = Vec::new();
    for file in &files {
        reports.push(
            verifier
                .verify_schematic(file)
                .with_context(|| format!("checking {}", file.display()))?,
        );
    }

    let errors: usize = reports.iter().map(FileReport::errors).sum();
    let warnings: usize = reports.iter().map(FileReport::warnings).sum();
    let passed = !fail_on.fails(errors, warnings);

    match format {
        OutputFormat::Human => {
            for r in &reports {
                println!();
                print!("{}", r);
            }
            println!();
            println!("{}", report::summary(errors, warnings, passed));
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "results": reports,
                "summary": {
                    "total_files": reports.len(),
                    "errors": errors,
                    "warnings": warnings,
                    "passed": passed,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(passed)
}

fn handle_board(
    config: &BoardConfig,
    options: &VerifyOptions,
    format: OutputFormat,
    fail_on: FailOn,
) -> anyhow::Result<bool> {
    let report = Verifier::new().verify_board(config, options)?;
    let passed = report.passed(fail_on);

    match format {
        OutputFormat::Human => {
            print!("{}", report);
            println!();
            println!("{}", report::summary(report.errors(), report.warnings(), passed));
            if let Some(path) = &report.report_path {
                println!("Report: {}", path.display());
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "report": report,
                "summary": {
                    "errors": report.errors(),
                    "warnings": report.warnings(),
                    "passed": passed,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(passed)
}

fn handle_pcb(
    config: &BoardConfig,
    options: &VerifyOptions,
    format: OutputFormat,
    fail_on: FailOn,
) -> anyhow::Result<bool> {
    let report = Verifier::new().verify_pcb(config, options)?;
    let passed = report.passed(fail_on);

    match format {
        OutputFormat::Human => {
            print!("{}", report);
            println!();
            println!("{}", report::summary(report.errors(), report.warnings(), passed));
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "report": report,
                "summary": {
                    "errors": report.errors(),
                    "warnings": report.warnings(),
                    "passed": passed,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(passed)
}

fn handle_init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    BoardConfig::ram_prototype()
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn handle_checks(verbose: bool) {
    println!("Schematic checks:\n");
    let engine = CheckEngine::with_default_checks();
    for check in engine.checks() {
        println!("  {} [{}]", check.id(), check.severity());
        println!("    {}", check.category());
        if verbose {
            println!("    {}", check.description());
        }
        println!();
    }

    println!("PCB structure checks:\n");
    for (id, category, _) in BOARD_CHECKS {
        println!("  {} [ERROR]", id);
        println!("    {}", category);
        println!();
    }
}
