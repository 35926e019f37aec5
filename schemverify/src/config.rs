//! YAML board configuration.
//!
//! A board configuration names the schematic files of one board, the
//! connectivity its root sheet must show, and the PCB expectations. Every
//! field is optional; missing fields take the RAM prototype defaults.
//!
//! ```yaml
//! name: RAM Prototype
//! board_dir: .
//! output_dir: verify_output
//! root_schematic: ram.kicad_sch
//! schematics:
//!   - ram.kicad_sch
//!   - byte.kicad_sch
//! connections:
//!   expected:
//!     - ["Address Decoder:SEL0", "Write Clk Gen:SEL0"]
//!   required:
//!     - "Address Decoder:A0"
//!   isolated:
//!     - ["Address Decoder:A0", "Address Decoder:A1"]
//! kicad_cli:
//!   program: kicad-cli
//!   timeout_secs: 300
//! pcb:
//!   file: ram.kicad_pcb
//!   expected_components: 512
//!   power_planes:
//!     - { net: GND, layer: In1.Cu }
//!   rule_sets:
//!     - { label: pcbway, path: rules/pcbway.kicad_dru }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kicad_cli::{KicadCli, DEFAULT_PROGRAM, DEFAULT_TIMEOUT_SECS};
use crate::netlist::ConnectionTable;

pub const DEFAULT_CONFIG_FILE: &str = "schemverify.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub name: String,
    /// Directory holding the schematic and board files.
    pub board_dir: PathBuf,
    /// Reports, ERC/DRC JSON and SVGs go here; relative to `board_dir`.
    pub output_dir: PathBuf,
    /// Sheet whose netlist is checked against `connections` and whose ERC
    /// covers the full hierarchy.
    pub root_schematic: String,
    pub schematics: Vec<String>,
    pub connections: ConnectionTable,
    pub kicad_cli: KicadCliConfig,
    pub pcb: PcbConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KicadCliConfig {
    pub program: PathBuf,
    pub timeout_secs: u64,
}

impl Default for KicadCliConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcbConfig {
    pub file: String,
    pub expected_components: Option<usize>,
    pub required_layers: Vec<String>,
    pub power_planes: Vec<PowerPlane>,
    pub outline_min_mm: f64,
    pub outline_max_mm: f64,
    /// Extra DRC passes, each with its own `.kicad_dru`, after the default one.
    pub rule_sets: Vec<RuleSet>,
    /// DRC violation types ignored in every pass.
    pub skip_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerPlane {
    pub net: String,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub label: String,
    pub path: PathBuf,
}

/// Violations expected on a placed but unrouted board.
pub const PRE_ROUTING_SKIP_TYPES: &[&str] = &[
    "unconnected_items",
    "lib_footprint_mismatch",
    "lib_footprint_issues",
    "silk_over_copper",
    "silk_overlap",
    "text_thickness",
    "text_height",
];

impl Default for PcbConfig {
    fn default() -> Self {
        Self {
            file: "ram.kicad_pcb".to_string(),
            // 161 ICs + 175 LEDs + 175 resistors + 1 connector
            expected_components: Some(512),
            required_layers: ["F.Cu", "In1.Cu", "In2.Cu", "B.Cu"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            power_planes: vec![
                PowerPlane {
                    net: "GND".to_string(),
                    layer: "In1.Cu".to_string(),
                },
                PowerPlane {
                    net: "VCC".to_string(),
                    layer: "In2.Cu".to_string(),
                },
            ],
            outline_min_mm: 10.0,
            outline_max_mm: 300.0,
            rule_sets: vec![
                RuleSet {
                    label: "pcbway".to_string(),
                    path: PathBuf::from("rules/pcbway.kicad_dru"),
                },
                RuleSet {
                    label: "elecrow".to_string(),
                    path: PathBuf::from("rules/elecrow.kicad_dru"),
                },
            ],
            skip_types: PRE_ROUTING_SKIP_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::ram_prototype()
    }
}

impl BoardConfig {
    /// The hierarchical 8-byte RAM prototype board.
    pub fn ram_prototype() -> Self {
        Self {
            name: "RAM Prototype".to_string(),
            board_dir: PathBuf::from("."),
            output_dir: PathBuf::from("verify_output"),
            root_schematic: "ram.kicad_sch".to_string(),
            schematics: [
                "ram.kicad_sch",
                "address_decoder.kicad_sch",
                "control_logic.kicad_sch",
                "write_clk_gen.kicad_sch",
                "read_oe_gen.kicad_sch",
                "byte.kicad_sch",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            connections: ConnectionTable::ram_prototype(),
            kicad_cli: KicadCliConfig::default(),
            pcb: PcbConfig::default(),
        }
    }

    /// Load configuration from a YAML file. A relative `board_dir` is taken
    /// relative to the file's own directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&contents)?;
        if config.board_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.board_dir = parent.join(&config.board_dir);
            }
        }
        tracing::debug!("loaded board config {} from {}", config.name, path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn with_board_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.board_dir = dir.into();
        self
    }

    pub fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        self.board_dir.join(file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.board_dir.join(&self.output_dir)
    }

    pub fn root_path(&self) -> PathBuf {
        self.resolve(&self.root_schematic)
    }

    pub fn pcb_path(&self) -> PathBuf {
        self.resolve(&self.pcb.file)
    }

    pub fn kicad_cli(&self) -> KicadCli {
        KicadCli::new(
            self.kicad_cli.program.clone(),
            Duration::from_secs(self.kicad_cli.timeout_secs),
        )
    }
}
