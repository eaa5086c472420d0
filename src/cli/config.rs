use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::context::step_context::StepSettings;
use crate::error::StepError;
use crate::report::console::RenderOptions;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "step-context",
    version,
    about = "Hierarchical, concurrency-safe test step reporting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: step-context.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sample tree of async steps and print the resulting report tree
    Demo {
        /// Number of async steps to launch under the root
        #[arg(long, default_value_t = 10)]
        async_steps: usize,

        /// How many of them panic
        #[arg(long, default_value_t = 3)]
        panics: usize,

        /// How many of them fail an assertion
        #[arg(long, default_value_t = 3)]
        failures: usize,

        /// Output format: console, json (default: from config)
        #[arg(long)]
        format: Option<String>,
    },

    /// Render a serialized step tree (JSON)
    Render {
        /// Path to the step tree JSON file
        #[arg(long)]
        input: String,

        /// Output format: console, json (default: from config)
        #[arg(long)]
        format: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `step-context.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StepConfig {
    #[serde(default)]
    pub steps: StepSettings,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_console")]
    pub format: String,

    #[serde(default = "default_true")]
    pub show_parameters: bool,

    #[serde(default = "default_true")]
    pub show_attachments: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: "console".to_string(),
            show_parameters: true,
            show_attachments: true,
        }
    }
}

impl ReportConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_parameters: self.show_parameters,
            show_attachments: self.show_attachments,
        }
    }
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_console() -> String { "console".to_string() }

/// Output format for rendered trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            other => Err(StepError::UnknownFormat(other.to_string())),
        }
    }
}

// ============================================================================
// Config File Loading
// ============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "step-context.yaml";

impl StepConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, StepError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Strict load: a missing or malformed file is an error.
    pub fn from_yaml_file(path: &str) -> Result<Self, StepError> {
        let content = std::fs::read_to_string(path).map_err(|source| StepError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> StepConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match StepConfig::from_yaml_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!(path = config_path, error = %e, "using default config");
            StepConfig::default()
        }
    }
}
