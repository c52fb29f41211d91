//! Config command for roomtrack.
//!
//! Shows the effective configuration after the full precedence chain and
//! lists any values the tracker would replace with defaults.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::FailOpen;

/// Options for the config command.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// A single invalid config value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProblem {
    pub key: String,
    pub problem: String,
}

/// Output format for the config command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// The effective configuration.
    pub config: Config,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<ConfigProblem>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The config command implementation.
pub struct ConfigCommand {
    config: Config,
}

impl ConfigCommand {
    /// Create a new config command for an already loaded configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the config command.
    pub fn run(&self) -> ConfigOutput {
        let problems: Vec<ConfigProblem> = self
            .config
            .validate()
            .into_iter()
            .map(|(key, problem)| ConfigProblem { key, problem })
            .collect();

        ConfigOutput {
            success: problems.is_empty(),
            config: self.config.clone(),
            problems,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ConfigOutput, options: &ConfigOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let mut text = output.config.to_toml().fail_open_default("rendering config");
        if !output.problems.is_empty() {
            text.push_str("\n# Invalid values (defaults will be used):\n");
            for problem in &output.problems {
                text.push_str(&format!("#   {}: {}\n", problem.key, problem.problem));
            }
        }
        text
    }
}
