//! Configuration for the jemscope CLI.
//!
//! Loads settings from `jemscope.toml` next to the dump manifest or in the
//! current directory.

use crate::cli::{Args, OutputFormat};
use anyhow::{Context, Result};
use jemscope::InspectConfig;
use serde::{Deserialize, Serialize};

/// Configuration loaded from `jemscope.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inspector settings
    pub inspect: InspectSection,

    /// Output settings
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectSection {
    /// Queries between automatic rescans
    pub refresh_threshold: u64,

    /// Rescan arenas and thread caches too
    pub deep_refresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// "terminal" or "json"
    pub format: String,
}

impl Default for InspectSection {
    fn default() -> Self {
        let defaults = InspectConfig::default();
        Self {
            refresh_threshold: defaults.refresh_threshold,
            deep_refresh: defaults.deep_refresh,
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: "terminal".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `jemscope.toml` or use defaults
    pub fn load(args: &Args) -> Result<Self> {
        if !args.config.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&args.config)
            .with_context(|| format!("reading {}", args.config.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", args.config.display()))?;
        Ok(config)
    }

    /// Inspector configuration for this run.
    pub fn inspect_config(&self) -> InspectConfig {
        InspectConfig::default()
            .with_refresh_threshold(self.inspect.refresh_threshold)
            .with_deep_refresh(self.inspect.deep_refresh)
    }

    /// Output format, with `--format` taking precedence.
    pub fn output_format(&self, args: &Args) -> OutputFormat {
        args.format
            .or_else(|| OutputFormat::parse(&self.output.format))
            .unwrap_or(OutputFormat::Terminal)
    }
}

/// Generate a default `jemscope.toml` configuration file
pub fn generate_default_config() -> String {
    r#"# jemscope configuration

[inspect]
# Queries between automatic rescans of chunks and runs
refresh_threshold = 1000

# Rescan arenas and thread caches as well
deep_refresh = false

[output]
# "terminal" or "json"
format = "terminal"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.inspect.refresh_threshold, 1000);
        assert!(!config.inspect.deep_refresh);
        assert_eq!(config.output.format, "terminal");
    }

    #[test]
    fn test_partial_config_and_overrides() {
        let config: Config = toml::from_str(
            "[inspect]\nrefresh_threshold = 8\nkey_slot_limit = 8\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();
        let inspect = config.inspect_config();
        assert_eq!(inspect.refresh_threshold, 8);
        assert!(!inspect.deep_refresh);
        // The platform key-slot bound cannot be changed from a config file.
        assert_eq!(inspect.key_slot_limit, None);

        let args = Args::parse_from(["jemscope", "stats"]);
        assert_eq!(config.output_format(&args), OutputFormat::Json);

        let args = Args::parse_from(["jemscope", "stats", "--format", "terminal"]);
        assert_eq!(config.output_format(&args), OutputFormat::Terminal);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jemscope.toml");
        let args = Args::parse_from(["jemscope", "--config", path.to_str().unwrap(), "stats"]);
        let config = Config::load(&args).unwrap();
        assert_eq!(config.output.format, "terminal");

        std::fs::write(&path, "[inspect]\ndeep_refresh = true\n").unwrap();
        let config = Config::load(&args).unwrap();
        assert!(config.inspect_config().deep_refresh);
    }
}
