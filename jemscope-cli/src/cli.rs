//! Command-line interface for jemscope.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jemscope",
    about = "Rebuild a jemalloc heap from a captured memory dump",
    version,
    after_help = "EXAMPLES:
    jemscope -m dump.toml info 0x7f00123450   Classify an address
    jemscope -m dump.toml runs --chunk 0x7f00000000
    jemscope -m dump.toml stats --format json
    jemscope -m dump.toml verify --strict     Fail on any skipped entity
    jemscope layouts                          List built-in layout tables"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Dump manifest (pointer width, symbols, segments)
    #[arg(long, short = 'm', default_value = "dump.toml", global = true)]
    pub manifest: PathBuf,

    /// Configuration file path
    #[arg(long, default_value = "jemscope.toml", global = true)]
    pub config: PathBuf,

    /// Output format (overrides the configuration file)
    #[arg(long, short = 'f', value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Only decode chunks and runs; skip arenas and thread caches
    #[arg(long, global = true)]
    pub shallow: bool,

    /// Treat JE errors as fatal
    #[arg(long, global = true)]
    pub strict: bool,

    /// Do not print JE diagnostics
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Classify one or more addresses
    Info {
        /// Addresses, hex (0x...) or decimal
        #[arg(required = true, value_parser = parse_address)]
        addresses: Vec<u64>,
    },

    /// List discovered chunks
    Chunks,

    /// List decoded runs
    Runs {
        /// Only runs of the chunk at this address
        #[arg(long, value_parser = parse_address)]
        chunk: Option<u64>,
    },

    /// List arenas and their bins' current runs
    Arenas,

    /// List threads and their caches
    Tcaches,

    /// Print snapshot statistics
    Stats,

    /// Check run free counters against their bitmaps
    Verify,

    /// List built-in layout tables
    Layouts,

    /// Create a jemscope.toml configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    /// Whether the command needs arenas and thread caches.
    pub fn needs_deep_parse(&self) -> bool {
        matches!(self, Command::Arenas | Command::Tcaches | Command::Stats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Terminal,
    /// One JSON document
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "terminal" => Some(OutputFormat::Terminal),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Parse `0x`-prefixed hex or decimal.
pub fn parse_address(value: &str) -> Result<u64, String> {
    let value = value.trim().replace('_', "");
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x70_0000_1000"), Ok(0x70_0000_1000));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn test_subcommand_arguments() {
        let args = Args::parse_from([
            "jemscope", "-m", "core.toml", "info", "0x10", "32", "--format", "json",
        ]);
        assert_eq!(args.manifest, PathBuf::from("core.toml"));
        assert_eq!(args.format, Some(OutputFormat::Json));
        match args.command {
            Command::Info { addresses } => assert_eq!(addresses, vec![0x10, 32]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_runs_chunk_filter() {
        let args = Args::parse_from(["jemscope", "runs", "--chunk", "0x7000000000"]);
        assert!(matches!(args.command, Command::Runs { chunk: Some(0x70_0000_0000) }));
        assert!(!args.command.needs_deep_parse());
    }
}
