//! jemscope: inspect a jemalloc heap in a captured memory dump
//!
//! The dump is described by a TOML manifest (pointer width, symbol
//! addresses, raw segment files). The heap is rebuilt once and the
//! requested view is printed.
//!
//! # Usage
//!
//! ```bash
//! # Where does an address live?
//! jemscope -m dump.toml info 0x7f8a41c2d0
//!
//! # Listings
//! jemscope -m dump.toml chunks
//! jemscope -m dump.toml runs --chunk 0x7f8a400000
//! jemscope -m dump.toml arenas
//! jemscope -m dump.toml tcaches
//!
//! # Summary and consistency check (exit code 1 on mismatches)
//! jemscope -m dump.toml stats --format json
//! jemscope -m dump.toml verify
//!
//! # Misc
//! jemscope layouts                  # Built-in layout tables
//! jemscope init                     # Create jemscope.toml
//! ```

mod cli;
mod config;
mod manifest;
mod output;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Command, OutputFormat};
use jemscope::diagnostics::{init_from_env, set_sink, set_strict_mode, suppress_diagnostics};
use jemscope::{BuiltinLayouts, Inspector, MemoryImage, StrictMode};

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::Config::load(&args)?;
    let format = config.output_format(&args);

    // Commands that do not need a dump
    match &args.command {
        Command::Layouts => {
            output::print_layouts(&BuiltinLayouts, format);
            return Ok(());
        }
        Command::Init { force } => {
            if args.config.exists() && !force {
                eprintln!("{} already exists. Use --force to overwrite.", args.config.display());
                std::process::exit(1);
            }
            std::fs::write(&args.config, config::generate_default_config())?;
            println!("Created {}", args.config.display());
            return Ok(());
        }
        _ => {}
    }

    init_from_env();
    if args.strict {
        set_strict_mode(StrictMode::FailOnError);
    }
    if args.quiet {
        suppress_diagnostics(true);
    } else {
        set_sink(Arc::new(output::TerminalSink));
    }

    let inspector = open(&args, &config)?;
    let deep = args.command.needs_deep_parse() || !args.shallow;
    if deep {
        inspector.parse_all()?;
    } else {
        inspector.parse()?;
    }

    run(&args.command, &inspector, format)
}

fn open(args: &Args, config: &config::Config) -> Result<Inspector<MemoryImage>> {
    let image = manifest::load_image(&args.manifest)
        .with_context(|| format!("loading dump {}", args.manifest.display()))?;

    if matches!(args.format, None | Some(OutputFormat::Terminal)) && !args.quiet {
        eprintln!(
            "{}",
            output::header(&format!(
                "{} segments, {} bytes mapped",
                image.segment_count(),
                image.mapped_bytes()
            ))
        );
    }

    let inspector = Inspector::detect(image, &BuiltinLayouts, config.inspect_config())?;
    if !inspector.is_enabled() {
        bail!("no layout table matches this dump; run `jemscope layouts` for the supported builds");
    }
    Ok(inspector)
}

fn run(command: &Command, inspector: &Inspector<MemoryImage>, format: OutputFormat) -> Result<()> {
    let snapshot = inspector.snapshot();

    match command {
        Command::Info { addresses } => {
            let infos = addresses
                .iter()
                .map(|&address| inspector.get_info(address))
                .collect::<Result<Vec<_>, _>>()?;
            output::print_info(&infos, format);
        }
        Command::Chunks => output::print_chunks(&snapshot, format),
        Command::Runs { chunk } => {
            if let Some(address) = chunk {
                if !snapshot.chunks().iter().any(|c| c.address == *address) {
                    bail!("no chunk at {:#x}", address);
                }
            }
            output::print_runs(&snapshot, *chunk, format);
        }
        Command::Arenas => output::print_arenas(&snapshot, format),
        Command::Tcaches => output::print_tcaches(&snapshot, format),
        Command::Stats => output::print_stats(&inspector.stats(), format),
        Command::Verify => {
            let inconsistent = inspector.verify();
            output::print_verify(&snapshot, &inconsistent, format);
            if !inconsistent.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Layouts | Command::Init { .. } => {}
    }

    Ok(())
}
