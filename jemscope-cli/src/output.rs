//! Output formatting for the jemscope CLI.

use crate::cli::OutputFormat;
use colored::*;
use jemscope::diagnostics::DiagnosticSink;
use jemscope::{
    Address, Diagnostic, DiagnosticKind, HeapInfo, Layout, LayoutProvider, Run, RunId, Snapshot,
    SnapshotStats,
};
use serde::Serialize;

/// Format a header line
pub fn header(text: &str) -> String {
    format!("{} {}", "jemscope".cyan().bold(), text)
}

fn hex(address: Address) -> String {
    format!("{:#x}", address)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Prints JE diagnostics to stderr, rustc style.
pub struct TerminalSink;

impl DiagnosticSink for TerminalSink {
    fn emit(&self, diag: &Diagnostic, context: Option<&str>) {
        let kind = match diag.kind {
            DiagnosticKind::Error => "error".red().bold(),
            DiagnosticKind::Warning => "warning".yellow().bold(),
            DiagnosticKind::Note => "note".cyan().bold(),
            DiagnosticKind::Help => "help".green().bold(),
        };

        eprintln!("{}[{}]: {}", kind, diag.code.bold(), diag.message);
        if let Some(context) = context {
            eprintln!("   {} {}", "-->".blue().bold(), context);
        }
        if let Some(note) = diag.note {
            eprintln!("   {} {}: {}", "=".blue().bold(), "note".bold(), note);
        }
        if let Some(help) = diag.help {
            eprintln!("   {} {}: {}", "=".blue().bold(), "help".green().bold(), help);
        }
    }
}

// =============================================================================
// JSON rows
// =============================================================================

#[derive(Debug, Serialize)]
struct InfoRow {
    address: String,
    chunk: Option<String>,
    run: Option<String>,
    run_size: Option<u64>,
    bin_id: Option<usize>,
    region: Option<String>,
    region_size: Option<u64>,
    free: Option<bool>,
}

impl From<&HeapInfo> for InfoRow {
    fn from(info: &HeapInfo) -> Self {
        Self {
            address: hex(info.address),
            chunk: info.chunk.map(|c| hex(c.address)),
            run: info.run.map(|r| hex(r.address)),
            run_size: info.run.map(|r| r.size),
            bin_id: info.run.and_then(|r| r.bin_id),
            region: info.region.map(|r| hex(r.address)),
            region_size: info.region.map(|r| r.size),
            free: info.region.map(|r| r.is_free),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChunkRow {
    address: String,
    arena: Option<String>,
    size: u64,
    runs: usize,
}

#[derive(Debug, Serialize)]
struct RunRow {
    header: String,
    address: String,
    size: u64,
    bin_id: Option<usize>,
    regions: usize,
    free_count: u32,
    free_bits: usize,
}

impl From<&Run> for RunRow {
    fn from(run: &Run) -> Self {
        Self {
            header: hex(run.header_address),
            address: hex(run.address),
            size: run.size,
            bin_id: run.bin_id,
            regions: run.regions.len(),
            free_count: run.free_count,
            free_bits: run.free_bits(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ArenaRow {
    index: usize,
    address: String,
    threads: Vec<u32>,
    current_runs: Vec<(usize, String)>,
}

#[derive(Debug, Serialize)]
struct TcacheBinRow {
    index: usize,
    low_water: i32,
    fill_divisor: u32,
    cached: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ThreadRow {
    thread_id: u32,
    arena: Option<String>,
    tcache: Option<String>,
    bins: Vec<TcacheBinRow>,
}

#[derive(Debug, Serialize)]
struct StatsRow {
    generation: u64,
    chunks: usize,
    orphan_chunks: usize,
    small_runs: usize,
    large_runs: usize,
    large_bytes: u64,
    free_regions: usize,
    used_regions: usize,
    free_bytes: u64,
    used_bytes: u64,
    inconsistent_runs: usize,
    arenas: usize,
    threads_with_tcache: usize,
    threads_without_tcache: usize,
}

impl From<&SnapshotStats> for StatsRow {
    fn from(stats: &SnapshotStats) -> Self {
        Self {
            generation: stats.generation,
            chunks: stats.chunk_count,
            orphan_chunks: stats.orphan_chunk_count,
            small_runs: stats.small_run_count,
            large_runs: stats.large_run_count,
            large_bytes: stats.large_bytes,
            free_regions: stats.free_regions,
            used_regions: stats.used_regions,
            free_bytes: stats.free_bytes,
            used_bytes: stats.used_bytes,
            inconsistent_runs: stats.inconsistent_runs,
            arenas: stats.arena_count,
            threads_with_tcache: stats.threads_with_tcache,
            threads_without_tcache: stats.threads_without_tcache,
        }
    }
}

#[derive(Debug, Serialize)]
struct LayoutRow {
    id: String,
    pointer_width: u64,
    key_slots: usize,
}

// =============================================================================
// Commands
// =============================================================================

pub fn print_info(infos: &[HeapInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<InfoRow> = infos.iter().map(InfoRow::from).collect();
            print_json(&rows);
        }
        OutputFormat::Terminal => {
            for info in infos {
                if info.is_heap() {
                    print!("{}", info);
                } else {
                    println!("{:#x}: {}", info.address, "not in a known chunk".dimmed());
                }
            }
        }
    }
}

pub fn print_chunks(snapshot: &Snapshot, format: OutputFormat) {
    let rows: Vec<ChunkRow> = snapshot
        .chunks()
        .iter()
        .map(|chunk| ChunkRow {
            address: hex(chunk.address),
            arena: chunk.arena.map(hex),
            size: chunk.size,
            runs: chunk.runs.len(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Terminal => {
            println!("{}", header(&format!("{} chunks", rows.len())));
            for row in &rows {
                let arena = match &row.arena {
                    Some(arena) => arena.normal(),
                    None => "orphan".yellow(),
                };
                println!("  {:>18}  arena {:<18}  {:>4} runs", row.address, arena, row.runs);
            }
        }
    }
}

pub fn print_runs(snapshot: &Snapshot, chunk: Option<Address>, format: OutputFormat) {
    let runs: Vec<&Run> = match chunk {
        Some(address) => snapshot
            .chunks()
            .iter()
            .filter(|c| c.address == address)
            .flat_map(|c| snapshot.runs_of(c))
            .collect(),
        None => snapshot.runs().iter().collect(),
    };
    let rows: Vec<RunRow> = runs.into_iter().map(RunRow::from).collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Terminal => {
            println!("{}", header(&format!("{} runs", rows.len())));
            for row in &rows {
                let kind = match row.bin_id {
                    Some(bin) => format!("bin {:<3}", bin),
                    None => "large  ".to_string(),
                };
                let mut line = format!(
                    "  {:>18}  {}  {:#8x}  {:>4} regions  {:>4} free",
                    row.address, kind, row.size, row.regions, row.free_count
                );
                if row.bin_id.is_some() && row.free_bits != row.free_count as usize {
                    line.push_str(&format!("  ({} in bitmap)", row.free_bits).red().to_string());
                }
                println!("{}", line);
            }
        }
    }
}

pub fn print_arenas(snapshot: &Snapshot, format: OutputFormat) {
    let rows: Vec<ArenaRow> = snapshot
        .arenas()
        .iter()
        .map(|arena| ArenaRow {
            index: arena.index,
            address: hex(arena.address),
            threads: arena.thread_ids.iter().copied().collect(),
            current_runs: arena
                .bins
                .iter()
                .filter_map(|bin| {
                    let run = snapshot.run(bin.current_run?)?;
                    Some((bin.index, hex(run.address)))
                })
                .collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Terminal => {
            println!("{}", header(&format!("{} arenas", rows.len())));
            for row in &rows {
                println!(
                    "  arena {} at {}  threads {:?}",
                    row.index.to_string().bold(),
                    row.address,
                    row.threads
                );
                for (bin, run) in &row.current_runs {
                    println!("    bin {:<3} current run {}", bin, run);
                }
            }
        }
    }
}

pub fn print_tcaches(snapshot: &Snapshot, format: OutputFormat) {
    let rows: Vec<ThreadRow> = snapshot
        .threads()
        .iter()
        .map(|thread| ThreadRow {
            thread_id: thread.thread_id,
            arena: thread.arena.map(hex),
            tcache: thread.tcache.as_ref().map(|t| hex(t.address)),
            bins: thread
                .tcache
                .iter()
                .flat_map(|t| t.bins.iter())
                .filter(|bin| !bin.cached().is_empty())
                .map(|bin| TcacheBinRow {
                    index: bin.index,
                    low_water: bin.low_water,
                    fill_divisor: bin.fill_divisor,
                    cached: bin.cached().iter().copied().map(hex).collect(),
                })
                .collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Terminal => {
            println!("{}", header(&format!("{} threads", rows.len())));
            for row in &rows {
                let tcache = match &row.tcache {
                    Some(tcache) => tcache.normal(),
                    None => "no tcache".dimmed(),
                };
                println!("  tid {:<8} {}", row.thread_id.to_string().bold(), tcache);
                for bin in &row.bins {
                    println!(
                        "    bin {:<3} low water {:<3} cached {}",
                        bin.index,
                        bin.low_water,
                        bin.cached.join(" ")
                    );
                }
            }
        }
    }
}

pub fn print_stats(stats: &SnapshotStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsRow::from(stats)),
        OutputFormat::Terminal => print!("{}", stats),
    }
}

pub fn print_verify(snapshot: &Snapshot, inconsistent: &[RunId], format: OutputFormat) {
    let rows: Vec<RunRow> = inconsistent
        .iter()
        .filter_map(|&id| snapshot.run(id))
        .map(RunRow::from)
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Terminal => {
            if rows.is_empty() {
                println!("{} all {} runs consistent", "ok:".green().bold(), snapshot.runs().len());
                return;
            }
            for row in &rows {
                println!(
                    "{} run {} stores {} free, bitmap has {}",
                    "mismatch:".red().bold(),
                    row.address,
                    row.free_count,
                    row.free_bits
                );
            }
        }
    }
}

pub fn print_layouts(provider: &dyn LayoutProvider, format: OutputFormat) {
    let rows: Vec<LayoutRow> = provider
        .available()
        .into_iter()
        .filter_map(|id| provider.layout(id))
        .map(|layout: Layout| LayoutRow {
            id: layout.id().to_string(),
            pointer_width: layout.bits().pointer_width(),
            key_slots: layout.key_slots(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Terminal => {
            println!("{}", header("built-in layouts"));
            for row in &rows {
                println!("  {:<16} {}-byte pointers, {} TLS key slots", row.id, row.pointer_width, row.key_slots);
            }
        }
    }
}
