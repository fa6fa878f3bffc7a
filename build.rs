//! Build script for jemscope.
//!
//! Reports the enabled features and a few hints for users wiring the
//! inspector into their own tooling.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");
    println!("cargo:rerun-if-env-changed=JEMSCOPE_QUIET_BUILD");

    if env::var("JEMSCOPE_QUIET_BUILD").is_ok() {
        return;
    }

    let parking_lot_enabled = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // Feature-specific diagnostics
    // =========================================================================

    if parking_lot_enabled {
        emit_info("Using parking_lot for snapshot publication");
    }

    if log_enabled {
        emit_info("log integration enabled");
        emit_note("JE diagnostics are forwarded to the log crate:");
        emit_note("  errors -> error!, warnings -> warn!, notes -> debug!");
    }

    if is_release && !diagnostics_enabled && !log_enabled {
        emit_warning("Release build without 'diagnostics' or 'log'");
        emit_note("Skipped chunks, runs and threads will not be reported unless a sink is installed:");
        emit_note("  jemscope::diagnostics::set_sink(Arc::new(CollectingSink::new()));");
    }

    // =========================================================================
    // Environment checks
    // =========================================================================

    check_target();
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[jemscope] ℹ️  {}", msg);
}

fn emit_note(msg: &str) {
    if msg.is_empty() {
        println!("cargo:warning=[jemscope]");
    } else {
        println!("cargo:warning=[jemscope]    {}", msg);
    }
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[jemscope] ⚠️  {}", msg);
}

// =============================================================================
// Environment checks
// =============================================================================

fn check_target() {
    let endian = env::var("CARGO_CFG_TARGET_ENDIAN").unwrap_or_default();
    if endian == "big" {
        emit_warning("Big-endian host detected");
        emit_note("Dumps are decoded as little-endian regardless of the host.");
    }

    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("wasm") {
        emit_warning("WebAssembly target detected");
        emit_note("Only MemoryImage-backed inspection is available; there is no process to attach to.");
    }
}
