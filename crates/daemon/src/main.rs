// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maestro Daemon (maestrod)
//!
//! Orchestrator process: owns the worker pool, the bridge endpoint, and
//! the event bus, and exposes the Task API to host sessions.
//!
//! Exit codes: 0 normal, 1 configuration error, 2 bridge port
//! unavailable, 130 SIGINT, 143 SIGTERM.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bridge;
mod config;
mod env;
mod event_bus;
mod facade;
mod lifecycle;

use lifecycle::{LifecycleError, Paths};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

const EXIT_CONFIG: i32 = 1;
const EXIT_BRIDGE_PORT: i32 = 2;
const EXIT_SIGINT: i32 = 130;
const EXIT_SIGTERM: i32 = 143;

#[tokio::main]
async fn main() {
    // Handle info flags before any config or socket work
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("maestrod {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                println!("maestrod {}", env!("CARGO_PKG_VERSION"));
                println!("Maestro daemon - coordinates a pool of agent-runtime workers");
                println!();
                println!("USAGE:");
                println!("    maestrod");
                println!();
                println!("The daemon is typically embedded by the host session and should");
                println!("not need to be invoked directly. Configuration lives in");
                println!("maestro.toml under the state directory (MAESTRO_STATE_DIR).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: maestrod [--help | --version]");
                std::process::exit(EXIT_CONFIG);
            }
        }
    }

    let paths = match Paths::load() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    rotate_log_if_needed(&paths.log_path);

    // Append the marker synchronously, before tracing owns the file:
    // the embedding process scans for it to find where this startup
    // attempt begins, even when the daemon dies before logging is up.
    if let Err(e) = write_startup_marker(&paths.log_path) {
        eprintln!("error: cannot write to log file: {e}");
        std::process::exit(EXIT_CONFIG);
    }

    let log_guard = match setup_logging(&paths) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: cannot set up logging: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    info!("starting maestrod (pid: {})", std::process::id());

    let result = match lifecycle::startup(&paths).await {
        Ok(result) => result,
        Err(e @ LifecycleError::BridgeBind(_)) => {
            error!("failed to start: {}", e);
            eprintln!("error: {e}");
            drop(log_guard);
            std::process::exit(EXIT_BRIDGE_PORT);
        }
        Err(e) => {
            error!("failed to start: {}", e);
            eprintln!("error: {e}");
            drop(log_guard);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Signal ready for the embedding process
    println!("READY {}", result.bridge.url);

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot install SIGTERM handler: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot install SIGINT handler: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let exit_code = tokio::select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            EXIT_SIGTERM
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            EXIT_SIGINT
        }
    };

    lifecycle::shutdown(&result).await;
    info!("maestrod stopped");
    drop(log_guard);
    std::process::exit(exit_code);
}

/// Startup marker prefix; the full line is
/// `--- maestrod: starting (pid: 12345) ---`.
const STARTUP_MARKER_PREFIX: &str = "--- maestrod: starting (pid: ";

/// Append the startup marker (and a trailing blank line, so a fast
/// failure's ERROR line does not butt up against it) to the log file.
fn write_startup_marker(log_path: &std::path::Path) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(log, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (maestrod.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `maestrod.log` → `.1` → `.2` → `.3`, deleting the oldest.
/// Best-effort: rotation failures are ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = paths
        .log_path
        .parent()
        .unwrap_or(std::path::Path::new("."));
    let file = paths
        .log_path
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("maestrod.log"));
    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
