//! Tracing subscriber setup.
//!
//! Filter priority: `WIND_AEP_LOG`, then `RUST_LOG`, then `--verbose`
//! (debug for this crate) or the default `warn`. The TUI owns the terminal,
//! so in TUI mode logs go to a file in the user cache directory instead of
//! stderr.

use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File,
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    if let Ok(directives) = std::env::var("WIND_AEP_LOG") {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = if verbose {
        "warn,wind_aep_dashboard=debug"
    } else {
        "warn"
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = crate::storage::log_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("dashboard.log"))
        .ok()
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(sink: LogSink, verbose: bool) {
    let filter = build_env_filter(verbose);
    let res = match sink {
        LogSink::Stderr => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(use_ansi)
                        .with_target(false)
                        .without_time()
                        .compact(),
                )
                .try_init()
        }
        LogSink::File => match open_log_file() {
            Some(file) => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true),
                )
                .try_init(),
            // No writable cache dir: run without logs rather than scribble over the UI.
            None => Ok(()),
        },
    };
    if let Err(e) = res {
        // The alternate screen is not up yet, so stderr is still safe here.
        eprintln!("wind-aep-dashboard: logging disabled: {e}");
    }
}
