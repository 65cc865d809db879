mod cli;
mod engine;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.json || args.text || cfg!(not(feature = "tui"));

    let sink = if is_headless {
        logging::LogSink::Stderr
    } else {
        logging::LogSink::File
    };
    logging::init(sink, args.verbose);

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success for one-shot modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "exiting with error");
            Err(e)
        }
    }
}
