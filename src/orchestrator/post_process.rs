//! Post-run processing utilities.
//!
//! Handles exports after a successful run.

use crate::cli::Cli;
use crate::model::AnalysisResponse;
use crate::storage;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub export_messages: Vec<String>,
}

/// Process a completed run: write the requested exports and report what happened.
pub(crate) fn process_run_completion(args: &Cli, run: &AnalysisResponse) -> ProcessedRun {
    let mut export_messages = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match storage::export_json(export_path, run) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => {
                tracing::warn!(error = ?e, path = %export_path.display(), "export failed");
                export_messages.push(format!("Export JSON failed: {e:#}"))
            }
        }
    }
    ProcessedRun { export_messages }
}
