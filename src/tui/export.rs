use crate::model::AnalysisResponse;
use anyhow::Result;

use super::state::UiState;

/// Save the result to the default location.
pub fn save_result_json(r: &AnalysisResponse) -> Result<std::path::PathBuf> {
    crate::storage::save_result(r)
}

/// Save the displayed result (if any) and report the outcome in `state.info`.
pub fn save_and_show_path(state: &mut UiState) {
    let Some(r) = state.displayed_result() else {
        state.info = "No completed analysis to save yet.".into();
        return;
    };
    match save_result_json(&r) {
        Ok(path) => {
            state.info = format!("Saved: {}", path.display());
        }
        Err(e) => {
            tracing::warn!(error = ?e, "saving result failed");
            state.info = format!("Save failed: {e:#}");
        }
    }
}
