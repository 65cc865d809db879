//! Text summary builder for CLI output.
//!
//! Formats the analysis result into human-readable lines for text mode.

use crate::metrics;
use crate::model::{AnalysisResponse, HealthStatus};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a completed analysis.
pub(crate) fn build_text_summary(result: &AnalysisResponse, health: HealthStatus) -> TextSummary {
    let mut lines = Vec::new();
    let summary = &result.chart_data.summary;

    lines.push(format!("Engine: {}", health.label()));
    lines.push(format!(
        "Plant: {} ({} turbines, rated {} MW each)",
        summary.plant_name, summary.total_turbines, summary.rated_power_mw
    ));
    lines.push(format!("Mode: {}", result.mode.description()));
    lines.push(format!(
        "AEP: {} GWh (uncertainty {}, {} iterations)",
        result.aep_gwh, result.uncertainty, summary.num_simulations
    ));
    lines.push(format!(
        "Avg capacity factor: {}  Avg availability: {}",
        metrics::percent(summary.avg_capacity_factor),
        metrics::percent(summary.avg_availability)
    ));

    if let Some((mean, median, p25, p75)) =
        metrics::compute_distribution_metrics(&result.chart_data.aep_distribution)
    {
        lines.push(format!(
            "AEP distribution: avg {:.2} med {:.2} p25 {:.2} p75 {:.2} GWh",
            mean, median, p25, p75
        ));
    }
    if let Some(ratio) = metrics::performance_ratio(&result.chart_data.monthly_production) {
        lines.push(format!("Actual vs expected production: {}", metrics::percent(ratio)));
    }

    if !result.chart_data.turbine_comparison.is_empty() {
        lines.push(format!(
            "{:<12} {:>8} {:>8} {:>14}",
            "Turbine", "CF", "Avail", "Energy (MWh)"
        ));
        for t in &result.chart_data.turbine_comparison {
            lines.push(format!(
                "{:<12} {:>8} {:>8} {:>14.1}",
                t.turbine_id,
                metrics::percent(t.capacity_factor),
                metrics::percent(t.availability),
                t.annual_energy_mwh
            ));
        }
    }

    if let Some(note) = result.debug_note.as_deref() {
        if !note.trim().is_empty() {
            lines.push(format!("Note: {note}"));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_response;

    #[test]
    fn summary_covers_cards_and_turbines() {
        let summary = build_text_summary(&sample_response(), HealthStatus::Connected);
        let text = summary.lines.join("\n");
        assert!(text.contains("Engine: Engine Connected"));
        assert!(text.contains("AEP: 12.3 GWh (uncertainty ±4.2%, 50 iterations)"));
        assert!(text.contains("Mode: Simulation fallback mode"));
        assert!(text.contains("Avg capacity factor: 33.0%"));
        assert!(text.contains("R80790"));
        assert!(!text.contains("Note:"));
    }

    #[test]
    fn debug_note_is_appended() {
        let mut r = sample_response();
        r.debug_note = Some("OpenOA import failed".into());
        let summary = build_text_summary(&r, HealthStatus::Disconnected);
        assert_eq!(
            summary.lines.last().map(String::as_str),
            Some("Note: OpenOA import failed")
        );
    }
}
