use crate::model::{AepDistributionBin, MonthlyProduction};

/// Compute (mean, median, p25, p75) of an AEP histogram, placing every
/// sample at its bin midpoint.
pub fn compute_distribution_metrics(bins: &[AepDistributionBin]) -> Option<(f64, f64, f64, f64)> {
    let total: u64 = bins.iter().map(|b| b.count).sum();
    if total == 0 {
        return None;
    }
    let mut sorted: Vec<&AepDistributionBin> = bins.iter().filter(|b| b.count > 0).collect();
    sorted.sort_by(|a, b| {
        a.bin_start
            .partial_cmp(&b.bin_start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mean = sorted
        .iter()
        .map(|b| b.midpoint() * b.count as f64)
        .sum::<f64>()
        / total as f64;

    // Sample at rank `idx` (0-based), same indexing as a sorted sample vector.
    let at_rank = |idx: u64| -> f64 {
        let mut seen = 0u64;
        for b in &sorted {
            seen += b.count;
            if idx < seen {
                return b.midpoint();
            }
        }
        sorted.last().map(|b| b.midpoint()).unwrap_or(f64::NAN)
    };
    Some((mean, at_rank(total / 2), at_rank(total / 4), at_rank(3 * total / 4)))
}

/// Actual over expected energy across all months, if anything was expected.
pub fn performance_ratio(months: &[MonthlyProduction]) -> Option<f64> {
    let expected: f64 = months.iter().map(|m| m.expected_gwh).sum();
    if expected <= 0.0 {
        return None;
    }
    let actual: f64 = months.iter().map(|m| m.actual_gwh).sum();
    Some(actual / expected)
}

/// Format a 0..1 fraction as a percentage with one decimal.
pub fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}
