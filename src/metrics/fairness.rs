/*!
 * Fairness Metrics
 * Jain's index, Gini coefficient, and starvation detection over waiting times
 */

use crate::core::types::Tick;

/// Jain's fairness index `(Σw)² / (n·Σw²)`. Ranges (0, 1]; 1.0 means every
/// task waited equally. An all-zero sample is perfectly fair.
#[must_use]
pub fn jain_index(values: &[Tick]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let sum_sq: f64 = values.iter().map(|&v| (v as f64) * (v as f64)).sum();
    if sum_sq == 0.0 {
        return 1.0;
    }
    (sum * sum) / (values.len() as f64 * sum_sq)
}

/// Gini coefficient over a sample. 0.0 is perfect equality; values near 1.0
/// mean a few tasks absorbed nearly all the waiting.
#[must_use]
pub fn gini_coefficient(values: &[Tick]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = values.iter().map(|&v| v as f64).sum();
    if total == 0.0 {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("waiting times are finite"));

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &v)| (2.0 * (i as f64 + 1.0) - n as f64 - 1.0) * v)
        .sum();
    weighted / (n as f64 * total)
}

/// A task starves when its waiting time exceeds `multiple` times the mean
#[must_use]
pub fn starvation_detected(values: &[Tick], multiple: f64) -> bool {
    if values.is_empty() {
        return false;
    }
    let mean: f64 = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return false;
    }
    values.iter().any(|&v| v as f64 > multiple * mean)
}
