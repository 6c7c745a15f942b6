//! Gyro activity heuristics for identifying ground tests
//!
//! A log recorded while the craft sat on the bench shows almost no gyro
//! movement. These helpers let callers flag such logs without discarding them.

use crate::types::GyroSample;

/// Fewest samples the variance check trusts
pub const MIN_SAMPLES_FOR_ANALYSIS: usize = 15;
/// Raw-unit variance below which every axis counts as still
pub const VERY_LOW_GYRO_VARIANCE_THRESHOLD: f64 = 0.3;

/// Analyzes gyro variance to detect ground tests vs actual flight
///
/// # Returns
/// Tuple of (is_minimal_movement, max_variance_value). Too few samples is
/// never reported as minimal.
pub fn has_minimal_gyro_activity(samples: &[GyroSample]) -> (bool, f64) {
    if samples.len() < MIN_SAMPLES_FOR_ANALYSIS {
        return (false, 0.0);
    }

    let gyro_x_values: Vec<f64> = samples.iter().map(|s| s.gyro_x_raw as f64).collect();
    let gyro_y_values: Vec<f64> = samples.iter().map(|s| s.gyro_y_raw as f64).collect();
    let gyro_z_values: Vec<f64> = samples.iter().map(|s| s.gyro_z_raw as f64).collect();

    let variance_x = calculate_variance(&gyro_x_values);
    let variance_y = calculate_variance(&gyro_y_values);
    let variance_z = calculate_variance(&gyro_z_values);

    // only minimal when every axis is still
    let max_variance = variance_x.max(variance_y).max(variance_z);
    (max_variance < VERY_LOW_GYRO_VARIANCE_THRESHOLD, max_variance)
}

/// Population variance of a dataset; 0 for fewer than two values
pub fn calculate_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64
}
