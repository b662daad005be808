use crate::round2;

/// Rescales raw scores against the mean of their cohort.
///
/// Scores are only comparable inside one cohort: one account, one
/// synchronization run. A zero (or empty) mean maps every score to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortNormalizer;

impl CohortNormalizer {
    pub fn mean(raw_scores: &[f64]) -> f64 {
        if raw_scores.is_empty() {
            return 0.0;
        }
        raw_scores.iter().sum::<f64>() / raw_scores.len() as f64
    }

    pub fn normalize(&self, raw_scores: &[f64]) -> Vec<f64> {
        let mean = Self::mean(raw_scores);
        if mean <= 0.0 || !mean.is_finite() {
            return vec![0.0; raw_scores.len()];
        }
        raw_scores
            .iter()
            .map(|raw| round2(raw / mean))
            .collect()
    }
}
