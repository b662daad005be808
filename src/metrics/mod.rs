pub mod cohort;
pub mod rates;

pub use cohort::CohortNormalizer;
pub use rates::{raw_score, Counters, Rates, LIKE_WEIGHT, REPLY_WEIGHT, RETWEET_WEIGHT};

/// Analysis of one post before cohort normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PostMetrics {
    pub counters: Counters,
    pub rates: Rates,
    pub raw_score: f64,
    pub normalized_score: f64,
}

impl PostMetrics {
    pub fn new(counters: Counters) -> Self {
        let rates = Rates::compute(&counters);
        Self {
            counters,
            raw_score: rates.raw_score(),
            rates,
            normalized_score: 0.0,
        }
    }
}

/// Computes rates and raw scores for each post, then normalizes the whole
/// cohort in one pass. Output order matches input order.
pub fn analyze_cohort(counters: &[Counters]) -> Vec<PostMetrics> {
    let mut metrics: Vec<PostMetrics> = counters.iter().copied().map(PostMetrics::new).collect();
    let raw_scores: Vec<f64> = metrics.iter().map(|metric| metric.raw_score).collect();
    let normalized = CohortNormalizer.normalize(&raw_scores);
    for (metric, score) in metrics.iter_mut().zip(normalized) {
        metric.normalized_score = score;
    }
    metrics
}
