use serde::{Deserialize, Serialize};

use crate::round2;

/// Weight of the retweet rate in the raw score.
pub const RETWEET_WEIGHT: f64 = 0.4;
/// Weight of the reply rate in the raw score.
pub const REPLY_WEIGHT: f64 = 0.4;
/// Weight of the like rate in the raw score.
pub const LIKE_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
}

impl Counters {
    pub fn new(views: u64, likes: u64, retweets: u64, replies: u64) -> Self {
        Self {
            views,
            likes,
            retweets,
            replies,
        }
    }
}

/// Per-post rates, in percent of views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub like_rate: f64,
    pub retweet_rate: f64,
    pub reply_rate: f64,
    pub engagement_rate: f64,
}

impl Rates {
    /// Unrounded rates. `engagement_rate` is the plain sum of the other three.
    pub fn exact(counters: &Counters) -> Self {
        if counters.views == 0 {
            return Rates::default();
        }
        let views = counters.views as f64;
        let like_rate = percent(counters.likes, views);
        let retweet_rate = percent(counters.retweets, views);
        let reply_rate = percent(counters.replies, views);
        Self {
            like_rate,
            retweet_rate,
            reply_rate,
            engagement_rate: like_rate + retweet_rate + reply_rate,
        }
    }

    /// Stored rates: each component rounded to cents, then summed.
    ///
    /// Components are rounded in integer arithmetic, so exact half cents
    /// always round up. The outer rounding on the sum only removes floating
    /// point noise.
    pub fn compute(counters: &Counters) -> Self {
        if counters.views == 0 {
            return Rates::default();
        }
        let like_rate = percent_cents(counters.likes, counters.views);
        let retweet_rate = percent_cents(counters.retweets, counters.views);
        let reply_rate = percent_cents(counters.replies, counters.views);
        Self {
            like_rate,
            retweet_rate,
            reply_rate,
            engagement_rate: round2(like_rate + retweet_rate + reply_rate),
        }
    }

    pub fn raw_score(&self) -> f64 {
        raw_score(self.like_rate, self.retweet_rate, self.reply_rate)
    }
}

pub fn raw_score(like_rate: f64, retweet_rate: f64, reply_rate: f64) -> f64 {
    round2(RETWEET_WEIGHT * retweet_rate + REPLY_WEIGHT * reply_rate + LIKE_WEIGHT * like_rate)
}

fn percent(count: u64, views: f64) -> f64 {
    (count as f64 / views) * 100.0
}

/// `count / views` in percent, rounded half up to two decimals. `views > 0`.
fn percent_cents(count: u64, views: u64) -> f64 {
    let views = u128::from(views);
    let hundredths = (2 * 10_000 * u128::from(count) + views) / (2 * views);
    hundredths as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_views_yield_zero_rates() {
        let rates = Rates::compute(&Counters::new(0, 12, 4, 9));
        assert_eq!(rates, Rates::default());
        assert_eq!(rates.raw_score(), 0.0);
    }

    #[test]
    fn rates_are_percent_of_views() {
        let rates = Rates::compute(&Counters::new(200, 10, 4, 2));
        assert_eq!(rates.like_rate, 5.0);
        assert_eq!(rates.retweet_rate, 2.0);
        assert_eq!(rates.reply_rate, 1.0);
        assert_eq!(rates.engagement_rate, 8.0);
    }

    #[test]
    fn engagement_is_sum_of_rounded_components() {
        let counters = Counters::new(3, 1, 1, 1);
        let exact = Rates::exact(&counters);
        assert!(
            (exact.engagement_rate - (exact.like_rate + exact.retweet_rate + exact.reply_rate))
                .abs()
                < 1e-12
        );

        let stored = Rates::compute(&counters);
        assert_eq!(stored.like_rate, 33.33);
        assert_eq!(stored.engagement_rate, 99.99);
        assert_eq!(round2(exact.engagement_rate), 100.0);
    }

    #[test]
    fn raw_score_uses_fixed_weights() {
        assert_eq!(raw_score(10.0, 10.0, 10.0), 10.0);
        assert_eq!(raw_score(5.0, 0.0, 0.0), 1.0);
        assert_eq!(raw_score(0.0, 2.5, 0.0), 1.0);
        assert_eq!(raw_score(0.0, 0.0, 2.5), 1.0);
    }

    #[test]
    fn half_cents_round_up() {
        let rates = Rates::compute(&Counters::new(20_000, 201, 0, 0));
        assert_eq!(rates.like_rate, 1.01);
        assert_eq!(rates.engagement_rate, 1.01);

        let rates = Rates::compute(&Counters::new(20_000, 0, 1, 3));
        assert_eq!(rates.retweet_rate, 0.01);
        assert_eq!(rates.reply_rate, 0.02);
    }

    #[test]
    fn rates_may_exceed_one_hundred() {
        let rates = Rates::compute(&Counters::new(10, 30, 0, 0));
        assert_eq!(rates.like_rate, 300.0);
    }
}
