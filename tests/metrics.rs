use engagement_metrics::metrics::raw_score;
use engagement_metrics::{analyze_cohort, round2, CohortNormalizer, Counters, Rates};

#[test]
fn rates_are_percentages_of_views() {
    let rates = Rates::compute(&Counters::new(1_000, 50, 10, 5));

    assert!((rates.like_rate - 5.0).abs() < 1e-6);
    assert!((rates.retweet_rate - 1.0).abs() < 1e-6);
    assert!((rates.reply_rate - 0.5).abs() < 1e-6);
    assert!((rates.engagement_rate - 6.5).abs() < 1e-6);
}

#[test]
fn unviewed_posts_have_zero_rates_and_score() {
    let rates = Rates::compute(&Counters::new(0, 40, 12, 3));

    assert_eq!(rates, Rates::default());
    assert_eq!(rates.raw_score(), 0.0);
}

#[test]
fn engagement_is_sum_of_rounded_components() {
    let rates = Rates::compute(&Counters::new(3, 1, 1, 1));

    assert!((rates.like_rate - 33.33).abs() < 1e-6);
    assert!((rates.engagement_rate - 99.99).abs() < 1e-6);
    assert!((Rates::exact(&Counters::new(3, 1, 1, 1)).engagement_rate - 100.0).abs() < 1e-6);
}

#[test]
fn raw_score_weights_conversation_over_likes() {
    let liked = raw_score(10.0, 0.0, 0.0);
    let shared = raw_score(0.0, 10.0, 0.0);
    let discussed = raw_score(0.0, 0.0, 10.0);

    assert!((liked - 2.0).abs() < 1e-6);
    assert!((shared - 4.0).abs() < 1e-6);
    assert!((discussed - 4.0).abs() < 1e-6);
}

#[test]
fn normalized_scores_average_to_one() {
    let normalized = CohortNormalizer.normalize(&[2.0, 4.0, 6.0, 8.0]);
    let mean = normalized.iter().sum::<f64>() / normalized.len() as f64;

    assert!((mean - 1.0).abs() < 1e-6);
    assert!((normalized[0] - 0.4).abs() < 1e-6);
    assert!((normalized[3] - 1.6).abs() < 1e-6);
}

#[test]
fn cohort_without_engagement_normalizes_to_zero() {
    let metrics = analyze_cohort(&[Counters::new(100, 0, 0, 0), Counters::new(0, 5, 0, 0)]);

    assert_eq!(metrics.len(), 2);
    assert!(metrics.iter().all(|metric| metric.normalized_score == 0.0));
}

#[test]
fn cohort_keeps_input_order() {
    let cohort = [
        Counters::new(100, 10, 0, 0),
        Counters::new(100, 0, 10, 0),
        Counters::new(100, 0, 0, 0),
    ];
    let metrics = analyze_cohort(&cohort);

    // raw scores 2.0, 4.0, 0.0 with mean 2.0
    assert!((metrics[0].raw_score - 2.0).abs() < 1e-6);
    assert!((metrics[0].normalized_score - 1.0).abs() < 1e-6);
    assert!((metrics[1].normalized_score - 2.0).abs() < 1e-6);
    assert_eq!(metrics[2].normalized_score, 0.0);
    assert_eq!(metrics[1].counters, cohort[1]);
}

#[test]
fn rates_may_exceed_one_hundred() {
    let rates = Rates::compute(&Counters::new(10, 25, 0, 0));

    assert!((rates.like_rate - 250.0).abs() < 1e-6);
    assert_eq!(round2(rates.raw_score()), 50.0);
}
