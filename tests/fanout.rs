mod common;

use std::time::Duration;

use common::{JPEG, Reply, estimator, reply_with_calories, scripted};
use nutrisnap::prompt::NUTRITION_INSTRUCTION;
use nutrisnap::{AttemptFailure, FanOutScheduler};

#[tokio::test]
async fn one_outcome_per_requested_sample() {
    for n in [1, 3, 8] {
        let provider = scripted(vec![Reply::Text(reply_with_calories(300))]);
        let scheduler = FanOutScheduler::new(estimator(&provider));

        let outcomes = scheduler.run(JPEG, NUTRITION_INSTRUCTION, n).await;

        assert_eq!(outcomes.len(), n);
        assert_eq!(provider.calls(), n);
        assert!(outcomes.iter().all(|o| o.is_success()));
    }
}

#[tokio::test]
async fn failures_stay_in_their_own_slots() {
    let provider = scripted(vec![
        Reply::Text(reply_with_calories(100)),
        Reply::Fail("upstream 503"),
        Reply::Text(reply_with_calories(200)),
        Reply::Fail("connection reset"),
        Reply::Text(reply_with_calories(300)),
    ]);
    let scheduler = FanOutScheduler::new(estimator(&provider));

    let outcomes = scheduler.run(JPEG, NUTRITION_INSTRUCTION, 5).await;

    assert_eq!(outcomes.len(), 5);
    let successes = outcomes.iter().filter(|o| o.is_success()).count();
    assert_eq!(successes, 3);

    let kinds: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.failure())
        .map(AttemptFailure::kind)
        .collect();
    assert_eq!(kinds, vec!["transport", "transport"]);

    let mut calories: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.estimate())
        .map(|e| e.calories())
        .collect();
    calories.sort_by(f64::total_cmp);
    assert_eq!(calories, vec![100.0, 200.0, 300.0]);
}

#[tokio::test]
async fn unparseable_reply_is_malformed_response() {
    let provider = scripted(vec![Reply::Text("I think it's a sandwich")]);
    let scheduler = FanOutScheduler::new(estimator(&provider));

    let outcomes = scheduler.run(JPEG, NUTRITION_INSTRUCTION, 1).await;

    assert!(matches!(
        outcomes[0].failure(),
        Some(AttemptFailure::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn blank_reply_is_malformed_response() {
    let provider = scripted(vec![Reply::Text("  \n ")]);
    let scheduler = FanOutScheduler::new(estimator(&provider));

    let outcomes = scheduler.run(JPEG, NUTRITION_INSTRUCTION, 1).await;

    assert!(matches!(
        outcomes[0].failure(),
        Some(AttemptFailure::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn slow_call_times_out_without_holding_back_the_rest() {
    let provider = scripted(vec![
        Reply::Slow(Duration::from_secs(5), reply_with_calories(999)),
        Reply::Text(reply_with_calories(250)),
    ]);
    let scheduler =
        FanOutScheduler::new(estimator(&provider)).with_timeout(Some(Duration::from_millis(100)));

    let started = std::time::Instant::now();
    let outcomes = scheduler.run(JPEG, NUTRITION_INSTRUCTION, 2).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcomes.len(), 2);
    let timed_out = outcomes
        .iter()
        .filter_map(|o| o.failure())
        .filter(|f| matches!(f, AttemptFailure::Timeout(_)))
        .count();
    assert_eq!(timed_out, 1);
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
}

#[tokio::test]
async fn calls_run_concurrently() {
    let provider = scripted(vec![Reply::Slow(
        Duration::from_millis(300),
        reply_with_calories(400),
    )]);
    let scheduler = FanOutScheduler::new(estimator(&provider));

    let started = std::time::Instant::now();
    let outcomes = scheduler.run(JPEG, NUTRITION_INSTRUCTION, 5).await;

    // Sequential would take at least 1.5s.
    assert!(started.elapsed() < Duration::from_millis(1200));
    assert!(outcomes.iter().all(|o| o.is_success()));
}
