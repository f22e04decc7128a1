//! Scenario 3 (§8): concurrent sends to distinct targets spawn distinct
//! transports and proceed independently — wall time is ~max(t_a, t_b), not
//! their sum.

mod common;

use std::time::{Duration, Instant};

use iris_transport::MockResponse;

#[tokio::test]
async fn distinct_targets_run_concurrently() {
    let harness = common::Harness::new(&["caller", "alpha", "beta"]).await;
    harness.factory.script("alpha", MockResponse::Text("a".to_string()));
    harness.factory.script("beta", MockResponse::Text("b".to_string()));
    harness.factory.with_delay("alpha", Duration::from_millis(120));
    harness.factory.with_delay("beta", Duration::from_millis(120));

    let orchestrator = harness.orchestrator();

    let started = Instant::now();
    let (alpha, beta) = tokio::join!(orchestrator.send_message("caller", "alpha", "a", None), orchestrator.send_message("caller", "beta", "b", None));
    let elapsed = started.elapsed();

    assert_eq!(alpha.unwrap(), "a");
    assert_eq!(beta.unwrap(), "b");
    assert_eq!(harness.pool.len().await, 2);

    // Sequential dispatch would take ~240ms; concurrent dispatch should stay
    // close to the slower single call. Generous margin to absorb CI jitter.
    assert!(elapsed < Duration::from_millis(220), "expected concurrent dispatch, took {elapsed:?}");
}
