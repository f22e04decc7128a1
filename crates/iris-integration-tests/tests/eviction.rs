//! Scenario 5 (§8): with `maxProcesses=1`, addressing a second target
//! evicts the first; returning to the first later spawns a fresh transport
//! that reuses the original session id.

mod common;

use iris_pool::PoolConfig;
use iris_transport::MockResponse;

#[tokio::test]
async fn eviction_makes_room_and_reuses_the_original_session() {
    let harness = common::Harness::with_pool_config(&["caller", "alpha", "beta"], PoolConfig { max_processes: 1, ..PoolConfig::default() }).await;
    harness.factory.script("alpha", MockResponse::Text("a1".to_string()));
    harness.factory.script("beta", MockResponse::Text("b1".to_string()));
    harness.factory.script("alpha", MockResponse::Text("a2".to_string()));

    let orchestrator = harness.orchestrator();

    let first_alpha = orchestrator.send_message("caller", "alpha", "hi", None).await.unwrap();
    assert_eq!(first_alpha, "a1");
    assert_eq!(harness.pool.len().await, 1);

    let original_session = harness.session_manager.get_or_create_session("caller", "alpha").await.unwrap();

    let beta_response = orchestrator.send_message("caller", "beta", "hi", None).await.unwrap();
    assert_eq!(beta_response, "b1");
    // alpha's transport was evicted to make room for beta's.
    assert_eq!(harness.pool.len().await, 1);
    let statuses = harness.pool.get_status().await;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].to_team, "beta");

    let second_alpha = orchestrator.send_message("caller", "alpha", "hi again", None).await.unwrap();
    assert_eq!(second_alpha, "a2");

    let reused_session = harness.session_manager.get_or_create_session("caller", "alpha").await.unwrap();
    assert_eq!(original_session.session_id, reused_session.session_id);
}
