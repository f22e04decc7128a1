//! Scenario 6 (§8): a pending approval with no resolution denies itself on
//! timeout, and a later resolve attempt on the same id is a no-op.

use std::time::{Duration, Instant};

use iris_approval::PendingApprovals;
use iris_core::SessionId;
use serde_json::json;

#[tokio::test]
async fn unanswered_approval_times_out_as_a_denial() {
    let approvals = PendingApprovals::new();
    let (id, waiter) = approvals.create(SessionId::new(), "alpha", "bash", json!({"cmd": "rm -rf /"}), None, Some(Duration::from_millis(50)));

    let started = Instant::now();
    let outcome = waiter.wait().await;
    let elapsed = started.elapsed();

    assert!(!outcome.approved);
    assert!(outcome.reason.unwrap().contains("timed out"));
    assert!(elapsed < Duration::from_millis(200), "timeout took too long: {elapsed:?}");

    assert!(!approvals.resolve(&id, true, None), "resolving an already-timed-out id must be a no-op");
}
