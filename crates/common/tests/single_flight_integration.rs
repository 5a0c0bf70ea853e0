//! Integration tests for the single-flight primitive
//!
//! Exercises sharing, failure propagation and slot release across spawned
//! tasks on a multi-threaded runtime.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use facturo_common::SingleFlight;

/// Validates that concurrently spawned tasks share one execution.
///
/// # Test Steps
/// 1. Spawn 16 tasks that all join the same flight
/// 2. The operation sleeps long enough for every task to join
/// 3. Verify the operation ran once and every task saw its result
/// 4. Verify exactly one task was the leader
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_tasks_share_single_execution() {
    let flight: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let flight = Arc::clone(&flight);
            let executions = Arc::clone(&executions);
            tokio::spawn(async move {
                flight
                    .run(move || async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("fresh-token".to_string())
                    })
                    .await
            })
        })
        .collect();

    let mut leaders = 0;
    for handle in handles {
        let flight = handle.await.expect("task should not panic");
        assert_eq!(flight.result, Ok("fresh-token".to_string()));
        if flight.leader {
            leaders += 1;
        }
    }

    assert_eq!(executions.load(Ordering::SeqCst), 1);
    assert_eq!(leaders, 1);
    assert!(!flight.in_flight());
}

/// Validates that a completed flight does not serve later callers.
///
/// # Test Steps
/// 1. Run a flight to completion
/// 2. Run a second flight afterwards
/// 3. Verify both executed and both callers were leaders
#[tokio::test]
async fn test_sequential_flights_execute_independently() {
    let flight: SingleFlight<usize, String> = SingleFlight::new();
    let executions = Arc::new(AtomicUsize::new(0));

    for expected in 1..=2 {
        let executions = Arc::clone(&executions);
        let outcome = flight
            .run(move || async move { Ok(executions.fetch_add(1, Ordering::SeqCst) + 1) })
            .await;
        assert!(outcome.leader);
        assert_eq!(outcome.result, Ok(expected));
    }
}

/// Validates that the pending execution survives its leader being dropped.
///
/// # Test Steps
/// 1. Start a flight and abort the leader task while the operation is pending
/// 2. Join the same flight from another task
/// 3. Verify the follower still receives the result of the first execution
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_follower_completes_after_leader_cancelled() {
    let flight: Arc<SingleFlight<u8, String>> = Arc::new(SingleFlight::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let leader = {
        let flight = Arc::clone(&flight);
        let executions = Arc::clone(&executions);
        tokio::spawn(async move {
            flight
                .run(move || async move {
                    executions.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok(42)
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(flight.in_flight());
    leader.abort();

    let follower = flight.run(|| async { Ok(0) }).await;
    assert!(!follower.leader);
    assert_eq!(follower.result, Ok(42));
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}
