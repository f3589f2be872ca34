//! Admission lifecycle integration tests.
//!
//! These tests drive the admission coordinator with concurrent callers:
//! - Capacity is never exceeded
//! - Waiters are promoted in arrival order
//! - Slots are released on success, failure and panic
//! - Overflow requests start only after an earlier request finishes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use pdfsmith_core::{create_admission_system, AdmissionHandle, AdmissionRoute};

fn spawn_system(capacity: usize) -> AdmissionHandle {
    let (handle, coordinator) = create_admission_system(capacity);
    tokio::spawn(coordinator.run());
    handle
}

async fn wait_for_waiting(handle: &AdmissionHandle, count: usize) {
    for _ in 0..400 {
        if handle.status().await.unwrap().waiting.len() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("wait list never reached {} entries", count);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_never_exceeded() {
    let handle = spawn_system(3);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let handle = handle.clone();
        let running = running.clone();
        let peak = peak.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .submit(Uuid::new_v4(), async {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
    let status = handle.status().await.unwrap();
    assert!(status.admitted.is_empty());
    assert!(status.waiting.is_empty());
}

#[tokio::test]
async fn test_waiters_promoted_in_arrival_order() {
    let handle = spawn_system(1);
    let blocker = handle.admit(Uuid::new_v4()).await.unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut tasks = Vec::new();
    for label in 0..5 {
        let task_handle = handle.clone();
        let order = order.clone();
        tasks.push(tokio::spawn(async move {
            let permit = task_handle.admit(Uuid::new_v4()).await.unwrap();
            assert_eq!(permit.route(), AdmissionRoute::Promoted);
            order.lock().unwrap().push(label);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }));
        // Make sure each waiter is queued before the next one arrives.
        wait_for_waiting(&handle, label + 1).await;
    }

    drop(blocker);
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_slot_released_after_failed_work() {
    let handle = spawn_system(1);
    let id = Uuid::new_v4();

    let result: Result<Result<(), String>, _> = handle
        .submit(id, async { Err("typesetting failed".to_string()) })
        .await;

    assert!(result.unwrap().is_err());
    let status = handle.status().await.unwrap();
    assert!(!status.admitted.contains(&id));
}

#[tokio::test]
async fn test_slot_released_after_panic() {
    let handle = spawn_system(1);
    let id = Uuid::new_v4();

    let task = {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle
                .submit(id, async {
                    panic!("pipeline exploded");
                })
                .await
        })
    };
    assert!(task.await.is_err());

    let status = handle.status().await.unwrap();
    assert!(status.admitted.is_empty());
    // The slot is usable again.
    let _permit = handle.admit(Uuid::new_v4()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_third_request_waits_for_first_completion() {
    const D: Duration = Duration::from_millis(200);
    let handle = spawn_system(2);
    let submitted = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .submit(Uuid::new_v4(), async {
                    let start = Instant::now();
                    tokio::time::sleep(D).await;
                    (start, Instant::now())
                })
                .await
                .unwrap()
        }));
    }

    let mut spans = Vec::new();
    for task in tasks {
        spans.push(task.await.unwrap());
    }
    spans.sort_by_key(|(start, _)| *start);

    let first_completion = spans[..2].iter().map(|(_, end)| *end).min().unwrap();
    let (third_start, third_end) = spans[2];
    assert!(third_start >= first_completion);

    let latency = third_end.duration_since(submitted);
    assert!(latency >= D * 2);
    assert!(latency < D * 3);
}
