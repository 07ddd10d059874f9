use dbfixture_engine::pool::{WorkerPool, DEFAULT_CAPACITY};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_default_capacity() {
    assert_eq!(WorkerPool::default().capacity(), DEFAULT_CAPACITY);
    assert_eq!(WorkerPool::new(0).capacity(), 1);
}

#[tokio::test]
async fn test_join_returns_task_output() {
    let pool = WorkerPool::new(2);
    let task = pool.spawn(async { 40 + 2 }).await.unwrap();
    assert_eq!(task.join().await.unwrap(), 42);
    assert_eq!(pool.available(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_capacity() {
    let pool = WorkerPool::new(2);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let running = running.clone();
        let peak = peak.clone();
        let task = pool
            .spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        tasks.push(task);
    }
    for task in tasks {
        task.join().await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(pool.available(), 2);
}

#[tokio::test]
async fn test_panicking_task_reports_worker_pool_error() {
    let pool = WorkerPool::new(1);
    let task = pool
        .spawn(async {
            panic!("boom");
        })
        .await
        .unwrap();

    let err = task.join().await.unwrap_err();
    assert!(matches!(
        err,
        dbfixture_core::ProvisionError::WorkerPool { .. }
    ));
    assert_eq!(pool.available(), 1);
}
