//! Worker pool behaviour against the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{Mutex, Notify};

use erp_core::types::id::JobId;
use erp_database::JobFilter;
use erp_entity::job::JobStatus;
use erp_worker::{JobExecutionError, handler_fn};

use crate::helpers::TestEngine;

#[tokio::test]
async fn test_echo_jobs_complete_in_submission_order() {
    let engine = TestEngine::new();
    engine.register_echo().await;

    let mut ids = Vec::new();
    for n in 1..=3 {
        ids.push(engine.queue.submit("echo", &n, None).await.unwrap().id);
    }

    let pool = engine.start(1);
    engine.wait_drained().await;
    pool.stop().await.unwrap();

    let listed = engine.queue.list(&JobFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 3);
    // Newest first.
    let listed_ids: Vec<_> = listed.iter().map(|j| j.id).collect();
    assert_eq!(listed_ids, ids.iter().rev().copied().collect::<Vec<_>>());

    let mut finished = Vec::new();
    for (n, id) in (1..=3).zip(&ids) {
        let job = engine.queue.get(*id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(json!(n)));
        finished.push(job.completed_at.unwrap());
    }
    assert!(finished.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_unregistered_type_fails_without_running_anything() {
    let engine = TestEngine::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    engine
        .register(
            "echo",
            handler_fn(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            }),
        )
        .await;

    let job = engine.queue.submit("unregistered", &json!({}), None).await.unwrap();
    let pool = engine.start(1);
    let job = engine.wait_terminal(job.id).await;
    pool.stop().await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some("no handler registered for type unregistered")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_single_job_runs_once_with_two_workers() {
    let engine = TestEngine::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    engine
        .register(
            "backup_create",
            handler_fn(move |_, _| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(None)
                }
            }),
        )
        .await;

    let job = engine.queue.submit("backup_create", &json!({}), None).await.unwrap();
    let pool = engine.start(2);
    let job = engine.wait_terminal(job.id).await;
    pool.stop().await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.started_at.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_job_executes_exactly_once() {
    let engine = TestEngine::new();
    let seen: Arc<Mutex<HashMap<JobId, usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let tally = seen.clone();
    engine
        .register(
            "bulk_update",
            handler_fn(move |job, _| {
                let tally = tally.clone();
                async move {
                    *tally.lock().await.entry(job.id).or_insert(0) += 1;
                    tokio::task::yield_now().await;
                    Ok(None)
                }
            }),
        )
        .await;

    for n in 0..40 {
        engine.queue.submit("bulk_update", &n, None).await.unwrap();
    }

    let pool = engine.start(6);
    engine.wait_drained().await;
    pool.stop().await.unwrap();

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 40);
    assert!(seen.values().all(|&count| count == 1));
    assert_eq!(engine.queue.stats().await.unwrap().completed, 40);
}

#[tokio::test]
async fn test_progress_is_visible_while_running() {
    let engine = TestEngine::new();
    let reported = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let (on_report, on_release) = (reported.clone(), release.clone());
    engine
        .register(
            "data_import",
            handler_fn(move |_, progress| {
                let (reported, release) = (on_report.clone(), on_release.clone());
                async move {
                    progress.report(30, 120).await?;
                    reported.notify_one();
                    release.notified().await;
                    progress.report(120, 120).await?;
                    Ok(Some(json!({"rows": 120})))
                }
            }),
        )
        .await;

    let job = engine.queue.submit("data_import", &json!({}), None).await.unwrap();
    let pool = engine.start(1);

    reported.notified().await;
    let mid = engine.queue.get(job.id).await.unwrap();
    assert_eq!(mid.status, JobStatus::Running);
    assert!(mid.progress >= 30);
    assert_eq!(mid.total, 120);

    release.notify_one();
    let done = engine.wait_terminal(job.id).await;
    pool.stop().await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.percent_complete(), 100);
    assert_eq!(done.result, Some(json!({"rows": 120})));
}

#[tokio::test]
async fn test_worker_survives_failing_and_panicking_handlers() {
    let engine = TestEngine::new();
    engine.register_echo().await;
    engine
        .register(
            "report_generate",
            handler_fn(|_, _| async { Err(JobExecutionError::failed("template missing")) }),
        )
        .await;
    engine
        .register(
            "email_send",
            handler_fn(|job, _| async move {
                let recipients: Vec<String> = Vec::new();
                let first = &recipients[job.progress as usize];
                Ok(Some(json!(first)))
            }),
        )
        .await;

    let failing = engine.queue.submit("report_generate", &1, None).await.unwrap();
    let panicking = engine.queue.submit("email_send", &2, None).await.unwrap();
    let echo = engine.queue.submit("echo", &3, None).await.unwrap();

    let pool = engine.start(1);
    let echo = engine.wait_terminal(echo.id).await;
    pool.stop().await.unwrap();

    let failing = engine.queue.get(failing.id).await.unwrap();
    assert_eq!(failing.status, JobStatus::Failed);
    assert_eq!(failing.error_message.as_deref(), Some("template missing"));

    let panicking = engine.queue.get(panicking.id).await.unwrap();
    assert_eq!(panicking.status, JobStatus::Failed);
    assert!(
        panicking
            .error_message
            .as_deref()
            .is_some_and(|m| m.starts_with("handler panicked: "))
    );

    assert_eq!(echo.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_cancelled_job_is_skipped() {
    let engine = TestEngine::new();
    engine.register_echo().await;

    let cancelled = engine.queue.submit("echo", &1, None).await.unwrap();
    let kept = engine.queue.submit("echo", &2, None).await.unwrap();
    engine.queue.cancel(cancelled.id).await.unwrap();

    let pool = engine.start(1);
    engine.wait_terminal(kept.id).await;
    pool.stop().await.unwrap();

    let cancelled = engine.queue.get(cancelled.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.started_at.is_none());
    assert!(cancelled.result.is_none());

    let stats = engine.queue.stats().await.unwrap();
    assert_eq!((stats.completed, stats.cancelled), (1, 1));
}

#[tokio::test]
async fn test_blank_type_is_stored_and_failed_by_worker() {
    let engine = TestEngine::new();
    engine.register_echo().await;

    let job = engine.queue.submit("", &1, None).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let pool = engine.start(1);
    let job = engine.wait_terminal(job.id).await;
    pool.stop().await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some("no handler registered for type ")
    );
}
