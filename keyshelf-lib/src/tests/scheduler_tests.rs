use super::*;
use std::sync::atomic::AtomicUsize;
use tokio::time::Instant;

fn config(min_interval_ms: u64, concurrency: usize) -> SchedulerConfig {
    SchedulerConfig {
        min_interval: Duration::from_millis(min_interval_ms),
        concurrency,
    }
}

#[tokio::test]
async fn runs_tasks_and_returns_results() {
    let scheduler = RequestScheduler::start(config(0, 1));
    let result = scheduler.submit(async { Ok::<_, FetchError>(42) }).await;
    assert_eq!(result, Ok(42));

    let err = scheduler
        .submit(async { Err::<u32, _>(FetchError::network("timeout")) })
        .await;
    assert_eq!(err, Err(FetchError::network("timeout")));
    // Ordinary failures do not trip the breaker
    assert!(!scheduler.is_stopped());
}

#[tokio::test]
async fn admits_in_fifo_order() {
    let scheduler = RequestScheduler::start(config(0, 1));
    let order = Arc::new(Mutex::new(Vec::new()));

    let futures: Vec<_> = (0..5)
        .map(|i| {
            let order = order.clone();
            scheduler.submit(async move {
                order.lock().unwrap().push(i);
                Ok::<_, FetchError>(())
            })
        })
        .collect();
    for f in futures {
        f.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn spaces_tasks_by_min_interval() {
    let scheduler = RequestScheduler::start(config(50, 1));
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let futures: Vec<_> = (0..3)
        .map(|_| {
            let stamps = stamps.clone();
            scheduler.submit(async move {
                stamps.lock().unwrap().push(Instant::now());
                Ok::<_, FetchError>(())
            })
        })
        .collect();
    for f in futures {
        f.await.unwrap();
    }

    let stamps = stamps.lock().unwrap();
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(50));
    }
}

/// Submit `count` tasks that each record their start and then run for
/// `work`, returning the start instants in admission order.
async fn admission_times(scheduler: &RequestScheduler, count: usize, work: Duration) -> Vec<Instant> {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let futures: Vec<_> = (0..count)
        .map(|_| {
            let stamps = stamps.clone();
            scheduler.submit(async move {
                stamps.lock().unwrap().push(Instant::now());
                tokio::time::sleep(work).await;
                Ok::<_, FetchError>(())
            })
        })
        .collect();
    for f in futures {
        f.await.unwrap();
    }
    let stamps = stamps.lock().unwrap().clone();
    stamps
}

#[tokio::test]
async fn spacing_counts_from_completion_not_admission() {
    let scheduler = RequestScheduler::start(config(50, 1));
    let stamps = admission_times(&scheduler, 3, Duration::from_millis(100)).await;

    // Admission-based spacing would allow a 100 ms gap here
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(150));
    }
}

#[tokio::test]
async fn each_worker_spaces_its_own_tasks() {
    let scheduler = RequestScheduler::start(config(50, 2));
    let stamps = admission_times(&scheduler, 4, Duration::from_millis(100)).await;

    // Two workers admit the first pair together
    assert!(stamps[1] - stamps[0] < Duration::from_millis(100));
    // The next pair waits for a task to finish plus the interval
    assert!(stamps[2] - stamps[0] >= Duration::from_millis(150));
    assert!(stamps[3] - stamps[1] >= Duration::from_millis(150));
}

#[tokio::test]
async fn never_exceeds_concurrency() {
    let scheduler = RequestScheduler::start(config(0, 2));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let futures: Vec<_> = (0..6)
        .map(|_| {
            let running = running.clone();
            let peak = peak.clone();
            scheduler.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, FetchError>(())
            })
        })
        .collect();
    for f in futures {
        f.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limit_trips_breaker_and_rejects_queue() {
    let scheduler = RequestScheduler::start(config(0, 1));
    let ran = Arc::new(AtomicUsize::new(0));

    let first = scheduler.submit(async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err::<(), _>(FetchError::RateLimited { status: 403 })
    });
    let queued: Vec<_> = (0..3)
        .map(|_| {
            let ran = ran.clone();
            scheduler.submit(async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(())
            })
        })
        .collect();

    assert_eq!(first.await, Err(FetchError::RateLimited { status: 403 }));
    for f in queued {
        assert_eq!(f.await, Err(FetchError::QueueStopped));
    }

    assert!(scheduler.is_stopped());
    assert_eq!(scheduler.pending_len(), 0);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    let later = scheduler.submit(async { Ok::<_, FetchError>(1) }).await;
    assert_eq!(later, Err(FetchError::QueueStopped));
    assert_eq!(scheduler.pending_len(), 0);
}

#[tokio::test]
async fn stop_discards_queue_but_not_in_flight() {
    let scheduler = RequestScheduler::start(config(0, 1));
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let in_flight = scheduler.submit(async move {
        let _ = started_tx.send(());
        let _ = release_rx.await;
        Ok::<_, FetchError>("finished")
    });
    started_rx.await.unwrap();

    let a = scheduler.submit(async { Ok::<_, FetchError>("a") });
    let b = scheduler.submit(async { Ok::<_, FetchError>("b") });
    assert_eq!(scheduler.pending_len(), 2);

    assert_eq!(scheduler.stop(), 2);
    assert_eq!(scheduler.pending_len(), 0);
    // Stopping twice is a no-op
    assert_eq!(scheduler.stop(), 0);

    release_tx.send(()).unwrap();
    assert_eq!(in_flight.await, Ok("finished"));
    assert_eq!(a.await, Err(FetchError::QueueStopped));
    assert_eq!(b.await, Err(FetchError::QueueStopped));
}

#[tokio::test]
async fn zero_concurrency_is_clamped() {
    let scheduler = RequestScheduler::start(config(0, 0));
    assert_eq!(scheduler.config().concurrency, 1);
    assert_eq!(scheduler.submit(async { Ok::<_, FetchError>(7) }).await, Ok(7));
}
