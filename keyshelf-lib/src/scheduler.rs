//! Paced, circuit-breaking runner for remote requests.
//!
//! Tasks are admitted in FIFO order by `concurrency` persistent worker
//! tasks. After each task finishes, its worker waits `min_interval` before
//! taking the next one, so spacing is measured from completion.
//!
//! A task that fails with [`FetchError::RateLimited`] trips the breaker: the
//! queue is discarded (every queued submitter sees
//! [`FetchError::QueueStopped`]) and all later submissions are rejected. The
//! breaker never re-arms. Tasks already running are left to finish.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use keyshelf_core::FetchError;
use tokio::sync::{Notify, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Pacing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub min_interval: Duration,
    pub concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(300),
            concurrency: 1,
        }
    }
}

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    stopped: AtomicBool,
    /// Set when the last scheduler handle is dropped; workers exit once idle.
    closed: AtomicBool,
    notify: Notify,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Flip to stopped and drop every queued job. Returns how many were
    /// dropped, or `None` if the breaker had already tripped.
    fn trip(&self) -> Option<usize> {
        let drained: Vec<Job> = {
            let mut queue = self.queue();
            if self.stopped.swap(true, Ordering::SeqCst) {
                return None;
            }
            queue.drain(..).collect()
        };
        let count = drained.len();
        // Dropping the jobs drops their result senders
        drop(drained);
        self.notify.notify_waiters();
        Some(count)
    }

    fn should_exit(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst)
    }
}

struct Handle {
    shared: Arc<Shared>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
    }
}

/// Handle to a running scheduler. Clones share the same queue and breaker.
#[derive(Clone)]
pub struct RequestScheduler {
    handle: Arc<Handle>,
    config: SchedulerConfig,
}

impl std::fmt::Debug for RequestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScheduler")
            .field("config", &self.config)
            .field("stopped", &self.is_stopped())
            .field("pending", &self.pending_len())
            .finish()
    }
}

impl RequestScheduler {
    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start(config: SchedulerConfig) -> Self {
        let config = SchedulerConfig {
            concurrency: config.concurrency.max(1),
            ..config
        };
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            stopped: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        });

        for _ in 0..config.concurrency {
            tokio::spawn(worker(shared.clone(), config.min_interval));
        }

        Self {
            handle: Arc::new(Handle { shared }),
            config,
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    fn shared(&self) -> &Arc<Shared> {
        &self.handle.shared
    }

    /// Queue `task`. The returned future resolves with the task's result once
    /// it has run, or with [`FetchError::QueueStopped`] if the breaker trips
    /// first. When the breaker has already tripped, nothing is queued.
    pub fn submit<T, Fut>(&self, task: Fut) -> impl Future<Output = Result<T, FetchError>> + Send + use<T, Fut>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let receiver = self.enqueue(task);
        async move {
            match receiver {
                Some(rx) => rx.await.unwrap_or(Err(FetchError::QueueStopped)),
                None => Err(FetchError::QueueStopped),
            }
        }
    }

    fn enqueue<T, Fut>(&self, task: Fut) -> Option<oneshot::Receiver<Result<T, FetchError>>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let shared = Arc::downgrade(self.shared());
        let job: Job = Box::pin(async move {
            let result = task.await;
            if let Err(FetchError::RateLimited { status }) = &result {
                if let Some(shared) = shared.upgrade() {
                    trip_breaker(&shared, *status);
                }
            }
            let _ = tx.send(result);
        });

        {
            let mut queue = self.shared().queue();
            if self.is_stopped() {
                return None;
            }
            queue.push_back(job);
        }
        self.shared().notify.notify_one();
        Some(rx)
    }

    /// Trip the breaker by hand. Returns the number of queued tasks discarded.
    pub fn stop(&self) -> usize {
        match self.shared().trip() {
            Some(count) => {
                log::error!(
                    "Request queue stopped; {} pending request(s) discarded",
                    count
                );
                count
            }
            None => 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared().stopped.load(Ordering::SeqCst)
    }

    /// Number of tasks queued but not yet admitted.
    pub fn pending_len(&self) -> usize {
        self.shared().queue().len()
    }
}

fn trip_breaker(shared: &Shared, status: u16) {
    if let Some(count) = shared.trip() {
        log::error!(
            "Remote service rate limited us (HTTP {}); request queue stopped, {} pending request(s) discarded",
            status,
            count
        );
    }
}

async fn worker(shared: Arc<Shared>, min_interval: Duration) {
    loop {
        let job = loop {
            let notified = shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = shared.queue().pop_front() {
                break job;
            }
            if shared.should_exit() {
                return;
            }
            notified.await;
        };

        job.await;

        if !min_interval.is_zero() {
            tokio::time::sleep(min_interval).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
