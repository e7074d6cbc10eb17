//! Delayed Task Scheduler — timer service that fires interview call tasks
//! at/after their deadline, exactly once each.
//!
//! An injected service with an explicit start/stop lifecycle, not a
//! process-wide registry. Pending tasks live behind the `TaskStore`
//! interface so a durable store can be slotted in without touching the
//! timer loop; fired tasks land in a `CallSink`, which tests replace with a
//! recorder. The production sink re-checks the application status and
//! no-ops on terminal applications before dispatching.

pub mod sink;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::info;
use uuid::Uuid;

/// One scheduled interview call, correlated to exactly one application.
/// The application row only tracks the attempt count; the scheduler is the
/// sole owner of pending tasks.
#[derive(Debug, Clone)]
pub struct CallTask {
    pub id: Uuid,
    pub application_id: Uuid,
    pub phone: String,
    pub candidate_name: String,
    pub job_title: String,
    pub attempt: i32,
    pub due_at: DateTime<Utc>,
}

/// Destination for fired tasks.
#[async_trait]
pub trait CallSink: Send + Sync {
    async fn fire(&self, task: CallTask);
}

/// Pending-task storage.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task. Any pending task for the same application is removed
    /// first: exactly one active scheduled call per application.
    async fn push(&self, task: CallTask, deadline: Instant);
    /// Removes pending tasks for an application; returns how many were dropped.
    async fn cancel(&self, application_id: Uuid) -> usize;
    /// Pops one task whose deadline has passed, and reports the next
    /// deadline still pending (for the timer to sleep until).
    async fn pop_due(&self, now: Instant) -> (Option<CallTask>, Option<Instant>);
}

struct Entry {
    deadline: Instant,
    seq: u64,
    task: CallTask,
}

// Min-heap on (deadline, seq): BinaryHeap is a max-heap, so invert.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

/// In-memory task store. Loses pending tasks on restart; acceptable here
/// because a lost call surfaces as a stuck `interview_scheduled` application
/// the recruiter can override.
#[derive(Default)]
pub struct InMemoryTaskStore {
    heap: Mutex<BinaryHeap<Entry>>,
    seq: AtomicU64,
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn push(&self, task: CallTask, deadline: Instant) {
        let mut heap = self.heap.lock().await;
        let retained: BinaryHeap<Entry> = heap
            .drain()
            .filter(|e| e.task.application_id != task.application_id)
            .collect();
        *heap = retained;
        heap.push(Entry {
            deadline,
            seq: self.seq.fetch_add(1, AtomicOrdering::SeqCst),
            task,
        });
    }

    async fn cancel(&self, application_id: Uuid) -> usize {
        let mut heap = self.heap.lock().await;
        let before = heap.len();
        let retained: BinaryHeap<Entry> = heap
            .drain()
            .filter(|e| e.task.application_id != application_id)
            .collect();
        *heap = retained;
        before - heap.len()
    }

    async fn pop_due(&self, now: Instant) -> (Option<CallTask>, Option<Instant>) {
        let mut heap = self.heap.lock().await;
        if let Some(entry) = heap.peek() {
            if entry.deadline <= now {
                let task = heap.pop().map(|e| e.task);
                let next = heap.peek().map(|e| e.deadline);
                return (task, next);
            }
            return (None, Some(entry.deadline));
        }
        (None, None)
    }
}

struct Inner {
    store: Arc<dyn TaskStore>,
    sink: Arc<dyn CallSink>,
    notify: Notify,
    shutdown: AtomicBool,
}

/// Handle to the scheduler service. Cheap to clone; carried in `AppState`.
#[derive(Clone)]
pub struct CallScheduler {
    inner: Arc<Inner>,
}

impl CallScheduler {
    pub fn new(store: Arc<dyn TaskStore>, sink: Arc<dyn CallSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                sink,
                notify: Notify::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Spawns the timer loop on its own tokio task.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move { run(inner).await })
    }

    /// Enqueues a call task to fire after `delay`. Supersedes any pending
    /// task for the same application.
    pub async fn schedule(&self, task: CallTask, delay: Duration) {
        info!(
            application_id = %task.application_id,
            attempt = task.attempt,
            delay_secs = delay.as_secs(),
            "Scheduling interview call"
        );
        self.inner.store.push(task, Instant::now() + delay).await;
        self.inner.notify.notify_one();
    }

    /// Drops pending tasks for an application (e.g. it reached a terminal
    /// status). Returns how many were cancelled.
    pub async fn cancel(&self, application_id: Uuid) -> usize {
        let dropped = self.inner.store.cancel(application_id).await;
        if dropped > 0 {
            info!(%application_id, dropped, "Cancelled pending call tasks");
        }
        self.inner.notify.notify_one();
        dropped
    }

    /// Signals the timer loop to exit after the current iteration.
    pub fn stop(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::SeqCst);
        self.inner.notify.notify_one();
    }
}

async fn run(inner: Arc<Inner>) {
    info!("Call scheduler started");
    loop {
        if inner.shutdown.load(AtomicOrdering::SeqCst) {
            break;
        }
        let (due, next) = inner.store.pop_due(Instant::now()).await;
        if let Some(task) = due {
            // Sequential by design: sink calls are timeout-bounded, and
            // ordering between due tasks stays deterministic.
            inner.sink.fire(task).await;
            continue;
        }
        match next {
            Some(deadline) => {
                tokio::select! {
                    _ = sleep_until(deadline) => {}
                    _ = inner.notify.notified() => {}
                }
            }
            None => inner.notify.notified().await,
        }
    }
    info!("Call scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        fired: StdMutex<Vec<CallTask>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: StdMutex::new(Vec::new()),
            })
        }

        fn fired_ids(&self) -> Vec<Uuid> {
            self.fired.lock().unwrap().iter().map(|t| t.id).collect()
        }
    }

    #[async_trait]
    impl CallSink for RecordingSink {
        async fn fire(&self, task: CallTask) {
            self.fired.lock().unwrap().push(task);
        }
    }

    fn task_for(application_id: Uuid, attempt: i32) -> CallTask {
        CallTask {
            id: Uuid::new_v4(),
            application_id,
            phone: "+15550100".to_string(),
            candidate_name: "Ada".to_string(),
            job_title: "Rust Engineer".to_string(),
            attempt,
            due_at: Utc::now(),
        }
    }

    /// Lets the scheduler task observe clock movement between assertions.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline_exactly_once() {
        let sink = RecordingSink::new();
        let scheduler = CallScheduler::new(
            Arc::new(InMemoryTaskStore::default()),
            sink.clone(),
        );
        let handle = scheduler.start();

        scheduler
            .schedule(task_for(Uuid::new_v4(), 0), Duration::from_secs(120))
            .await;
        settle().await;

        tokio::time::advance(Duration::from_secs(119)).await;
        settle().await;
        assert!(sink.fired_ids().is_empty(), "fired before the deadline");

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(sink.fired_ids().len(), 1);

        // No replay on further time movement.
        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(sink.fired_ids().len(), 1);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_in_deadline_order() {
        let sink = RecordingSink::new();
        let scheduler = CallScheduler::new(
            Arc::new(InMemoryTaskStore::default()),
            sink.clone(),
        );
        let handle = scheduler.start();

        let late = task_for(Uuid::new_v4(), 0);
        let early = task_for(Uuid::new_v4(), 0);
        scheduler
            .schedule(late.clone(), Duration::from_secs(200))
            .await;
        scheduler
            .schedule(early.clone(), Duration::from_secs(100))
            .await;
        settle().await;

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;

        assert_eq!(sink.fired_ids(), vec![early.id, late.id]);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_task() {
        let sink = RecordingSink::new();
        let scheduler = CallScheduler::new(
            Arc::new(InMemoryTaskStore::default()),
            sink.clone(),
        );
        let handle = scheduler.start();

        let app_id = Uuid::new_v4();
        scheduler
            .schedule(task_for(app_id, 0), Duration::from_secs(120))
            .await;
        settle().await;

        assert_eq!(scheduler.cancel(app_id).await, 1);

        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert!(sink.fired_ids().is_empty());

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_supersedes_prior_task_for_same_application() {
        let sink = RecordingSink::new();
        let scheduler = CallScheduler::new(
            Arc::new(InMemoryTaskStore::default()),
            sink.clone(),
        );
        let handle = scheduler.start();

        let app_id = Uuid::new_v4();
        let first = task_for(app_id, 0);
        let second = task_for(app_id, 1);
        scheduler
            .schedule(first, Duration::from_secs(100))
            .await;
        scheduler
            .schedule(second.clone(), Duration::from_secs(200))
            .await;
        settle().await;

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;

        // Exactly one active task per application: only the superseding
        // attempt fires.
        assert_eq!(sink.fired_ids(), vec![second.id]);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_exits_loop() {
        let sink = RecordingSink::new();
        let scheduler =
            CallScheduler::new(Arc::new(InMemoryTaskStore::default()), sink);
        let handle = scheduler.start();
        settle().await;
        scheduler.stop();
        handle.await.unwrap();
    }
}
