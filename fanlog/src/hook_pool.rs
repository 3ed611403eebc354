//! Bounded worker pool that runs asynchronous hook invocations
//!
//! Jobs are queued on a bounded channel and drained by a fixed number of
//! worker threads. When the queue is full the configured
//! [`OverflowPolicy`] decides what gets dropped. Every job runs inside a
//! panic boundary so a failing hook never takes a worker down.
//!
//! Running jobs hold a shared gate; [`HookPool::pause`] takes it
//! exclusively to wait for them. [`HookPool::shutdown`] disconnects the
//! queue and joins the workers.

use crate::error::HookError;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::cell::Cell;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A queued hook invocation
pub(crate) type HookJob = Box<dyn FnOnce() -> Result<(), HookError> + Send + 'static>;

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread is a hook worker
pub(crate) fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

/// What to do with a new hook job when the queue is full
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the job being submitted
    #[default]
    DropNewest,
    /// Evict the oldest queued job to make room
    DropOldest,
    /// Wait up to `timeout` for room, then discard the job
    Block { timeout: Duration },
}

/// Sizing of the hook worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookPoolConfig {
    /// Number of worker threads (at least one is started)
    pub workers: usize,
    /// Maximum queued jobs (at least one)
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for HookPoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

/// Statistics about the hook pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookPoolStats {
    /// Jobs handed to the pool
    pub submitted: u64,
    /// Jobs discarded because of overflow or shutdown
    pub dropped: u64,
    /// Jobs whose hook returned an error
    pub failed: u64,
    /// Jobs whose hook panicked
    pub panicked: u64,
    /// Jobs currently waiting in the queue
    pub queued: usize,
    /// Worker threads still running
    pub workers: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    live_workers: AtomicUsize,
}

/// Fixed-size pool of hook workers fed by a bounded queue
pub(crate) struct HookPool {
    // None once shut down
    sender: RwLock<Option<Sender<HookJob>>>,
    // Kept so DropOldest can evict from the front of the queue
    receiver: Receiver<HookJob>,
    overflow: OverflowPolicy,
    counters: Arc<Counters>,
    gate: Arc<RwLock<()>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl HookPool {
    /// Start the worker threads.
    ///
    /// Fails only if not a single worker thread could be spawned.
    pub fn new(config: HookPoolConfig) -> io::Result<Self> {
        let (sender, receiver) = bounded::<HookJob>(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let gate = Arc::new(RwLock::new(()));

        let mut workers = Vec::with_capacity(config.workers.max(1));
        let mut last_err = None;
        for index in 0..config.workers.max(1) {
            let receiver = receiver.clone();
            let worker_counters = Arc::clone(&counters);
            let gate = Arc::clone(&gate);
            let spawned = thread::Builder::new()
                .name(format!("fanlog-hook-{}", index))
                .spawn(move || run_worker(receiver, worker_counters, gate));

            match spawned {
                Ok(handle) => {
                    counters.live_workers.fetch_add(1, Ordering::SeqCst);
                    workers.push(handle);
                }
                Err(err) => {
                    tracing::error!(worker = index, error = %err, "Failed to spawn hook worker");
                    last_err = Some(err);
                }
            }
        }

        if workers.is_empty() {
            return Err(last_err.unwrap_or_else(|| io::Error::other("no hook workers started")));
        }

        tracing::debug!(
            workers = workers.len(),
            capacity = config.queue_capacity.max(1),
            overflow = ?config.overflow,
            "Hook pool started"
        );

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            overflow: config.overflow,
            counters,
            gate,
            workers: Mutex::new(workers),
        })
    }

    /// Queue a job according to the overflow policy.
    ///
    /// Returns `false` if the submitted job was discarded.
    pub fn submit(&self, job: HookJob) -> bool {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let Some(sender) = self.sender.read().clone() else {
            let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(dropped, "Hook pool shut down, dropping job");
            return false;
        };

        let accepted = match self.overflow {
            OverflowPolicy::DropNewest => sender.try_send(job).is_ok(),
            OverflowPolicy::DropOldest => self.submit_evicting(&sender, job),
            OverflowPolicy::Block { timeout } => match sender.send_timeout(job, timeout) {
                Ok(()) => true,
                Err(SendTimeoutError::Timeout(_)) | Err(SendTimeoutError::Disconnected(_)) => false,
            },
        };

        if !accepted {
            let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(dropped, policy = ?self.overflow, "Hook queue full, dropping new job");
        }
        accepted
    }

    fn submit_evicting(&self, sender: &Sender<HookJob>, mut job: HookJob) -> bool {
        loop {
            match sender.try_send(job) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    if self.receiver.try_recv().is_ok() {
                        let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::warn!(dropped, "Hook queue full, evicted oldest job");
                    }
                    job = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    pub fn stats(&self) -> HookPoolStats {
        HookPoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            queued: self.receiver.len(),
            workers: self.counters.live_workers.load(Ordering::SeqCst),
        }
    }

    /// Wait until no job is running and hold off new ones while the guard
    /// lives. Must not be called from a worker thread.
    pub fn pause(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write()
    }

    /// Disconnect the queue and join the workers.
    ///
    /// Jobs still queued run before the workers exit. Later submissions are
    /// dropped. From a worker thread the workers are left to exit on their
    /// own instead of being joined.
    pub fn shutdown(&self) {
        if self.sender.write().take().is_none() {
            return;
        }

        if on_worker_thread() {
            return;
        }
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                tracing::warn!("Hook worker exited with a panic");
            }
        }
        tracing::debug!("Hook pool shut down");
    }
}

fn run_worker(receiver: Receiver<HookJob>, counters: Arc<Counters>, gate: Arc<RwLock<()>>) {
    ON_WORKER.with(|flag| flag.set(true));

    // Ends once every sender is gone and the queue is drained
    while let Ok(job) = receiver.recv() {
        let _running = gate.read();
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %err, "Asynchronous hook failed");
            }
            Err(_) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Asynchronous hook panicked");
            }
        }
    }

    counters.live_workers.fetch_sub(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Instant;

    fn wait_for(pool: &HookPool, check: impl Fn(&HookPoolStats) -> bool) -> HookPoolStats {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let stats = pool.stats();
            if check(&stats) || Instant::now() > deadline {
                return stats;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_jobs_run_on_workers() {
        let pool = HookPool::new(HookPoolConfig::default()).unwrap();
        let (tx, rx) = unbounded();

        for i in 0..10 {
            let tx = tx.clone();
            assert!(pool.submit(Box::new(move || {
                tx.send(i).unwrap();
                Ok(())
            })));
        }

        let mut seen: Vec<i32> = (0..10)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(pool.stats().submitted, 10);
    }

    #[test]
    fn test_failures_and_panics_are_contained() {
        let pool = HookPool::new(HookPoolConfig {
            workers: 1,
            ..Default::default()
        })
        .unwrap();

        pool.submit(Box::new(|| Err(HookError::Failed("nope".into()))));
        pool.submit(Box::new(|| -> Result<(), HookError> { panic!("hook blew up") }));

        // The worker must survive both and keep serving jobs
        let (tx, rx) = unbounded();
        pool.submit(Box::new(move || {
            tx.send(()).unwrap();
            Ok(())
        }));
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let stats = wait_for(&pool, |s| s.failed == 1 && s.panicked == 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.panicked, 1);
    }

    /// Occupy the single worker so queued jobs stay queued
    fn blocked_pool(overflow: OverflowPolicy) -> (HookPool, Sender<()>) {
        let pool = HookPool::new(HookPoolConfig {
            workers: 1,
            queue_capacity: 1,
            overflow,
        })
        .unwrap();

        let (started_tx, started_rx) = bounded(1);
        let (release_tx, release_rx) = bounded::<()>(1);
        pool.submit(Box::new(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
            Ok(())
        }));
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        (pool, release_tx)
    }

    #[test]
    fn test_drop_newest_discards_submitted_job() {
        let (pool, release) = blocked_pool(OverflowPolicy::DropNewest);
        let (tx, rx) = unbounded();

        let first = tx.clone();
        assert!(pool.submit(Box::new(move || {
            first.send("first").unwrap();
            Ok(())
        })));
        let second = tx.clone();
        assert!(!pool.submit(Box::new(move || {
            second.send("second").unwrap();
            Ok(())
        })));

        release.send(()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "first");
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(pool.stats().dropped, 1);
    }

    #[test]
    fn test_drop_oldest_evicts_queued_job() {
        let (pool, release) = blocked_pool(OverflowPolicy::DropOldest);
        let (tx, rx) = unbounded();

        let first = tx.clone();
        assert!(pool.submit(Box::new(move || {
            first.send("first").unwrap();
            Ok(())
        })));
        let second = tx.clone();
        assert!(pool.submit(Box::new(move || {
            second.send("second").unwrap();
            Ok(())
        })));

        release.send(()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "second");
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(pool.stats().dropped, 1);
    }

    #[test]
    fn test_block_times_out_when_queue_stays_full() {
        let (pool, release) = blocked_pool(OverflowPolicy::Block {
            timeout: Duration::from_millis(20),
        });

        assert!(pool.submit(Box::new(|| Ok(()))));
        let started = Instant::now();
        assert!(!pool.submit(Box::new(|| Ok(()))));
        assert!(started.elapsed() >= Duration::from_millis(20));

        release.send(()).unwrap();
        assert_eq!(pool.stats().dropped, 1);
    }

    #[test]
    fn test_pause_waits_for_running_job() {
        let pool = HookPool::new(HookPoolConfig::default()).unwrap();
        let (started_tx, started_rx) = bounded(1);
        let finished = Arc::new(AtomicUsize::new(0));

        let done = Arc::clone(&finished);
        pool.submit(Box::new(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let _paused = pool.pause();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_joins_workers_and_drops_later_jobs() {
        let pool = HookPool::new(HookPoolConfig {
            workers: 3,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(pool.stats().workers, 3);

        let (tx, rx) = unbounded();
        assert!(pool.submit(Box::new(move || {
            tx.send(()).unwrap();
            Ok(())
        })));

        pool.shutdown();
        // Queued work drains before the workers exit
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(pool.stats().workers, 0);

        assert!(!pool.submit(Box::new(|| Ok(()))));
        let stats = pool.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.dropped, 1);

        pool.shutdown();
    }
}
