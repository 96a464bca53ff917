//! 工作线程池管理 - 惰性创建、跨调用复用、关闭时排空

use log::{debug, error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::config::ExtractorConfig;
use super::error::ExtractionError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct PoolCounters {
    pools_created: AtomicU64,
    acquisitions: AtomicU64,
    submitted: AtomicU64,
    abandoned: AtomicU64,
}

/// Units submitted to the current pool that have not finished yet.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    fn enter(&self) {
        *lock(&self.count) += 1;
    }

    fn leave(&self) {
        let mut count = lock(&self.count);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn current(&self) -> usize {
        *lock(&self.count)
    }

    /// Returns the number of units still running when the wait ended.
    fn wait_drained(&self, timeout: Option<Duration>) -> usize {
        let count = lock(&self.count);
        match timeout {
            None => *self
                .drained
                .wait_while(count, |c| *c > 0)
                .unwrap_or_else(PoisonError::into_inner),
            Some(limit) => {
                let (count, _) = self
                    .drained
                    .wait_timeout_while(count, limit, |c| *c > 0)
                    .unwrap_or_else(PoisonError::into_inner);
                *count
            }
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.leave();
    }
}

/// Cheap clone of the live pool, valid for one generation.
#[derive(Clone)]
pub struct PoolHandle {
    pool: Arc<ThreadPool>,
    open: Arc<AtomicBool>,
    in_flight: Arc<InFlight>,
    counters: Arc<PoolCounters>,
    generation: u64,
}

impl PoolHandle {
    /// Queues `job` on the pool. Fails once the pool has been shut down.
    pub fn spawn<F>(&self, job: F) -> Result<(), ExtractionError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.in_flight.enter();
        if !self.open.load(Ordering::SeqCst) {
            self.in_flight.leave();
            return Err(ExtractionError::PoolShutDown);
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        self.pool.spawn(move || {
            let _guard = guard;
            job();
        });
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// 关闭结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// False when there was no pool to stop.
    pub was_running: bool,
    /// Units still running when the drain wait gave up.
    pub outstanding: usize,
}

impl ShutdownReport {
    pub fn drained(&self) -> bool {
        self.outstanding == 0
    }
}

/// 线程池统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub is_running: bool,
    pub pools_created: u64,
    pub acquisitions: u64,
    pub submitted_units: u64,
    pub abandoned_units: u64,
    pub in_flight_units: usize,
}

/// Owns at most one rayon pool at a time.
///
/// The pool is built on the first `acquire_pool()`, shared by every call after
/// that, and released by `shutdown()` so the next acquire builds a fresh one.
pub struct WorkerPool {
    workers: usize,
    thread_name_prefix: String,
    drain_timeout: Option<Duration>,
    slot: Mutex<Option<PoolHandle>>,
    in_flight: Arc<InFlight>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            workers: config.workers,
            thread_name_prefix: config.thread_name_prefix.clone(),
            drain_timeout: config.drain_timeout(),
            slot: Mutex::new(None),
            in_flight: Arc::new(InFlight::default()),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// 获取共享线程池，首次调用时创建（加锁保证只创建一个）
    pub fn acquire_pool(&self) -> Result<PoolHandle, ExtractionError> {
        let mut slot = lock(&self.slot);
        self.counters.acquisitions.fetch_add(1, Ordering::Relaxed);

        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        if self.workers == 0 {
            return Err(ExtractionError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }

        let prefix = self.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .panic_handler(|_| error!("❌ Extraction worker panicked"))
            .build()
            .map_err(|e| {
                error!("❌ Failed to create ThreadPool: {}", e);
                ExtractionError::PoolCreation(e)
            })?;

        let generation = self.counters.pools_created.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "🧵 ThreadPool created with {} workers (generation {})",
            self.workers, generation
        );

        let handle = PoolHandle {
            pool: Arc::new(pool),
            open: Arc::new(AtomicBool::new(true)),
            in_flight: Arc::clone(&self.in_flight),
            counters: Arc::clone(&self.counters),
            generation,
        };
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Stops accepting work, waits for in-flight units and releases the pool.
    ///
    /// Calling it again, or before the pool ever existed, is a no-op.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut slot = lock(&self.slot);
        let handle = match slot.take() {
            Some(handle) => handle,
            None => {
                debug!("ThreadPool already shut down");
                return ShutdownReport {
                    was_running: false,
                    outstanding: 0,
                };
            }
        };

        handle.open.store(false, Ordering::SeqCst);
        let outstanding = self.in_flight.wait_drained(self.drain_timeout);
        if outstanding > 0 {
            warn!(
                "⚠️ ThreadPool released with {} units still running (drain timeout {:?})",
                outstanding, self.drain_timeout
            );
        }
        drop(handle);

        info!("🗑️ ThreadPool shutdown completed");
        ShutdownReport {
            was_running: true,
            outstanding,
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.slot).is_some()
    }

    pub(crate) fn record_abandoned(&self, count: usize) {
        if count > 0 {
            self.counters
                .abandoned
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers,
            is_running: self.is_running(),
            pools_created: self.counters.pools_created.load(Ordering::Relaxed),
            acquisitions: self.counters.acquisitions.load(Ordering::Relaxed),
            submitted_units: self.counters.submitted.load(Ordering::Relaxed),
            abandoned_units: self.counters.abandoned.load(Ordering::Relaxed),
            in_flight_units: self.in_flight.current(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
