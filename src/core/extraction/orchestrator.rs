//! 并行提取编排器
//!
//! 1. 去重 - 保持首次出现的顺序
//! 2. 扇出 - 每个类别一个任务，提交到共享线程池
//! 3. 收集 - 在截止时间内按完成顺序接收结果
//! 4. 超时 - 未完成的类别记为 TimedOut，任务被放弃但不阻塞调用方
//! 5. 合并 - 仅合并成功的结果

use crossbeam_channel::{unbounded, RecvTimeoutError};
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::cancel::CancellationToken;
use super::category::{available_categories, dedup_preserving_order, Category};
use super::config::ExtractorConfig;
use super::deadline::{compute_deadline, DeadlineConfig, RateSignal, TimeoutInfo};
use super::error::ExtractionError;
use super::merge::{merge, AggregatedResult, OutcomeMap};
use super::outcome::{ExtractionOutcome, ExtractionRequest};
use super::pool::{PoolHandle, PoolStats, ShutdownReport, WorkerPool};
use super::registry::{Extractor, ExtractorRegistry};
use super::resource::Payload;

/// 并行提取器 - 共享线程池 + 帧率截止时间
pub struct ParallelExtractor<S> {
    pool: Arc<WorkerPool>,
    registry: Arc<ExtractorRegistry<S>>,
    source: RwLock<Arc<S>>,
    deadline: DeadlineConfig,
}

impl<S> ParallelExtractor<S>
where
    S: Send + Sync + 'static,
{
    /// Builds an extractor with its own pool. The pool threads start on first use.
    pub fn new(
        source: S,
        registry: ExtractorRegistry<S>,
        config: &ExtractorConfig,
    ) -> Result<Self, ExtractionError> {
        config.validate()?;
        Ok(Self::with_pool(
            source,
            registry,
            Arc::new(WorkerPool::new(config)),
            config.deadline.clone(),
        ))
    }

    /// Builds an extractor on a pool owned by the caller, e.g. one shared by several sources.
    pub fn with_pool(
        source: S,
        registry: ExtractorRegistry<S>,
        pool: Arc<WorkerPool>,
        deadline: DeadlineConfig,
    ) -> Self {
        Self {
            pool,
            registry: Arc::new(registry),
            source: RwLock::new(Arc::new(source)),
            deadline,
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn registry(&self) -> &ExtractorRegistry<S> {
        &self.registry
    }

    pub fn deadline_config(&self) -> &DeadlineConfig {
        &self.deadline
    }

    pub fn current_source(&self) -> Arc<S> {
        let source = self.source.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*source)
    }

    /// Swaps the data source. Calls already in flight keep the old one.
    pub fn update_source(&self, source: S) {
        let mut current = self.source.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(source);
        info!("🔄 Data source updated in ParallelExtractor");
    }

    pub fn extract_parallel(
        &self,
        categories: &[Category],
        deadline: Duration,
    ) -> Result<AggregatedResult, ExtractionError> {
        self.extract_parallel_with_cancel(categories, deadline, &CancellationToken::new())
    }

    /// Runs every distinct category on the pool and merges what finished before `deadline`.
    ///
    /// Per-category errors, panics and timeouts end up in `AggregatedResult::missing`;
    /// only a pool that cannot be created fails the call. Units still running at the
    /// deadline are cancelled cooperatively and left to finish in the background.
    pub fn extract_parallel_with_cancel(
        &self,
        categories: &[Category],
        deadline: Duration,
        parent: &CancellationToken,
    ) -> Result<AggregatedResult, ExtractionError> {
        let unique = dedup_preserving_order(categories);
        if unique.is_empty() {
            return Ok(AggregatedResult::empty());
        }

        let pool = self.pool.acquire_pool()?;
        let outcomes = self.fan_out(&pool, &unique, deadline, parent);
        Ok(merge(outcomes))
    }

    /// 扇出并收集 - 每个类别恰好产生一个结果
    fn fan_out(
        &self,
        pool: &PoolHandle,
        unique: &[Category],
        deadline: Duration,
        parent: &CancellationToken,
    ) -> OutcomeMap {
        let source = self.current_source();
        let cancel = parent.child_token();
        let (tx, rx) = unbounded::<(Category, ExtractionOutcome)>();

        let started = Instant::now();
        // None: the deadline is too far out to represent, wait for every unit
        let deadline_at = started.checked_add(deadline);
        let mut outcomes = OutcomeMap::with_capacity(unique.len());

        for category in unique {
            let request = ExtractionRequest::new(category.clone(), Arc::clone(&source));
            let extractor = self.registry.get(category);
            let unit_cancel = cancel.clone();
            let unit_tx = tx.clone();

            let submitted = pool.spawn(move || {
                let category = request.category().clone();
                let outcome = run_unit(&request, extractor, &unit_cancel);
                // The coordinator may have returned already; a late result is dropped.
                let _ = unit_tx.send((category, outcome));
            });

            if let Err(e) = submitted {
                warn!("⚠️ Could not submit {}: {}", category, e);
                outcomes.insert(category.clone(), ExtractionOutcome::Failure(e.to_string()));
            }
        }
        drop(tx);

        while outcomes.len() < unique.len() {
            let received = match deadline_at {
                Some(at) => rx.recv_deadline(at),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((category, outcome)) => {
                    outcomes.insert(category, outcome);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let pending = unique.len() - outcomes.len();
        if pending > 0 {
            cancel.cancel();
            warn!(
                "Data extraction timed out after {:.3}s, abandoning {} of {} categories",
                deadline.as_secs_f64(),
                pending,
                unique.len()
            );
            for category in unique {
                if !outcomes.contains_key(category) {
                    outcomes.insert(category.clone(), ExtractionOutcome::TimedOut);
                }
            }
            self.pool.record_abandoned(pending);
        }

        debug!(
            "Parallel extraction of {} categories finished in {:.3}s (deadline {:.3}s)",
            unique.len(),
            started.elapsed().as_secs_f64(),
            deadline.as_secs_f64()
        );

        outcomes
    }

    pub fn shutdown(&self) -> ShutdownReport {
        self.pool.shutdown()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl<S> ParallelExtractor<S>
where
    S: RateSignal + Send + Sync + 'static,
{
    /// Extracts with a deadline derived from the source's current rate.
    pub fn extract_all(
        &self,
        categories: &[Category],
        validation: bool,
    ) -> Result<AggregatedResult, ExtractionError> {
        let rate = self.current_source().rate_hz();
        let deadline = compute_deadline(rate, validation, &self.deadline);
        debug!(
            "Extracting {} categories, rate {:?} Hz, deadline {:.3}s",
            categories.len(),
            rate,
            deadline.as_secs_f64()
        );
        self.extract_parallel(categories, deadline)
    }

    /// Runs one category with the validation budget. `None` on any kind of miss.
    pub fn extract_single_validation(&self, category: &Category) -> Option<Payload> {
        let deadline = compute_deadline(None, true, &self.deadline);
        match self.extract_parallel(std::slice::from_ref(category), deadline) {
            Ok(result) => {
                if let Some(missing) = result.missing.first() {
                    warn!(
                        "Validation miss for data type '{}': {}",
                        category, missing.reason
                    );
                    return None;
                }
                Some(result.image_data)
            }
            Err(e) => {
                error!("Validation error for data type '{}': {}", category, e);
                None
            }
        }
    }

    pub fn timeout_info(&self) -> TimeoutInfo {
        TimeoutInfo::new(self.current_source().rate_hz(), &self.deadline)
    }
}

fn run_unit<S>(
    request: &ExtractionRequest<S>,
    extractor: Option<Arc<dyn Extractor<S>>>,
    cancel: &CancellationToken,
) -> ExtractionOutcome {
    if cancel.is_cancelled() {
        return ExtractionOutcome::Cancelled;
    }

    let extractor = match extractor {
        Some(extractor) => extractor,
        None => {
            let err = ExtractionError::UnknownCategory {
                name: request.category().to_string(),
                available: available_categories()
                    .keys()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            return ExtractionOutcome::Failure(err.to_string());
        }
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        extractor.extract(request.target(), cancel)
    }));

    match result {
        Ok(Ok(data)) => ExtractionOutcome::Success(data.into_payload()),
        Ok(Err(ExtractionError::Cancelled)) => ExtractionOutcome::Cancelled,
        Ok(Err(e)) => ExtractionOutcome::Failure(e.to_string()),
        Err(panic) => {
            let err = ExtractionError::Panicked(panic_message(&*panic));
            ExtractionOutcome::Failure(err.to_string())
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extraction::resource::CategoryData;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    struct MockSource {
        fps: Option<f64>,
        label: &'static str,
    }

    impl RateSignal for MockSource {
        fn rate_hz(&self) -> Option<f64> {
            self.fps
        }
    }

    fn source(label: &'static str) -> MockSource {
        MockSource { fps: None, label }
    }

    fn keyed(key: &str, value: serde_json::Value) -> Result<CategoryData, ExtractionError> {
        let mut data = CategoryData::new();
        data.push_raw(key, value);
        Ok(data)
    }

    fn cats(names: &[&str]) -> Vec<Category> {
        names.iter().map(|n| Category::from(*n)).collect()
    }

    fn basic_registry(calls: Arc<AtomicUsize>) -> ExtractorRegistry<MockSource> {
        let gps_calls = Arc::clone(&calls);
        let camera_calls = calls;
        ExtractorRegistry::new()
            .with("gps", move |s: &MockSource, _| {
                gps_calls.fetch_add(1, Ordering::SeqCst);
                keyed("GpsInformation", json!({ "Source": s.label }))
            })
            .with("camera", move |_, _| {
                camera_calls.fetch_add(1, Ordering::SeqCst);
                keyed("CameraInformation", json!({ "Model": "Gx620" }))
            })
    }

    fn extractor_with(
        registry: ExtractorRegistry<MockSource>,
    ) -> ParallelExtractor<MockSource> {
        ParallelExtractor::new(source("frame-1"), registry, &ExtractorConfig::default()).unwrap()
    }

    #[test]
    fn test_duplicates_submitted_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = extractor_with(basic_registry(Arc::clone(&calls)));

        let result = extractor
            .extract_parallel(&cats(&["gps", "gps", "camera"]), Duration::from_secs(5))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(extractor.pool_stats().submitted_units, 2);
        assert_eq!(result.data_keys.len(), 2);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn test_unknown_category_fails_alone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = extractor_with(basic_registry(calls));

        let result = extractor
            .extract_parallel(&cats(&["gps", "camera", "bogus"]), Duration::from_secs(5))
            .unwrap();

        assert!(result.image_data.contains_key("GpsInformation"));
        assert!(result.image_data.contains_key("CameraInformation"));
        assert_eq!(result.data_keys.len(), 2);
        assert_eq!(result.missing_categories(), cats(&["bogus"]));
        assert_eq!(result.missing[0].reason, "failure");
        assert!(!result.provenance.values().any(|c| c.as_str() == "bogus"));
    }

    #[test]
    fn test_failing_and_panicking_extractors_are_isolated() {
        let registry = basic_registry(Arc::new(AtomicUsize::new(0)))
            .with("gas", |_, _| Err(ExtractionError::extractor("sensor offline")))
            .with("zoom", |_, _| panic!("zoom driver crashed"));
        let extractor = extractor_with(registry);

        let result = extractor
            .extract_parallel(
                &cats(&["gas", "gps", "zoom", "camera"]),
                Duration::from_secs(5),
            )
            .unwrap();

        assert_eq!(result.contributing_categories().len(), 2);
        assert!(result.image_data.contains_key("GpsInformation"));
        assert!(result.image_data.contains_key("CameraInformation"));

        let mut missing = result.missing_categories();
        missing.sort();
        assert_eq!(missing, cats(&["gas", "zoom"]));
        let zoom = result
            .missing
            .iter()
            .find(|m| m.category.as_str() == "zoom")
            .unwrap();
        assert!(zoom.detail.as_deref().unwrap().contains("zoom driver crashed"));
    }

    #[test]
    fn test_slow_extractor_times_out_without_blocking() {
        let registry = ExtractorRegistry::new().with("statistics", |_: &MockSource, _| {
            thread::sleep(Duration::from_millis(500));
            keyed("Statistics", json!({ "Max": 41.5 }))
        });
        let extractor = extractor_with(registry);

        let started = Instant::now();
        let result = extractor
            .extract_parallel(&cats(&["statistics"]), Duration::from_millis(20))
            .unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_millis(300), "took {:?}", elapsed);
        assert!(result.image_data.is_empty());
        assert!(result.data_keys.is_empty());
        assert_eq!(result.missing[0].reason, "timed_out");
        assert_eq!(extractor.pool_stats().abandoned_units, 1);
    }

    #[test]
    fn test_partial_results_at_deadline() {
        let registry = basic_registry(Arc::new(AtomicUsize::new(0))).with("palette", |_, _| {
            thread::sleep(Duration::from_millis(400));
            keyed("Palette", json!({ "name": "iron" }))
        });
        let extractor = extractor_with(registry);

        let result = extractor
            .extract_parallel(
                &cats(&["palette", "gps", "camera"]),
                Duration::from_millis(150),
            )
            .unwrap();

        assert_eq!(result.data_keys.len(), 2);
        assert!(!result.image_data.contains_key("Palette"));
        assert_eq!(result.missing_categories(), cats(&["palette"]));
    }

    #[test]
    fn test_cancellation_reaches_slow_unit() {
        let observed = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&observed);
        let registry = ExtractorRegistry::new().with("compass", move |_: &MockSource, cancel| {
            let until = Instant::now() + Duration::from_secs(2);
            while Instant::now() < until {
                if cancel.is_cancelled() {
                    seen.store(true, Ordering::SeqCst);
                    return Err(ExtractionError::Cancelled);
                }
                thread::sleep(Duration::from_millis(5));
            }
            keyed("CompassInformation", json!({ "Degrees": 90 }))
        });
        let extractor = extractor_with(registry);

        let result = extractor
            .extract_parallel(&cats(&["compass"]), Duration::from_millis(30))
            .unwrap();
        assert!(result.is_empty());

        let report = extractor.shutdown();
        assert!(report.drained());
        assert!(observed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_parent_cancel_before_start() {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = extractor_with(basic_registry(Arc::clone(&calls)));
        let parent = CancellationToken::new();
        parent.cancel();

        let result = extractor
            .extract_parallel_with_cancel(&cats(&["gps", "camera"]), Duration::from_secs(5), &parent)
            .unwrap();

        assert!(result.is_empty());
        assert!(result.missing.iter().all(|m| m.reason == "cancelled"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_input_never_touches_pool() {
        let extractor = extractor_with(basic_registry(Arc::new(AtomicUsize::new(0))));

        let result = extractor.extract_parallel(&[], Duration::from_secs(1)).unwrap();

        assert!(result.data_keys.is_empty());
        assert!(result.image_data.is_empty());
        let stats = extractor.pool_stats();
        assert_eq!(stats.acquisitions, 0);
        assert_eq!(stats.pools_created, 0);
    }

    #[test]
    fn test_concurrent_calls_do_not_interfere() {
        let registry = ExtractorRegistry::new()
            .with("gps", |_: &MockSource, _| {
                thread::sleep(Duration::from_millis(20));
                keyed("GpsInformation", json!(1))
            })
            .with("camera", |_, _| keyed("CameraInformation", json!(2)))
            .with("zoom", |_, _| keyed("ZoomInformation", json!(3)));
        let extractor = Arc::new(extractor_with(registry));

        let requests = [vec!["gps"], vec!["camera", "zoom"], vec!["zoom", "gps"]];
        let handles: Vec<_> = requests
            .iter()
            .cycle()
            .take(9)
            .map(|names| {
                let extractor = Arc::clone(&extractor);
                let categories = cats(names);
                thread::spawn(move || {
                    let result = extractor
                        .extract_parallel(&categories, Duration::from_secs(5))
                        .unwrap();
                    (categories, result)
                })
            })
            .collect();

        for handle in handles {
            let (categories, result) = handle.join().unwrap();
            let mut contributed = result.contributing_categories();
            contributed.sort();
            let mut expected = categories.clone();
            expected.sort();
            assert_eq!(contributed, expected);
        }
        assert_eq!(extractor.pool_stats().pools_created, 1);
    }

    #[test]
    fn test_update_source_between_calls() {
        let extractor = extractor_with(basic_registry(Arc::new(AtomicUsize::new(0))));

        let before = extractor
            .extract_parallel(&cats(&["gps"]), Duration::from_secs(5))
            .unwrap();
        extractor.update_source(source("frame-2"));
        let after = extractor
            .extract_parallel(&cats(&["gps"]), Duration::from_secs(5))
            .unwrap();

        assert_eq!(before.image_data["GpsInformation"]["Source"], json!("frame-1"));
        assert_eq!(after.image_data["GpsInformation"]["Source"], json!("frame-2"));
    }

    #[test]
    fn test_extract_after_shutdown_recreates_pool() {
        let extractor = extractor_with(basic_registry(Arc::new(AtomicUsize::new(0))));

        extractor
            .extract_parallel(&cats(&["gps"]), Duration::from_secs(5))
            .unwrap();
        assert!(extractor.shutdown().was_running);
        assert!(!extractor.shutdown().was_running);

        let result = extractor
            .extract_parallel(&cats(&["camera"]), Duration::from_secs(5))
            .unwrap();
        assert_eq!(result.data_keys, vec!["CameraInformation"]);
        assert_eq!(extractor.pool_stats().pools_created, 2);
    }

    #[test]
    fn test_rate_driven_extract_and_validation() {
        let mut config = ExtractorConfig::default();
        config.deadline.default_timeout_secs = 2.0;
        let extractor = ParallelExtractor::new(
            MockSource {
                fps: Some(2.0),
                label: "live",
            },
            basic_registry(Arc::new(AtomicUsize::new(0))),
            &config,
        )
        .unwrap();

        let info = extractor.timeout_info();
        assert_eq!(info.camera_fps, Some(2.0));
        assert_eq!(info.frequency_seconds, Some(0.5));

        let result = extractor.extract_all(&cats(&["gps", "camera"]), false).unwrap();
        assert_eq!(result.data_keys.len(), 2);

        let payload = extractor
            .extract_single_validation(&Category::from("camera"))
            .unwrap();
        assert_eq!(payload["CameraInformation"]["Model"], json!("Gx620"));
        assert!(extractor
            .extract_single_validation(&Category::from("bogus"))
            .is_none());
    }

    #[test]
    fn test_unbounded_deadline_waits_for_all() {
        let extractor = extractor_with(basic_registry(Arc::new(AtomicUsize::new(0))));

        let result = extractor
            .extract_parallel(&cats(&["gps", "camera"]), Duration::MAX)
            .unwrap();

        assert_eq!(result.data_keys.len(), 2);
        assert!(result.missing.is_empty());
        assert_eq!(extractor.pool_stats().abandoned_units, 0);
    }

    #[test]
    fn test_pool_creation_failure_is_fatal() {
        let pool = Arc::new(WorkerPool::new(&ExtractorConfig {
            workers: 0,
            ..Default::default()
        }));
        let extractor = ParallelExtractor::with_pool(
            source("x"),
            basic_registry(Arc::new(AtomicUsize::new(0))),
            pool,
            DeadlineConfig::default(),
        );

        let err = extractor
            .extract_parallel(&cats(&["gps"]), Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(err.is_fatal());
        assert_eq!(extractor.pool_stats().submitted_units, 0);
    }

    #[test]
    fn test_submit_on_closed_pool_reports_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = extractor_with(basic_registry(Arc::clone(&calls)));
        let stale = extractor.pool().acquire_pool().unwrap();
        assert!(extractor.shutdown().was_running);

        let unique = dedup_preserving_order(&cats(&["gps", "camera", "gps"]));
        let outcomes = extractor.fan_out(
            &stale,
            &unique,
            Duration::from_secs(1),
            &CancellationToken::new(),
        );

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .values()
            .all(|o| matches!(o, ExtractionOutcome::Failure(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = merge(outcomes);
        assert!(result.is_empty());
        assert_eq!(result.missing.len(), 2);
        assert!(result.missing.iter().all(|m| m.reason == "failure"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            workers: 0,
            ..Default::default()
        };
        let err = ParallelExtractor::new(
            source("x"),
            ExtractorRegistry::new(),
            &config,
        )
        .err()
        .unwrap();
        assert!(err.is_fatal());
    }
}
