//! 并行数据提取 - 在帧率推导的截止时间内，从同一数据源并行提取多种类别
//!
//! 核心流程：
//! 1. 截止时间 - 由数据源帧率计算，验证模式使用更长的固定时间
//! 2. 线程池 - 固定大小、惰性创建、跨调用复用
//! 3. 扇出收集 - 超时的类别被放弃，不影响其他类别
//! 4. 合并 - 仅保留成功类别的键

pub mod cancel;
pub mod category;
pub mod config;
pub mod deadline;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod outcome;
pub mod pool;
pub mod registry;
pub mod resource;
pub mod response;

pub use cancel::CancellationToken;
pub use category::{available_categories, dedup_preserving_order, validate_category, Category};
pub use config::ExtractorConfig;
pub use deadline::{compute_deadline, DeadlineConfig, RateSignal, TimeoutInfo};
pub use error::ExtractionError;
pub use merge::{merge, AggregatedResult, MissingCategory, OutcomeMap};
pub use orchestrator::ParallelExtractor;
pub use outcome::{ExtractionOutcome, ExtractionRequest};
pub use pool::{PoolHandle, PoolStats, ShutdownReport, WorkerPool};
pub use registry::{Extractor, ExtractorRegistry};
pub use resource::{CategoryData, Payload, ResourceSlot, ThermalResource};
pub use response::{format_error_response, format_response_for_view, ViewResponse};
