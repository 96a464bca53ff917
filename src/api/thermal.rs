//! 热成像数据提取器

use crate::core::extraction::{
    available_categories, format_error_response, format_response_for_view, validate_category,
    Category, ExtractionError, ExtractorConfig, ParallelExtractor, Payload, PoolStats,
    ShutdownReport, TimeoutInfo, ViewResponse,
};
use crate::core::thermal::{default_registry, ThermalFrame};
use log::{error, info};

/// 热成像数据提取器 - 按帧率限时并行提取
///
/// ```ignore
/// let extractor = ThermalDataExtractor::create(frame)?;
/// let response = extractor.extract(vec!["gps".into(), "statistics".into()]);
/// extractor.shutdown();
/// ```
pub struct ThermalDataExtractor {
    inner: ParallelExtractor<ThermalFrame>,
}

impl ThermalDataExtractor {
    /// 创建热成像数据提取器（默认配置，线程池首次提取时创建）
    pub fn create(frame: ThermalFrame) -> Result<Self, ExtractionError> {
        Self::with_config(frame, ExtractorConfig::default())
    }

    /// 使用自定义配置创建
    pub fn with_config(
        frame: ThermalFrame,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractionError> {
        crate::init_logging();
        let inner = ParallelExtractor::new(frame, default_registry(), &config).map_err(|e| {
            error!("❌ ThermalDataExtractor: invalid config: {}", e);
            e
        })?;
        info!(
            "🌡️ ThermalDataExtractor: created with {} workers",
            config.workers
        );
        Ok(Self { inner })
    }

    /// 并行提取指定数据类型（按当前帧率限时）
    pub fn extract(&self, data_types: Vec<String>) -> ViewResponse {
        self.extract_with_mode(data_types, false)
    }

    /// 提取 - 可选验证模式（更长的超时）
    pub fn extract_with_mode(&self, data_types: Vec<String>, validation: bool) -> ViewResponse {
        let categories: Vec<Category> = data_types.iter().map(|t| Category::parse(t)).collect();
        let requested = categories
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(",");

        match self.inner.extract_all(&categories, validation) {
            Ok(result) => format_response_for_view(result, &requested),
            Err(e) => {
                error!("❌ Extraction failed for [{}]: {}", requested, e);
                format_error_response(&e, &requested)
            }
        }
    }

    /// 单类型验证提取，失败或超时返回 None
    pub fn extract_validation(&self, data_type: String) -> Option<Payload> {
        self.inner
            .extract_single_validation(&Category::parse(&data_type))
    }

    /// 更新数据源帧
    pub fn update_frame(&self, frame: ThermalFrame) {
        self.inner.update_source(frame);
    }

    /// 获取可用数据类型及说明
    pub fn available_types() -> Vec<(String, String)> {
        available_categories()
            .iter()
            .map(|(name, description)| (name.to_string(), description.to_string()))
            .collect()
    }

    /// 校验数据类型名称
    pub fn validate_type(data_type: String) -> Result<String, ExtractionError> {
        validate_category(&data_type).map(|d| format!("Valid data type: {}", d))
    }

    /// 获取当前超时信息
    pub fn timeout_info(&self) -> TimeoutInfo {
        self.inner.timeout_info()
    }

    /// 获取线程池统计
    pub fn stats(&self) -> PoolStats {
        self.inner.pool_stats()
    }

    /// 关闭线程池（等待运行中的任务完成）
    pub fn shutdown(&self) -> ShutdownReport {
        self.inner.shutdown()
    }
}

impl Drop for ThermalDataExtractor {
    fn drop(&mut self) {
        info!("🗑️ ThermalDataExtractor: released");
    }
}
