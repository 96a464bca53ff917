pub mod api;
pub mod core;

pub use crate::api::thermal::ThermalDataExtractor;
pub use crate::core::extraction::{
    AggregatedResult, Category, ExtractionError, ExtractionOutcome, ExtractorConfig,
    ParallelExtractor, WorkerPool,
};
pub use crate::core::thermal::ThermalFrame;

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("thermal_extract"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // the embedding binary installs its own `log` backend
    }
}
