pub mod extractors;
pub mod frame;

pub use extractors::default_registry;
pub use frame::ThermalFrame;
