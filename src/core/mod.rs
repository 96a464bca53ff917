pub mod extraction;
pub mod thermal;
