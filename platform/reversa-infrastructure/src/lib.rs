pub mod artifacts;
pub mod dataset;
pub mod reporting;
