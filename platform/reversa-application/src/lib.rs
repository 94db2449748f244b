pub mod backtesting;
pub mod config;
pub mod importances;
pub mod pipeline;
pub mod preparing;
mod shared;
pub mod validation;
