pub mod backtest;
pub mod features;
pub mod importance;
pub mod observations;
pub mod pipeline;
pub mod signals;
