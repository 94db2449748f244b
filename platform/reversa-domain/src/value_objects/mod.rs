pub mod decision;
pub mod observation;
pub mod signal;
pub mod trade_event;
