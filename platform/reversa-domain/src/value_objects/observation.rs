use crate::value_objects::signal::SignalValue;

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub index: String,
    pub close: f64,
    pub signal: SignalValue,
}
