use crate::entities::table::{Cell, Table};
use crate::value_objects::observation::Observation;
use crate::value_objects::signal::SignalValue;

pub const PRICE_COLUMN: &str = "close";
pub const TARGET_COLUMN: &str = "Target";

/// Turns a cleaned table into backtest observations, keeping row order.
/// Any missing price or signal is an error: such rows must have been removed
/// before the table reaches the simulator.
pub fn observations_from_table(
    table: &Table,
    price_column: &str,
    signal_column: &str,
) -> Result<Vec<Observation>, String> {
    let prices = table.numeric(price_column)?;
    let signals = table
        .column(signal_column)
        .ok_or_else(|| format!("missing column: {signal_column}"))?;

    table
        .index()
        .iter()
        .zip(prices)
        .zip(&signals.cells)
        .map(|((index, price), signal)| {
            let close = price.ok_or_else(|| {
                format!("missing {price_column} at {index}: rows must be cleaned first")
            })?;
            let signal = match signal {
                Cell::Missing => {
                    return Err(format!(
                        "missing {signal_column} at {index}: rows must be cleaned first"
                    ))
                }
                Cell::Number(value) => SignalValue::from_number(*value),
                Cell::Text(label) => SignalValue::Label(label.clone()),
            };
            Ok(Observation {
                index: index.clone(),
                close,
                signal,
            })
        })
        .collect()
}
