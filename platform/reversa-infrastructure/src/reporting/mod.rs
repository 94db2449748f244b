use reversa_domain::entities::table::Table;
use reversa_domain::value_objects::trade_event::TradeEvent;
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create table csv {}: {}", path.display(), err))?;

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(table.index_name());
    header.extend(table.column_names());
    wtr.write_record(&header)
        .map_err(|err| format!("failed to write table csv header: {}", err))?;

    for (row, index) in table.index().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(index.clone());
        for column in table.columns() {
            record.push(column.cells[row].render());
        }
        wtr.write_record(&record)
            .map_err(|err| format!("failed to write table row {}: {}", index, err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush table csv: {}", err))
}

pub fn write_events_csv(path: &Path, events: &[TradeEvent]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create events csv {}: {}", path.display(), err))?;
    wtr.write_record(["index", "kind", "shares", "price", "cash_after"])
        .map_err(|err| format!("failed to write events csv header: {}", err))?;

    for event in events {
        wtr.write_record([
            event.index().to_string(),
            event.kind().to_string(),
            event.shares().to_string(),
            event.price().to_string(),
            event.cash_after().to_string(),
        ])
        .map_err(|err| format!("failed to write events row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush events csv: {}", err))
}

pub fn write_events_jsonl(path: &Path, events: &[TradeEvent]) -> Result<(), String> {
    let mut file = fs::File::create(path)
        .map_err(|err| format!("failed to create events jsonl {}: {}", path.display(), err))?;
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|err| format!("failed to serialize trade event: {}", err))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|err| format!("failed to write trade event: {}", err))?;
    }
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &serde_json::Value) -> Result<(), String> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|err| format!("failed to serialize summary: {}", err))?;
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create summary: {}", err))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write summary: {}", err))
}
