use std::collections::HashSet;

const MISSING_MARKERS: [&str; 6] = ["", "nan", "na", "n/a", "null", "none"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parses a raw CSV field: missing markers, then numbers, then text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
        {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_nan() => Cell::Missing,
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Number(value) => value.to_string(),
            Cell::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

/// Column-oriented in-memory table keyed by a row index (usually a date).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index_name: String,
    index: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(index_name: impl Into<String>, index: Vec<String>) -> Self {
        Self {
            index_name: index_name.into(),
            index,
            columns: Vec::new(),
        }
    }

    pub fn from_columns(
        index_name: impl Into<String>,
        index: Vec<String>,
        columns: Vec<Column>,
    ) -> Result<Self, String> {
        let mut table = Self::new(index_name, index);
        let mut seen = HashSet::new();
        for column in columns {
            if !seen.insert(column.name.clone()) {
                return Err(format!("duplicate column name: {}", column.name));
            }
            table.set_column(column.name, column.cells)?;
        }
        Ok(table)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn require(&self, name: &str) -> Result<&Column, String> {
        self.column(name)
            .ok_or_else(|| format!("missing column: {name}"))
    }

    /// Inserts a column, replacing an existing one with the same name in place.
    pub fn set_column(&mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<(), String> {
        let name = name.into();
        if cells.len() != self.index.len() {
            return Err(format!(
                "column {name} has {} rows, table has {}",
                cells.len(),
                self.index.len()
            ));
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.cells = cells,
            None => self.columns.push(Column { name, cells }),
        }
        Ok(())
    }

    pub fn set_numeric(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<(), String> {
        let cells = values.into_iter().map(Cell::from_option).collect();
        self.set_column(name, cells)
    }

    /// Numeric view of a column. Text cells are an error.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, String> {
        let column = self.require(name)?;
        column
            .cells
            .iter()
            .zip(&self.index)
            .map(|(cell, idx)| match cell {
                Cell::Missing => Ok(None),
                Cell::Number(value) => Ok(Some(*value)),
                Cell::Text(text) => Err(format!(
                    "column {name} at {idx}: expected a number, found {text:?}"
                )),
            })
            .collect()
    }

    pub fn map_cells<F>(&mut self, name: &str, mut f: F) -> Result<(), String>
    where
        F: FnMut(&str, &Cell) -> Result<Cell, String>,
    {
        let index = &self.index;
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| format!("missing column: {name}"))?;
        let mut mapped = Vec::with_capacity(column.cells.len());
        for (cell, idx) in column.cells.iter().zip(index) {
            mapped.push(f(idx, cell)?);
        }
        column.cells = mapped;
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), String> {
        if from != to && self.has_column(to) {
            return Err(format!("cannot rename {from} to {to}: column exists"));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| format!("missing column: {from}"))?;
        column.name = to.to_string();
        Ok(())
    }

    /// Removes the named columns, ignoring names that are not present.
    pub fn drop_columns(&mut self, names: &[String]) -> usize {
        let before = self.columns.len();
        self.columns.retain(|c| !names.iter().any(|n| n == &c.name));
        before - self.columns.len()
    }

    /// Removes every row holding a missing cell in any column.
    pub fn drop_missing_rows(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.index.len())
            .map(|row| self.columns.iter().all(|c| !c.cells[row].is_missing()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return 0;
        }

        let mut row = 0;
        self.index.retain(|_| {
            let k = keep[row];
            row += 1;
            k
        });
        for column in &mut self.columns {
            let mut row = 0;
            column.cells.retain(|_| {
                let k = keep[row];
                row += 1;
                k
            });
        }
        dropped
    }

    /// New table with the named columns, in the order given.
    pub fn select(&self, names: &[String]) -> Result<Table, String> {
        let mut out = Table::new(self.index_name.clone(), self.index.clone());
        for name in names {
            let column = self.require(name)?;
            out.set_column(name.clone(), column.cells.clone())?;
        }
        Ok(out)
    }

    pub fn missing_count(&self, name: &str) -> Result<usize, String> {
        Ok(self
            .require(name)?
            .cells
            .iter()
            .filter(|c| c.is_missing())
            .count())
    }

    pub fn missing_total(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.cells.iter().filter(|cell| cell.is_missing()).count())
            .sum()
    }
}
