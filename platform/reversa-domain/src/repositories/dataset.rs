use crate::entities::table::Table;
use serde::Serialize;
use std::path::Path;

/// Row-index quality findings collected while loading a dataset.
/// Rows are never reordered or removed by the loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetReport {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub duplicate_index: usize,
    pub first_duplicate: Option<String>,
    pub out_of_order: usize,
    pub first_out_of_order: Option<String>,
    pub unparsed_index: usize,
    pub first_unparsed_index: Option<String>,
}

pub trait DatasetRepository {
    fn load_table(&self, path: &Path) -> Result<(Table, DatasetReport), String>;
    /// Reads `(feature, importance)` pairs in file order.
    fn load_importances(&self, path: &Path) -> Result<(Vec<String>, Vec<f64>), String>;
}
