pub mod portfolio;
pub mod table;
