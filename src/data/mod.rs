//! Measurement tables and their CSV files.

mod store;
mod table;

pub use store::DataError;
pub use table::{ParamValue, Record, Table};
