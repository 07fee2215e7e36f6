//! CSV persistence for [`Table`].
//!
//! Layout: a header row with the column keys, one row per record (absent
//! values as empty cells), then one `name,value` row per run parameter.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use super::table::{ParamValue, Record, Table};

/// Table persistence errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV file has no header row")]
    MissingHeader,
}

impl Table {
    /// Write the table as CSV to `path`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let file = File::create(path.as_ref())?;
        self.to_writer(file)?;
        tracing::info!("Wrote {} records to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    /// Write the table as CSV.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), DataError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        csv_writer.write_record(&self.keys)?;
        for record in &self.records {
            let row: Vec<String> = self
                .keys
                .iter()
                .map(|k| record.get(k).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            csv_writer.write_record(&row)?;
        }
        for (name, value) in &self.parameters {
            csv_writer.write_record([name.as_str(), value.to_string().as_str()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Read a table written by [`Table::write_csv`].
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a table from CSV.
    ///
    /// A row is a record when it has one field per key and its first field is
    /// numeric; any other non-empty row is a `name,value` parameter.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = csv_reader.records();
        let header = rows.next().ok_or(DataError::MissingHeader)??;
        let keys: Vec<String> = header.iter().map(|k| k.trim().to_string()).collect();
        if keys.iter().all(|k| k.is_empty()) {
            return Err(DataError::MissingHeader);
        }

        let mut table = Table {
            keys,
            ..Default::default()
        };

        for row in rows {
            let row = row?;
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            let first = row.get(0).unwrap_or_default().trim();
            if row.len() == table.keys.len() && first.parse::<f64>().is_ok() {
                let record: Record = table
                    .keys
                    .iter()
                    .zip(row.iter())
                    .filter_map(|(k, v)| Some((k.clone(), v.trim().parse::<f64>().ok()?)))
                    .collect();
                table.push(record);
            } else {
                let value = row.get(1).unwrap_or_default();
                table
                    .parameters
                    .push((first.to_string(), ParamValue::parse(value)));
            }
        }

        Ok(table)
    }
}
