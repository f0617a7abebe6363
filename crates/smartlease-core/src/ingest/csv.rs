//! Listing feed CSV reader
//!
//! Projects each row onto the store columns: headers are matched
//! case-insensitively, extra columns are ignored and missing ones read as
//! empty. Rows without a `property_id` are skipped.

use crate::db::PropertyRecord;
use crate::error::{Result, SmartLeaseError};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// Rows read from a listings CSV
#[derive(Debug, Default)]
pub struct CsvBatch {
    pub records: Vec<PropertyRecord>,
    /// 1-based data row numbers that had no property id
    pub skipped_rows: Vec<usize>,
}

/// Read a listings CSV file
pub fn read_properties_csv(path: &Path) -> Result<CsvBatch> {
    let file = std::fs::File::open(path).map_err(|e| {
        SmartLeaseError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read CSV file {:?}: {}", path, e),
        ))
    })?;
    read_properties(file)
}

/// Read listings CSV data from any reader
pub fn read_properties<R: Read>(reader: R) -> Result<CsvBatch> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if !headers
        .iter()
        .any(|h| h.trim().eq_ignore_ascii_case("property_id"))
    {
        return Err(SmartLeaseError::InvalidInput(
            "CSV has no property_id column".to_string(),
        ));
    }

    let mut batch = CsvBatch::default();
    for (row_num, result) in reader.records().enumerate() {
        let row = result?;
        let fields = headers.iter().zip(row.iter());
        match PropertyRecord::from_fields(fields) {
            Ok(record) => batch.records.push(record),
            Err(SmartLeaseError::InvalidInput(_)) => {
                tracing::warn!("Skipping CSV row {}: missing property_id", row_num + 1);
                batch.skipped_rows.push(row_num + 1);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_known_columns() {
        let data = "\
Property_ID,Address,Beds,List_Price,agent_phone
p1,\"10 Elm St, Boston\",2,1800,555-0100
,nowhere,1,900,
p2,5 Oak Ave,3,2400,
";
        let batch = read_properties(data.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped_rows, vec![2]);

        let first = &batch.records[0];
        assert_eq!(first.property_id, "p1");
        assert_eq!(first.get("address"), "10 Elm St, Boston");
        assert_eq!(first.get("list_price"), "1800");
        assert_eq!(first.get("sqft"), "");
        assert!(!first.summary.contains("555-0100"));
    }

    #[test]
    fn test_requires_property_id_header() {
        let err = read_properties("address,beds\n1 Main St,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SmartLeaseError::InvalidInput(_)));
    }
}
