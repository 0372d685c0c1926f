use crate::error::{AppError, Result};
use csv::ReaderBuilder;

/// An uploaded tabular dataset: named columns over string cells.
///
/// Lifetime is one request; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawFrame {
    /// Parse an uploaded CSV file. A header row is required and every record
    /// must have the same width as the header.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Validation(format!("Invalid CSV header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(AppError::Validation("CSV upload has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                AppError::Validation(format!("Invalid CSV record at line {}: {}", i + 2, e))
            })?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        if rows.is_empty() {
            return Err(AppError::Validation("CSV upload contains no data rows".to_string()));
        }

        Ok(Self { columns, rows })
    }

    /// Index of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_csv() {
        let csv = b"id,Age,Response\n1,44,1\n2,31,0\n";
        let frame = RawFrame::from_csv(csv).unwrap();

        assert_eq!(frame.columns, vec!["id", "Age", "Response"]);
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.rows[0], vec!["1", "44", "1"]);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let csv = b"Age, Response\n 44 , 1\n";
        let frame = RawFrame::from_csv(csv).unwrap();
        assert_eq!(frame.columns, vec!["Age", "Response"]);
        assert_eq!(frame.rows[0], vec!["44", "1"]);
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let csv = b"a,b,c\n1,2,3\n4,5\n";
        let err = RawFrame::from_csv(csv).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        assert!(RawFrame::from_csv(b"").is_err());
    }

    #[test]
    fn test_header_only_upload_is_rejected() {
        let err = RawFrame::from_csv(b"a,b,c\n").unwrap_err();
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn test_column_index() {
        let frame = RawFrame::from_csv(b"id,Age\n1,2\n").unwrap();
        assert_eq!(frame.column_index("Age"), Some(1));
        assert_eq!(frame.column_index("missing"), None);
    }
}
