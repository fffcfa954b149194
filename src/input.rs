use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::error::InputError;
use crate::record::InputRow;

const REQUIRED_COLUMNS: [&str; 2] = ["url", "topic"];

/// Read the (url, topic) list from a CSV file with a header row.
pub fn read_rows(path: &Path) -> Result<Vec<InputRow>, InputError> {
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = parse_rows(file)?;
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn parse_rows<R: Read>(input: R) -> Result<Vec<InputRow>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(InputError::MissingColumn(column));
        }
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: InputRow = record.deserialize(Some(&headers))?;
        if row.url.is_empty() {
            // Line the record starts on; quoted cells may span several lines
            let line = record.position().map_or(0, |p| p.line());
            return Err(InputError::EmptyUrl { line });
        }
        rows.push(row);
    }
    Ok(rows)
}
