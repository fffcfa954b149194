use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::OutputError;
use crate::record::ScrapedRecord;

/// Write all records as one pretty-printed JSON array, replacing any existing file.
pub fn write_records(path: &Path, records: &[ScrapedRecord]) -> Result<(), OutputError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n").map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    Ok(())
}
