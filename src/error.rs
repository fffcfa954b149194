use std::path::PathBuf;

use thiserror::Error;

/// The external fetch + extraction call failed for one URL.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine config error: {0}")]
    Config(String),

    #[error("page fetch failed: {0}")]
    Fetch(String),

    #[error("no content returned for {url}")]
    EmptyPage { url: String },

    #[error("language model error: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A record could not be constructed from the resolved fields.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be a string, got {found}")]
    WrongType {
        field: &'static str,
        found: &'static str,
    },

    #[error("document {index}: {source}")]
    InvalidDocument {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Why a single row produced an error record instead of a scraped one.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unusable engine result: expected a JSON object, got {found}")]
    UnusableShape { found: &'static str },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// The input list could not be read. Fatal for the whole batch.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("input is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("row on line {line} has an empty url")]
    EmptyUrl { line: u64 },
}

/// The output file could not be written. Fatal, no partial recovery.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Short name of a JSON value's kind, for error messages.
pub fn kind_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
