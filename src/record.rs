use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{kind_of, ValidationError};

/// One row of the input list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputRow {
    pub url: String,
    pub topic: String,
}

/// A downloadable reference found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    pub title: String,
    pub url: String,
    pub file_type: String,
}

impl DocumentLink {
    /// Build a link from resolved values; each must be a string.
    pub fn from_values(
        title: &Value,
        url: &Value,
        file_type: &Value,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: required_text("title", title)?,
            url: required_text("url", url)?,
            file_type: required_text("file_type", file_type)?,
        })
    }
}

/// The normalized result of processing exactly one input URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedRecord {
    pub topic: String,
    pub title: String,
    #[serde(rename = "text_html")]
    pub body_text: String,
    pub author: String,
    pub documents: Vec<DocumentLink>,
    pub scraped_at: DateTime<Utc>,
    pub source_url: String,
}

/// Marker prefix of the title of every error record.
pub const ERROR_TITLE_PREFIX: &str = "Error scraping";

impl ScrapedRecord {
    /// Construct a record for a successfully extracted page.
    ///
    /// `title` is still untyped here: the engine may hand back anything under
    /// the title key, and a non-string fails construction.
    pub fn new(
        row: &InputRow,
        title: &Value,
        body_text: String,
        author: String,
        documents: Vec<DocumentLink>,
        scraped_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            topic: row.topic.clone(),
            title: required_text("title", title)?,
            body_text,
            author,
            documents,
            scraped_at,
            source_url: required_url(&row.url)?,
        })
    }

    /// Construct the stand-in record for a row whose extraction failed.
    pub fn failed(row: &InputRow, reason: &str, scraped_at: DateTime<Utc>) -> Self {
        Self {
            topic: row.topic.clone(),
            title: format!("{} {}", ERROR_TITLE_PREFIX, row.url),
            body_text: format!("Error: {}", reason),
            author: String::new(),
            documents: Vec::new(),
            scraped_at,
            source_url: row.url.clone(),
        }
    }
}

fn required_text(field: &'static str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(ValidationError::MissingField { field }),
        other => Err(ValidationError::WrongType {
            field,
            found: kind_of(other),
        }),
    }
}

fn required_url(url: &str) -> Result<String, ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "source_url",
        });
    }
    Ok(url.to_string())
}
