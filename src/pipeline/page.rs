use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::resolver;
use crate::engine::{ExtractionEngine, EXTRACTION_PROMPT};
use crate::error::{kind_of, PageError};
use crate::record::{InputRow, ScrapedRecord};

/// Turns one input row into one record with a single engine call.
pub struct PageExtractor<E: ?Sized> {
    engine: Arc<E>,
}

impl<E> Clone for PageExtractor<E>
where
    E: ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<E: ExtractionEngine + ?Sized> PageExtractor<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Extract and normalize one page. Any failure comes back as `Err`;
    /// callers turn it into an error record with `ScrapedRecord::failed`.
    pub async fn extract(&self, row: &InputRow) -> Result<ScrapedRecord, PageError> {
        let raw = self.engine.extract(&row.url, EXTRACTION_PROMPT).await?;
        build_record(row, &raw)
    }
}

/// Reduce a raw engine result to a record for `row`.
pub fn build_record(row: &InputRow, raw: &Value) -> Result<ScrapedRecord, PageError> {
    if !raw.is_object() {
        return Err(PageError::UnusableShape {
            found: kind_of(raw),
        });
    }

    let page = resolver::resolve_page(raw)?;
    debug!(
        url = %row.url,
        documents = page.documents.len(),
        body_len = page.body.len(),
        "fields resolved"
    );

    Ok(ScrapedRecord::new(
        row,
        &page.title,
        page.body,
        page.author,
        page.documents,
        Utc::now(),
    )?)
}
