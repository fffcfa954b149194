pub mod smart_scraper;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;

pub use smart_scraper::SmartScraper;

/// Instruction sent with every page. Asks for the four record fields.
pub const EXTRACTION_PROMPT: &str = r#"
Extract the following information from this Bundestag webpage:
1. title: The main title of the document/article (usually the main heading)
2. content: The main text content as clean text (preserve structure but remove HTML tags)
3. author: Look specifically for "Herausgeber" section to find the author/publisher information
4. documents: Look in the "Dokumente" section for document links with their titles and URLs (typically PDF files with Drucksache numbers)

Return the information in JSON format with these exact keys: title, content, author, documents
For documents, each item should have: title, url, file_type
"#;

/// Fetches a page and extracts loosely structured fields from it.
///
/// The returned value is untyped: key names, nesting and presence may vary
/// from call to call.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    async fn extract(&self, url: &str, instruction: &str) -> Result<Value, EngineError>;
}
