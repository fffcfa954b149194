pub mod batch;
pub mod page;
pub mod resolver;

pub use batch::{BatchRunner, ScrapeStats};
pub use page::PageExtractor;
