use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::page::PageExtractor;
use crate::engine::ExtractionEngine;
use crate::error::{OutputError, PageError};
use crate::output;
use crate::record::{InputRow, ScrapedRecord};

/// Counts returned after a batch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct BatchResult {
    pub records: Vec<ScrapedRecord>,
    pub stats: ScrapeStats,
}

/// Drives every input row through the page extractor, one record per row,
/// in input order.
pub struct BatchRunner<E: ?Sized> {
    extractor: PageExtractor<E>,
    concurrency: usize,
    show_progress: bool,
}

impl<E: ExtractionEngine + ?Sized + 'static> BatchRunner<E> {
    pub fn new(extractor: PageExtractor<E>) -> Self {
        Self {
            extractor,
            concurrency: 1,
            show_progress: true,
        }
    }

    /// Rows in flight at once. 1 (the default) is strictly sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub async fn run(&self, rows: &[InputRow]) -> BatchResult {
        let pb = self.progress_bar(rows.len());
        let (records, errors) = if self.concurrency == 1 {
            self.run_sequential(rows, &pb).await
        } else {
            self.run_concurrent(rows, &pb).await
        };
        pb.finish_and_clear();

        let stats = ScrapeStats {
            total: records.len(),
            ok: records.len() - errors,
            errors,
        };
        info!("Scraped {} pages ({} ok, {} errors)", stats.total, stats.ok, stats.errors);
        BatchResult { records, stats }
    }

    /// Run the batch, then write every record to `path` in one go.
    pub async fn run_and_save(
        &self,
        rows: &[InputRow],
        path: &Path,
    ) -> Result<ScrapeStats, OutputError> {
        let result = self.run(rows).await;
        output::write_records(path, &result.records)?;
        Ok(result.stats)
    }

    async fn run_sequential(&self, rows: &[InputRow], pb: &ProgressBar) -> (Vec<ScrapedRecord>, usize) {
        let total = rows.len();
        let mut records = Vec::with_capacity(total);
        let mut errors = 0;
        for (i, row) in rows.iter().enumerate() {
            pb.set_message(row.url.clone());
            let outcome = self.extractor.extract(row).await;
            records.push(settle(i, total, row, outcome, pb, &mut errors));
            pb.inc(1);
        }
        (records, errors)
    }

    async fn run_concurrent(&self, rows: &[InputRow], pb: &ProgressBar) -> (Vec<ScrapedRecord>, usize) {
        let total = rows.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) =
            tokio::sync::mpsc::channel::<(usize, Result<ScrapedRecord, PageError>)>(self.concurrency * 2);

        for (i, row) in rows.iter().enumerate() {
            let extractor = self.extractor.clone();
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let row = row.clone();

            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };
                let outcome = extractor.extract(&row).await;
                let _ = tx.send((i, outcome)).await;
            });
        }

        // rx closes once every spawned task has dropped its sender
        drop(tx);

        // Stage by index: completion order is not input order
        let mut slots: Vec<Option<ScrapedRecord>> = vec![None; total];
        let mut errors = 0;
        while let Some((i, outcome)) = rx.recv().await {
            slots[i] = Some(settle(i, total, &rows[i], outcome, pb, &mut errors));
            pb.inc(1);
        }

        let records = slots
            .into_iter()
            .zip(rows)
            .map(|(slot, row)| {
                slot.unwrap_or_else(|| {
                    warn!("Task for {} ended without a result", row.url);
                    errors += 1;
                    ScrapedRecord::failed(row, "extraction task aborted", Utc::now())
                })
            })
            .collect();
        (records, errors)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb
    }
}

/// Report one row's outcome and turn a failure into its error record.
fn settle(
    index: usize,
    total: usize,
    row: &InputRow,
    outcome: Result<ScrapedRecord, PageError>,
    pb: &ProgressBar,
    errors: &mut usize,
) -> ScrapedRecord {
    match outcome {
        Ok(record) => {
            pb.println(format!("[{}/{}] ✅ Successfully scraped: {}", index + 1, total, record.title));
            record
        }
        Err(e) => {
            *errors += 1;
            warn!(url = %row.url, error = %e, "extraction failed");
            pb.println(format!("[{}/{}] ❌ Error scraping {}: {}", index + 1, total, row.url, e));
            ScrapedRecord::failed(row, &e.to_string(), Utc::now())
        }
    }
}
