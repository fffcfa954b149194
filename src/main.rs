mod engine;
mod error;
mod input;
mod output;
mod pipeline;
mod record;
mod settings;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use engine::{ExtractionEngine, SmartScraper};
use pipeline::{BatchRunner, PageExtractor, ScrapeStats};
use record::{InputRow, ScrapedRecord};
use settings::{Settings, QUIET_LOG_FILTER};

#[derive(Parser)]
#[command(name = "bundestag_scraper", about = "Bundestag page scraper via spider.cloud + LLM extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every URL in the input CSV and write one JSON array
    Run {
        /// CSV with `url` and `topic` columns
        #[arg(short, long, default_value = "data/input/urls.csv")]
        input: PathBuf,
        /// Output JSON file (overwritten)
        #[arg(short, long, default_value = "data/output/out.json")]
        output: PathBuf,
        /// Pages in flight at once (1 = sequential)
        #[arg(short = 'j', long, default_value = "1")]
        concurrency: usize,
        /// Only scrape the first N rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// Scrape a single URL and print its record
    Extract {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        topic: String,
    },
    /// Validate the input CSV without scraping
    Check {
        #[arg(short, long, default_value = "data/input/urls.csv")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Only `run` and `extract` need settings; `check` must work without them
    let settings = Settings::load();
    init_tracing(settings.as_ref().ok());

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            concurrency,
            limit,
            quiet,
        } => {
            let mut rows = input::read_rows(&input)
                .with_context(|| format!("Failed to read input list {}", input.display()))?;
            if let Some(n) = limit {
                rows.truncate(n);
            }

            let stats = scrape_to_file(&rows, &output, || {
                let engine = build_engine(loaded(&settings)?)?;
                let runner = BatchRunner::new(PageExtractor::new(engine)).with_concurrency(concurrency);
                Ok(if quiet { runner.quiet() } else { runner })
            })
            .await?;
            println!(
                "📁 Saved {} documents to {} ({} ok, {} errors)",
                stats.total,
                output.display(),
                stats.ok,
                stats.errors
            );
            Ok(())
        }
        Commands::Extract { url, topic } => {
            let engine = build_engine(loaded(&settings)?)?;
            let extractor = PageExtractor::new(engine);
            let row = InputRow { url, topic };
            let record = match extractor.extract(&row).await {
                Ok(record) => record,
                Err(e) => {
                    eprintln!("❌ Error scraping {}: {}", row.url, e);
                    ScrapedRecord::failed(&row, &e.to_string(), chrono::Utc::now())
                }
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Check { input } => {
            let rows = input::read_rows(&input)
                .with_context(|| format!("Failed to read input list {}", input.display()))?;
            let mut topics: BTreeMap<&str, usize> = BTreeMap::new();
            for row in &rows {
                *topics.entry(row.topic.as_str()).or_default() += 1;
            }
            println!("{} rows, {} topics", rows.len(), topics.len());
            for (topic, count) in &topics {
                println!("  {:<24} {:>5}", truncate(topic, 24), count);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn init_tracing(settings: Option<&Settings>) {
    let default_filter = settings.map_or(QUIET_LOG_FILTER, Settings::log_filter);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn loaded(settings: &Result<Settings, ::config::ConfigError>) -> anyhow::Result<&Settings> {
    settings
        .as_ref()
        .map_err(|e| anyhow!("Failed to load settings: {}", e))
}

/// Scrape `rows` and write them to `output`. An empty list still replaces the
/// output with `[]`, without building an engine.
async fn scrape_to_file<E, F>(
    rows: &[InputRow],
    output: &Path,
    make_runner: F,
) -> anyhow::Result<ScrapeStats>
where
    E: ExtractionEngine + ?Sized + 'static,
    F: FnOnce() -> anyhow::Result<BatchRunner<E>>,
{
    if rows.is_empty() {
        output::write_records(output, &[])
            .with_context(|| format!("Failed to write {}", output.display()))?;
        return Ok(ScrapeStats {
            total: 0,
            ok: 0,
            errors: 0,
        });
    }

    let runner = make_runner()?;
    println!("Starting to scrape {} URLs...", rows.len());
    runner
        .run_and_save(rows, output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))
}

fn build_engine(settings: &Settings) -> anyhow::Result<Arc<dyn ExtractionEngine>> {
    let scraper = SmartScraper::new(settings).context("Failed to set up extraction engine")?;
    info!(model = %settings.model, "Extraction engine ready");
    Ok(Arc::new(scraper))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::mock::ScriptedEngine;
    use serde_json::json;

    #[tokio::test]
    async fn empty_list_replaces_stale_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, r#"[{"title":"from an earlier run"}]"#).unwrap();

        let stats = scrape_to_file::<ScriptedEngine, _>(&[], &path, || {
            Err(anyhow!("engine must not be built for an empty list"))
        })
        .await
        .unwrap();

        assert_eq!(stats.total, 0);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!([]));
    }

    #[tokio::test]
    async fn non_empty_list_builds_runner_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/output/out.json");
        let rows = vec![InputRow {
            url: "https://a".into(),
            topic: "finance".into(),
        }];
        let engine = ScriptedEngine::new().with_result("https://a", json!({"title": "A"}));

        let stats = scrape_to_file(&rows, &path, || {
            Ok(BatchRunner::new(PageExtractor::new(Arc::new(engine))).quiet())
        })
        .await
        .unwrap();

        assert_eq!(stats.ok, 1);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["title"], "A");
    }

    #[test]
    fn settings_error_surfaces_only_when_needed() {
        let bad: Result<Settings, ::config::ConfigError> =
            Err(::config::ConfigError::Message("bad value".into()));
        assert!(loaded(&bad).is_err());
        let good = Ok(Settings::default());
        assert!(loaded(&good).is_ok());
    }
}
