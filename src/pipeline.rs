use crate::config::Config;
use crate::enrich::EnrichmentEngine;
use crate::error::Result;
use crate::merge::{filter_positive_assessed, merge_listings, retain_assessed};
use crate::storage::{CsvStore, WriteMode};
use crate::summary::summarize;
use crate::types::{ListingSource, TaxResolver};
use chrono::{Local, NaiveDate};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

/// Result of one scrape run
#[derive(Debug, Serialize)]
pub struct ScrapeResult {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub listings_fetched: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub records_written: usize,
    pub output_file: String,
}

/// Which slice of the raw table a summary run covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SummaryMode {
    /// Today's listings only, appended to the summary table. Repeated runs on
    /// the same day append duplicate rows; a batch run is the corrective.
    Incremental,
    /// The entire history, overwriting the summary table
    Batch,
}

/// Result of one summary run
#[derive(Debug, Serialize)]
pub struct SummarizeResult {
    pub run_id: Uuid,
    pub input_records: usize,
    pub rows_written: usize,
    pub output_file: String,
}

pub struct Pipeline;

impl Pipeline {
    /// Fetch listings, enrich each with its tax-assessed value, merge, filter
    /// to positive assessments, and append to the raw listings table. Fails
    /// before writing anything if the listing feed itself is unusable;
    /// per-address lookup failures only show up as unresolved counts.
    #[instrument(skip_all, fields(source_name = %source.source_name()))]
    pub async fn run_scrape(
        source: Arc<dyn ListingSource>,
        resolver: Arc<dyn TaxResolver>,
        store: &CsvStore,
        config: &Config,
    ) -> Result<ScrapeResult> {
        let run_id = Uuid::new_v4();
        let date = Local::now().date_naive();
        info!("🚀 Starting scrape run {} on {}", run_id, date);
        println!("🚀 Starting scrape run {} on {}", run_id, date);
        counter!("listing_scrape_runs_total").increment(1);
        let t_run = Instant::now();

        info!("📡 Fetching listings from {}...", source.source_name());
        println!("📡 Fetching listings from {}...", source.source_name());
        let t_fetch = Instant::now();
        let listings = source.fetch_listings(&config.search).await?;
        histogram!("listing_fetch_duration_seconds").record(t_fetch.elapsed().as_secs_f64());
        info!("✅ Fetched {} listings", listings.len());
        println!("✅ Fetched {} listings", listings.len());
        counter!("listing_listings_fetched_total").increment(listings.len() as u64);

        info!("🔍 Resolving tax-assessed values...");
        println!("🔍 Resolving tax-assessed values...");
        let addresses: Vec<String> = listings.iter().map(|l| l.full_address()).collect();
        let engine = EnrichmentEngine::new(resolver, config.enrichment.concurrency);
        let t_enrich = Instant::now();
        let taxes = engine.enrich(&addresses).await;
        histogram!("listing_enrich_duration_seconds").record(t_enrich.elapsed().as_secs_f64());

        let resolved = taxes.values().filter(|v| !v.is_unresolved()).count();
        let unresolved = taxes.len() - resolved;

        info!("🔗 Merging and filtering for positive assessments...");
        println!("🔗 Merging and filtering for positive assessments...");
        let merged = merge_listings(listings, &taxes, date)?;
        let records = retain_assessed(merged);

        info!("💾 Appending {} records to the raw table...", records.len());
        println!("💾 Appending {} records to the raw table...", records.len());
        let records_written = store.append_listings(&records)?;
        counter!("listing_records_written_total").increment(records_written as u64);
        histogram!("listing_scrape_duration_seconds").record(t_run.elapsed().as_secs_f64());

        Ok(ScrapeResult {
            run_id,
            date,
            listings_fetched: addresses.len(),
            resolved,
            unresolved,
            records_written,
            output_file: store.listings_path().display().to_string(),
        })
    }

    /// Summarize the raw listings table per day. Incremental mode covers only
    /// today's slice and appends; batch mode recomputes the whole history and
    /// overwrites. The mode changes the input filter and write mode, never
    /// the statistics.
    #[instrument(skip(store))]
    pub fn run_summarize(
        store: &CsvStore,
        threshold: f64,
        mode: SummaryMode,
    ) -> Result<SummarizeResult> {
        let run_id = Uuid::new_v4();
        let today = Local::now().date_naive();
        info!("🚀 Starting summary run {} on {} ({:?})", run_id, today, mode);
        println!("🚀 Starting summary run {} on {} ({:?})", run_id, today, mode);
        counter!("listing_summary_runs_total").increment(1);

        info!("📂 Loading raw listings...");
        println!("📂 Loading raw listings...");
        let loaded = store.load_listings()?;
        let mut records = filter_positive_assessed(loaded);
        if mode == SummaryMode::Incremental {
            records.retain(|r| r.date == today);
        }
        info!("🧮 Summarizing {} records...", records.len());
        println!("🧮 Summarizing {} records...", records.len());

        let rows = summarize(&records, threshold);
        let write_mode = match mode {
            SummaryMode::Incremental => WriteMode::Append,
            SummaryMode::Batch => WriteMode::Overwrite,
        };
        let rows_written = store.write_summary(&rows, write_mode)?;
        counter!("listing_summary_rows_written_total").increment(rows_written as u64);
        info!("💾 Wrote {} summary rows", rows_written);
        println!("💾 Wrote {} summary rows", rows_written);

        Ok(SummarizeResult {
            run_id,
            input_records: records.len(),
            rows_written,
            output_file: store.summary_path().display().to_string(),
        })
    }
}
