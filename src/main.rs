use clap::{Parser, Subcommand};
use listing_scraper::apis::RedfinApi;
use listing_scraper::config::Config;
use listing_scraper::pipeline::{Pipeline, SummaryMode};
use listing_scraper::storage::CsvStore;
use listing_scraper::types::{ListingSource, TaxResolver};
use listing_scraper::{logging, observability};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "listing_scraper")]
#[command(about = "Redfin listing scraper with tax-assessment enrichment")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listings, resolve tax-assessed values, append the raw table
    Scrape,
    /// Summarize the raw table per day
    Summarize {
        /// Recompute the entire history and overwrite the summary
        /// (default: today's slice only, appended)
        #[arg(long)]
        batch: bool,
    },
    /// Scrape, then summarize today's slice
    Run,
}

async fn scrape(config: &Config, store: &CsvStore) -> anyhow::Result<()> {
    println!("🔄 Running scrape pipeline...");
    let api = Arc::new(RedfinApi::new(&config.enrichment)?);
    let source: Arc<dyn ListingSource> = api.clone();
    let resolver: Arc<dyn TaxResolver> = api;

    let result = Pipeline::run_scrape(source, resolver, store, config).await?;
    println!("\n📊 Scrape results:");
    println!("   Listings fetched: {}", result.listings_fetched);
    println!(
        "   Tax lookups: {} resolved, {} unresolved",
        result.resolved, result.unresolved
    );
    println!("   Records written: {}", result.records_written);
    println!("   Output file: {}", result.output_file);
    Ok(())
}

fn summarize(config: &Config, store: &CsvStore, batch: bool) -> anyhow::Result<()> {
    let mode = if batch {
        SummaryMode::Batch
    } else {
        SummaryMode::Incremental
    };
    println!("🧮 Running summary pipeline...");
    let result = Pipeline::run_summarize(store, config.summary.outlier_threshold, mode)?;
    println!("\n📊 Summary results:");
    println!("   Input records: {}", result.input_records);
    println!("   Rows written: {}", result.rows_written);
    println!("   Output file: {}", result.output_file);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    observability::init_metrics();

    let cli = Cli::parse();
    let config = Config::load()?;
    let store = CsvStore::new(&config.output.listings_path, &config.output.summary_path);

    let start = std::time::Instant::now();
    info!("Initializing on {}", chrono::Local::now().format("%Y-%m-%d"));

    match cli.command {
        Commands::Scrape => {
            scrape(&config, &store).await?;
        }
        Commands::Summarize { batch } => {
            summarize(&config, &store, batch)?;
        }
        Commands::Run => {
            println!("🚀 Running full pipeline (scrape + summarize)...");
            println!("\n📥 Step 1: Scraping...");
            scrape(&config, &store).await?;
            println!("\n🧮 Step 2: Summarizing today's listings...");
            summarize(&config, &store, false)?;
        }
    }

    println!("\n✅ Completed in {:.3} seconds", start.elapsed().as_secs_f64());
    Ok(())
}
