//! ICD-10 lookup tool
//!
//! Loads a catalog through the same sources the app uses and runs queries
//! through a real `LookupSession`, printing the ranked results.
//!
//! Build with: cargo build -p lookup-tool
//! Run with: cargo run -p lookup-tool -- diabetes "e11.9" cholera

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rafinity::pipeline::{QueryPipeline, ResultSink};
use rafinity::{
    load_catalog, Catalog, CatalogSource, FileCatalogSource, HttpCatalogSource, LookupConfig, LookupSession,
    PremiumStatus, SearchIndex, SearchOutcome, StaticCatalogSource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Queries to run, in order (reads one per line from stdin when empty)
    queries: Vec<String>,

    /// Load the catalog from a local JSON file
    #[arg(short, long, conflicts_with = "url")]
    file: Option<String>,

    /// Download the catalog (defaults to the production dataset URL)
    #[arg(short, long, num_args = 0..=1, default_missing_value = rafinity::catalog::DEFAULT_CATALOG_URL)]
    url: Option<String>,

    /// Lookup configuration as a JSON file
    #[arg(short, long)]
    config: Option<String>,

    /// Run as a premium user (no quota)
    #[arg(long)]
    premium: bool,

    /// Feed each query keystroke by keystroke through the debouncer
    #[arg(long)]
    simulate_typing: bool,

    /// Delay between simulated keystrokes in milliseconds
    #[arg(long, default_value_t = 80)]
    keystroke_ms: u64,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "rafinity=debug,lookup_tool=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn load(args: &Args) -> Catalog {
    let source: Box<dyn CatalogSource> = if let Some(path) = &args.file {
        Box::new(FileCatalogSource::new(path))
    } else if let Some(url) = &args.url {
        Box::new(HttpCatalogSource::new(url.as_str()))
    } else {
        Box::new(StaticCatalogSource::new(demo_data::catalog_json().as_bytes()))
    };
    load_catalog(source.as_ref()).await
}

fn print_outcome(query: &str, outcome: &SearchOutcome) {
    println!("> {:?} [{:?}] {} result(s)", query, outcome.resolution, outcome.entries.len());
    if outcome.blocked {
        println!("  free searches used up; upgrade to keep searching");
        return;
    }
    for entry in outcome.entries.iter() {
        let raf = entry.raf_score.as_deref().unwrap_or("-");
        let v28 = if entry.has_v28 { "V28" } else { "   " };
        println!("  {:<10} {} {:>6}  {}", entry.code, v28, raf, entry.description);
    }
}

struct PrintSink;

impl ResultSink for PrintSink {
    fn on_results(&self, outcome: &SearchOutcome) {
        print_outcome("<debounced>", outcome);
    }

    fn on_upgrade_requested(&self) {
        println!("  (upgrade requested)");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
            LookupConfig::from_json(&json).context("Invalid lookup config")?
        }
        None => LookupConfig::default(),
    };

    let catalog = load(&args).await;
    let index = Arc::new(SearchIndex::build(catalog, &config.fuzzy));
    tracing::info!(entries = index.len(), "Index ready");

    let session = Arc::new(LookupSession::new(index, PremiumStatus::new(args.premium), config));

    let queries = if args.queries.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read queries from stdin")?
    } else {
        args.queries.clone()
    };

    if args.simulate_typing {
        let pipeline = QueryPipeline::spawn(Arc::clone(&session), Arc::new(PrintSink));
        let keystroke = Duration::from_millis(args.keystroke_ms);
        for query in &queries {
            let mut typed = String::new();
            for ch in query.chars() {
                typed.push(ch);
                pipeline.input(&typed);
                tokio::time::sleep(keystroke).await;
            }
            tokio::time::sleep(session.config().debounce() * 2).await;
        }
    } else {
        for query in queries {
            let outcome = session.search(query.clone()).await?;
            print_outcome(&query, &outcome);
        }
    }

    println!(
        "searches charged: {}, free searches left: {}",
        session.search_count(),
        session.remaining_free_searches()
    );
    Ok(())
}
