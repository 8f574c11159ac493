use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wordcrawl::config::{DEFAULT_CACHE_CAPACITY, DEFAULT_FLUSH_EVERY, DEFAULT_INDEX_URL};
use wordcrawl::{Alphabet, Crawler, CsvSink, EntryRule, LinkFilter, links};

#[derive(Parser)]
#[command(name = "wordcrawl")]
#[command(about = "Crawl a dictionary index and export part-of-speech flags per headword as CSV")]
struct Cli {
    /// Verbosity level (-v, -vv); RUST_LOG overrides it
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output CSV file
    #[arg(short, long, default_value = "out.csv")]
    output: PathBuf,

    /// Symbols to enumerate, e.g. "a-z", "abc" or "a-c,x"
    #[arg(short, long, default_value = "a-z")]
    letters: String,

    /// Index URL template; {} is replaced by each symbol
    #[arg(long, default_value = DEFAULT_INDEX_URL)]
    index_url: String,

    /// Seconds without a new record before the crawl is considered done
    #[arg(long, default_value_t = 30)]
    quiet_secs: u64,

    /// Stop after this many accepted records
    #[arg(long)]
    limit: Option<usize>,

    /// Number of recent headwords remembered for deduplication
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,

    /// Maximum concurrent entry page fetches (unbounded when omitted)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Flush the output file every N records
    #[arg(long, default_value_t = DEFAULT_FLUSH_EVERY)]
    flush_every: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Part-of-speech pattern that marks an index entry as an idiom
    #[arg(long, default_value = links::DEFAULT_IDIOM_PATTERN)]
    idiom_pattern: String,

    /// Path pattern entry links must match
    #[arg(long, default_value = links::DEFAULT_ENTRY_PATH_PATTERN)]
    entry_path: String,
}

async fn run(cli: Cli) -> Result<()> {
    let alphabet: Alphabet = cli.letters.parse()?;
    let link_filter = LinkFilter::new(
        links::DEFAULT_SUB_INDEX_SELECTOR,
        links::DEFAULT_ENTRY_SELECTOR,
        links::DEFAULT_ENTRY_LABEL_SELECTOR,
        &cli.idiom_pattern,
        &cli.entry_path,
    )?;

    let mut builder = Crawler::builder()
        .index_url(cli.index_url)
        .alphabet(alphabet)
        .quiet_interval(Duration::from_secs(cli.quiet_secs))
        .cache_capacity(cli.cache_capacity)
        .request_timeout(Duration::from_secs(cli.timeout_secs))
        .link_filter(link_filter)
        .entry_rule(EntryRule::default());
    if let Some(limit) = cli.limit {
        builder = builder.record_limit(limit);
    }
    if let Some(max_in_flight) = cli.max_in_flight {
        builder = builder.max_in_flight(max_in_flight);
    }
    let crawler = builder.build().context("Invalid crawl configuration")?;

    let mut sink = CsvSink::create(&cli.output)
        .with_context(|| format!("Failed to create output file: {}", cli.output.display()))?
        .flush_every(cli.flush_every);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, flushing accepted records");
            ctrl_c_token.cancel();
        }
    });

    info!(
        letters = %crawler.config().alphabet(),
        output = %cli.output.display(),
        "Starting crawl"
    );
    let summary = crawler
        .crawl_with_cancellation(&mut sink, cancel_token)
        .await
        .context("Crawl failed")?;

    println!();
    println!("=== Summary ===");
    println!("Accepted records:   {}", summary.accepted);
    println!("Missed entries:     {}", summary.missed);
    println!("Duplicates:         {}", summary.duplicates);
    println!("Index pages:        {}", summary.enumeration.index_pages);
    println!("Index failures:     {}", summary.enumeration.index_failures);
    println!("Entry pages:        {}", summary.stats.pages_fetched);
    println!("Fetch errors:       {}", summary.stats.errors_encountered);
    println!("Pages per second:   {:.2}", summary.stats.pages_per_second());
    println!("Stopped by:         {:?}", summary.close_reason);
    println!("Elapsed:            {:.2}s", summary.elapsed.as_secs_f64());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
