mod cli;
mod metrics;
mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crawler_core::config::DestinationsConfig;
use crawler_core::{
    create_sink, load_config, load_default_config, validate_config, Config, Crawler,
    DispatchService, ListingLayout, PageFetcher, ProxyConfig, RetryPolicy, SanitizedConfig,
    SqliteTorrentStore, TableListingExtractor, TorrentStore,
};

use cli::{Args, Command, DestinationArgs, PushArgs, QueryArgs};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Priority: RUST_LOG > --quiet > --verbose > info.
fn init_tracing(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout is reserved for the report.
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args) -> Result<()> {
    let command = args.subcommand();
    let config = build_config(&args, &command)?;

    validate_config(&config).context("Configuration validation failed")?;
    debug!(config = ?SanitizedConfig::from(&config), "Configuration loaded");

    let result = match command {
        Command::Scrape { file, .. } => scrape(&config, file.as_deref()).await,
        Command::Query(query) => run_query(&config, &query).await,
        Command::Push(push) => run_push(&config, &push).await,
        Command::Stats => show_stats(&config),
    };

    if let Some(path) = &args.metrics_file {
        metrics::write_metrics_file(path)
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
    }

    result
}

/// Defaults < config file < environment < command line.
fn build_config(args: &Args, command: &Command) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_default_config().context("Failed to load configuration")?,
    };

    if let Some(db) = &args.db {
        config.database.path = db.clone();
    }
    if let Some(proxy) = &args.proxy {
        config.proxy.url = Some(proxy.clone());
    }
    if let Command::Scrape { url: Some(url), .. } = command {
        config.scrape.url = url.clone();
    }
    if let Command::Push(push) = command {
        apply_destination_overrides(&mut config.destinations, &push.destinations);
    }

    Ok(config)
}

fn apply_destination_overrides(destinations: &mut DestinationsConfig, overrides: &DestinationArgs) {
    if let Some(transmission) = &overrides.transmission {
        destinations.transmission = Some(transmission.clone());
    }
    if let Some(aria2) = &overrides.aria2 {
        destinations.aria2 = Some(aria2.clone());
    }
}

fn open_store(config: &Config) -> Result<Arc<SqliteTorrentStore>> {
    let store = SqliteTorrentStore::new(&config.database.path)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
    Ok(Arc::new(store))
}

/// Reading commands never create a database.
fn open_existing_store(config: &Config) -> Result<Arc<SqliteTorrentStore>> {
    if !config.database.path.exists() {
        bail!(
            "Database file does not exist: {}",
            config.database.path.display()
        );
    }
    open_store(config)
}

fn build_dispatch(
    config: &Config,
    destinations: &DestinationsConfig,
    store: Arc<SqliteTorrentStore>,
) -> Result<DispatchService> {
    let proxy = if destinations.use_proxy {
        ProxyConfig::parse(config.proxy.url.as_deref())?
    } else {
        ProxyConfig::Direct
    };

    let mut service = DispatchService::new(store);
    for destination in destinations.enabled() {
        if let Some(raw) = destinations.endpoint(destination) {
            service.add_sink(create_sink(destination, raw, destinations.timeout(), &proxy)?);
        }
    }
    Ok(service)
}

fn show_stats(config: &Config) -> Result<()> {
    let store = open_existing_store(config)?;
    print!("{}", report::stats_summary(&store.stats()?));
    Ok(())
}

async fn scrape(config: &Config, file: Option<&Path>) -> Result<()> {
    let store = open_store(config)?;

    let proxy = ProxyConfig::parse(config.proxy.url.as_deref())?;
    info!(proxy = proxy.kind(), db = %config.database.path.display(), "Starting scrape");

    let fetcher = PageFetcher::new(
        proxy,
        config.scrape.timeout(),
        RetryPolicy::new(config.scrape.max_attempts, config.scrape.backoff_unit()),
    )?;
    let extractor = TableListingExtractor::new(ListingLayout::default())?;
    let crawler = Crawler::new(fetcher, Box::new(extractor), store.clone());

    let report = match file {
        Some(path) => crawler.scrape_file(path).await,
        None => crawler.scrape_url(&config.scrape.url).await,
    }
    .context("Scrape failed")?;

    print!("{}", report::scrape_summary(&report, &store.stats()?));
    Ok(())
}

async fn run_query(config: &Config, query: &QueryArgs) -> Result<()> {
    let store = open_existing_store(config)?;

    // Only destinations named on the command line receive the listed records.
    let mut destinations = DestinationsConfig {
        transmission: None,
        aria2: None,
        ..config.destinations.clone()
    };
    apply_destination_overrides(&mut destinations, &query.destinations);
    let service = build_dispatch(config, &destinations, store.clone())?;

    let records = match &query.pattern {
        Some(pattern) => {
            println!(
                "Torrents matching pattern '{}' (limit {}):",
                pattern, query.limit
            );
            store.query_by_name(pattern, query.limit)?
        }
        None => {
            println!("Latest {} torrents:", query.limit);
            store.query_latest(query.limit)?
        }
    };
    print!("{}", report::torrent_table(&records));

    if let Some(pattern) = &query.pattern {
        println!("\nFound {} matching torrents", store.count_matching(pattern)?);
    }
    print!("{}", report::stats_summary(&store.stats()?));

    if service.is_empty() {
        return Ok(());
    }

    println!();
    if query.destinations.dry_run {
        for plan in service.plan(&records) {
            print!("{}", report::plan_summary(&plan));
        }
    } else {
        for outcome in service.dispatch(&records).await {
            print!("{}", report::dispatch_summary(&outcome));
        }
    }
    Ok(())
}

async fn run_push(config: &Config, push: &PushArgs) -> Result<()> {
    let store = open_existing_store(config)?;
    let service = build_dispatch(config, &config.destinations, store)?;

    if service.is_empty() {
        bail!("No destinations configured; pass --transmission/--aria2 or set [destinations]");
    }

    if push.destinations.dry_run {
        for plan in service.plan_pending(push.limit)? {
            print!("{}", report::plan_summary(&plan));
        }
    } else {
        for outcome in service.dispatch_pending(push.limit).await? {
            print!("{}", report::dispatch_summary(&outcome));
        }
    }
    Ok(())
}
