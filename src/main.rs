//! Driftnet main entry point
//!
//! Command-line interface for the driftnet site crawler.

use clap::Parser;
use driftnet::config::load_config_with_hash;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Driftnet: a resumable site crawler
///
/// Driftnet crawls a single target domain from a seed URL, extracting text,
/// links, images, files, and tables into an append-only JSONL file. Crawl
/// state is checkpointed so an interrupted run picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A resumable site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from the existing checkpoint (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring any previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "watch")]
    dry_run: bool,

    /// Watch a single item chain for new content instead of crawling
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        print_dry_run(&config, &config_hash);
        return Ok(());
    }

    if cli.watch {
        tracing::info!("Starting watch mode");
        driftnet::crawler::watch(config).await?;
        return Ok(());
    }

    if cli.fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if a checkpoint exists)");
    }
    driftnet::crawler::crawl(config, cli.fresh).await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Shows the effective crawl policy without fetching anything
fn print_dry_run(config: &driftnet::Config, config_hash: &str) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Crawler:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    match config.crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unbounded"),
    }
    println!("  Fetch workers: {}", config.crawler.fetch_workers);
    println!("  Parse workers: {}", config.crawler.parse_workers);
    println!("  Checkpoint every: {}s", config.crawler.save_interval_secs);
    println!("  Idle threshold: {}s", config.crawler.idle_threshold_secs);

    println!("\nFetch:");
    println!("  User agents: {}", config.fetch.user_agents.len());
    println!(
        "  Retries: {} (backoff {}s..{}s, budget {}s)",
        config.fetch.max_retries,
        config.fetch.backoff_base_secs,
        config.fetch.backoff_cap_secs,
        config.fetch.time_budget_secs
    );

    println!("\nFilter:");
    println!("  Excluded paths: {}", config.filter.excluded_paths.len());
    for path in &config.filter.excluded_paths {
        println!("    - {}", path);
    }
    println!(
        "  Excluded URL prefixes: {}",
        config.filter.excluded_url_prefixes.len()
    );
    for prefix in &config.filter.excluded_url_prefixes {
        println!("    - {}", prefix);
    }
    println!("  Excluded query rules: {}", config.filter.excluded_query.len());
    for rule in &config.filter.excluded_query {
        println!("    - {}={}*", rule.key, rule.value_prefix);
    }
    println!("  Identity keys: {:?}", config.filter.identity_keys);
    println!("  Stripped params: {:?}", config.filter.strip_params);
    println!("  Force HTTPS: {}", config.filter.force_https);

    println!("\nOutput:");
    println!("  Records: {}", config.output.records_path);
    println!("  Rotate at: {} bytes", config.output.rotate_bytes);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Link log: {}", config.output.links_log_path);

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}
