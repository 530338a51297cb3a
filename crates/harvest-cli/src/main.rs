mod sink;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use harvest_client::{DEFAULT_ALLOWED_DOMAIN, DEFAULT_ROTATE_EVERY, ReqwestFetcher, UserAgentRotator};
use harvest_core::registry::DEFAULT_SITES_PATH;
use harvest_core::throttle::{ThrottleConfig, ThrottledFetcher};
use harvest_core::{
    CrawlConfig, CrawlSession, NullSink, RecordSink, SiteRegistry, TracingCrawlReporter,
};

use crate::sink::{CsvSink, JsonLinesSink, OutputFormat};

#[derive(Parser)]
#[command(name = "harvest", version, about = "Job posting harvester for Avature career sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the configured sites and write deduplicated job records
    Crawl(CrawlArgs),

    /// List the configured sites
    Sites {
        /// Path to the site registry YAML file
        #[arg(short, long, env = "HARVEST_SITES", default_value = DEFAULT_SITES_PATH)]
        sites: PathBuf,
    },
}

#[derive(Args)]
struct CrawlArgs {
    /// Path to the site registry YAML file
    #[arg(short, long, env = "HARVEST_SITES", default_value = DEFAULT_SITES_PATH)]
    sites: PathBuf,

    /// Only crawl the named site (repeatable)
    #[arg(long = "site")]
    only: Vec<String>,

    /// Output file (stdout if omitted)
    #[arg(short, long, env = "HARVEST_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Jsonl)]
    format: OutputFormat,

    /// Maximum requests in flight at once, across all sites and pages
    #[arg(short, long, env = "HARVEST_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Base delay between requests to the same host, in milliseconds
    #[arg(long, env = "HARVEST_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,

    /// Use the exact delay instead of a random 0.5x-1.5x of it
    #[arg(long, default_value_t = false)]
    fixed_delay: bool,

    /// HTTP request timeout, in seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Draw a new User-Agent every N requests (0 keeps the default one)
    #[arg(long, env = "HARVEST_ROTATE_EVERY", default_value_t = DEFAULT_ROTATE_EVERY)]
    rotate_every: usize,

    /// Domains the crawler may visit, subdomains included (repeatable)
    #[arg(long = "allowed-domain", default_values_t = [DEFAULT_ALLOWED_DOMAIN.to_string()])]
    allowed_domains: Vec<String>,

    /// Disable the allowed-domain check
    #[arg(long, default_value_t = false)]
    any_domain: bool,

    /// Crawl and extract but discard the records
    #[arg(long, default_value_t = false, conflicts_with = "output")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("harvest=info".parse()?)
                .add_directive("harvest_core=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => cmd_crawl(args).await?,
        Commands::Sites { sites } => cmd_sites(&sites)?,
    }

    Ok(())
}

fn load_registry(path: &Path) -> Result<SiteRegistry> {
    SiteRegistry::load(path)
        .with_context(|| format!("Failed to load site registry: {}", path.display()))
}

async fn cmd_crawl(args: CrawlArgs) -> Result<()> {
    let registry = load_registry(&args.sites)?
        .select(&args.only)
        .context("Invalid --site filter")?;
    if registry.is_empty() {
        tracing::warn!("No sites configured in {}", args.sites.display());
        return Ok(());
    }

    let mut fetcher = ReqwestFetcher::with_timeout(Duration::from_secs(args.timeout_secs))
        .context("Failed to create HTTP client")?;
    if !args.any_domain {
        fetcher = fetcher.with_allowed_domains(args.allowed_domains.clone());
    }
    if args.rotate_every > 0 {
        fetcher = fetcher
            .with_user_agent_rotation(UserAgentRotator::with_pool(Vec::new(), args.rotate_every));
    }
    let throttle =
        ThrottleConfig::new(Duration::from_millis(args.delay_ms)).randomized(!args.fixed_delay);
    let fetcher = ThrottledFetcher::new(fetcher, throttle);

    let config = CrawlConfig::default().with_concurrency(args.concurrency);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    if args.dry_run {
        return run_crawl(fetcher, NullSink, config, &registry, cancel).await;
    }

    let output = args.output.as_deref();
    match args.format {
        OutputFormat::Jsonl => {
            let sink = JsonLinesSink::open(output)?;
            run_crawl(fetcher, sink, config, &registry, cancel).await
        }
        OutputFormat::Csv => {
            let sink = CsvSink::open(output)?;
            run_crawl(fetcher, sink, config, &registry, cancel).await
        }
    }
}

async fn run_crawl<K: RecordSink>(
    fetcher: ThrottledFetcher<ReqwestFetcher>,
    sink: K,
    config: CrawlConfig,
    registry: &SiteRegistry,
    cancel: CancellationToken,
) -> Result<()> {
    let session = CrawlSession::new(fetcher, sink, config);
    let stats = session
        .run(registry.sites(), cancel, &TracingCrawlReporter)
        .await;

    eprintln!(
        "Harvested {} jobs from {} sites ({} duplicates, {} without id, {} failed pages)",
        stats.records_emitted,
        stats.sites,
        stats.duplicates,
        stats.missing_ids,
        stats.listing_failures + stats.detail_failures,
    );

    Ok(())
}

fn cmd_sites(path: &Path) -> Result<()> {
    let registry = load_registry(path)?;

    if registry.is_empty() {
        println!("No sites configured in {}", path.display());
        return Ok(());
    }

    for site in registry.sites() {
        println!("  {:<24} {}  (domain: {})", site.name, site.base_url, site.base_domain());
    }
    println!("\nTotal: {} sites", registry.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn crawl_defaults() {
        let cli = Cli::try_parse_from(["harvest", "crawl"]).unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(args.concurrency, 2);
        assert_eq!(args.delay_ms, 1000);
        assert_eq!(args.rotate_every, 5);
        assert_eq!(args.allowed_domains, vec!["avature.net".to_string()]);
        assert_eq!(args.format, OutputFormat::Jsonl);
        assert!(args.output.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn dry_run_rejects_output_file() {
        let cli = Cli::try_parse_from(["harvest", "crawl", "--dry-run"]).unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert!(args.dry_run);

        assert!(Cli::try_parse_from(["harvest", "crawl", "--dry-run", "-o", "jobs.jsonl"]).is_err());
    }

    #[test]
    fn crawl_site_filter_and_format() {
        let cli = Cli::try_parse_from([
            "harvest", "crawl", "--site", "Acme", "--site", "Globex", "-f", "csv", "-o", "jobs.csv",
        ])
        .unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(args.only, vec!["Acme", "Globex"]);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.output, Some(PathBuf::from("jobs.csv")));
    }
}
