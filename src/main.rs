//! CLI entry point: runs a single links-tree request and prints the JSON
//! response. The MCP/HTTP tool layer that wraps this for production is an
//! external collaborator (spec §1) and out of scope here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use sitetree_crawler::{
    BrowserPool, BrowserPoolConfig, CacheLayer, HeadlessFetcher, HttpFetcher, LinksOptionsBuilder,
    LinksOrchestrator,
};

/// Scrape a URL and print its links tree (or flat response) as JSON.
#[derive(Parser, Debug)]
#[command(name = "sitetree-crawler", about = "Concurrent site-map tree builder")]
struct Cli {
    /// Target URL to crawl.
    url: String,

    /// Disable tree assembly and return a flat per-URL response.
    #[arg(long)]
    no_tree: bool,

    /// Attach extracted links to the response.
    #[arg(long)]
    extracted_links: bool,

    /// Attach metadata to the response.
    #[arg(long)]
    metadata: bool,

    /// Attach cleaned HTML to the response.
    #[arg(long)]
    cleaned_html: bool,

    /// Order sibling folders before leaves.
    #[arg(long)]
    folder_first: bool,

    /// Sibling ordering: `page` (default) or `alphabetical`.
    #[arg(long, default_value = "page")]
    links_order: String,

    /// Treat the target's subdomain as the crawl root.
    #[arg(long)]
    subdomain_as_root_url: bool,

    /// Force platform-URL classification rules.
    #[arg(long)]
    is_platform_url: bool,

    /// Use a headless Chromium fetcher instead of plain HTTP.
    #[arg(long)]
    browser: bool,

    /// Disable the KV cache for this request.
    #[arg(long)]
    no_cache: bool,

    /// SQLite cache database path.
    #[arg(long, default_value = "sitetree-cache.sqlite")]
    cache_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut builder = LinksOptionsBuilder::new()
        .url(cli.url.as_str())
        .tree(!cli.no_tree)
        .extracted_links(cli.extracted_links)
        .metadata(cli.metadata)
        .cleaned_html(cli.cleaned_html)
        .folder_first(cli.folder_first)
        .subdomain_as_root_url(cli.subdomain_as_root_url)
        .is_platform_url(cli.is_platform_url);

    builder = match cli.links_order.as_str() {
        "alphabetical" => builder.links_order(sitetree_crawler::config::LinksOrder::Alphabetical),
        _ => builder.links_order(sitetree_crawler::config::LinksOrder::Page),
    };

    if cli.browser {
        builder = builder.cleaning_processor(sitetree_crawler::config::CleaningProcessor::Browser);
    }
    if cli.no_cache {
        builder = builder.cache_options(sitetree_crawler::config::CacheOptions {
            enabled: false,
            ..Default::default()
        });
    }

    let opts = builder.build().context("invalid request options")?;

    let cache = CacheLayer::open(&cli.cache_path).await.context("opening cache database")?;

    let http_fetcher: Arc<dyn sitetree_crawler::Fetcher> =
        Arc::new(HttpFetcher::new().context("building HTTP fetcher")?);

    let headless_fetcher: Option<Arc<dyn sitetree_crawler::Fetcher>> = if cli.browser {
        let pool = BrowserPool::new(BrowserPoolConfig::default());
        Some(Arc::new(HeadlessFetcher::new(pool)))
    } else {
        None
    };

    let orchestrator = LinksOrchestrator::new(cache, http_fetcher, headless_fetcher);
    let response = orchestrator.process_links_request(opts, CancellationToken::new()).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
