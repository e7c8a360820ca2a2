//! Topic crawl command.

use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use review_harvester::config::Config;
use review_harvester::discovery::{CrossrefClient, FallbackResolver};
use review_harvester::output::RecordWriter;
use review_harvester::scrapers::{
    BrowserFetcher, ChainedFetcher, CrawlSettings, Crawler, HttpClient, PageFetcher, RateLimiter,
    StopReason,
};

use crate::cli::helpers::{print_empty_hint, print_written, resolve_topic};

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Topic name, e.g. "Neurology"
    pub topic: String,

    /// Facet id to use instead of looking the name up
    #[arg(long)]
    pub topic_id: Option<String>,

    /// First listing page (1-based)
    #[arg(long)]
    pub page_start: Option<u32>,

    /// Results per listing page (1-100)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Number of listing pages to walk
    #[arg(short = 'n', long)]
    pub max_pages: Option<u32>,

    /// Output file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Append instead of truncating
    #[arg(short, long)]
    pub append: bool,

    /// Raw Cookie header from a browser session on the site
    #[arg(long, env = "COCHRANE_COOKIES", hide_env_values = true)]
    pub cookie: Option<String>,

    /// User-Agent of the browser the cookie came from
    #[arg(long, env = "COCHRANE_UA")]
    pub user_agent: Option<String>,

    /// Do not fall back to the bibliographic API when blocked
    #[arg(long)]
    pub no_fallback: bool,

    /// Write records from listing cards without fetching each review
    #[arg(long)]
    pub listing_only: bool,

    /// Skip the initial request to the search page
    #[arg(long)]
    pub no_warm_up: bool,

    /// Retry challenged pages in a headless browser (needs the `browser` feature)
    #[arg(long)]
    pub browser: bool,
}

impl CrawlArgs {
    /// Layer command-line values over the loaded config.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(v) = self.page_start {
            config.page_start = v;
        }
        if let Some(v) = self.page_size {
            config.page_size = v;
        }
        if let Some(v) = self.max_pages {
            config.max_pages = v;
        }
        if let Some(v) = &self.output {
            config.output = v.clone();
        }
        if self.cookie.is_some() {
            config.cookie = self.cookie.clone();
        }
        if self.user_agent.is_some() {
            config.user_agent = self.user_agent.clone();
        }
        config.append |= self.append;
        config.listing_only |= self.listing_only;
        config.browser.enabled |= self.browser;
        if self.no_fallback {
            config.fallback.enabled = false;
        }
        if self.no_warm_up {
            config.warm_up = false;
        }
        config.normalized()
    }
}

pub async fn cmd_crawl(config: Config, args: CrawlArgs) -> anyhow::Result<()> {
    let config = args.apply(config);
    let topic = resolve_topic(&config, &args.topic, args.topic_id.as_deref())?;

    // Open the output before any network traffic so a bad path fails fast.
    let output_path = config.output_path();
    let mut writer = RecordWriter::create(&output_path, config.append)?;

    let http = HttpClient::with_identity(
        config.user_agent.as_deref(),
        config.cookie.as_deref(),
        config.timeout(),
    )?
    .with_rate_limiter(RateLimiter::new(config.delays.min_request_interval()));

    if http.has_cookie() {
        info!("Using cookie(s): {}", http.cookie_names().join(", "));
    } else {
        info!("No cookie configured; the listing may answer with a challenge page");
    }

    let user_agent = http.user_agent().to_string();
    let fetcher: Arc<dyn PageFetcher> = if config.browser.enabled {
        let browser = BrowserFetcher::new(config.browser.clone(), user_agent);
        Arc::new(ChainedFetcher::new(Box::new(http), Box::new(browser)))
    } else {
        Arc::new(http)
    };

    let mut crawler = Crawler::new(fetcher, topic.clone(), CrawlSettings::from_config(&config));
    if config.fallback.enabled {
        let client = CrossrefClient::new(&config.crossref)?;
        let resolver = FallbackResolver::new(Arc::new(client), &config.crossref.container_title)
            .with_rows(config.crossref.rows)
            .with_title_filter(config.fallback.filter_titles);
        crawler = crawler.with_fallback(resolver);
    }

    println!(
        "{} Crawling {} ({}) pages {}..{}",
        style("→").cyan(),
        style(&topic.name).bold(),
        topic.id,
        config.page_start,
        config.page_start.saturating_add(config.max_pages).saturating_sub(1)
    );

    let summary = crawler.run(&mut writer).await?;

    let reason = match summary.stop_reason {
        StopReason::Blocked => style(summary.stop_reason.to_string()).red(),
        _ => style(summary.stop_reason.to_string()).dim(),
    };
    println!(
        "  {} page(s), {} from listing, {} from fallback ({})",
        summary.pages_fetched, summary.primary_records, summary.fallback_records, reason
    );
    print_written(writer.path(), writer.records_written());
    if summary.total_records() == 0 {
        print_empty_hint();
    }
    Ok(())
}
