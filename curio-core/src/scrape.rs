// Strategy selection and the single public scrape entry point

use crate::aggregate::{aggregate_static, aggregate_with_driver};
use crate::crawl_api::CrawlApiClient;
use crate::enrich::enrich_missing;
use crate::report::ScrapeReport;
use curio_harvest::{BrowserSession, PageDriver, StaticFetcher, requires_javascript};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

static BROWSER_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(/products|/category|/catalog|/shop)").unwrap());

/// How a scrape run obtains page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Probe the page statically and pick Static or Browser.
    #[default]
    Auto,
    Static,
    Browser,
    CrawlApi,
}

impl Strategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Strategy::Auto),
            "static" => Some(Strategy::Static),
            "browser" => Some(Strategy::Browser),
            "crawl-api" | "crawlapi" | "api" => Some(Strategy::CrawlApi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub url: String,
    pub brand: String,
    pub strategy: Strategy,
    /// Maximum products harvested per listing page; doubles as the page
    /// limit for the crawl-API strategy.
    pub limit: usize,
    /// Pagination budget per listing for static/browser strategies.
    pub page_budget: usize,
    /// Pause between node fetches.
    pub delay: Duration,
    /// Revisit detail pages to backfill missing fields.
    pub enrich: bool,
    /// Base URL of the crawl service.
    pub api_base: String,
}

impl ScrapeOptions {
    pub fn new(url: &str, brand: &str) -> Self {
        Self {
            url: url.to_string(),
            brand: brand.to_string(),
            strategy: Strategy::Auto,
            limit: 50,
            page_budget: curio_harvest::PAGE_BUDGET,
            delay: Duration::from_millis(500),
            enrich: false,
            api_base: "https://api.firecrawl.dev".to_string(),
        }
    }
}

/// Run a full catalog scrape. This is the only public entry point of the
/// strategy layer and it never returns an error: total failure comes back
/// as a report with the `error` field set.
pub async fn execute_scrape(options: &ScrapeOptions) -> ScrapeReport {
    info!(
        "Starting scrape of {} for brand {}",
        options.url, options.brand
    );

    let fetcher = StaticFetcher::new();

    if !fetcher.robots_allowed(&options.url).await {
        warn!(
            "robots.txt disallows {}; proceeding anyway (advisory only)",
            options.url
        );
    }

    let mut report = match options.strategy {
        Strategy::CrawlApi => {
            let client = CrawlApiClient::new(&options.api_base);
            client
                .scrape_catalog(&options.url, &options.brand, options.limit)
                .await
        }
        Strategy::Static => scrape_static(&fetcher, options).await,
        Strategy::Browser => scrape_browser(&fetcher, options).await,
        Strategy::Auto => scrape_auto(&fetcher, options).await,
    };

    if options.enrich && report.error.is_none() {
        enrich_missing(&fetcher, &mut report, options.delay).await;
    }

    report
}

/// Auto selection: catalog-shaped paths always get the browser; otherwise
/// a static probe decides based on JS-requirement heuristics.
async fn scrape_auto(fetcher: &StaticFetcher, options: &ScrapeOptions) -> ScrapeReport {
    let path = Url::parse(&options.url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();

    if BROWSER_PATH_RE.is_match(&path) {
        info!("Catalog-shaped path {}, using browser strategy", path);
        return scrape_browser(fetcher, options).await;
    }

    match fetcher.fetch_html(&options.url).await {
        Ok(html) if !requires_javascript(&html) => {
            info!("Static content detected, using static strategy");
            scrape_static_with_html(fetcher, options, html).await
        }
        Ok(_) => {
            info!("JavaScript rendering required, using browser strategy");
            scrape_browser(fetcher, options).await
        }
        Err(e) => {
            warn!("Static probe of {} failed: {}", options.url, e);
            scrape_browser(fetcher, options).await
        }
    }
}

async fn scrape_static(fetcher: &StaticFetcher, options: &ScrapeOptions) -> ScrapeReport {
    match fetcher.fetch_html(&options.url).await {
        Ok(html) => scrape_static_with_html(fetcher, options, html).await,
        Err(e) => ScrapeReport::failed(&options.brand, "Brand Website", e.to_string()),
    }
}

async fn scrape_static_with_html(
    fetcher: &StaticFetcher,
    options: &ScrapeOptions,
    html: String,
) -> ScrapeReport {
    aggregate_static(
        fetcher,
        &options.brand,
        &options.url,
        &html,
        options.page_budget,
        options.limit,
        options.delay,
    )
    .await
}

/// Browser strategy. A session that fails to launch falls back to static;
/// a launched session is closed on every exit path, with close failures
/// logged and ignored so they never mask the scrape result.
async fn scrape_browser(fetcher: &StaticFetcher, options: &ScrapeOptions) -> ScrapeReport {
    let mut session = match BrowserSession::launch().await {
        Ok(session) => session,
        Err(e) => {
            warn!("Browser launch failed ({}), falling back to static", e);
            return scrape_static(fetcher, options).await;
        }
    };

    let report = scrape_with_session(&mut session, options).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    report
}

async fn scrape_with_session(session: &mut BrowserSession, options: &ScrapeOptions) -> ScrapeReport {
    if let Err(e) = session.load(&options.url).await {
        return ScrapeReport::failed(
            &options.brand,
            "Brand Website (Browser)",
            format!("failed to load {}: {}", options.url, e),
        );
    }
    if let Err(e) = session.settle().await {
        warn!("Homepage settle failed: {}", e);
    }

    let homepage_html = match session.html().await {
        Ok(html) => html,
        Err(e) => {
            return ScrapeReport::failed(
                &options.brand,
                "Brand Website (Browser)",
                format!("failed to snapshot {}: {}", options.url, e),
            );
        }
    };

    aggregate_with_driver(
        session,
        &options.brand,
        &options.url,
        &homepage_html,
        "Brand Website (Browser)",
        options.page_budget,
        options.limit,
        options.delay,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!(Strategy::parse("auto"), Some(Strategy::Auto));
        assert_eq!(Strategy::parse("Static"), Some(Strategy::Static));
        assert_eq!(Strategy::parse("crawl-api"), Some(Strategy::CrawlApi));
        assert_eq!(Strategy::parse("selenium"), None);
    }

    #[test]
    fn test_browser_path_rule() {
        assert!(BROWSER_PATH_RE.is_match("/products/chairs"));
        assert!(BROWSER_PATH_RE.is_match("/shop"));
        assert!(!BROWSER_PATH_RE.is_match("/about"));
    }
}
