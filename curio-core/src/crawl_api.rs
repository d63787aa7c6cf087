// Crawl-API strategy: hand the whole site to a hosted crawl service and
// classify the returned pages into products and listings

use crate::report::{CollectionEntry, ScrapeReport};
use curio_harvest::Product;
use curio_harvest::error::{HarvestError, Result};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Environment variable holding the crawl service API key.
pub const API_KEY_ENV: &str = "CURIO_CRAWL_API_KEY";

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: usize = 60;

static CATEGORY_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(/product-category/|/category/|/product-tag/|/collection/|/shop/?$|/products/?$|/archive|/page/\d+)")
        .unwrap()
});
static PRODUCT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(/product/[^/]+/?$|/item/[^/]+/?$|/p/[^/]+/?$|-\d+\.html$)").unwrap()
});
static PRODUCT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[([^\]]+)\]\((https?://[^)]+/product/[^)]+)\)").unwrap()
});
static SECTION_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((https?://[^)]+/product/[^)]+)\)").unwrap());
static MARKDOWN_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\((https?://[^)]+)\)").unwrap());
static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
static PRICE_BEFORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Price|Cost|AED|USD|\$|€|£)\s*:?\s*(\d+(?:[.,]\d{2})?)").unwrap()
});
static PRICE_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d{2})?)\s*(?:AED|USD|\$|€|£)").unwrap());
static TITLE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*[-|]\s*.+$").unwrap());
static TITLE_PARENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());
static TITLE_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(buy|shop|price|online)\b").unwrap());

/// Markdown link labels that are navigation chrome, not product names.
const SKIP_TERMS: &[&str] = &[
    "add to",
    "select option",
    "wishlist",
    "cart",
    "home",
    "archives",
    "open submenu",
    "contact for price",
    "showing",
    "filter",
    "sort by",
    "page",
    "next",
    "previous",
    "view:",
    "categories",
    "tags",
];

#[derive(Debug, Serialize)]
struct CrawlStartRequest<'a> {
    url: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct CrawlStartResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    /// Status URL to poll for completion.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrawlStatusResponse {
    pub status: String,
    #[serde(default)]
    pub data: Vec<CrawlPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlPage {
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub metadata: PageMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "sourceURL")]
    pub source_url: Option<String>,
    #[serde(default, rename = "ogImage")]
    pub og_image: Option<String>,
    #[serde(default, rename = "ogType")]
    pub og_type: Option<String>,
}

pub struct CrawlApiClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl CrawlApiClient {
    pub fn new(api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: std::env::var(API_KEY_ENV).ok(),
        }
    }

    pub fn with_api_key(api_base: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: Some(api_key.to_string()),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Start a crawl job and poll its status URL until it completes.
    pub async fn crawl(&self, url: &str, limit: usize) -> Result<Vec<CrawlPage>> {
        info!("Initiating crawl job for {} (limit: {} pages)", url, limit);

        let start: CrawlStartResponse = self
            .authorize(self.client.post(format!("{}/v1/crawl", self.api_base)))
            .json(&CrawlStartRequest { url, limit })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !start.success {
            return Err(HarvestError::Other("crawl job was not accepted".into()));
        }
        let status_url = match (start.url, start.id) {
            (Some(url), _) => url,
            (None, Some(id)) => format!("{}/v1/crawl/{}", self.api_base, id),
            (None, None) => {
                return Err(HarvestError::Other(
                    "crawl start response carried no job reference".into(),
                ));
            }
        };

        for _ in 0..MAX_POLLS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let status: CrawlStatusResponse = self
                .authorize(self.client.get(&status_url))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            debug!("Crawl status: {}", status.status);
            match status.status.as_str() {
                "completed" => {
                    info!("Crawl completed with {} pages", status.data.len());
                    return Ok(status.data);
                }
                "failed" => return Err(HarvestError::Other("crawl job failed".into())),
                _ => {}
            }
        }

        Err(HarvestError::Other("crawl job timed out".into()))
    }

    /// Run a full catalog scrape through the crawl service. Never errors
    /// past this boundary: total failure is reported in-band.
    pub async fn scrape_catalog(&self, website: &str, brand: &str, limit: usize) -> ScrapeReport {
        match self.crawl(website, limit).await {
            Ok(pages) => classify_pages(&pages, brand),
            Err(e) => {
                warn!("Crawl API scrape failed for {}: {}", website, e);
                ScrapeReport::failed(brand, "Brand Website (Crawl API)", e.to_string())
            }
        }
    }
}

/// Sort crawled pages into product pages and listing pages, extract
/// products from each, and assemble the report.
pub fn classify_pages(pages: &[CrawlPage], brand: &str) -> ScrapeReport {
    let mut report = ScrapeReport::new(brand, "Brand Website (Crawl API)");

    for page in pages {
        let url = page.metadata.source_url.clone().unwrap_or_default();
        if url.is_empty() {
            continue;
        }

        if is_product_page(&url, &page.metadata) {
            if let Some(mut product) = product_from_page(page, &url, brand) {
                let (category, subcategory) = category_from_url(&url);
                product.category = Some(category.clone());
                product.subcategory = subcategory.clone();
                file_product(&mut report, product, &url, category, subcategory);
            }
        } else if is_category_page(&url, &page.markdown) {
            let products = products_from_listing_markdown(&page.markdown, brand);
            if products.is_empty() {
                continue;
            }
            info!("Extracted {} products from listing page: {}", products.len(), url);
            let (category, subcategory) = category_from_url(&url);
            let subcategory = Some(subcategory.unwrap_or_else(|| "general".to_string()));
            for mut product in products {
                product.category = Some(category.clone());
                product.subcategory = subcategory.clone();
                file_product(&mut report, product, &url, category.clone(), subcategory.clone());
            }
        }
    }

    report.finalize();
    report
}

fn file_product(
    report: &mut ScrapeReport,
    mut product: Product,
    page_url: &str,
    category: String,
    subcategory: Option<String>,
) {
    let key = match &subcategory {
        Some(sub) => format!("{} > {}", category, sub),
        None => category.clone(),
    };
    product.collection = Some(key.clone());

    let entry = report
        .collections
        .entry(key)
        .or_insert_with(|| CollectionEntry {
            url: page_url.to_string(),
            category,
            subcategory,
            product_count: 0,
            products: Vec::new(),
        });
    entry.products.push(product);
}

/// A page is a product page if its URL has a single-product shape or its
/// og:type says so; listing-shaped URLs are excluded first.
pub fn is_product_page(url: &str, metadata: &PageMetadata) -> bool {
    if CATEGORY_URL_RE.is_match(url) {
        return false;
    }
    if PRODUCT_URL_RE.is_match(url) {
        return true;
    }
    metadata.og_type.as_deref() == Some("product")
}

/// A page is a listing if its URL has a category shape, or its markdown
/// carries at least three product links.
pub fn is_category_page(url: &str, markdown: &str) -> bool {
    if CATEGORY_URL_RE.is_match(url) {
        return true;
    }
    PRODUCT_LINK_RE.find_iter(markdown).count() >= 3
}

fn skip_label(label: &str) -> bool {
    let lowered = label.to_lowercase();
    SKIP_TERMS.iter().any(|term| lowered.contains(term))
}

/// Products from a listing page's markdown: plain product links first,
/// then `###` sections that contain a product link.
pub fn products_from_listing_markdown(markdown: &str, brand: &str) -> Vec<Product> {
    let mut products: Vec<Product> = Vec::new();

    for caps in PRODUCT_LINK_RE.captures_iter(markdown) {
        let title = caps[1].trim().to_string();
        let product_url = caps[2].to_string();

        if title.len() < 3 || skip_label(&title) {
            continue;
        }
        if CATEGORY_URL_RE.is_match(&product_url) {
            continue;
        }
        if products.iter().any(|p| p.source_url == product_url) {
            continue;
        }

        products.push(Product::with_model(brand.to_string(), title, product_url));
    }

    for (section_title, section_body) in markdown_sections(markdown) {
        if skip_label(&section_title) {
            continue;
        }
        let Some(url_caps) = SECTION_URL_RE.captures(&section_body) else {
            continue;
        };
        let product_url = url_caps[1].to_string();
        if products.iter().any(|p| p.source_url == product_url) {
            continue;
        }

        let mut product =
            Product::with_model(brand.to_string(), section_title, product_url);
        product.description = section_body.trim().chars().take(200).collect();
        product.image_url = MARKDOWN_IMAGE_RE
            .captures(&section_body)
            .map(|c| c[1].to_string());
        products.push(product);
    }

    products
}

/// Split markdown into `### Title` sections, stripping link brackets from
/// the title line.
fn markdown_sections(markdown: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in markdown.lines() {
        if let Some(rest) = line.strip_prefix("### ") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            let title = rest
                .trim()
                .trim_start_matches('[')
                .split(']')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            if !title.is_empty() {
                current = Some((title, String::new()));
            }
        } else if let Some((_, body)) = current.as_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }
    sections
}

/// A single product from a product page: title from metadata or the first
/// H1, image from og:image or the first markdown image, price and
/// description from metadata or markdown.
pub fn product_from_page(page: &CrawlPage, url: &str, brand: &str) -> Option<Product> {
    let raw_title = page
        .metadata
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| H1_RE.captures(&page.markdown).map(|c| c[1].trim().to_string()))?;

    let title = clean_product_title(&raw_title, brand);
    if title.len() < 3 {
        return None;
    }

    let mut product = Product::with_model(brand.to_string(), title, url.to_string());

    product.image_url = page
        .metadata
        .og_image
        .clone()
        .filter(|i| !i.is_empty())
        .or_else(|| {
            MARKDOWN_IMAGE_RE
                .captures(&page.markdown)
                .map(|c| c[1].to_string())
        });

    product.price = price_from_markdown(&page.markdown);

    product.description = page
        .metadata
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| first_paragraph(&page.markdown));

    Some(product)
}

fn first_paragraph(markdown: &str) -> String {
    markdown
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#') && !p.starts_with("!["))
        .map(|p| p.chars().take(200).collect())
        .unwrap_or_default()
}

/// Strip the brand name, trailing `- site name` tails, parentheticals and
/// storefront noise words from a page title.
pub fn clean_product_title(title: &str, brand: &str) -> String {
    let mut cleaned = title.to_string();

    if !brand.is_empty()
        && let Ok(brand_re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(brand)))
    {
        cleaned = brand_re.replace_all(&cleaned, "").to_string();
    }

    let cleaned = TITLE_TAIL_RE.replace(&cleaned, "");
    let cleaned = TITLE_PARENS_RE.replace_all(&cleaned, "");
    let cleaned = TITLE_NOISE_RE.replace_all(&cleaned, "");

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn price_from_markdown(markdown: &str) -> Option<f64> {
    let caps = PRICE_BEFORE_RE
        .captures(markdown)
        .or_else(|| PRICE_AFTER_RE.captures(markdown))?;
    caps[1].replace(',', ".").parse::<f64>().ok()
}

/// Infer (category, subcategory) from the URL path, title-casing the
/// hyphenated segments and ignoring the `/product/` marker itself.
pub fn category_from_url(url: &str) -> (String, Option<String>) {
    let segments: Vec<String> = Url::parse(url)
        .map(|u| {
            u.path()
                .split('/')
                .filter(|s| !s.is_empty() && *s != "product")
                .map(title_case_segment)
                .collect()
        })
        .unwrap_or_default();

    match segments.len() {
        0 => ("Products".to_string(), None),
        1 => (segments[0].clone(), None),
        _ => (segments[0].clone(), Some(segments[1].clone())),
    }
}

fn title_case_segment(segment: &str) -> String {
    segment
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
