// Catalog assembly: walk detected collections, harvest each node,
// bucket stray product links, recompute counts

use crate::detect::{CollectionNode, detect_collections};
use crate::discover::{subcategories_from_products, subcategories_on_page};
use crate::report::{CollectionEntry, ScrapeReport};
use curio_harvest::harvest::{extract_logo, find_product_links, harvest_detail, harvest_listing};
use curio_harvest::{PageDriver, Product, StaticFetcher, drive_listing};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{info, warn};

/// Cap on direct (non-collection) product links harvested per run.
pub const DIRECT_PRODUCT_CAP: usize = 50;

fn tag_products(
    products: &mut [Product],
    collection: &str,
    category: &str,
    subcategory: Option<&str>,
) {
    for product in products {
        product.collection = Some(collection.to_string());
        product.category = Some(category.to_string());
        product.subcategory = subcategory.map(str::to_string);
    }
}

/// Assemble a report by driving a rendered browser session through every
/// detected collection. A node whose page reveals subcategories is not
/// harvested itself; its children are harvested instead, since parent
/// pages re-list child contents and direct harvesting would double-count.
pub async fn aggregate_with_driver<D: PageDriver>(
    driver: &mut D,
    brand: &str,
    base_url: &str,
    homepage_html: &str,
    source: &str,
    page_budget: usize,
    limit: usize,
    delay: Duration,
) -> ScrapeReport {
    let mut report = ScrapeReport::new(brand, source);
    report.logo = extract_logo(homepage_html, base_url);

    let collections = detect_collections(homepage_html, base_url);
    let product_links = find_product_links(homepage_html, base_url);

    for (name, node) in &collections {
        info!("Scraping collection: {}", name);
        tokio::time::sleep(delay).await;

        let subcategories = discover_subcategories(driver, name, node, brand, limit).await;

        if !subcategories.is_empty() {
            info!(
                "Found {} subcategories under {}",
                subcategories.len(),
                name
            );
            for (sub_name, sub_url) in subcategories {
                info!("Scraping subcategory: {} > {}", name, sub_name);
                tokio::time::sleep(delay).await;

                let mut products =
                    drive_listing(driver, &sub_url, brand, page_budget, limit).await;
                if products.is_empty() {
                    continue;
                }

                let full_name = format!("{} > {}", name, sub_name);
                tag_products(&mut products, &full_name, name, Some(&sub_name));
                report.collections.insert(
                    full_name.clone(),
                    CollectionEntry {
                        url: sub_url,
                        category: name.clone(),
                        subcategory: Some(sub_name),
                        product_count: products.len(),
                        products,
                    },
                );
            }
            // Parent pages duplicate child contents.
            continue;
        }

        let mut products = drive_listing(driver, &node.url, brand, page_budget, limit).await;
        tag_products(&mut products, name, &node.category, node.subcategory.as_deref());
        report
            .collections
            .insert(name.clone(), CollectionEntry::new(node, products));
    }

    harvest_direct_with_driver(driver, &mut report, base_url, brand, &product_links, delay).await;

    report.finalize();
    report
}

/// Rendered-page rescan first, breadcrumb sampling second.
async fn discover_subcategories<D: PageDriver>(
    driver: &mut D,
    name: &str,
    node: &CollectionNode,
    brand: &str,
    limit: usize,
) -> BTreeMap<String, String> {
    if let Err(e) = driver.load(&node.url).await {
        warn!("Failed to load collection page {}: {}", node.url, e);
        return BTreeMap::new();
    }
    if let Err(e) = driver.settle().await {
        warn!("Failed to settle collection page {}: {}", node.url, e);
    }
    let html = match driver.html().await {
        Ok(html) => html,
        Err(e) => {
            warn!("Failed to snapshot collection page {}: {}", node.url, e);
            return BTreeMap::new();
        }
    };

    let found = subcategories_on_page(&html, &node.url, name);
    if !found.is_empty() {
        return found;
    }

    let sample = harvest_listing(&html, &node.url, brand, limit);
    if sample.is_empty() {
        return BTreeMap::new();
    }
    subcategories_from_products(driver, &sample, name).await
}

async fn harvest_direct_with_driver<D: PageDriver>(
    driver: &mut D,
    report: &mut ScrapeReport,
    base_url: &str,
    brand: &str,
    product_links: &[String],
    delay: Duration,
) {
    let mut seen_urls: HashSet<String> = report
        .collections
        .values()
        .flat_map(|e| e.products.iter().map(|p| p.source_url.clone()))
        .collect();
    let mut direct_products: Vec<Product> = Vec::new();

    for product_url in product_links.iter().take(DIRECT_PRODUCT_CAP) {
        if seen_urls.contains(product_url) {
            continue;
        }

        info!("Scraping product: {}", product_url);
        tokio::time::sleep(delay).await;

        if let Err(e) = driver.load(product_url).await {
            warn!("Failed to load product page {}: {}", product_url, e);
            continue;
        }
        let html = match driver.html().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to snapshot product page {}: {}", product_url, e);
                continue;
            }
        };

        if let Some(mut product) = harvest_detail(&html, product_url, brand) {
            product.collection = Some("Uncategorized".to_string());
            seen_urls.insert(product_url.clone());
            direct_products.push(product);
        }
    }

    insert_uncategorized(report, base_url, direct_products);
}

fn insert_uncategorized(report: &mut ScrapeReport, base_url: &str, products: Vec<Product>) {
    if products.is_empty() {
        return;
    }
    report.collections.insert(
        "Uncategorized".to_string(),
        CollectionEntry {
            url: base_url.to_string(),
            category: "Uncategorized".to_string(),
            subcategory: None,
            product_count: products.len(),
            products,
        },
    );
}

/// Synthesize the Nth page URL for a static listing: query-string sites
/// get `paged=N`, path-style sites get `page/N/`.
pub fn paged_url(url: &str, page: usize) -> String {
    if page <= 1 {
        return url.to_string();
    }
    if url.contains('?') {
        format!("{url}&paged={page}")
    } else if url.ends_with('/') {
        format!("{url}page/{page}/")
    } else {
        format!("{url}?paged={page}")
    }
}

/// Harvest a static listing across synthesized page URLs, stopping on the
/// page budget, an unreachable page, an empty page, or a page that adds
/// nothing new.
async fn harvest_paged(
    fetcher: &StaticFetcher,
    url: &str,
    brand: &str,
    page_budget: usize,
    limit: usize,
    delay: Duration,
) -> Vec<Product> {
    let mut products: Vec<Product> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for page in 1..=page_budget {
        let page_url = paged_url(url, page);
        if page > 1 {
            tokio::time::sleep(delay).await;
        }

        let html = match fetcher.fetch_html(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch {}: {}", page_url, e);
                break;
            }
        };

        let page_products = harvest_listing(&html, &page_url, brand, limit);
        if page_products.is_empty() {
            info!("No more products found on page {}", page);
            break;
        }

        let mut fresh = 0usize;
        for product in page_products {
            if seen_urls.insert(product.source_url.clone()) {
                products.push(product);
                fresh += 1;
            }
        }
        if fresh == 0 {
            break;
        }
    }

    products
}

/// Assemble a report over plain HTTP, paginating with synthesized page
/// URLs instead of a browser.
pub async fn aggregate_static(
    fetcher: &StaticFetcher,
    brand: &str,
    base_url: &str,
    homepage_html: &str,
    page_budget: usize,
    limit: usize,
    delay: Duration,
) -> ScrapeReport {
    let mut report = ScrapeReport::new(brand, "Brand Website");
    report.logo = extract_logo(homepage_html, base_url);

    let collections = detect_collections(homepage_html, base_url);
    let product_links = find_product_links(homepage_html, base_url);

    for (name, node) in &collections {
        info!("Scraping collection: {}", name);
        tokio::time::sleep(delay).await;

        let mut products =
            harvest_paged(fetcher, &node.url, brand, page_budget, limit, delay).await;
        tag_products(&mut products, name, &node.category, node.subcategory.as_deref());
        report
            .collections
            .insert(name.clone(), CollectionEntry::new(node, products));
    }

    let mut seen_urls: HashSet<String> = report
        .collections
        .values()
        .flat_map(|e| e.products.iter().map(|p| p.source_url.clone()))
        .collect();
    let mut direct_products: Vec<Product> = Vec::new();

    for product_url in product_links.iter().take(DIRECT_PRODUCT_CAP) {
        if seen_urls.contains(product_url) {
            continue;
        }

        info!("Scraping product: {}", product_url);
        tokio::time::sleep(delay).await;

        let html = match fetcher.fetch_html(product_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch product page {}: {}", product_url, e);
                continue;
            }
        };
        if let Some(mut product) = harvest_detail(&html, product_url, brand) {
            product.collection = Some("Uncategorized".to_string());
            seen_urls.insert(product_url.clone());
            direct_products.push(product);
        }
    }

    insert_uncategorized(&mut report, base_url, direct_products);

    report.finalize();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curio_harvest::HarvestError;
    use curio_harvest::error::Result as HarvestResult;
    use curio_harvest::fetch::NextControl;
    use std::collections::HashMap;

    /// A canned site: URL -> DOM snapshot, served through the driver trait.
    struct SiteDriver {
        pages: HashMap<String, String>,
        current: String,
    }

    impl SiteDriver {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                current: String::new(),
            }
        }
    }

    #[async_trait]
    impl PageDriver for SiteDriver {
        async fn load(&mut self, url: &str) -> HarvestResult<()> {
            self.current = url.to_string();
            if self.pages.contains_key(url) {
                Ok(())
            } else {
                Err(HarvestError::Other(format!("no page {url}")))
            }
        }

        async fn settle(&mut self) -> HarvestResult<()> {
            Ok(())
        }

        async fn html(&mut self) -> HarvestResult<String> {
            Ok(self.pages.get(&self.current).cloned().unwrap_or_default())
        }

        async fn activate(&mut self, _control: &NextControl) -> HarvestResult<bool> {
            Ok(false)
        }
    }

    const HOMEPAGE: &str = r#"<html><body>
        <nav class="main-nav">
          <a href="/cat/workspace/">Workspace</a>
        </nav>
        <a href="/product/orphan-lamp/">Orphan Lamp</a>
    </body></html>"#;

    const WORKSPACE_PAGE: &str = r#"<html><body>
        <div class="product-categories">
          <a href="/product-category/desks/">Desks</a>
          <a href="/product-category/chairs/">Chairs</a>
        </div>
    </body></html>"#;

    const DESKS_LISTING: &str = r#"<html><body>
        <div class="product-card"><a href="/product/delta-desk/"><h3>Delta Desk</h3></a></div>
        <div class="product-card"><a href="/product/echo-desk/"><h3>Echo Desk</h3></a></div>
    </body></html>"#;

    fn workspace_site() -> SiteDriver {
        SiteDriver::new(&[
            ("https://example.com/cat/workspace/", WORKSPACE_PAGE),
            ("https://example.com/product-category/desks/", DESKS_LISTING),
            (
                "https://example.com/product-category/chairs/",
                "<html><body><p>Coming soon.</p></body></html>",
            ),
            (
                "https://example.com/product/orphan-lamp/",
                r#"<html><body><h1 class="product-title">Orphan Lamp</h1></body></html>"#,
            ),
        ])
    }

    #[tokio::test]
    async fn test_node_with_subcategories_is_not_harvested_itself() {
        let mut driver = workspace_site();

        let report = aggregate_with_driver(
            &mut driver,
            "Acme",
            "https://example.com/",
            HOMEPAGE,
            "Brand Website (Browser)",
            5,
            50,
            Duration::ZERO,
        )
        .await;

        // The parent page re-lists its children; only the children appear.
        assert!(!report.collections.contains_key("Workspace"));
        let desks = &report.collections["Workspace > Desks"];
        assert_eq!(desks.product_count, 2);
        assert_eq!(desks.category, "Workspace");
        assert_eq!(desks.subcategory.as_deref(), Some("Desks"));
        assert_eq!(
            desks.products[0].collection.as_deref(),
            Some("Workspace > Desks")
        );

        // An empty subcategory listing yields no entry.
        assert!(!report.collections.contains_key("Workspace > Chairs"));
    }

    #[tokio::test]
    async fn test_direct_product_links_filed_under_uncategorized() {
        let mut driver = workspace_site();

        let report = aggregate_with_driver(
            &mut driver,
            "Acme",
            "https://example.com/",
            HOMEPAGE,
            "Brand Website (Browser)",
            5,
            50,
            Duration::ZERO,
        )
        .await;

        let stray = &report.collections["Uncategorized"];
        assert_eq!(stray.product_count, 1);
        assert_eq!(stray.products[0].model, "Orphan Lamp");
        assert_eq!(stray.products[0].collection.as_deref(), Some("Uncategorized"));

        assert_eq!(report.total_products, 3);
        let per_entry: usize = report.collections.values().map(|e| e.products.len()).sum();
        assert_eq!(report.total_products, per_entry);
    }

    #[test]
    fn test_paged_url_first_page_unchanged() {
        assert_eq!(paged_url("https://x.com/cat/", 1), "https://x.com/cat/");
    }

    #[test]
    fn test_paged_url_trailing_slash() {
        assert_eq!(
            paged_url("https://x.com/cat/", 3),
            "https://x.com/cat/page/3/"
        );
    }

    #[test]
    fn test_paged_url_query_string() {
        assert_eq!(
            paged_url("https://x.com/cat?sort=new", 2),
            "https://x.com/cat?sort=new&paged=2"
        );
    }

    #[test]
    fn test_paged_url_bare_path() {
        assert_eq!(paged_url("https://x.com/cat", 2), "https://x.com/cat?paged=2");
    }
}
