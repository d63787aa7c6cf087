// Optional detail-page enrichment pass

use crate::report::ScrapeReport;
use curio_harvest::StaticFetcher;
use curio_harvest::harvest::harvest_detail;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Revisit the detail pages of products missing a description, price or
/// image and backfill what the detail page offers. Fetch or parse failures
/// skip the product; enrichment never removes data.
pub async fn enrich_missing(fetcher: &StaticFetcher, report: &mut ScrapeReport, delay: Duration) {
    let needs_enrichment: Vec<String> = report
        .all_products
        .iter()
        .filter(|p| p.description.is_empty() || p.price.is_none() || p.image_url.is_none())
        .map(|p| p.source_url.clone())
        .collect();

    if needs_enrichment.is_empty() {
        return;
    }
    info!("Enriching {} products from detail pages", needs_enrichment.len());

    let mut enriched: HashMap<String, curio_harvest::Product> = HashMap::new();
    for url in &needs_enrichment {
        tokio::time::sleep(delay).await;

        let html = match fetcher.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Enrichment fetch failed for {}: {}", url, e);
                continue;
            }
        };
        if let Some(detail) = harvest_detail(&html, url, &report.brand) {
            enriched.insert(url.clone(), detail);
        } else {
            debug!("No detail content found at {}", url);
        }
    }

    let mut backfilled = 0usize;
    for entry in report.collections.values_mut() {
        for product in &mut entry.products {
            let Some(detail) = enriched.get(&product.source_url) else {
                continue;
            };
            let mut touched = false;
            if product.description.is_empty() && !detail.description.is_empty() {
                product.description = detail.description.clone();
                touched = true;
            }
            if product.price.is_none() && detail.price.is_some() {
                product.price = detail.price;
                touched = true;
            }
            if product.image_url.is_none() && detail.image_url.is_some() {
                product.image_url = detail.image_url.clone();
                touched = true;
            }
            if touched {
                backfilled += 1;
            }
        }
    }

    // all_products mirrors the collection entries
    report.finalize();
    info!("Backfilled {} products", backfilled);
}
