use crate::fetch::{NextControl, PageDriver};
use crate::harvest::harvest_listing;
use crate::product::Product;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Hard cap on paginated pages per listing.
pub const PAGE_BUDGET: usize = 5;

/// "Next page" controls, tried in priority order on each page.
pub const NEXT_CONTROLS: &[NextControl] = &[
    NextControl::Css("a[rel='next']"),
    NextControl::Css("a.next"),
    NextControl::Css("button.next"),
    NextControl::Text("next"),
    NextControl::Text("load more"),
    NextControl::Css(".pagination a:last-child"),
];

/// Pagination progresses through a small state machine. Pages are counted
/// when harvested; a page that adds no new products still consumes budget,
/// which bounds sites whose "next" control is a self-link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    Loading,
    Harvesting,
    Advancing,
    Done,
}

/// Drive a rendered listing page through pagination, harvesting at most
/// `limit` products from each page and collapsing duplicates across pages
/// by product URL.
///
/// A failed initial load yields an empty result; the caller treats that the
/// same as a listing with no products. Failures while advancing end the run
/// with whatever was harvested so far.
pub async fn drive_listing<D: PageDriver>(
    driver: &mut D,
    url: &str,
    brand: &str,
    budget: usize,
    limit: usize,
) -> Vec<Product> {
    let mut products: Vec<Product> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut pages_harvested = 0usize;
    let mut state = PageState::Loading;

    loop {
        match state {
            PageState::Loading => {
                if let Err(e) = driver.load(url).await {
                    warn!("Failed to load listing {}: {}", url, e);
                    return Vec::new();
                }
                if let Err(e) = driver.settle().await {
                    warn!("Failed to settle listing {}: {}", url, e);
                }
                state = PageState::Harvesting;
            }
            PageState::Harvesting => {
                let html = match driver.html().await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("Failed to snapshot listing {}: {}", url, e);
                        state = PageState::Done;
                        continue;
                    }
                };

                let page_products = harvest_listing(&html, url, brand, limit);
                let mut fresh = 0usize;
                for product in page_products {
                    if seen_urls.insert(product.source_url.clone()) {
                        products.push(product);
                        fresh += 1;
                    }
                }
                pages_harvested += 1;
                debug!(
                    "Page {} of {}: {} new products ({} total)",
                    pages_harvested,
                    url,
                    fresh,
                    products.len()
                );

                state = if pages_harvested >= budget {
                    PageState::Done
                } else {
                    PageState::Advancing
                };
            }
            PageState::Advancing => {
                let mut advanced = false;
                for control in NEXT_CONTROLS {
                    match driver.activate(control).await {
                        Ok(true) => {
                            advanced = true;
                            break;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            warn!("Pagination error on {}: {}", url, e);
                        }
                    }
                }

                if advanced {
                    if let Err(e) = driver.settle().await {
                        warn!("Failed to settle after pagination on {}: {}", url, e);
                    }
                    state = PageState::Harvesting;
                } else {
                    state = PageState::Done;
                }
            }
            PageState::Done => break,
        }
    }

    products
}
