// Subcategory discovery fallback for category pages with no nav hierarchy

use crate::normalize::clean_category_name;
use curio_harvest::harvest::extract_breadcrumb_links;
use curio_harvest::{PageDriver, Product};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{info, warn};
use url::Url;

static SUBCAT_CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul, div, aside").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static SUBCAT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(product.*categor|categor.*list|categor.*grid|sub.*categor|child.*categor|widget.*categor|sidebar)")
        .unwrap()
});

/// How many products to sample for breadcrumb-based discovery.
const BREADCRUMB_SAMPLE: usize = 3;

fn element_text(el: &ElementRef) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scan a rendered category page for subcategory listings (category grids,
/// sidebar widgets). Returns name -> URL, excluding the parent itself.
pub fn subcategories_on_page(
    html: &str,
    page_url: &str,
    parent_category: &str,
) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut subcategories = BTreeMap::new();

    for container in document
        .select(&SUBCAT_CONTAINER_SEL)
        .filter(|el| {
            el.value().name() == "aside"
                || SUBCAT_CLASS_RE.is_match(el.value().attr("class").unwrap_or(""))
        })
    {
        for link in container.select(&LINK_SEL) {
            let href = link.value().attr("href").unwrap_or("").trim();
            let name = element_text(&link);
            if href.is_empty() || name.len() < 2 {
                continue;
            }
            if !href.contains("/product-category/") && !href.contains("/category/") {
                continue;
            }
            let Some(full_url) = Url::parse(page_url)
                .ok()
                .and_then(|base| base.join(href).ok())
                .map(|u| u.to_string())
            else {
                continue;
            };
            if full_url == page_url {
                continue;
            }
            let clean_name = clean_category_name(&name);
            if !clean_name.is_empty() && clean_name != parent_category {
                subcategories.insert(clean_name, full_url);
            }
        }
    }

    subcategories
}

/// Visit a small sample of products and infer subcategories from their
/// breadcrumb trails: the entry following a loose match of the parent
/// category, provided it is not the product page itself.
pub async fn subcategories_from_products<D: PageDriver>(
    driver: &mut D,
    products: &[Product],
    parent_category: &str,
) -> BTreeMap<String, String> {
    let mut discovered = BTreeMap::new();
    let clean_parent = parent_category.to_lowercase();

    for product in products.iter().take(BREADCRUMB_SAMPLE) {
        let url = &product.source_url;
        info!("Checking product for subcategories: {}", url);

        if let Err(e) = driver.load(url).await {
            warn!("Error discovering subcategories from {}: {}", url, e);
            continue;
        }
        let html = match driver.html().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Error discovering subcategories from {}: {}", url, e);
                continue;
            }
        };

        let breadcrumbs = extract_breadcrumb_links(&html, url);
        for (i, (name, _link)) in breadcrumbs.iter().enumerate() {
            let clean_name = clean_category_name(name).to_lowercase();
            if !(clean_name.contains(&clean_parent) || clean_parent.contains(&clean_name)) {
                continue;
            }
            if let Some((sub_name, sub_link)) = breadcrumbs.get(i + 1)
                && sub_link != url
            {
                let clean_sub = clean_category_name(sub_name);
                if !clean_sub.is_empty() && clean_sub.to_lowercase() != clean_parent {
                    discovered.insert(clean_sub, sub_link.clone());
                }
            }
        }
    }

    discovered
}
