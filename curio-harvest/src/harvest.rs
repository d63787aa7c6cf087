use crate::product::Product;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, article, li").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, h5").unwrap());
static TITLE_CANDIDATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, a, span, div").unwrap());
static PRICE_CANDIDATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span, div, p").unwrap());
static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static META_OG_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property=\"og:title\"]").unwrap());
static META_OG_IMAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property=\"og:image\"]").unwrap());
static META_DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name=\"description\"]").unwrap());
static TITLE_TAG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static ITEMPROP_IMAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[itemprop=\"image\"]").unwrap());
static LIST_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul, ol").unwrap());
static LI_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static HEADER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("header").unwrap());
static BREADCRUMB_CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("nav, div, ul, ol").unwrap());
static BREADCRUMB_ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a, span, li").unwrap());

static PRODUCT_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(product|item|card)").unwrap());
static TITLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(title|name|product.*name|woocommerce-loop-product__title)").unwrap());
static PRICE_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)price").unwrap());
static DETAIL_TITLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(product|title|name)").unwrap());
static DESCRIPTION_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(description|detail|overview)").unwrap());
static DETAIL_IMAGE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(product|main|primary|hero)").unwrap());
static FEATURE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(feature|spec|benefit)").unwrap());
static BREADCRUMB_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(breadcrumb|bread-crumb|path)").unwrap());
static LOGO_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(brand.*logo|logo.*brand|site-logo)").unwrap());
static BRAND_CONTAINER_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(brand|logo)").unwrap());
static PRICE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.?\d*").unwrap());
static PRODUCT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(/products?/|/items?/|/chairs?/|/desks?/|/seating/|/furniture/|/catalog/|/collections?/)")
        .unwrap()
});

/// Attributes an `<img>` may carry its real source in, in priority order.
const IMAGE_SRC_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

fn element_text(el: &ElementRef) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn class_attr<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().attr("class").unwrap_or("")
}

/// Resolve an href against the page URL. Skips empty, fragment-only and
/// non-navigational schemes; strips fragments from the result.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn image_src(img: &ElementRef) -> Option<String> {
    for attr in IMAGE_SRC_ATTRS {
        if let Some(src) = img.value().attr(attr)
            && !src.trim().is_empty()
        {
            return Some(src.trim().to_string());
        }
    }
    None
}

/// Parse a price out of arbitrary text. Strips thousands separators and
/// currency symbols and takes the first decimal-or-integer token.
pub fn parse_price(text: &str) -> Option<f64> {
    let stripped = text.replace(',', "");
    let token = PRICE_TOKEN_RE.find(&stripped)?;
    token.as_str().parse::<f64>().ok()
}

/// Extract products from a listing page DOM, taking at most `limit`
/// products from the page. A container yields a product only if it has a
/// title or a resolvable link; everything else is expected noise in a
/// generic scan and silently dropped.
pub fn harvest_listing(html: &str, page_url: &str, brand: &str, limit: usize) -> Vec<Product> {
    let document = Html::parse_document(html);
    let mut products = Vec::new();
    let mut seen_links: HashSet<String> = HashSet::new();

    for container in document.select(&CONTAINER_SEL) {
        if products.len() >= limit {
            break;
        }
        if !PRODUCT_CLASS_RE.is_match(class_attr(&container)) {
            continue;
        }

        let link_url = container
            .select(&LINK_SEL)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_url(page_url, href));

        // Nested card markup produces one container per wrapper element;
        // collapse them on the resolved link.
        if let Some(ref url) = link_url
            && !seen_links.insert(url.clone())
        {
            continue;
        }

        let mut title = container
            .select(&TITLE_CANDIDATE_SEL)
            .find(|el| TITLE_CLASS_RE.is_match(class_attr(el)))
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty());

        if title.is_none() {
            title = container
                .select(&HEADING_SEL)
                .next()
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty());
        }

        if title.is_none() {
            title = container
                .select(&LINK_SEL)
                .next()
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty());
        }

        if title.is_none() {
            let all_text = element_text(&container);
            if !all_text.is_empty() && all_text.len() < 200 {
                title = Some(all_text);
            }
        }

        if title.is_none() && link_url.is_none() {
            continue;
        }

        let image_url = container
            .select(&IMG_SEL)
            .next()
            .and_then(|img| image_src(&img))
            .and_then(|src| resolve_url(page_url, &src));

        let price = container
            .select(&PRICE_CANDIDATE_SEL)
            .find(|el| PRICE_CLASS_RE.is_match(class_attr(el)))
            .and_then(|el| parse_price(&element_text(&el)));

        let source_url = link_url.unwrap_or_else(|| page_url.to_string());
        let mut product = match title {
            Some(title) => Product::with_model(brand.to_string(), title, source_url),
            None => Product::new(brand.to_string(), source_url),
        };
        product.image_url = image_url;
        product.price = price;
        products.push(product);
    }

    debug!("Harvested {} products from {}", products.len(), page_url);
    products
}

/// Extract a single product from a detail page DOM. Returns `None` only
/// when no title can be determined at all.
pub fn harvest_detail(html: &str, page_url: &str, brand: &str) -> Option<Product> {
    let document = Html::parse_document(html);

    let title = extract_detail_title(&document)?;

    let mut product = Product::with_model(brand.to_string(), title, page_url.to_string());
    product.description = extract_detail_description(&document);
    product.image_url = extract_detail_image(&document, page_url);
    product.price = extract_detail_price(&document);
    product.features = extract_features(&document);
    product.category_path = extract_breadcrumb_trail_from(&document);
    Some(product)
}

fn extract_detail_title(document: &Html) -> Option<String> {
    if let Some(h1) = document
        .select(&H1_SEL)
        .find(|el| DETAIL_TITLE_CLASS_RE.is_match(class_attr(el)))
    {
        let text = element_text(&h1);
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Some(h1) = document.select(&H1_SEL).next() {
        let text = element_text(&h1);
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Some(meta) = document.select(&META_OG_TITLE_SEL).next()
        && let Some(content) = meta.value().attr("content")
        && !content.trim().is_empty()
    {
        return Some(content.trim().to_string());
    }

    document
        .select(&TITLE_TAG_SEL)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

fn extract_detail_description(document: &Html) -> String {
    if let Some(meta) = document.select(&META_DESCRIPTION_SEL).next()
        && let Some(content) = meta.value().attr("content")
        && !content.trim().is_empty()
    {
        return content.trim().to_string();
    }

    for container in document
        .select(&PRICE_CANDIDATE_SEL)
        .filter(|el| DESCRIPTION_CLASS_RE.is_match(class_attr(el)))
        .take(3)
    {
        let text = element_text(&container);
        if text.len() > 50 {
            return text.chars().take(500).collect();
        }
    }

    String::new()
}

fn extract_detail_image(document: &Html, page_url: &str) -> Option<String> {
    if let Some(img) = document
        .select(&IMG_SEL)
        .find(|el| DETAIL_IMAGE_CLASS_RE.is_match(class_attr(el)))
        && let Some(src) = image_src(&img)
    {
        return resolve_url(page_url, &src);
    }

    if let Some(meta) = document.select(&META_OG_IMAGE_SEL).next()
        && let Some(content) = meta.value().attr("content")
        && !content.trim().is_empty()
    {
        return resolve_url(page_url, content.trim());
    }

    if let Some(img) = document.select(&ITEMPROP_IMAGE_SEL).next()
        && let Some(src) = image_src(&img)
    {
        return resolve_url(page_url, &src);
    }

    document
        .select(&IMG_SEL)
        .next()
        .and_then(|img| image_src(&img))
        .and_then(|src| resolve_url(page_url, &src))
}

fn extract_detail_price(document: &Html) -> Option<f64> {
    if let Some(price) = document
        .select(&PRICE_CANDIDATE_SEL)
        .find(|el| PRICE_CLASS_RE.is_match(class_attr(el)))
        .and_then(|el| parse_price(&element_text(&el)))
    {
        return Some(price);
    }

    document
        .select(&PRICE_CANDIDATE_SEL)
        .find(|el| el.value().attr("itemprop") == Some("price"))
        .and_then(|el| parse_price(&element_text(&el)))
}

fn extract_features(document: &Html) -> Vec<String> {
    let mut features = Vec::new();
    for list in document
        .select(&LIST_SEL)
        .filter(|el| FEATURE_CLASS_RE.is_match(class_attr(el)))
        .take(2)
    {
        for item in list.select(&LI_SEL).take(5) {
            let text = element_text(&item);
            if !text.is_empty() && text.len() < 100 {
                features.push(text);
            }
        }
    }
    features
}

const BREADCRUMB_SEPARATORS: &[&str] = &[">", "/", "»", "Home"];

fn extract_breadcrumb_trail_from(document: &Html) -> Vec<String> {
    for container in document
        .select(&BREADCRUMB_CONTAINER_SEL)
        .filter(|el| {
            BREADCRUMB_CLASS_RE.is_match(class_attr(el))
                || BREADCRUMB_CLASS_RE.is_match(el.value().attr("id").unwrap_or(""))
        })
    {
        let mut trail: Vec<String> = Vec::new();
        for item in container.select(&BREADCRUMB_ITEM_SEL) {
            let text = element_text(&item);
            if text.len() > 1 && !BREADCRUMB_SEPARATORS.contains(&text.as_str()) {
                // span nested inside a yields the same label twice
                if trail.last().map(String::as_str) != Some(text.as_str()) {
                    trail.push(text);
                }
            }
        }
        if !trail.is_empty() {
            return trail;
        }
    }
    Vec::new()
}

/// Breadcrumb trail as (label, resolved URL) pairs. The first container
/// that yields any links wins.
pub fn extract_breadcrumb_links(html: &str, page_url: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);

    for container in document
        .select(&BREADCRUMB_CONTAINER_SEL)
        .filter(|el| {
            BREADCRUMB_CLASS_RE.is_match(class_attr(el))
                || BREADCRUMB_CLASS_RE.is_match(el.value().attr("id").unwrap_or(""))
        })
    {
        let mut links = Vec::new();
        for anchor in container.select(&LINK_SEL) {
            let text = element_text(&anchor);
            if text.is_empty() || BREADCRUMB_SEPARATORS.contains(&text.as_str()) {
                continue;
            }
            if let Some(href) = anchor.value().attr("href")
                && let Some(url) = resolve_url(page_url, href)
            {
                links.push((text, url));
            }
        }
        if !links.is_empty() {
            return links;
        }
    }
    Vec::new()
}

/// Find direct product-page links anywhere on a page, by URL shape.
pub fn find_product_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&LINK_SEL) {
        if let Some(href) = anchor.value().attr("href")
            && let Some(url) = resolve_url(base_url, href)
            && PRODUCT_URL_RE.is_match(&url)
            && seen.insert(url.clone())
        {
            links.push(url);
        }
    }
    links
}

/// Best-effort brand logo extraction, in priority order: og:image carrying
/// "logo", ranked logo selectors, brand/logo containers, any logo-named
/// image, first header image.
pub fn extract_logo(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(meta) = document.select(&META_OG_IMAGE_SEL).next()
        && let Some(content) = meta.value().attr("content")
        && content.to_lowercase().contains("logo")
    {
        return Some(strip_query(content));
    }

    let logo_selectors = [
        ".custom-logo",
        ".site-logo img",
        ".logo img",
        "a.logo img",
        "header img[src*=\"logo\"]",
        ".navbar-brand img",
        "#logo img",
        ".header-logo img",
    ];
    for selector in logo_selectors {
        let parsed = Selector::parse(selector).unwrap();
        if let Some(el) = document.select(&parsed).next() {
            let src = image_src(&el).or_else(|| {
                el.value()
                    .attr("srcset")
                    .and_then(|s| s.split_whitespace().next())
                    .map(str::to_string)
            });
            if let Some(src) = src
                && let Some(url) = resolve_url(base_url, &src)
            {
                return Some(strip_query(&url));
            }
        }
    }

    if let Some(img) = document
        .select(&IMG_SEL)
        .find(|el| LOGO_CLASS_RE.is_match(class_attr(el)))
        && let Some(src) = image_src(&img)
        && let Some(url) = resolve_url(base_url, &src)
    {
        return Some(strip_query(&url));
    }

    if let Some(container) = document
        .select(&CONTAINER_SEL)
        .find(|el| BRAND_CONTAINER_CLASS_RE.is_match(class_attr(el)))
        && let Some(img) = container.select(&IMG_SEL).next()
        && let Some(src) = image_src(&img)
        && let Some(url) = resolve_url(base_url, &src)
    {
        return Some(strip_query(&url));
    }

    for img in document.select(&IMG_SEL) {
        let alt = img.value().attr("alt").unwrap_or("").to_lowercase();
        let src = img.value().attr("src").unwrap_or("").to_lowercase();
        if (alt.contains("logo") || src.contains("logo"))
            && src.len() < 255
            && !["placeholder", "spinner", "loading"]
                .iter()
                .any(|x| src.contains(x))
            && let Some(url) = resolve_url(base_url, img.value().attr("src").unwrap_or(""))
        {
            return Some(strip_query(&url));
        }
    }

    document
        .select(&HEADER_SEL)
        .next()
        .and_then(|header| header.select(&IMG_SEL).next())
        .and_then(|img| img.value().attr("src").map(str::to_string))
        .and_then(|src| resolve_url(base_url, &src))
}

fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/cat/task/";

    #[test]
    fn test_parse_price_plain() {
        assert_eq!(parse_price("1299"), Some(1299.0));
    }

    #[test]
    fn test_parse_price_currency_and_separators() {
        assert_eq!(parse_price("$1,299.50"), Some(1299.5));
        assert_eq!(parse_price("AED 2,400"), Some(2400.0));
    }

    #[test]
    fn test_parse_price_no_digits() {
        assert_eq!(parse_price("Contact for price"), None);
    }

    #[test]
    fn test_resolve_url_skips_non_navigational() {
        assert_eq!(resolve_url(BASE, "javascript:void(0)"), None);
        assert_eq!(resolve_url(BASE, "mailto:x@example.com"), None);
        assert_eq!(resolve_url(BASE, "#top"), None);
        assert_eq!(resolve_url(BASE, ""), None);
    }

    #[test]
    fn test_resolve_url_strips_fragment() {
        assert_eq!(
            resolve_url(BASE, "/p/chair#reviews"),
            Some("https://example.com/p/chair".to_string())
        );
    }

    #[test]
    fn test_harvest_listing_extracts_cards() {
        let html = r#"<html><body>
            <div class="product-card">
              <a href="/product/alpha-chair/"><h3>Alpha Chair</h3></a>
              <img data-src="/img/alpha.jpg">
              <span class="price">$1,299.00</span>
            </div>
            <div class="product-card">
              <a href="/product/beta-desk/">Beta Desk</a>
              <img src="/img/beta.jpg">
            </div>
            <div class="banner">no product signal here</div>
        </body></html>"#;

        let products = harvest_listing(html, "https://example.com/shop/", "Acme", 50);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].model, "Alpha Chair");
        assert_eq!(products[0].price, Some(1299.0));
        assert_eq!(
            products[0].image_url.as_deref(),
            Some("https://example.com/img/alpha.jpg")
        );
        assert_eq!(
            products[0].source_url,
            "https://example.com/product/alpha-chair/"
        );
        assert_eq!(products[1].model, "Beta Desk");
        assert_eq!(products[1].price, None);
    }

    #[test]
    fn test_harvest_listing_nested_wrappers_collapse() {
        let html = r#"<div class="product">
            <div class="product-inner">
              <a href="/product/gamma/"><h3>Gamma</h3></a>
            </div>
        </div>"#;
        let products = harvest_listing(html, "https://example.com/", "Acme", 50);
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn test_harvest_listing_caps_at_limit() {
        let html = r#"<body>
            <div class="product-card"><a href="/product/a/"><h3>A</h3></a></div>
            <div class="product-card"><a href="/product/b/"><h3>B</h3></a></div>
            <div class="product-card"><a href="/product/c/"><h3>C</h3></a></div>
        </body>"#;
        let products = harvest_listing(html, "https://example.com/", "Acme", 2);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].model, "A");
        assert_eq!(products[1].model, "B");
    }

    #[test]
    fn test_harvest_listing_container_without_signal_dropped() {
        let html = r#"<div class="product-card"><img src="/x.jpg"></div>"#;
        let products = harvest_listing(html, "https://example.com/", "Acme", 50);
        // A bare image yields no title and no link; the container is noise.
        assert!(products.is_empty());
    }

    #[test]
    fn test_harvest_detail_full_page() {
        let html = r#"<html><head>
            <meta name="description" content="A generous lounge chair.">
            <meta property="og:image" content="/img/lounge.jpg">
          </head><body>
            <nav class="breadcrumb">
              <a href="/">Home</a> <a href="/seating/">Seating</a>
              <span>Lounge Chair</span>
            </nav>
            <h1 class="product-title">Lounge Chair</h1>
            <span class="price">2 450,00 €</span>
            <ul class="features"><li>Oak frame</li><li>Wool upholstery</li></ul>
        </body></html>"#;

        let product =
            harvest_detail(html, "https://example.com/product/lounge/", "Acme").unwrap();
        assert_eq!(product.model, "Lounge Chair");
        assert_eq!(product.description, "A generous lounge chair.");
        assert_eq!(product.features, vec!["Oak frame", "Wool upholstery"]);
        assert_eq!(product.category_path, vec!["Seating", "Lounge Chair"]);
    }

    #[test]
    fn test_harvest_detail_og_title_fallback() {
        let html = r#"<html><head><meta property="og:title" content="Sled Base Chair">
            </head><body><p>spec sheet</p></body></html>"#;
        let product = harvest_detail(html, "https://example.com/p/1", "Acme").unwrap();
        assert_eq!(product.model, "Sled Base Chair");
    }

    #[test]
    fn test_harvest_detail_no_title_is_none() {
        let html = "<html><body><div>nothing identifiable</div></body></html>";
        assert!(harvest_detail(html, "https://example.com/p/2", "Acme").is_none());
    }

    #[test]
    fn test_extract_breadcrumb_links() {
        let html = r#"<nav class="breadcrumbs">
            <a href="/">Home</a>
            <a href="/seating/">Seating</a>
            <a href="/seating/task/">Task Chairs</a>
        </nav>"#;
        let links = extract_breadcrumb_links(html, "https://example.com/product/x/");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].0, "Seating");
        assert_eq!(links[1].1, "https://example.com/seating/task/");
    }

    #[test]
    fn test_find_product_links_dedups() {
        let html = r#"<body>
            <a href="/product/alpha/">Alpha</a>
            <a href="/product/alpha/">Alpha again</a>
            <a href="/about/">About</a>
        </body>"#;
        let links = find_product_links(html, "https://example.com/");
        assert_eq!(links, vec!["https://example.com/product/alpha/"]);
    }

    #[test]
    fn test_extract_logo_site_logo_selector() {
        let html = r#"<header><div class="site-logo">
            <img src="/assets/acme-logo.png?v=3"></div></header>"#;
        let logo = extract_logo(html, "https://example.com/");
        assert_eq!(logo.as_deref(), Some("https://example.com/assets/acme-logo.png"));
    }
}
