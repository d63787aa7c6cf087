// Detail-page enrichment against a mock site

use curio_core::enrich::enrich_missing;
use curio_core::report::{CollectionEntry, ScrapeReport};
use curio_harvest::{Product, StaticFetcher};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.to_string())
}

const ALPHA_DETAIL: &str = r#"<html><head>
    <meta name="description" content="An ergonomic task chair.">
  </head><body>
    <h1 class="product-title">Alpha Chair</h1>
    <span class="price">$1,299.00</span>
    <img class="product-image" src="/img/alpha.jpg">
</body></html>"#;

const BETA_DETAIL: &str = r#"<html><head>
    <meta name="description" content="Marketing copy that must not win.">
  </head><body>
    <h1 class="product-title">Beta Desk</h1>
    <span class="price">$1,099.00</span>
    <img class="product-hero" src="/img/beta-large.jpg">
</body></html>"#;

fn report_with(products: Vec<Product>) -> ScrapeReport {
    let mut report = ScrapeReport::new("Acme", "Brand Website");
    report.collections.insert(
        "Desks".to_string(),
        CollectionEntry {
            url: "https://example.com/desks/".to_string(),
            category: "Desks".to_string(),
            subcategory: None,
            product_count: products.len(),
            products,
        },
    );
    report.finalize();
    report
}

#[tokio::test]
async fn test_enrich_backfills_missing_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/alpha/"))
        .respond_with(html_response(ALPHA_DETAIL))
        .mount(&server)
        .await;

    let alpha = Product::with_model(
        "Acme".into(),
        "Alpha Chair".into(),
        format!("{}/product/alpha/", server.uri()),
    );
    let mut report = report_with(vec![alpha]);

    let fetcher = StaticFetcher::new();
    enrich_missing(&fetcher, &mut report, Duration::ZERO).await;

    let product = &report.collections["Desks"].products[0];
    assert_eq!(product.description, "An ergonomic task chair.");
    assert_eq!(product.price, Some(1299.0));
    assert!(product.image_url.as_deref().unwrap().ends_with("/img/alpha.jpg"));
    assert_eq!(report.total_products, 1);
}

#[tokio::test]
async fn test_enrich_never_overwrites_existing_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/beta/"))
        .respond_with(html_response(BETA_DETAIL))
        .mount(&server)
        .await;

    // Missing image only; description and price are already known and the
    // detail page disagrees with both.
    let mut beta = Product::with_model(
        "Acme".into(),
        "Beta Desk".into(),
        format!("{}/product/beta/", server.uri()),
    );
    beta.description = "Hand-finished walnut desk.".to_string();
    beta.price = Some(950.0);
    let mut report = report_with(vec![beta]);

    let fetcher = StaticFetcher::new();
    enrich_missing(&fetcher, &mut report, Duration::ZERO).await;

    let product = &report.collections["Desks"].products[0];
    assert_eq!(product.description, "Hand-finished walnut desk.");
    assert_eq!(product.price, Some(950.0));
    assert!(
        product
            .image_url
            .as_deref()
            .unwrap()
            .ends_with("/img/beta-large.jpg")
    );
}

#[tokio::test]
async fn test_enrich_skips_unreachable_detail_pages() {
    let server = MockServer::start().await;
    // No mounts: the detail page 404s.

    let gamma = Product::with_model(
        "Acme".into(),
        "Gamma Stool".into(),
        format!("{}/product/gamma/", server.uri()),
    );
    let mut report = report_with(vec![gamma]);

    let fetcher = StaticFetcher::new();
    enrich_missing(&fetcher, &mut report, Duration::ZERO).await;

    let product = &report.collections["Desks"].products[0];
    assert!(product.description.is_empty());
    assert_eq!(product.price, None);
    assert_eq!(product.image_url, None);
}
