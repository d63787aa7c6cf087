// Tests for report assembly and persistence

use curio_core::detect::CollectionNode;
use curio_core::report::{
    CollectionEntry, ScrapeReport, generate_text_summary, safe_brand_name, save_report,
};
use curio_harvest::Product;

fn product(url: &str, model: &str) -> Product {
    Product::with_model("Acme".into(), model.into(), url.into())
}

fn entry(url: &str, products: Vec<Product>) -> CollectionEntry {
    CollectionEntry::new(
        &CollectionNode {
            url: url.into(),
            category: "Seating".into(),
            subcategory: None,
        },
        products,
    )
}

// ============================================================================
// Count Invariant Tests
// ============================================================================

#[test]
fn test_total_products_matches_all_products() {
    let mut report = ScrapeReport::new("Acme", "https://example.com");
    report.collections.insert(
        "Seating".into(),
        entry("https://example.com/seating/", vec![
            product("https://example.com/p/1", "Alpha"),
            product("https://example.com/p/2", "Beta"),
        ]),
    );
    report.collections.insert(
        "Tables".into(),
        entry("https://example.com/tables/", vec![
            product("https://example.com/p/3", "Gamma"),
        ]),
    );

    report.finalize();

    assert_eq!(report.total_products, report.all_products.len());
    let per_entry_sum: usize = report.collections.values().map(|e| e.products.len()).sum();
    assert_eq!(report.total_products, per_entry_sum);
    assert_eq!(report.total_collections, 2);
}

#[test]
fn test_zero_collections_invariant() {
    let mut report = ScrapeReport::new("Acme", "https://example.com");
    report.finalize();

    assert_eq!(report.total_products, 0);
    assert_eq!(report.total_collections, 0);
    assert!(report.all_products.is_empty());
}

#[test]
fn test_collections_are_a_partition() {
    let mut report = ScrapeReport::new("Acme", "https://example.com");
    report.collections.insert(
        "Seating".into(),
        entry("https://example.com/seating/", vec![
            product("https://example.com/p/1", "Alpha"),
        ]),
    );
    report.collections.insert(
        "Sale".into(),
        entry("https://example.com/sale/", vec![
            product("https://example.com/p/1", "Alpha"),
            product("https://example.com/p/4", "Delta"),
        ]),
    );

    report.finalize();

    // The shared product survives in exactly one entry.
    assert_eq!(report.total_products, 2);
    let occurrences: usize = report
        .collections
        .values()
        .flat_map(|e| e.products.iter())
        .filter(|p| p.source_url == "https://example.com/p/1")
        .count();
    assert_eq!(occurrences, 1);
}

#[test]
fn test_failed_report_shape() {
    let report = ScrapeReport::failed("Acme", "https://example.com", "homepage unreachable");

    assert_eq!(report.error.as_deref(), Some("homepage unreachable"));
    assert_eq!(report.total_products, 0);
    assert!(report.collections.is_empty());
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[test]
fn test_save_report_filename_and_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let mut report = ScrapeReport::new("Acme & Co", "https://example.com");
    report.collections.insert(
        "Seating".into(),
        entry("https://example.com/seating/", vec![
            product("https://example.com/p/1", "Alpha"),
        ]),
    );
    report.finalize();

    let path = save_report(&report, "catalog", dir.path()).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "Acme___Co_catalog.json"
    );

    let json = std::fs::read_to_string(&path).unwrap();
    let loaded: ScrapeReport = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded.brand, "Acme & Co");
    assert_eq!(loaded.total_products, 1);
    assert_eq!(loaded.collections["Seating"].products[0].model, "Alpha");
}

#[test]
fn test_save_report_creates_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("reports").join("brands");
    let report = ScrapeReport::new("Acme", "https://example.com");

    let path = save_report(&report, "catalog", &nested).unwrap();
    assert!(path.exists());
}

#[test]
fn test_safe_brand_name_preserves_word_chars() {
    assert_eq!(safe_brand_name("west-elm_2"), "west-elm_2");
    assert_eq!(safe_brand_name("B&B Italia"), "B_B_Italia");
}

// ============================================================================
// Text Summary Tests
// ============================================================================

#[test]
fn test_text_summary_lists_collections() {
    let mut report = ScrapeReport::new("Acme", "https://example.com");
    report.collections.insert(
        "Seating > Task Chairs".into(),
        entry("https://example.com/cat/task/", vec![
            product("https://example.com/p/1", "Alpha"),
            product("https://example.com/p/2", "Beta"),
        ]),
    );
    report.finalize();

    let text = generate_text_summary(&report);
    assert!(text.contains("Seating > Task Chairs"));
    assert!(text.contains("2 products"));
    assert!(text.contains("Acme"));
}

#[test]
fn test_text_summary_error_short_circuits() {
    let report = ScrapeReport::failed("Acme", "https://example.com", "dns failure");
    let text = generate_text_summary(&report);
    assert!(text.contains("dns failure"));
    assert!(!text.contains("COLLECTIONS"));
}
