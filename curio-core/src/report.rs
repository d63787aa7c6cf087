// Scrape report assembly, rendering and persistence

use crate::detect::CollectionNode;
use curio_harvest::Product;
use curio_harvest::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Products harvested for one collection node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub url: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub product_count: usize,
    pub products: Vec<Product>,
}

impl CollectionEntry {
    pub fn new(node: &CollectionNode, products: Vec<Product>) -> Self {
        Self {
            url: node.url.clone(),
            category: node.category.clone(),
            subcategory: node.subcategory.clone(),
            product_count: products.len(),
            products,
        }
    }
}

/// The uniform result of a scrape run, identical across strategies.
///
/// `error` is the single user-visible total-failure signal: when set, the
/// collections map and counts must not be trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub brand: String,
    pub source: String,
    pub scraped_at: String,
    pub total_products: usize,
    pub total_collections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub collections: BTreeMap<String, CollectionEntry>,
    pub all_products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeReport {
    pub fn new(brand: &str, source: &str) -> Self {
        Self {
            brand: brand.to_string(),
            source: source.to_string(),
            scraped_at: chrono::Utc::now().to_rfc3339(),
            total_products: 0,
            total_collections: 0,
            logo: None,
            collections: BTreeMap::new(),
            all_products: Vec::new(),
            error: None,
        }
    }

    /// A report representing total failure of a scrape run.
    pub fn failed(brand: &str, source: &str, error: impl Into<String>) -> Self {
        let mut report = Self::new(brand, source);
        report.error = Some(error.into());
        report
    }

    /// Rebuild `all_products` and both totals from the collections map.
    /// Counts are always recomputed from the assembled structure, never
    /// carried over from intermediate state. Products appearing in more
    /// than one entry are kept in the first entry only, keyed by URL.
    pub fn finalize(&mut self) {
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut all_products: Vec<Product> = Vec::new();

        for entry in self.collections.values_mut() {
            entry
                .products
                .retain(|p| seen_urls.insert(p.source_url.clone()));
            entry.product_count = entry.products.len();
            all_products.extend(entry.products.iter().cloned());
        }
        self.all_products = all_products;
        self.total_products = self.all_products.len();
        self.total_collections = self.collections.len();
    }
}

/// Sanitize a brand name for use in a filename.
pub fn safe_brand_name(brand: &str) -> String {
    brand
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write the report to `{output_dir}/{safe_brand}_{tier}.json` as pretty
/// JSON. Returns the written path.
pub fn save_report(report: &ScrapeReport, tier: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let filename = format!("{}_{}.json", safe_brand_name(&report.brand), tier);
    let path = output_dir.join(filename);

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| curio_harvest::HarvestError::ParseError(e.to_string()))?;

    let mut file = File::create(&path)?;
    file.write_all(json.as_bytes())?;

    info!("Saved report to {}", path.display());
    Ok(path)
}

pub fn generate_text_summary(report: &ScrapeReport) -> String {
    let mut out = String::new();

    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out.push_str("                   CURIO CATALOG SCRAPE REPORT\n");
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    out.push_str(&format!("Brand:        {}\n", report.brand));
    out.push_str(&format!("Source:       {}\n", report.source));
    out.push_str(&format!("Scraped At:   {}\n", report.scraped_at));

    if let Some(ref error) = report.error {
        out.push_str(&format!("\nScrape FAILED: {}\n", error));
        return out;
    }

    if let Some(ref logo) = report.logo {
        out.push_str(&format!("Logo:         {}\n", logo));
    }
    out.push_str(&format!("Collections:  {}\n", report.total_collections));
    out.push_str(&format!("Products:     {}\n\n", report.total_products));

    if !report.collections.is_empty() {
        out.push_str("──────────────────────────────────────────────────────────────\n");
        out.push_str("COLLECTIONS\n");
        out.push_str("──────────────────────────────────────────────────────────────\n\n");

        for (name, entry) in &report.collections {
            out.push_str(&format!(
                "  {:<40} {:>4} products\n",
                name, entry.product_count
            ));
        }
        out.push('\n');
    }

    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(url: &str) -> Product {
        Product::with_model("Acme".into(), "Chair".into(), url.into())
    }

    fn node(url: &str) -> CollectionNode {
        CollectionNode {
            url: url.into(),
            category: "Seating".into(),
            subcategory: None,
        }
    }

    #[test]
    fn test_finalize_recomputes_counts() {
        let mut report = ScrapeReport::new("Acme", "https://example.com");
        report.collections.insert(
            "Seating".into(),
            CollectionEntry::new(&node("https://example.com/seating/"), vec![
                product("https://example.com/p/1"),
                product("https://example.com/p/2"),
            ]),
        );
        // Stale values that must be overwritten.
        report.total_products = 99;
        report.total_collections = 99;

        report.finalize();

        assert_eq!(report.total_products, 2);
        assert_eq!(report.total_collections, 1);
        assert_eq!(report.all_products.len(), 2);
    }

    #[test]
    fn test_finalize_partitions_duplicates() {
        let mut report = ScrapeReport::new("Acme", "https://example.com");
        report.collections.insert(
            "A".into(),
            CollectionEntry::new(&node("https://example.com/a/"), vec![
                product("https://example.com/p/1"),
            ]),
        );
        report.collections.insert(
            "B".into(),
            CollectionEntry::new(&node("https://example.com/b/"), vec![
                product("https://example.com/p/1"),
                product("https://example.com/p/2"),
            ]),
        );

        report.finalize();

        assert_eq!(report.total_products, 2);
        assert_eq!(report.collections["A"].product_count, 1);
        assert_eq!(report.collections["B"].product_count, 1);
        // Every product reachable from exactly one entry.
        let sum: usize = report
            .collections
            .values()
            .map(|e| e.products.len())
            .sum();
        assert_eq!(sum, report.total_products);
    }

    #[test]
    fn test_finalize_zero_collections() {
        let mut report = ScrapeReport::new("Acme", "https://example.com");
        report.finalize();
        assert_eq!(report.total_products, 0);
        assert!(report.all_products.is_empty());
    }

    #[test]
    fn test_failed_report_carries_error() {
        let report = ScrapeReport::failed("Acme", "https://example.com", "homepage unreachable");
        assert_eq!(report.error.as_deref(), Some("homepage unreachable"));
        assert_eq!(report.total_products, 0);
    }

    #[test]
    fn test_safe_brand_name() {
        assert_eq!(safe_brand_name("Fritz & Sons Möbel"), "Fritz___Sons_Möbel");
        assert_eq!(safe_brand_name("acme-co"), "acme-co");
    }

    #[test]
    fn test_text_summary_failure_path() {
        let report = ScrapeReport::failed("Acme", "https://example.com", "dns failure");
        let text = generate_text_summary(&report);
        assert!(text.contains("Scrape FAILED: dns failure"));
        assert!(!text.contains("Collections:"));
    }
}
