use serde::{Deserialize, Serialize};

/// A single harvested product record.
///
/// A product is never discarded solely for missing optional fields: the
/// display name falls back to "Unknown Product" and `source_url` falls back
/// to the listing page it was harvested from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub source_url: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_path: Vec<String>,
}

impl Product {
    pub fn new(brand: String, source_url: String) -> Self {
        Self {
            brand,
            model: "Unknown Product".to_string(),
            description: String::new(),
            image_url: None,
            price: None,
            source_url,
            category: None,
            subcategory: None,
            collection: None,
            features: Vec::new(),
            category_path: Vec::new(),
        }
    }

    pub fn with_model(brand: String, model: String, source_url: String) -> Self {
        let mut product = Self::new(brand, source_url);
        product.model = model;
        product
    }
}
