//! Product records as stored in the catalog.

use serde::{Deserialize, Serialize};

/// Stable product identifier (SQLite rowid).
pub type ProductId = i64;

/// A catalog product with its optional one-to-one metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub mrp: f64,
    pub stock: i64,
    /// Average rating in `[0, 5]`.
    pub rating: f64,
    pub total_reviews: i64,
    pub units_sold: i64,
    pub return_rate: f64,
    pub currency: String,
    /// Unix seconds.
    pub created_at: i64,
    pub metadata: Option<ProductMetadata>,
}

/// Free-text attributes attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub screensize: Option<String>,
    pub model: Option<String>,
    pub brightness: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub mrp: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: i64,
    #[serde(default)]
    pub units_sold: i64,
    #[serde(default)]
    pub return_rate: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, rename = "Metadata")]
    pub metadata: Option<MetadataPatch>,
}

fn default_currency() -> String {
    "Rupee".to_string()
}

impl NewProduct {
    /// Minimal payload with every optional field at its default.
    pub fn new(title: impl Into<String>, description: impl Into<String>, price: f64, mrp: f64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            price,
            mrp,
            stock: 0,
            rating: 0.0,
            total_reviews: 0,
            units_sold: 0,
            return_rate: 0.0,
            currency: default_currency(),
            metadata: None,
        }
    }
}

/// Partial metadata update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(default)]
    pub ram: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub screensize: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub brightness: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl MetadataPatch {
    /// Field name / value pairs, in column order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("ram", self.ram.as_deref()),
            ("storage", self.storage.as_deref()),
            ("screensize", self.screensize.as_deref()),
            ("model", self.model.as_deref()),
            ("brightness", self.brightness.as_deref()),
            ("color", self.color.as_deref()),
            ("category", self.category.as_deref()),
        ]
    }

    /// Overlay the present fields onto `metadata`.
    pub fn apply(&self, metadata: &mut ProductMetadata) {
        let overlay = |slot: &mut Option<String>, value: &Option<String>| {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        };
        overlay(&mut metadata.ram, &self.ram);
        overlay(&mut metadata.storage, &self.storage);
        overlay(&mut metadata.screensize, &self.screensize);
        overlay(&mut metadata.model, &self.model);
        overlay(&mut metadata.brightness, &self.brightness);
        overlay(&mut metadata.color, &self.color);
        overlay(&mut metadata.category, &self.category);
    }
}
