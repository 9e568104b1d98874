//! Search index capability.
//
// The catalog talks to its keyword index only through `SearchIndex`, so the
// live Tantivy index, the no-op index and test doubles are interchangeable.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Product, ProductId};

/// Fields the index can sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Price,
    Mrp,
    Rating,
    UnitsSold,
    Stock,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::Price,
        SortField::Mrp,
        SortField::Rating,
        SortField::UnitsSold,
        SortField::Stock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::Mrp => "mrp",
            SortField::Rating => "rating",
            SortField::UnitsSold => "units_sold",
            SortField::Stock => "stock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Explicit ordering hint passed to the index, rendered as `field:order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortDirective {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortDirective {
    pub fn asc(field: SortField) -> Self {
        Self { field, order: SortOrder::Asc }
    }

    pub fn desc(field: SortField) -> Self {
        Self { field, order: SortOrder::Desc }
    }
}

impl fmt::Display for SortDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        write!(f, "{}:{}", self.field.as_str(), order)
    }
}

/// Fields the index can filter on (exact match, case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Category,
    Color,
    Currency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: FilterField,
    pub value: String,
}

/// Keyword query sent to an index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Free text. Blank means "every document".
    pub query: String,
    pub limit: usize,
    pub sort: Option<SortDirective>,
    pub filters: Vec<Filter>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self { query: query.into(), limit, sort: None, filters: vec![] }
    }

    pub fn with_sort(mut self, sort: Option<SortDirective>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.filters.push(Filter { field, value: value.into() });
        self
    }
}

/// A ranked hit as returned by the index.
///
/// The identifier is kept as raw JSON: the index is not trusted to hand back
/// a well-formed integer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: serde_json::Value,
    pub score: Option<f32>,
}

/// Flattened product document pushed into the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub mrp: f64,
    pub stock: i64,
    pub rating: f64,
    pub total_reviews: i64,
    pub units_sold: i64,
    pub return_rate: f64,
    pub currency: String,
    pub category: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub screensize: Option<String>,
}

impl From<&Product> for IndexDocument {
    fn from(product: &Product) -> Self {
        let metadata = product.metadata.clone().unwrap_or_default();
        Self {
            id: product.id,
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            mrp: product.mrp,
            stock: product.stock,
            rating: product.rating,
            total_reviews: product.total_reviews,
            units_sold: product.units_sold,
            return_rate: product.return_rate,
            currency: product.currency.clone(),
            category: metadata.category,
            model: metadata.model,
            color: metadata.color,
            ram: metadata.ram,
            storage: metadata.storage,
            screensize: metadata.screensize,
        }
    }
}

/// Keyword index with sort hints and document upsert.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ranked hits for `request`, best first.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
    /// Insert or replace documents by id.
    async fn upsert(&self, documents: &[IndexDocument]) -> Result<()>;
    /// Drop every document.
    async fn clear(&self) -> Result<()>;
    /// Cheap liveness check.
    async fn ping(&self) -> Result<()>;
}

/// Index that knows nothing: searches are empty and writes are discarded.
pub struct NoopIndex;

#[async_trait]
impl SearchIndex for NoopIndex {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>> {
        Ok(vec![])
    }

    async fn upsert(&self, _documents: &[IndexDocument]) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductMetadata;

    #[test]
    fn test_sort_directive_display() {
        assert_eq!(SortDirective::asc(SortField::Price).to_string(), "price:asc");
        assert_eq!(SortDirective::desc(SortField::UnitsSold).to_string(), "units_sold:desc");
    }

    #[test]
    fn test_document_flattens_metadata() {
        let product = Product {
            id: 7,
            title: "iPhone 15".into(),
            description: "A16 Bionic".into(),
            price: 69999.0,
            mrp: 79999.0,
            stock: 25,
            rating: 4.5,
            total_reviews: 320,
            units_sold: 1200,
            return_rate: 1.8,
            currency: "Rupee".into(),
            created_at: 0,
            metadata: Some(ProductMetadata {
                brightness: Some("2000 nits".into()),
                color: Some("Blue".into()),
                category: Some("Smartphone".into()),
                ..Default::default()
            }),
        };

        let doc = IndexDocument::from(&product);
        assert_eq!(doc.id, 7);
        assert_eq!(doc.color.as_deref(), Some("Blue"));
        assert_eq!(doc.category.as_deref(), Some("Smartphone"));

        // Brightness is not part of the search document
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("brightness").is_none());
        assert_eq!(json["units_sold"], 1200);
    }
}
