//! Catalog service: search orchestration and the indexed write path.
//
// Ties the product repository, the search gateway and the fallback ranker
// together behind one `Catalog` handle.

pub mod config;
pub mod error;
pub mod indexer;

use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use serde::Serialize;

use search::{extract_intent, normalize, rank, SearchGateway};
use store::{IndexDocument, IndexHandle};

pub use config::CatalogConfig;
pub use error::CatalogError;
pub use indexer::{IndexJob, IndexQueue};
pub use store::{MetadataPatch, NewProduct, Product, ProductId, ProductMetadata, ProductStore};

/// Documents per index call during a full reindex.
const REINDEX_BATCH: usize = 500;

/// Lightweight row returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    pub title: String,
    pub description: String,
    pub mrp: f64,
    #[serde(rename = "sellingPrice")]
    pub selling_price: f64,
    pub stock: i64,
    pub rating: f64,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            description: product.description.clone(),
            mrp: product.mrp,
            selling_price: product.price,
            stock: product.stock,
            rating: product.rating,
        }
    }
}

/// Options for configuring the catalog.
pub struct CatalogOptions {
    pub results_limit: usize,
    pub index_timeout: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            results_limit: 20,
            index_timeout: search::DEFAULT_TIMEOUT,
        }
    }
}

/// Summary of a full reindex.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReindexReport {
    /// Products read from the repository.
    pub products: usize,
    /// Products the index accepted.
    pub indexed: usize,
}

/// Main entry point for searching and writing products.
pub struct Catalog {
    store: Arc<ProductStore>,
    gateway: Arc<SearchGateway>,
    queue: IndexQueue,
    results_limit: usize,
}

impl Catalog {
    /// Build a catalog and start its index worker. Must be called from
    /// within a Tokio runtime.
    pub fn new(store: Arc<ProductStore>, handle: Arc<IndexHandle>, options: CatalogOptions) -> Self {
        let gateway = Arc::new(SearchGateway::new(handle, options.index_timeout));
        let (queue, _worker) = IndexQueue::spawn(gateway.clone());
        Self { store, gateway, queue, results_limit: options.results_limit }
    }

    /// Open the repository and index described by `config`.
    pub fn open(config: &CatalogConfig) -> Result<Self> {
        let data_dir = config.data_dir();
        let store = ProductStore::open(&data_dir)
            .with_context(|| format!("Failed to open catalog in {}", data_dir.display()))?;

        let handle = if config.index.enabled {
            IndexHandle::directory(config.index_dir(), config.index.writer_heap_bytes())
        } else {
            IndexHandle::disabled()
        };

        let options = CatalogOptions {
            results_limit: config.search.results_limit,
            index_timeout: config.index.timeout(),
        };
        Ok(Self::new(Arc::new(store), Arc::new(handle), options))
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    /// Search with the configured result cap.
    pub async fn search(&self, query: &str) -> Result<Vec<ProductSummary>> {
        self.search_limited(query, self.results_limit).await
    }

    /// Search returning at most `limit` summaries.
    pub async fn search_limited(&self, query: &str, limit: usize) -> Result<Vec<ProductSummary>> {
        let products = self.search_products(query, limit).await?;
        Ok(products.iter().map(ProductSummary::from).collect())
    }

    /// Ordered products for `query`.
    ///
    /// The index answers first; when it has no opinion, products whose title
    /// or description contains the normalized query are fallback-ranked. A blank
    /// query returns nothing without touching the index or the repository.
    pub async fn search_products(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }

        let normalized = normalize(query);
        let intent = extract_intent(&normalized);

        let ids = self.gateway.search(&intent, limit).await;
        if !ids.is_empty() {
            let mut by_id = self.store.in_bulk(&ids)?;
            let ordered: Vec<Product> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
            if !ordered.is_empty() {
                return Ok(ordered);
            }
            log::debug!("index returned {} stale id(s); falling back", ids.len());
        }

        let candidates = self.store.filter_by_substring(&normalized)?;
        log::debug!("fallback ranking {} candidate(s) for {:?}", candidates.len(), normalized);
        let mut ranked = rank(candidates, query);
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Validate and insert a product with its optional metadata. The index
    /// upsert is queued only once the insert has committed.
    pub fn create_product(&self, new: NewProduct) -> Result<Product> {
        validate_new_product(&new)?;

        let queue = self.queue.clone();
        self.store.transaction(move |uow| {
            let id = uow.insert_product(&new)?;
            let product = uow
                .get(id)?
                .with_context(|| format!("Product {} vanished inside its own transaction", id))?;

            let indexed = product.clone();
            uow.on_commit(move || queue.enqueue_upsert(indexed));
            Ok(product)
        })
    }

    /// Get-or-create the metadata of `id` and apply `patch`. The index upsert
    /// is queued only once the update has committed.
    pub fn update_metadata(&self, id: ProductId, patch: MetadataPatch) -> Result<Product> {
        validate_metadata(&patch)?;

        let queue = self.queue.clone();
        self.store.transaction(move |uow| {
            if uow.get(id)?.is_none() {
                return Err(CatalogError::ProductNotFound(id).into());
            }
            uow.upsert_metadata(id, &patch)?;
            let product = uow
                .get(id)?
                .ok_or(CatalogError::ProductNotFound(id))?;

            let indexed = product.clone();
            uow.on_commit(move || queue.enqueue_upsert(indexed));
            Ok(product)
        })
    }

    /// Push every product into the index, optionally recreating it first.
    pub async fn reindex(&self, fresh: bool) -> Result<ReindexReport> {
        let handle = self.gateway.handle();
        if !handle.is_enabled() {
            anyhow::bail!("Search index is disabled; set `enabled = true` under [index]");
        }

        // Let queued writes land before the index is touched wholesale
        self.queue.flush().await;

        if fresh {
            handle.recreate().await.context("Failed to recreate search index")?;
            log::info!("recreated search index");
        }

        let products = self.store.all()?;
        let mut report = ReindexReport { products: products.len(), indexed: 0 };

        for batch in products.chunks(REINDEX_BATCH) {
            let documents: Vec<IndexDocument> = batch.iter().map(IndexDocument::from).collect();
            if self.gateway.upsert_documents(&documents).await {
                report.indexed += documents.len();
            }
        }

        Ok(report)
    }

    /// Wait for queued index writes to finish.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), CatalogError> {
    let len = value.chars().count();
    if len > max {
        return Err(CatalogError::invalid(field, format!("at most {} characters, got {}", max, len)));
    }
    Ok(())
}

fn validate_new_product(new: &NewProduct) -> Result<(), CatalogError> {
    if new.title.trim().is_empty() {
        return Err(CatalogError::invalid("title", "may not be blank"));
    }
    check_len("title", &new.title, 500)?;
    if new.description.trim().is_empty() {
        return Err(CatalogError::invalid("description", "may not be blank"));
    }
    check_len("currency", &new.currency, 20)?;

    for (field, value) in [("price", new.price), ("mrp", new.mrp), ("return_rate", new.return_rate)] {
        if !value.is_finite() {
            return Err(CatalogError::invalid(field, "must be a finite number"));
        }
    }
    if !(0.0..=5.0).contains(&new.rating) {
        return Err(CatalogError::invalid("rating", "must be between 0 and 5"));
    }
    if new.units_sold < 0 {
        return Err(CatalogError::invalid("units_sold", "may not be negative"));
    }
    if new.total_reviews < 0 {
        return Err(CatalogError::invalid("total_reviews", "may not be negative"));
    }

    if let Some(ref metadata) = new.metadata {
        validate_metadata(metadata)?;
    }
    Ok(())
}

fn validate_metadata(patch: &MetadataPatch) -> Result<(), CatalogError> {
    for (field, value) in patch.fields() {
        let max = match field {
            "model" | "category" => 100,
            _ => 50,
        };
        if let Some(value) = value {
            check_len(field, value, max)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rejects_bad_payloads() {
        let ok = NewProduct::new("Pixel 8", "Google phone", 59999.0, 75999.0);
        assert!(validate_new_product(&ok).is_ok());

        let mut blank = ok.clone();
        blank.title = "   ".into();
        assert!(matches!(
            validate_new_product(&blank),
            Err(CatalogError::Validation { field: "title", .. })
        ));

        let mut rating = ok.clone();
        rating.rating = 5.5;
        assert!(matches!(
            validate_new_product(&rating),
            Err(CatalogError::Validation { field: "rating", .. })
        ));

        let mut long_color = ok.clone();
        long_color.metadata = Some(MetadataPatch { color: Some("x".repeat(51)), ..Default::default() });
        assert!(matches!(
            validate_new_product(&long_color),
            Err(CatalogError::Validation { field: "color", .. })
        ));

        let model = MetadataPatch { model: Some("m".repeat(100)), ..Default::default() };
        assert!(validate_metadata(&model).is_ok());
    }

    #[test]
    fn test_summary_shape() {
        let product = Product {
            id: 3,
            title: "Kettle".into(),
            description: "1.5L".into(),
            price: 999.0,
            mrp: 1499.0,
            stock: 2,
            rating: 4.0,
            total_reviews: 0,
            units_sold: 0,
            return_rate: 0.0,
            currency: "Rupee".into(),
            created_at: 0,
            metadata: None,
        };
        let json = serde_json::to_value(ProductSummary::from(&product)).unwrap();
        assert_eq!(json["productId"], 3);
        assert_eq!(json["sellingPrice"], 999.0);
        assert_eq!(json["mrp"], 1499.0);
        assert!(json.get("currency").is_none());
    }
}
