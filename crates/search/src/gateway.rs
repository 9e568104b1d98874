//! Best-effort bridge to the search index.
//!
//! The gateway never fails: a disabled index, an index that cannot be opened,
//! a query error or a timeout all come back as an empty result, which callers
//! read as "no opinion" rather than "no matches".

use std::sync::Arc;
use std::time::Duration;

use store::{IndexDocument, IndexHandle, Product, ProductId, SearchHit, SearchRequest};

use crate::intent::Intent;

/// Default bound on a single index call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct SearchGateway {
    handle: Arc<IndexHandle>,
    timeout: Duration,
}

impl SearchGateway {
    pub fn new(handle: Arc<IndexHandle>, timeout: Duration) -> Self {
        Self { handle, timeout }
    }

    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    /// Ordered product ids for `intent`, at most `limit` of them.
    pub async fn search(&self, intent: &Intent, limit: usize) -> Vec<ProductId> {
        if !self.handle.is_enabled() {
            return vec![];
        }
        if intent.query.trim().is_empty() {
            log::debug!("skipping index search for blank query");
            return vec![];
        }

        let request = SearchRequest::new(intent.query.clone(), limit).with_sort(intent.sort_directive());
        match request.sort {
            Some(sort) => log::debug!("index search {:?} sort={}", request.query, sort),
            None => log::debug!("index search {:?}", request.query),
        }

        let attempt = async {
            match self.handle.resolve().await {
                Some(index) => index.search(&request).await.map(Some),
                None => Ok(None),
            }
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(Some(hits))) => hit_ids(&hits),
            Ok(Ok(None)) => vec![],
            Ok(Err(e)) => {
                log::warn!("index search failed: {:#}", e);
                vec![]
            }
            Err(_) => {
                log::warn!("index search timed out after {:?}", self.timeout);
                vec![]
            }
        }
    }

    /// Push the product's document into the index. Returns whether the index
    /// accepted it; failures are logged and otherwise ignored.
    pub async fn upsert(&self, product: &Product) -> bool {
        self.upsert_documents(&[IndexDocument::from(product)]).await
    }

    /// Batch form of [`upsert`](Self::upsert).
    pub async fn upsert_documents(&self, documents: &[IndexDocument]) -> bool {
        if documents.is_empty() || !self.handle.is_enabled() {
            return false;
        }

        let attempt = async {
            match self.handle.resolve().await {
                Some(index) => index.upsert(documents).await.map(|_| true),
                None => Ok(false),
            }
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(applied)) => applied,
            Ok(Err(e)) => {
                log::warn!("index upsert of {} document(s) failed: {:#}", documents.len(), e);
                false
            }
            Err(_) => {
                log::warn!("index upsert timed out after {:?}", self.timeout);
                false
            }
        }
    }
}

/// Keep hits whose id is a well-formed non-negative integer, in index order.
fn hit_ids(hits: &[SearchHit]) -> Vec<ProductId> {
    hits.iter()
        .filter_map(|hit| {
            let id = hit.id.as_u64().and_then(|v| ProductId::try_from(v).ok());
            if id.is_none() {
                log::debug!("dropping index hit with malformed id {}", hit.id);
            }
            id
        })
        .collect()
}
