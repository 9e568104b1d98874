//! Background index writer.
//!
//! Write paths never talk to the index directly: a post-commit hook drops an
//! [`IndexJob`] on an unbounded channel and a single worker task applies it.
//! Index failures stay inside the worker.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use search::SearchGateway;
use store::Product;

/// Work item for the index worker.
#[derive(Debug)]
pub enum IndexJob {
    /// Push the committed product into the index.
    Upsert(Product),
    /// Reply once every earlier job has been processed.
    Flush(oneshot::Sender<()>),
}

/// Sending side of the index worker. Cheap to clone.
#[derive(Clone)]
pub struct IndexQueue {
    tx: mpsc::UnboundedSender<IndexJob>,
}

impl IndexQueue {
    /// Start the worker on the current Tokio runtime.
    pub fn spawn(gateway: Arc<SearchGateway>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(gateway, rx));
        (Self { tx }, worker)
    }

    /// Queue an upsert. Never blocks.
    pub fn enqueue_upsert(&self, product: Product) {
        let id = product.id;
        if self.tx.send(IndexJob::Upsert(product)).is_err() {
            log::warn!("index worker stopped; product {} not indexed", id);
        }
    }

    /// Wait until every job queued so far has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(IndexJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run(gateway: Arc<SearchGateway>, mut rx: mpsc::UnboundedReceiver<IndexJob>) {
    while let Some(job) = rx.recv().await {
        match job {
            IndexJob::Upsert(product) => {
                if gateway.upsert(&product).await {
                    log::debug!("indexed product {}", product.id);
                }
            }
            IndexJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    log::debug!("index worker exiting");
}
