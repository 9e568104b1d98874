//! Persistence and indexing for the product catalog.
//!
//! - `products`: SQLite product repository with post-commit hooks
//! - `index`: the `SearchIndex` capability and its no-op implementation
//! - `lexical`: the live Tantivy index
//! - `handle`: lazily resolved, retrying access to the configured index

pub mod handle;
pub mod index;
pub mod lexical;
pub mod model;
pub mod products;

pub use handle::IndexHandle;
pub use index::{
    Filter, FilterField, IndexDocument, NoopIndex, SearchHit, SearchIndex, SearchRequest,
    SortDirective, SortField, SortOrder,
};
pub use lexical::{DocumentIndex, DEFAULT_WRITER_HEAP, SEARCHABLE_FIELDS};
pub use model::{MetadataPatch, NewProduct, Product, ProductId, ProductMetadata};
pub use products::{CommitHook, ProductStore, UnitOfWork};
