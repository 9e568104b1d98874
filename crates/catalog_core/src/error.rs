//! Domain errors raised by catalog writes.

use store::ProductId;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid `{field}`: {message}")]
    Validation { field: &'static str, message: String },
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
}

impl CatalogError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CatalogError::Validation { field, message: message.into() }
    }
}
