use thiserror::Error;

use crate::{CategoryId, ProductId};

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A product with this ID already exists.
    /// Raised by the uniqueness constraint on insert.
    #[error("Duplicate product id: {0}")]
    DuplicateProductId(ProductId),

    /// The product to update or delete no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A product references a category that does not exist.
    #[error("Category not found: {0}")]
    MissingCategory(CategoryId),

    /// The batch handed to `insert_products` was rejected before touching storage.
    #[error("Invalid insert batch: {0}")]
    InvalidBatch(String),

    /// The store cannot serve requests right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the error was caused by an id collision on insert.
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, StoreError::DuplicateProductId(_))
    }
}

/// Result type for catalog store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
