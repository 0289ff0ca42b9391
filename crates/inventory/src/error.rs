//! Inventory error types.

use catalog_store::StoreError;
use thiserror::Error;

use crate::validation::ValidationError;
use crate::{CategoryId, ProductId};

/// Coarse classification of an [`InventoryError`], used by callers to pick a
/// response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// A referenced product or category does not exist.
    NotFound,
    /// The request is well-formed but conflicts with current state.
    Conflict,
    /// Store fault or other unexpected failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Input failed a field rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One item of an `add` batch failed a field rule.
    #[error("Item {index}: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("Product with ID {0} not found.")]
    ProductNotFound(ProductId),

    #[error("Category with ID {0} not found.")]
    CategoryNotFound(CategoryId),

    /// Categories referenced by an `add` batch that do not exist, sorted.
    #[error("Invalid CategoryId(s): {}", join_ids(.0))]
    CategoriesNotFound(Vec<CategoryId>),

    #[error("No stock available for the product with ID {0}.")]
    OutOfStock(ProductId),

    #[error(
        "Stock available ({available}) is less than requested quantity ({requested}) for product ID {product_id}."
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    #[error(
        "Adding {quantity} to stock {current} for product ID {product_id} would exceed the limit of {limit}."
    )]
    StockLimitExceeded {
        product_id: ProductId,
        current: i32,
        quantity: i32,
        limit: i32,
    },

    /// The store kept rejecting freshly allocated ids as duplicates.
    #[error("Could not allocate unique product ids after {attempts} attempts.")]
    IdCollision { attempts: u32 },

    /// The allocator hit its candidate limit without finding a free id.
    #[error("No free product id found after {candidates} candidates.")]
    IdSpaceExhausted { candidates: u32 },

    #[error("Operation cancelled.")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::Validation(_) | InventoryError::InvalidItem { .. } => {
                ErrorKind::Validation
            }
            InventoryError::ProductNotFound(_)
            | InventoryError::CategoryNotFound(_)
            | InventoryError::CategoriesNotFound(_) => ErrorKind::NotFound,
            InventoryError::OutOfStock(_)
            | InventoryError::InsufficientStock { .. }
            | InventoryError::StockLimitExceeded { .. }
            | InventoryError::IdCollision { .. } => ErrorKind::Conflict,
            InventoryError::IdSpaceExhausted { .. }
            | InventoryError::Cancelled
            | InventoryError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the store rejected an insert because the id was taken.
    pub(crate) fn is_duplicate_id(&self) -> bool {
        matches!(self, InventoryError::Store(e) if e.is_duplicate_id())
    }
}

fn join_ids(ids: &[CategoryId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
