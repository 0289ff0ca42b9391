use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;

use crate::{Category, CategoryId, Product, ProductId, ProductWithCategory, Result, SeedReport};

/// Existence check for product identifiers.
///
/// Split out of [`CatalogTransaction`] so the id allocator only depends on the
/// one query it needs.
#[async_trait]
pub trait ProductLookup: Send {
    /// Returns true if a product with this id exists.
    async fn product_exists(&mut self, id: ProductId) -> Result<bool>;
}

/// Core trait for catalog store implementations.
///
/// The store handle serves plain reads. All writes go through a transaction
/// obtained from [`CatalogStore::begin`]. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// The transaction type handed out by [`CatalogStore::begin`].
    type Tx: CatalogTransaction + 'static;

    /// Opens a transaction.
    ///
    /// Reads made through the transaction see its own staged writes. Nothing
    /// becomes visible to other callers until `commit`; dropping the
    /// transaction discards its changes.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Retrieves a product joined with its category name.
    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<ProductWithCategory>>;

    /// Retrieves all products joined with their category names, ordered by id.
    async fn find_all_products(&self) -> Result<Vec<ProductWithCategory>>;

    /// Inserts the given categories and products, skipping any whose id
    /// already exists. Safe to run repeatedly.
    async fn seed(&self, categories: Vec<Category>, products: Vec<Product>) -> Result<SeedReport>;
}

/// A unit of work against the catalog.
#[async_trait]
pub trait CatalogTransaction: ProductLookup {
    /// Retrieves a product for modification.
    ///
    /// Implementations that support row locking hold the row until the
    /// transaction ends.
    async fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Returns true if the category exists.
    async fn category_exists(&mut self, id: CategoryId) -> Result<bool>;

    /// Returns the subset of `ids` that reference existing categories.
    async fn categories_existing(&mut self, ids: &[CategoryId]) -> Result<BTreeSet<CategoryId>>;

    /// Retrieves the categories with the given ids. Missing ids are skipped.
    async fn find_categories(&mut self, ids: &[CategoryId]) -> Result<Vec<Category>>;

    /// Inserts a batch of new products. Either every product is staged or none is.
    ///
    /// Fails with `DuplicateProductId` if any id is already taken.
    async fn insert_products(&mut self, products: &[Product]) -> Result<()>;

    /// Overwrites an existing product.
    async fn update_product(&mut self, product: &Product) -> Result<()>;

    /// Removes a product.
    async fn delete_product(&mut self, id: ProductId) -> Result<()>;

    /// Durably applies the staged changes.
    async fn commit(self) -> Result<()>;
}

/// Extension trait providing convenience methods for transactions.
#[async_trait]
pub trait CatalogTransactionExt: CatalogTransaction {
    /// Retrieves a single category.
    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.find_categories(&[id]).await?.into_iter().next())
    }

    /// Returns the ids from `ids` that do not reference a category, sorted
    /// and without duplicates.
    async fn missing_categories(&mut self, ids: &[CategoryId]) -> Result<Vec<CategoryId>> {
        let existing = self.categories_existing(ids).await?;
        let missing: BTreeSet<CategoryId> = ids
            .iter()
            .filter(|id| !existing.contains(id))
            .copied()
            .collect();
        Ok(missing.into_iter().collect())
    }
}

// Blanket implementation for all CatalogTransaction implementations
impl<T: CatalogTransaction> CatalogTransactionExt for T {}

/// Error returned when a batch cannot be inserted as given.
#[derive(Debug, Clone)]
pub struct InsertValidationError {
    pub message: String,
}

impl std::fmt::Display for InsertValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Insert validation error: {}", self.message)
    }
}

impl std::error::Error for InsertValidationError {}

/// Validates a batch before inserting.
pub fn validate_products_for_insert(
    products: &[Product],
) -> std::result::Result<(), InsertValidationError> {
    if products.is_empty() {
        return Err(InsertValidationError {
            message: "Cannot insert empty product list".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(products.len());
    for product in products {
        if !seen.insert(product.id) {
            return Err(InsertValidationError {
                message: format!("Product id {} appears more than once in the batch", product.id),
            });
        }
    }

    Ok(())
}
