//! Inventory service: catalog CRUD and stock mutation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::time::Instant;

use catalog_store::{CatalogStore, CatalogTransaction, CatalogTransactionExt, Product};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::allocator::{IdAllocator, RandomIdAllocator};
use crate::config::InventoryConfig;
use crate::error::{ErrorKind, InventoryError};
use crate::model::{ProductDraft, ProductView};
use crate::validation;
use crate::{Actor, CategoryId, ProductId};

/// Awaits `fut` unless `cancel` fires first.
async fn until_cancelled<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, InventoryError>
where
    F: Future<Output = Result<T, E>>,
    InventoryError: From<E>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(InventoryError::Cancelled),
        result = fut => result.map_err(InventoryError::from),
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), InventoryError> {
    if cancel.is_cancelled() {
        return Err(InventoryError::Cancelled);
    }
    Ok(())
}

/// Records duration and, on failure, logs and counts the error.
fn record_outcome<T>(
    operation: &'static str,
    started: Instant,
    result: &Result<T, InventoryError>,
) {
    metrics::histogram!("inventory_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());

    if let Err(err) = result {
        let kind = err.kind();
        metrics::counter!(
            "inventory_operation_errors_total",
            "operation" => operation,
            "kind" => kind.as_str()
        )
        .increment(1);

        match kind {
            ErrorKind::Internal => tracing::error!(operation, error = %err, "inventory operation failed"),
            _ => tracing::warn!(operation, error = %err, "inventory operation rejected"),
        }
    }
}

/// Service for managing the product catalog and its stock.
///
/// Every mutating operation runs inside one store transaction: the product
/// is read, checked, changed and written back before the transaction commits.
/// Every operation takes a cancellation token that is honoured at each store
/// call. Once a commit has started it runs to completion.
pub struct InventoryService<S: CatalogStore, A: IdAllocator = RandomIdAllocator> {
    store: S,
    allocator: A,
    config: InventoryConfig,
}

impl<S: CatalogStore> InventoryService<S, RandomIdAllocator> {
    /// Creates a new service with random id allocation and default limits.
    pub fn new(store: S) -> Self {
        Self::with_allocator(store, RandomIdAllocator::new(), InventoryConfig::default())
    }
}

impl<S: CatalogStore, A: IdAllocator> InventoryService<S, A> {
    /// Creates a new service with the given allocator and limits.
    pub fn with_allocator(store: S, allocator: A, config: InventoryConfig) -> Self {
        Self {
            store,
            allocator,
            config,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lists every product with its category name, ordered by id.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<ProductView>, InventoryError> {
        let started = Instant::now();
        let result = until_cancelled(cancel, self.store.find_all_products())
            .await
            .map(|rows| rows.into_iter().map(ProductView::from).collect::<Vec<_>>());
        record_outcome("list", started, &result);
        result
    }

    /// Loads a single product with its category name.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_by_id(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        let started = Instant::now();
        let result = until_cancelled(cancel, self.store.find_product_by_id(id))
            .await
            .and_then(|row| row.map(ProductView::from).ok_or(InventoryError::ProductNotFound(id)));
        record_outcome("get_by_id", started, &result);
        result
    }

    /// Creates a batch of products.
    ///
    /// All referenced categories must exist and every item must pass field
    /// validation; otherwise nothing is persisted. If the store reports an id
    /// collision the whole batch is retried with fresh ids, up to the
    /// configured number of attempts.
    #[tracing::instrument(skip(self, actor, items, cancel), fields(actor = %actor, count = items.len()))]
    pub async fn add(
        &self,
        actor: &Actor,
        items: Vec<ProductDraft>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductView>, InventoryError> {
        let started = Instant::now();
        let result = self.add_with_retry(actor, items, cancel).await;
        if let Ok(views) = &result {
            metrics::counter!("inventory_products_created_total").increment(views.len() as u64);
            tracing::info!(count = views.len(), "products added");
        }
        record_outcome("add", started, &result);
        result
    }

    async fn add_with_retry(
        &self,
        actor: &Actor,
        items: Vec<ProductDraft>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductView>, InventoryError> {
        validation::validate_actor(actor)?;
        validation::validate_batch(items.len(), self.config.max_batch_size)?;

        let attempts = self.config.id_allocation_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.try_add(actor, &items, cancel).await {
                Err(err) if err.is_duplicate_id() && attempt < attempts => {
                    metrics::counter!("inventory_id_collisions_total").increment(1);
                    tracing::warn!(attempt, error = %err, "id collision on insert, retrying batch");
                    attempt += 1;
                }
                Err(err) if err.is_duplicate_id() => {
                    return Err(InventoryError::IdCollision { attempts });
                }
                other => return other,
            }
        }
    }

    async fn try_add(
        &self,
        actor: &Actor,
        items: &[ProductDraft],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductView>, InventoryError> {
        let mut tx = until_cancelled(cancel, self.store.begin()).await?;

        let category_ids: Vec<CategoryId> = items
            .iter()
            .map(|item| item.category_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let missing = until_cancelled(cancel, tx.missing_categories(&category_ids)).await?;
        if !missing.is_empty() {
            return Err(InventoryError::CategoriesNotFound(missing));
        }

        let now = Utc::now();
        let mut reserved = HashSet::with_capacity(items.len());
        let mut products = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            validation::validate(item)
                .map_err(|source| InventoryError::InvalidItem { index, source })?;

            let id = until_cancelled(cancel, self.allocator.allocate(&mut tx, &reserved)).await?;
            reserved.insert(id);
            products.push(item.clone().into_product(id, actor, now));
        }

        until_cancelled(cancel, tx.insert_products(&products)).await?;
        let categories = until_cancelled(cancel, tx.find_categories(&category_ids)).await?;

        ensure_not_cancelled(cancel)?;
        tx.commit().await?;

        let names: HashMap<CategoryId, String> =
            categories.into_iter().map(|c| (c.id, c.name)).collect();
        Ok(products
            .into_iter()
            .map(|product| {
                let category = names.get(&product.category_id).cloned();
                ProductView::from_parts(product, category)
            })
            .collect())
    }

    /// Replaces a product's name, description, category, stock and price.
    #[tracing::instrument(skip(self, actor, draft, cancel), fields(actor = %actor))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: ProductId,
        draft: ProductDraft,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        let started = Instant::now();
        let result = self.try_update(actor, id, draft, cancel).await;
        if result.is_ok() {
            metrics::counter!("inventory_products_updated_total").increment(1);
            tracing::info!(product_id = %id, "product updated");
        }
        record_outcome("update", started, &result);
        result
    }

    async fn try_update(
        &self,
        actor: &Actor,
        id: ProductId,
        draft: ProductDraft,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        validation::validate_product_id(id)?;
        validation::validate_actor(actor)?;

        let mut tx = until_cancelled(cancel, self.store.begin()).await?;
        let mut product = until_cancelled(cancel, tx.find_product_by_id(id))
            .await?
            .ok_or(InventoryError::ProductNotFound(id))?;

        let category_id = draft.category_id;
        if !until_cancelled(cancel, tx.category_exists(category_id)).await? {
            return Err(InventoryError::CategoryNotFound(category_id));
        }

        validation::validate(&draft)?;

        draft.apply_to(&mut product);
        product.stamp_modified(actor, Utc::now());

        self.save(tx, product, cancel).await
    }

    /// Removes `quantity` units from a product's stock.
    ///
    /// Fails with a conflict if the product has no stock or fewer than
    /// `quantity` units; stock is left unchanged in that case.
    #[tracing::instrument(skip(self, actor, cancel), fields(actor = %actor))]
    pub async fn decrement_stock(
        &self,
        actor: &Actor,
        id: ProductId,
        quantity: i32,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        let started = Instant::now();
        let result = self.try_decrement(actor, id, quantity, cancel).await;
        match &result {
            Ok(view) => {
                metrics::counter!("inventory_stock_decrements_total").increment(1);
                tracing::info!(product_id = %id, quantity, new_stock = view.stock, "stock decremented");
            }
            Err(err) if err.kind() == ErrorKind::Conflict => {
                metrics::counter!("inventory_stock_conflicts_total").increment(1);
            }
            Err(_) => {}
        }
        record_outcome("decrement_stock", started, &result);
        result
    }

    async fn try_decrement(
        &self,
        actor: &Actor,
        id: ProductId,
        quantity: i32,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        validation::validate_product_id(id)?;
        validation::validate_actor(actor)?;
        validation::validate_quantity(quantity)?;

        let mut tx = until_cancelled(cancel, self.store.begin()).await?;
        let mut product = until_cancelled(cancel, tx.find_product_by_id(id))
            .await?
            .ok_or(InventoryError::ProductNotFound(id))?;

        if product.stock == 0 {
            return Err(InventoryError::OutOfStock(id));
        }
        // Both operands are non-negative here, so the subtraction cannot overflow.
        let remaining = product.stock - quantity;
        if remaining < 0 {
            return Err(InventoryError::InsufficientStock {
                product_id: id,
                available: product.stock,
                requested: quantity,
            });
        }

        product.stock = remaining;
        product.stamp_modified(actor, Utc::now());

        self.save(tx, product, cancel).await
    }

    /// Adds `quantity` units to a product's stock.
    #[tracing::instrument(skip(self, actor, cancel), fields(actor = %actor))]
    pub async fn increment_stock(
        &self,
        actor: &Actor,
        id: ProductId,
        quantity: i32,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        let started = Instant::now();
        let result = self.try_increment(actor, id, quantity, cancel).await;
        match &result {
            Ok(view) => {
                metrics::counter!("inventory_stock_increments_total").increment(1);
                tracing::info!(product_id = %id, quantity, new_stock = view.stock, "stock incremented");
            }
            Err(err) if err.kind() == ErrorKind::Conflict => {
                metrics::counter!("inventory_stock_conflicts_total").increment(1);
            }
            Err(_) => {}
        }
        record_outcome("increment_stock", started, &result);
        result
    }

    async fn try_increment(
        &self,
        actor: &Actor,
        id: ProductId,
        quantity: i32,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        validation::validate_product_id(id)?;
        validation::validate_actor(actor)?;
        validation::validate_quantity(quantity)?;

        let mut tx = until_cancelled(cancel, self.store.begin()).await?;
        let mut product = until_cancelled(cancel, tx.find_product_by_id(id))
            .await?
            .ok_or(InventoryError::ProductNotFound(id))?;

        let limit = self.config.stock_ceiling();
        let new_stock = product
            .stock
            .checked_add(quantity)
            .filter(|total| *total <= limit)
            .ok_or(InventoryError::StockLimitExceeded {
                product_id: id,
                current: product.stock,
                quantity,
                limit,
            })?;

        product.stock = new_stock;
        product.stamp_modified(actor, Utc::now());

        self.save(tx, product, cancel).await
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete(&self, id: ProductId, cancel: &CancellationToken) -> Result<(), InventoryError> {
        let started = Instant::now();
        let result = self.try_delete(id, cancel).await;
        if result.is_ok() {
            metrics::counter!("inventory_products_deleted_total").increment(1);
            tracing::info!(product_id = %id, "product deleted");
        }
        record_outcome("delete", started, &result);
        result
    }

    async fn try_delete(&self, id: ProductId, cancel: &CancellationToken) -> Result<(), InventoryError> {
        validation::validate_product_id(id)?;

        let mut tx = until_cancelled(cancel, self.store.begin()).await?;
        if until_cancelled(cancel, tx.find_product_by_id(id)).await?.is_none() {
            return Err(InventoryError::ProductNotFound(id));
        }
        until_cancelled(cancel, tx.delete_product(id)).await?;

        ensure_not_cancelled(cancel)?;
        tx.commit().await?;
        Ok(())
    }

    /// Writes back a modified product, commits, and projects it.
    async fn save(
        &self,
        mut tx: S::Tx,
        product: Product,
        cancel: &CancellationToken,
    ) -> Result<ProductView, InventoryError> {
        until_cancelled(cancel, tx.update_product(&product)).await?;
        let category = until_cancelled(cancel, tx.find_category(product.category_id))
            .await?
            .map(|c| c.name);

        ensure_not_cancelled(cancel)?;
        tx.commit().await?;

        Ok(ProductView::from_parts(product, category))
    }
}
