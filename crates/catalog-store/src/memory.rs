use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Category, CategoryId, Product, ProductId, ProductWithCategory, Result, SeedReport, StoreError,
    store::{CatalogStore, CatalogTransaction, ProductLookup, validate_products_for_insert},
};

#[derive(Debug, Clone, Default)]
struct CatalogState {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
}

impl CatalogState {
    fn join(&self, product: &Product) -> ProductWithCategory {
        let category_name = self
            .categories
            .get(&product.category_id)
            .map(|c| c.name.clone());
        ProductWithCategory::new(product.clone(), category_name)
    }
}

/// In-memory catalog store for testing and local runs.
///
/// A transaction holds the store lock from `begin` until it is committed or
/// dropped, so transactions never interleave. Changes are staged on a working
/// copy and published on commit.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
    fail_on_commit: Arc<AtomicBool>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given categories.
    pub fn with_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let state = CatalogState {
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
            products: BTreeMap::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_on_commit: Arc::default(),
        }
    }

    /// Returns the number of stored products.
    pub async fn product_count(&self) -> usize {
        self.state.lock().await.products.len()
    }

    /// Returns the stored product, bypassing the category join.
    pub async fn get_product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    /// Configures every commit to fail until reset.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            working,
            fail_on_commit: self.fail_on_commit.load(Ordering::SeqCst),
        })
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<ProductWithCategory>> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id).map(|p| state.join(p)))
    }

    async fn find_all_products(&self) -> Result<Vec<ProductWithCategory>> {
        let state = self.state.lock().await;
        Ok(state.products.values().map(|p| state.join(p)).collect())
    }

    async fn seed(&self, categories: Vec<Category>, products: Vec<Product>) -> Result<SeedReport> {
        let mut state = self.state.lock().await;
        let mut report = SeedReport::default();

        for category in categories {
            if !state.categories.contains_key(&category.id) {
                state.categories.insert(category.id, category);
                report.categories_inserted += 1;
            }
        }

        for product in products {
            if state.products.contains_key(&product.id) {
                continue;
            }
            if !state.categories.contains_key(&product.category_id) {
                return Err(StoreError::MissingCategory(product.category_id));
            }
            state.products.insert(product.id, product);
            report.products_inserted += 1;
        }

        Ok(report)
    }
}

/// Transaction over an [`InMemoryCatalogStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<CatalogState>,
    working: CatalogState,
    fail_on_commit: bool,
}

#[async_trait]
impl ProductLookup for InMemoryTransaction {
    async fn product_exists(&mut self, id: ProductId) -> Result<bool> {
        Ok(self.working.products.contains_key(&id))
    }
}

#[async_trait]
impl CatalogTransaction for InMemoryTransaction {
    async fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn category_exists(&mut self, id: CategoryId) -> Result<bool> {
        Ok(self.working.categories.contains_key(&id))
    }

    async fn categories_existing(&mut self, ids: &[CategoryId]) -> Result<BTreeSet<CategoryId>> {
        Ok(ids
            .iter()
            .filter(|id| self.working.categories.contains_key(id))
            .copied()
            .collect())
    }

    async fn find_categories(&mut self, ids: &[CategoryId]) -> Result<Vec<Category>> {
        let wanted: BTreeSet<CategoryId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| self.working.categories.get(&id).cloned())
            .collect())
    }

    async fn insert_products(&mut self, products: &[Product]) -> Result<()> {
        validate_products_for_insert(products).map_err(|e| StoreError::InvalidBatch(e.message))?;

        // Check the whole batch before staging anything.
        for product in products {
            if self.working.products.contains_key(&product.id) {
                return Err(StoreError::DuplicateProductId(product.id));
            }
            if !self.working.categories.contains_key(&product.category_id) {
                return Err(StoreError::MissingCategory(product.category_id));
            }
        }

        for product in products {
            self.working.products.insert(product.id, product.clone());
        }
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<()> {
        if !self.working.categories.contains_key(&product.category_id) {
            return Err(StoreError::MissingCategory(product.category_id));
        }
        match self.working.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(StoreError::ProductNotFound(product.id)),
        }
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<()> {
        self.working
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::ProductNotFound(id))
    }

    async fn commit(self) -> Result<()> {
        if self.fail_on_commit {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }
        let InMemoryTransaction {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}
