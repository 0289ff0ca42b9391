use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Category, CategoryId, Product, ProductId, ProductWithCategory, Result, SeedReport, StoreError,
    store::{CatalogStore, CatalogTransaction, ProductLookup, validate_products_for_insert},
};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.category_id, p.stock, p.price, \
     p.created_by, p.created_date, p.modified_by, p.modified_date";

/// PostgreSQL-backed catalog store implementation.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        stock: row.try_get("stock")?,
        price: row.try_get::<Decimal, _>("price")?,
        created_by: row.try_get("created_by")?,
        created_date: row.try_get::<DateTime<Utc>, _>("created_date")?,
        modified_by: row.try_get("modified_by")?,
        modified_date: row.try_get::<Option<DateTime<Utc>>, _>("modified_date")?,
    })
}

fn row_to_joined(row: PgRow) -> Result<ProductWithCategory> {
    let product = row_to_product(&row)?;
    let category_name: Option<String> = row.try_get("category_name")?;
    Ok(ProductWithCategory::new(product, category_name))
}

fn row_to_category(row: PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

/// Translates constraint violations on a product write into store errors.
fn map_product_write_error(e: sqlx::Error, product: &Product) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateProductId(product.id);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::MissingCategory(product.category_id);
        }
    }
    StoreError::Database(e)
}

fn id_values(ids: &[CategoryId]) -> Vec<i32> {
    ids.iter().map(CategoryId::as_i32).collect()
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<ProductWithCategory>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS}, c.name AS category_name \
             FROM products p LEFT JOIN categories c ON c.id = p.category_id \
             WHERE p.id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_joined).transpose()
    }

    async fn find_all_products(&self) -> Result<Vec<ProductWithCategory>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS}, c.name AS category_name \
             FROM products p LEFT JOIN categories c ON c.id = p.category_id \
             ORDER BY p.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_joined).collect()
    }

    async fn seed(&self, categories: Vec<Category>, products: Vec<Product>) -> Result<SeedReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        for category in &categories {
            let result = sqlx::query(
                r#"
                INSERT INTO categories (id, name, description)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(category.id.as_i32())
            .bind(&category.name)
            .bind(&category.description)
            .execute(&mut *tx)
            .await?;
            report.categories_inserted += result.rows_affected() as usize;
        }

        for product in &products {
            let result = sqlx::query(
                r#"
                INSERT INTO products (id, name, description, category_id, stock, price,
                                      created_by, created_date, modified_by, modified_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(product.id.as_i32())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.category_id.as_i32())
            .bind(product.stock)
            .bind(product.price)
            .bind(&product.created_by)
            .bind(product.created_date)
            .bind(&product.modified_by)
            .bind(product.modified_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_product_write_error(e, product))?;
            report.products_inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        tracing::debug!(?report, "catalog seeded");
        Ok(report)
    }
}

/// Transaction over a [`PostgresCatalogStore`].
///
/// Rolled back when dropped without `commit`.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProductLookup for PostgresTransaction {
    async fn product_exists(&mut self, id: ProductId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(id.as_i32())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CatalogTransaction for PostgresTransaction {
    async fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>> {
        // Row lock held until commit/rollback, serializing concurrent stock updates.
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 FOR UPDATE"
        ))
        .bind(id.as_i32())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn category_exists(&mut self, id: CategoryId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id.as_i32())
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn categories_existing(&mut self, ids: &[CategoryId]) -> Result<BTreeSet<CategoryId>> {
        let found: Vec<i32> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
            .bind(id_values(ids))
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(found.into_iter().map(CategoryId::new).collect())
    }

    async fn find_categories(&mut self, ids: &[CategoryId]) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, description FROM categories WHERE id = ANY($1) ORDER BY id ASC",
        )
        .bind(id_values(ids))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_category).collect()
    }

    async fn insert_products(&mut self, products: &[Product]) -> Result<()> {
        validate_products_for_insert(products).map_err(|e| StoreError::InvalidBatch(e.message))?;

        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, description, category_id, stock, price,
                                      created_by, created_date, modified_by, modified_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(product.id.as_i32())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.category_id.as_i32())
            .bind(product.stock)
            .bind(product.price)
            .bind(&product.created_by)
            .bind(product.created_date)
            .bind(&product.modified_by)
            .bind(product.modified_date)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_product_write_error(e, product))?;
        }

        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, category_id = $4, stock = $5, price = $6,
                modified_by = $7, modified_date = $8
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_i32())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id.as_i32())
        .bind(product.stock)
        .bind(product.price)
        .bind(&product.modified_by)
        .bind(product.modified_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_product_write_error(e, product))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product.id));
        }
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
