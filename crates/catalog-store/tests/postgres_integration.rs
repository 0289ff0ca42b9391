//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p catalog-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use catalog_store::{
    CatalogStore, CatalogTransaction, CatalogTransactionExt, Category, CategoryId,
    PostgresCatalogStore, Product, ProductId, ProductLookup, StoreError, seed,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_catalog_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool, cleared tables and the default categories
async fn get_test_store() -> PostgresCatalogStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE products, categories")
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresCatalogStore::new(pool);
    store
        .seed(seed::default_categories(), vec![])
        .await
        .unwrap();
    store
}

fn create_test_product(id: i32, category: i32, stock: i32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Test product {id}"),
        description: Some("Integration test product".to_string()),
        category_id: CategoryId::new(category),
        stock,
        price: Decimal::new(1999, 2),
        created_by: "System".to_string(),
        created_date: Utc::now(),
        modified_by: None,
        modified_date: None,
    }
}

#[tokio::test]
#[serial]
async fn insert_and_retrieve_products() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_products(&[create_test_product(100_010, 1, 5), create_test_product(100_011, 3, 7)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let all = store.find_all_products().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].product.id, ProductId::new(100_010));
    assert_eq!(all[0].category_name.as_deref(), Some("Kitchenware"));
    assert_eq!(all[1].category_name.as_deref(), Some("Books"));
    assert_eq!(all[1].product.price, Decimal::new(1999, 2));

    let one = store
        .find_product_by_id(ProductId::new(100_011))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.product.stock, 7);
}

#[tokio::test]
#[serial]
async fn rolled_back_transaction_persists_nothing() {
    let store = get_test_store().await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_products(&[create_test_product(100_020, 1, 1)])
            .await
            .unwrap();
        assert!(tx.product_exists(ProductId::new(100_020)).await.unwrap());
    }

    assert!(
        store
            .find_product_by_id(ProductId::new(100_020))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn duplicate_id_is_reported() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_products(&[create_test_product(100_030, 1, 1)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_products(&[create_test_product(100_030, 2, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateProductId(id) if id == ProductId::new(100_030)));
}

#[tokio::test]
#[serial]
async fn missing_category_is_reported() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_products(&[create_test_product(100_040, 42, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingCategory(id) if id == CategoryId::new(42)));
}

#[tokio::test]
#[serial]
async fn category_lookups() {
    let store = get_test_store().await;
    let mut tx = store.begin().await.unwrap();

    assert!(tx.category_exists(CategoryId::new(5)).await.unwrap());
    assert!(!tx.category_exists(CategoryId::new(6)).await.unwrap());

    let missing = tx
        .missing_categories(&[CategoryId::new(9), CategoryId::new(1), CategoryId::new(7), CategoryId::new(9)])
        .await
        .unwrap();
    assert_eq!(missing, vec![CategoryId::new(7), CategoryId::new(9)]);

    let category: Option<Category> = tx.find_category(CategoryId::new(4)).await.unwrap();
    assert_eq!(category.unwrap().name, "Home Appliances");
}

#[tokio::test]
#[serial]
async fn update_and_delete() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_products(&[create_test_product(100_050, 1, 10)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let mut product = tx
        .find_product_by_id(ProductId::new(100_050))
        .await
        .unwrap()
        .unwrap();
    product.stock = 3;
    product.stamp_modified(&"clerk".into(), Utc::now());
    tx.update_product(&product).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store
        .find_product_by_id(ProductId::new(100_050))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.product.stock, 3);
    assert_eq!(stored.product.modified_by.as_deref(), Some("clerk"));

    let mut tx = store.begin().await.unwrap();
    tx.delete_product(ProductId::new(100_050)).await.unwrap();
    let err = tx.delete_product(ProductId::new(100_050)).await.unwrap_err();
    assert!(matches!(err, StoreError::ProductNotFound(_)));
}

/// Takes `quantity` from a product inside its own transaction, returning the
/// stock the transaction saw, or `None` if there was not enough.
async fn take_stock(store: PostgresCatalogStore, id: ProductId, quantity: i32) -> (i32, Option<i32>) {
    let mut tx = store.begin().await.unwrap();
    let mut product = tx.find_product_by_id(id).await.unwrap().unwrap();
    let seen = product.stock;
    if seen < quantity {
        return (seen, None);
    }
    product.stock -= quantity;
    tx.update_product(&product).await.unwrap();
    tx.commit().await.unwrap();
    (seen, Some(product.stock))
}

#[tokio::test]
#[serial]
async fn locked_read_waits_for_the_holder_to_commit() {
    let store = get_test_store().await;
    let id = ProductId::new(100_070);

    let mut tx = store.begin().await.unwrap();
    tx.insert_products(&[create_test_product(100_070, 1, 10)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    // First transaction takes the row lock and holds it.
    let mut first = store.begin().await.unwrap();
    let mut product = first.find_product_by_id(id).await.unwrap().unwrap();
    assert_eq!(product.stock, 10);

    let second = tokio::spawn(take_stock(store.clone(), id, 3));

    // Give the second transaction time to block on the lock.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!second.is_finished());

    product.stock -= 4;
    first.update_product(&product).await.unwrap();
    first.commit().await.unwrap();

    let (seen, remaining) = second.await.unwrap();
    assert_eq!(seen, 6);
    assert_eq!(remaining, Some(3));

    let stored = store.find_product_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.product.stock, 3);
}

#[tokio::test]
#[serial]
async fn concurrent_stock_takes_never_oversell() {
    let store = get_test_store().await;
    let id = ProductId::new(100_080);

    let mut tx = store.begin().await.unwrap();
    tx.insert_products(&[create_test_product(100_080, 1, 4)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| tokio::spawn(take_stock(store.clone(), id, 1)))
        .collect();

    let mut taken = 0;
    for handle in handles {
        let (seen, remaining) = handle.await.unwrap();
        assert!(seen >= 0);
        if let Some(remaining) = remaining {
            assert!(remaining >= 0);
            taken += 1;
        }
    }

    assert_eq!(taken, 4);
    let stored = store.find_product_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.product.stock, 0);
}

#[tokio::test]
#[serial]
async fn negative_stock_is_rejected_by_the_schema() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let result = tx
        .insert_products(&[create_test_product(100_060, 1, -1)])
        .await;
    assert!(matches!(result, Err(StoreError::Database(_))));
}

#[tokio::test]
#[serial]
async fn seeding_twice_inserts_once() {
    let store = get_test_store().await;
    let now = Utc::now();

    let first = store
        .seed(seed::default_categories(), seed::default_products(now))
        .await
        .unwrap();
    assert_eq!(first.categories_inserted, 0);
    assert_eq!(first.products_inserted, 5);

    let second = store
        .seed(seed::default_categories(), seed::default_products(now))
        .await
        .unwrap();
    assert_eq!(second.products_inserted, 0);
}
