//! Persistence for the product catalog.
//!
//! Products and categories are read through a [`CatalogStore`] handle and
//! mutated through a [`CatalogTransaction`], which stages changes until it is
//! committed. Two implementations are provided: an in-memory store for tests
//! and local runs, and a PostgreSQL store backed by `sqlx`.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod seed;
pub mod store;

pub use common::{Actor, CategoryId, ProductId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryCatalogStore, InMemoryTransaction};
pub use postgres::{PostgresCatalogStore, PostgresTransaction};
pub use record::{Category, Product, ProductWithCategory};
pub use seed::SeedReport;
pub use store::{CatalogStore, CatalogTransaction, CatalogTransactionExt, ProductLookup};
