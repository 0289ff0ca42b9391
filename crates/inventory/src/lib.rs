//! Inventory business logic for the product catalog.
//!
//! This crate provides:
//! - Field validation for proposed products
//! - Product identifier allocation
//! - [`InventoryService`], which orchestrates catalog CRUD and stock mutation
//!   on top of a [`catalog_store::CatalogStore`]

pub mod allocator;
pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod validation;

pub use allocator::{IdAllocator, RandomIdAllocator, SequentialIdAllocator};
pub use config::InventoryConfig;
pub use error::{ErrorKind, InventoryError};
pub use model::{ProductDraft, ProductView};
pub use service::InventoryService;
pub use validation::ValidationError;

pub use common::{Actor, CategoryId, ProductId};
