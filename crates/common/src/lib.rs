//! Shared types for the product catalog workspace.

pub mod types;

pub use types::{Actor, CategoryId, ProductId};
