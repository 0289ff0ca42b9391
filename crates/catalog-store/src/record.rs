use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Actor, CategoryId, ProductId};

/// A named grouping of products.
///
/// Categories are seeded outside the inventory service and are read-only to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    /// Creates a new category.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A catalog item as stored.
///
/// The category is referenced by id only; see [`ProductWithCategory`] for the
/// joined form returned by reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub stock: i32,
    pub price: Decimal,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
}

impl Product {
    /// Records a mutation by `actor` at `at`.
    pub fn stamp_modified(&mut self, actor: &Actor, at: DateTime<Utc>) {
        self.modified_by = Some(actor.as_str().to_string());
        self.modified_date = Some(at);
    }

    /// Returns true if the product has been written since creation.
    pub fn is_modified(&self) -> bool {
        self.modified_date.is_some()
    }
}

/// A product joined with the name of its category, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithCategory {
    pub product: Product,
    pub category_name: Option<String>,
}

impl ProductWithCategory {
    pub fn new(product: Product, category_name: Option<String>) -> Self {
        Self {
            product,
            category_name,
        }
    }
}
