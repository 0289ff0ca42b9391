//! Request- and response-shaped product types.

use catalog_store::{Product, ProductWithCategory};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{Actor, CategoryId, ProductId};

/// Proposed product fields, as supplied to `add` and `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub stock: i32,
    pub price: Decimal,
}

impl ProductDraft {
    /// Creates a draft without a description.
    pub fn new(
        name: impl Into<String>,
        category_id: impl Into<CategoryId>,
        stock: i32,
        price: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            category_id: category_id.into(),
            stock,
            price,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds a new product record from the draft.
    pub(crate) fn into_product(self, id: ProductId, actor: &Actor, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            stock: self.stock,
            price: self.price,
            created_by: actor.as_str().to_string(),
            created_date: now,
            modified_by: None,
            modified_date: None,
        }
    }

    /// Overwrites the mutable fields of `product` with the draft's values.
    pub(crate) fn apply_to(self, product: &mut Product) {
        product.name = self.name;
        product.description = self.description;
        product.category_id = self.category_id;
        product.stock = self.stock;
        product.price = self.price;
    }
}

/// A product as returned to callers, with its category name attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub category: Option<String>,
    pub stock: i32,
    pub price: Decimal,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
}

impl ProductView {
    /// Projects a product together with its category name.
    pub fn from_parts(product: Product, category: Option<String>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            category_id: product.category_id,
            category,
            stock: product.stock,
            price: product.price,
            created_by: product.created_by,
            created_date: product.created_date,
            modified_by: product.modified_by,
            modified_date: product.modified_date,
        }
    }
}

impl From<ProductWithCategory> for ProductView {
    fn from(joined: ProductWithCategory) -> Self {
        Self::from_parts(joined.product, joined.category_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_becomes_unmodified_product() {
        let now = Utc::now();
        let draft = ProductDraft::new("Kettle", 1, 4, Decimal::new(2500, 2)).with_description("1.7L");
        let product = draft.into_product(ProductId::new(123_456), &Actor::new("clerk"), now);

        assert_eq!(product.id, ProductId::new(123_456));
        assert_eq!(product.description.as_deref(), Some("1.7L"));
        assert_eq!(product.created_by, "clerk");
        assert_eq!(product.created_date, now);
        assert!(product.modified_by.is_none());
        assert!(product.modified_date.is_none());
    }

    #[test]
    fn view_carries_category_name() {
        let product = ProductDraft::new("Kettle", 4, 4, Decimal::ONE).into_product(
            ProductId::new(200_000),
            &Actor::system(),
            Utc::now(),
        );
        let view: ProductView =
            ProductWithCategory::new(product, Some("Home Appliances".to_string())).into();

        assert_eq!(view.category.as_deref(), Some("Home Appliances"));
        assert_eq!(view.category_id, CategoryId::new(4));
        assert_eq!(view.created_by, "System");
    }
}
